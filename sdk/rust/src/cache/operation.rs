use std::fmt;

use shared::algebraic::{ProductValue, RowKey};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperationKind {
  Insert,
  Delete,
}

/// One decoded row change, ready to apply to a table.
#[derive(Debug, Clone, PartialEq)]
pub struct RowOperation {
  pub kind: OperationKind,
  pub row_key: RowKey,
  pub row: ProductValue,
}

impl RowOperation {
  pub fn insert(row_key: RowKey, row: ProductValue) -> Self {
    Self {
      kind: OperationKind::Insert,
      row_key,
      row,
    }
  }

  pub fn delete(row_key: RowKey, row: ProductValue) -> Self {
    Self {
      kind: OperationKind::Delete,
      row_key,
      row,
    }
  }
}

/// A row-level notification owed to listeners, produced while applying a
/// batch and fired only once the whole message has been applied.
#[derive(Debug, Clone, PartialEq)]
pub struct PendingCallback {
  pub table: String,
  pub change: RowChange,
}

#[derive(Debug, Clone, PartialEq)]
pub enum RowChange {
  Insert(ProductValue),
  Update { old: ProductValue, new: ProductValue },
  Delete(ProductValue),
}

impl RowChange {
  pub fn kind(&self) -> CallbackKind {
    match self {
      RowChange::Insert(_) => CallbackKind::Insert,
      RowChange::Update { .. } => CallbackKind::Update,
      RowChange::Delete(_) => CallbackKind::Delete,
    }
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CallbackKind {
  Insert,
  Update,
  Delete,
}

impl fmt::Display for CallbackKind {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(match self {
      CallbackKind::Insert => "insert",
      CallbackKind::Update => "update",
      CallbackKind::Delete => "delete",
    })
  }
}

/// Decoded operations for one table, in the order they were supplied.
#[derive(Debug, Clone, PartialEq)]
pub struct TableOperations {
  pub table_name: String,
  pub operations: Vec<RowOperation>,
}
