//! Per-table accessor over the client cache.

use std::ops::RangeBounds;
use std::sync::Arc;

use shared::algebraic::{AlgebraicValue, ProductValue};
use shared::{Result, SyncError};

use super::DbConnection;
use crate::event::{CallbackId, CallbackList, EventContext, RowCallback, UpdateCallback};
use crate::row::TableRow;

/// Row callbacks registered for one table.
#[derive(Default)]
pub(crate) struct TableCallbacks {
  pub(crate) insert: CallbackList<RowCallback>,
  pub(crate) update: CallbackList<UpdateCallback>,
  pub(crate) delete: CallbackList<RowCallback>,
}

/// Read access and row callbacks for one table.
///
/// Reads copy rows out of the cache so no lock is held by the caller.
#[derive(Clone, Debug)]
pub struct TableHandle {
  conn: DbConnection,
  name: String,
}

impl TableHandle {
  pub(crate) fn new(conn: DbConnection, name: &str) -> Self {
    Self {
      conn,
      name: name.to_string(),
    }
  }

  pub fn name(&self) -> &str {
    &self.name
  }

  /// Number of distinct rows currently cached.
  pub fn count(&self) -> usize {
    self.conn.cache().table(&self.name).map_or(0, |t| t.count())
  }

  pub fn rows(&self) -> Vec<ProductValue> {
    self
      .conn
      .cache()
      .table(&self.name)
      .map(|t| t.iter().cloned().collect())
      .unwrap_or_default()
  }

  /// Decode every cached row as `T`.
  pub fn typed_rows<T: TableRow>(&self) -> Result<Vec<T>> {
    if T::TABLE_NAME != self.name {
      return Err(SyncError::mismatch(
        format!("row type for '{}'", self.name),
        format!("row type for '{}'", T::TABLE_NAME),
      ));
    }
    self.rows().iter().map(T::from_row).collect()
  }

  /// Look up a row through a unique index.
  pub fn find(&self, index: &str, key: &[AlgebraicValue]) -> Result<Option<ProductValue>> {
    let cache = self.conn.cache();
    let table = cache
      .table(&self.name)
      .ok_or_else(|| SyncError::UnknownTable(self.name.clone()))?;
    Ok(table.find(index, key)?.cloned())
  }

  /// Rows whose leading index columns equal `prefix` and whose last indexed
  /// column falls in `range`.
  pub fn filter<R>(&self, index: &str, prefix: &[AlgebraicValue], range: R) -> Result<Vec<ProductValue>>
  where
    R: RangeBounds<AlgebraicValue>,
  {
    let cache = self.conn.cache();
    let table = cache
      .table(&self.name)
      .ok_or_else(|| SyncError::UnknownTable(self.name.clone()))?;
    let rows = table.filter(index, prefix, range)?.cloned().collect();
    Ok(rows)
  }

  // ── Callbacks ───────────────────────────────────────────────────────

  pub fn on_insert<F>(&self, callback: F) -> CallbackId
  where
    F: Fn(&EventContext, &ProductValue) + Send + Sync + 'static,
  {
    self.callbacks().insert.add(Arc::new(callback))
  }

  pub fn remove_on_insert(&self, id: CallbackId) -> bool {
    self.callbacks().insert.remove(id)
  }

  /// Fires when a row is replaced under the same primary key. Tables
  /// without a primary key only ever see inserts and deletes.
  pub fn on_update<F>(&self, callback: F) -> CallbackId
  where
    F: Fn(&EventContext, &ProductValue, &ProductValue) + Send + Sync + 'static,
  {
    self.callbacks().update.add(Arc::new(callback))
  }

  pub fn remove_on_update(&self, id: CallbackId) -> bool {
    self.callbacks().update.remove(id)
  }

  pub fn on_delete<F>(&self, callback: F) -> CallbackId
  where
    F: Fn(&EventContext, &ProductValue) + Send + Sync + 'static,
  {
    self.callbacks().delete.add(Arc::new(callback))
  }

  pub fn remove_on_delete(&self, id: CallbackId) -> bool {
    self.callbacks().delete.remove(id)
  }

  fn callbacks(&self) -> &TableCallbacks {
    // Handles are only built for tables in the module, and the callback
    // map holds an entry for each of them.
    &self.conn.inner.table_callbacks[&self.name]
  }
}
