//! Module schema: the tables, reducers and procedures a database exposes,
//! as seen by the client.
//!
//! A `ModuleDef` is assembled once (usually by generated bindings) and then
//! shared read-only by the cache, the pump and the typed accessors.

use std::collections::HashMap;

use shared::algebraic::{AlgebraicType, ProductType, ProductValue, RowKey, Typespace};
use shared::{Result, SyncError};

/// Everything the client knows about the remote module.
#[derive(Debug, Clone, Default)]
pub struct ModuleDef {
  typespace: Typespace,
  tables: Vec<TableDef>,
  reducers: Vec<ReducerDef>,
  procedures: Vec<ProcedureDef>,
  table_index: HashMap<String, usize>,
  reducer_index: HashMap<String, usize>,
}

impl ModuleDef {
  pub fn new(typespace: Typespace) -> Self {
    Self {
      typespace,
      ..Self::default()
    }
  }

  /// Register a table. A later table with the same name replaces the earlier one.
  pub fn add_table(&mut self, table: TableDef) -> &mut Self {
    match self.table_index.get(&table.name) {
      Some(&i) => self.tables[i] = table,
      None => {
        self.table_index.insert(table.name.clone(), self.tables.len());
        self.tables.push(table);
      }
    }
    self
  }

  pub fn add_reducer(&mut self, reducer: ReducerDef) -> &mut Self {
    match self.reducer_index.get(&reducer.name) {
      Some(&i) => self.reducers[i] = reducer,
      None => {
        self.reducer_index.insert(reducer.name.clone(), self.reducers.len());
        self.reducers.push(reducer);
      }
    }
    self
  }

  pub fn add_procedure(&mut self, procedure: ProcedureDef) -> &mut Self {
    self.procedures.retain(|p| p.name != procedure.name);
    self.procedures.push(procedure);
    self
  }

  pub fn typespace(&self) -> &Typespace {
    &self.typespace
  }

  pub fn tables(&self) -> &[TableDef] {
    &self.tables
  }

  pub fn reducers(&self) -> &[ReducerDef] {
    &self.reducers
  }

  pub fn table(&self, name: &str) -> Option<&TableDef> {
    self.table_index.get(name).map(|&i| &self.tables[i])
  }

  pub fn reducer(&self, name: &str) -> Option<&ReducerDef> {
    self.reducer_index.get(name).map(|&i| &self.reducers[i])
  }

  pub fn procedure(&self, name: &str) -> Option<&ProcedureDef> {
    self.procedures.iter().find(|p| p.name == name)
  }

  pub(crate) fn require_table(&self, name: &str) -> Result<&TableDef> {
    self
      .table(name)
      .ok_or_else(|| SyncError::UnknownTable(name.to_string()))
  }

  pub(crate) fn require_reducer(&self, name: &str) -> Result<&ReducerDef> {
    self
      .reducer(name)
      .ok_or_else(|| SyncError::UnknownReducer(name.to_string()))
  }
}

/// A client-visible table.
#[derive(Debug, Clone)]
pub struct TableDef {
  pub name: String,
  pub row_type: ProductType,
  /// Column position of the primary key, if the table declares one.
  pub primary_key: Option<usize>,
  pub indexes: Vec<IndexDef>,
}

impl TableDef {
  pub fn new(name: impl Into<String>, row_type: ProductType) -> Self {
    Self {
      name: name.into(),
      row_type,
      primary_key: None,
      indexes: Vec::new(),
    }
  }

  /// Declare column `column` as the primary key. Also registers a unique
  /// index named after the column.
  pub fn with_primary_key(mut self, column: usize) -> Self {
    self.primary_key = Some(column);
    let name = self
      .row_type
      .elements
      .get(column)
      .map(|e| e.name.clone())
      .unwrap_or_else(|| format!("col_{column}"));
    self.indexes.push(IndexDef::unique(name, [column]));
    self
  }

  pub fn with_index(mut self, index: IndexDef) -> Self {
    self.indexes.push(index);
    self
  }

  pub fn index(&self, name: &str) -> Option<&IndexDef> {
    self.indexes.iter().find(|i| i.name == name)
  }

  /// Identity of a decoded row. `raw` is the exact byte span the row was
  /// decoded from and is only used by unkeyed tables.
  pub fn row_key(&self, row: &ProductValue, raw: &[u8], typespace: &Typespace) -> Result<RowKey> {
    match self.primary_key {
      Some(column) => {
        let ty = self
          .row_type
          .elements
          .get(column)
          .map(|e| &e.algebraic_type)
          .ok_or_else(|| SyncError::mismatch(format!("primary key column {column}"), "missing column"))?;
        RowKey::from_value(ty, row.field(column)?, typespace)
      }
      None => Ok(RowKey::from_row_bytes(raw)),
    }
  }
}

/// A btree index over one or more columns.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexDef {
  pub name: String,
  pub columns: Vec<usize>,
  pub unique: bool,
}

impl IndexDef {
  pub fn unique(name: impl Into<String>, columns: impl IntoIterator<Item = usize>) -> Self {
    Self {
      name: name.into(),
      columns: columns.into_iter().collect(),
      unique: true,
    }
  }

  pub fn btree(name: impl Into<String>, columns: impl IntoIterator<Item = usize>) -> Self {
    Self {
      name: name.into(),
      columns: columns.into_iter().collect(),
      unique: false,
    }
  }
}

/// A reducer and the product type of its arguments.
#[derive(Debug, Clone)]
pub struct ReducerDef {
  pub name: String,
  pub params: ProductType,
}

impl ReducerDef {
  pub fn new(name: impl Into<String>, params: ProductType) -> Self {
    Self {
      name: name.into(),
      params,
    }
  }
}

#[derive(Debug, Clone)]
pub struct ProcedureDef {
  pub name: String,
  pub params: ProductType,
  pub return_type: AlgebraicType,
}

impl ProcedureDef {
  pub fn new(name: impl Into<String>, params: ProductType, return_type: AlgebraicType) -> Self {
    Self {
      name: name.into(),
      params,
      return_type,
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use shared::algebraic::{AlgebraicValue, ProductValue};

  fn user_table() -> TableDef {
    TableDef::new(
      "user",
      ProductType::new([("id", AlgebraicType::U32), ("name", AlgebraicType::String)]),
    )
  }

  #[test]
  fn primary_key_registers_unique_index() {
    let table = user_table().with_primary_key(0);
    let index = table.index("id").unwrap();
    assert!(index.unique);
    assert_eq!(index.columns, vec![0]);
  }

  #[test]
  fn row_key_uses_primary_key_or_raw_bytes() {
    let ts = Typespace::new();
    let row = ProductValue::new([AlgebraicValue::U32(9), AlgebraicValue::String("ann".into())]);

    let keyed = user_table().with_primary_key(0);
    assert_eq!(keyed.row_key(&row, &[], &ts).unwrap(), RowKey::Unsigned(9));

    let unkeyed = user_table();
    assert_eq!(
      unkeyed.row_key(&row, &[1, 2, 3], &ts).unwrap(),
      RowKey::from_row_bytes(&[1, 2, 3])
    );
  }

  #[test]
  fn lookups_by_name() {
    let mut module = ModuleDef::new(Typespace::new());
    module
      .add_table(user_table())
      .add_reducer(ReducerDef::new("set_name", ProductType::new([("name", AlgebraicType::String)])));
    assert!(module.table("user").is_some());
    assert!(matches!(module.require_table("nope"), Err(SyncError::UnknownTable(_))));
    assert!(module.require_reducer("set_name").is_ok());
  }
}
