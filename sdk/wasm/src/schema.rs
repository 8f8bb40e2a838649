//! Module schema supplied by JavaScript as JSON.
//!
//! ```json
//! {
//!   "tables": [
//!     { "name": "user", "primary_key": "identity",
//!       "columns": [{ "name": "identity", "type": "identity" },
//!                   { "name": "name", "type": "option<string>" }] }
//!   ],
//!   "reducers": [
//!     { "name": "set_name", "params": [{ "name": "name", "type": "string" }] }
//!   ]
//! }
//! ```

use serde::Deserialize;
use shared::algebraic::{AlgebraicType, ProductType, Typespace};
use shared::{Result, SyncError};
use spacesync_sdk::schema::{ModuleDef, ReducerDef, TableDef};

#[derive(Debug, Deserialize)]
struct ModuleSchema {
  #[serde(default)]
  tables: Vec<TableSchema>,
  #[serde(default)]
  reducers: Vec<ReducerSchema>,
}

#[derive(Debug, Deserialize)]
struct TableSchema {
  name: String,
  columns: Vec<ColumnSchema>,
  #[serde(default)]
  primary_key: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ReducerSchema {
  name: String,
  #[serde(default)]
  params: Vec<ColumnSchema>,
}

#[derive(Debug, Deserialize)]
struct ColumnSchema {
  name: String,
  #[serde(rename = "type")]
  ty: String,
}

/// Build a module definition from its JSON description.
pub fn parse_module(json: &str) -> Result<ModuleDef> {
  let schema: ModuleSchema = serde_json::from_str(json).map_err(|e| invalid("schema", e.to_string()))?;
  let mut module = ModuleDef::new(Typespace::new());

  for table in schema.tables {
    let row_type = product(&table.columns)?;
    let mut def = TableDef::new(table.name.as_str(), row_type);
    if let Some(pk) = &table.primary_key {
      let column = def
        .row_type
        .index_of(pk)
        .ok_or_else(|| invalid("primary_key", format!("table '{}' has no column '{pk}'", table.name)))?;
      def = def.with_primary_key(column);
    }
    module.add_table(def);
  }
  for reducer in schema.reducers {
    let params = product(&reducer.params)?;
    module.add_reducer(ReducerDef::new(reducer.name, params));
  }
  Ok(module)
}

fn product(columns: &[ColumnSchema]) -> Result<ProductType> {
  let elements = columns
    .iter()
    .map(|c| Ok((c.name.clone(), parse_type(&c.ty)?)))
    .collect::<Result<Vec<_>>>()?;
  Ok(ProductType::new(elements))
}

/// Parse a column type such as `u32`, `identity` or `option<array<string>>`.
pub fn parse_type(s: &str) -> Result<AlgebraicType> {
  let s = s.trim();
  if let Some(inner) = generic(s, "option") {
    return Ok(AlgebraicType::option(parse_type(inner)?));
  }
  if let Some(inner) = generic(s, "array") {
    return Ok(AlgebraicType::array(parse_type(inner)?));
  }
  let ty = match s {
    "bool" => AlgebraicType::Bool,
    "i8" => AlgebraicType::I8,
    "u8" => AlgebraicType::U8,
    "i16" => AlgebraicType::I16,
    "u16" => AlgebraicType::U16,
    "i32" => AlgebraicType::I32,
    "u32" => AlgebraicType::U32,
    "i64" => AlgebraicType::I64,
    "u64" => AlgebraicType::U64,
    "i128" => AlgebraicType::I128,
    "u128" => AlgebraicType::U128,
    "i256" => AlgebraicType::I256,
    "u256" => AlgebraicType::U256,
    "f32" => AlgebraicType::F32,
    "f64" => AlgebraicType::F64,
    "string" => AlgebraicType::String,
    "bytes" => AlgebraicType::bytes(),
    "identity" => AlgebraicType::identity(),
    "connection_id" => AlgebraicType::connection_id(),
    "timestamp" => AlgebraicType::timestamp(),
    "time_duration" => AlgebraicType::time_duration(),
    other => return Err(invalid("type", format!("unknown column type '{other}'"))),
  };
  Ok(ty)
}

/// `name<inner>` → `inner`
fn generic<'a>(s: &'a str, name: &str) -> Option<&'a str> {
  s.strip_prefix(name)?.strip_prefix('<')?.strip_suffix('>')
}

fn invalid(key: &str, reason: String) -> SyncError {
  SyncError::ConfigInvalid {
    key: key.to_string(),
    reason,
  }
}
