//! Decoding of table updates into cache operations.

use shared::algebraic::codec::deserialize_product;
use shared::algebraic::Typespace;
use shared::serialize::{BinaryReader, Decode};
use shared::{Result, SyncError};
use tracing::warn;

use crate::cache::{OperationKind, RowOperation, TableOperations};
use crate::protocol::{Algorithm, BsatnRowList, CompressableQueryUpdate, DatabaseUpdate, Decompressor, QueryUpdate, TableUpdate};
use crate::schema::{ModuleDef, TableDef};

/// Decode every table of a database update. Tables the module does not
/// define are skipped with a warning.
pub(crate) async fn parse_database_update(
  module: &ModuleDef,
  update: DatabaseUpdate,
  decompressor: &dyn Decompressor,
) -> Result<Vec<TableOperations>> {
  let mut tables = Vec::with_capacity(update.tables.len());
  for table_update in update.tables {
    if let Some(parsed) = parse_table_update(module, table_update, decompressor).await? {
      tables.push(parsed);
    }
  }
  Ok(tables)
}

/// Decode one table's query updates: for each, inserts first, then deletes.
pub(crate) async fn parse_table_update(
  module: &ModuleDef,
  update: TableUpdate,
  decompressor: &dyn Decompressor,
) -> Result<Option<TableOperations>> {
  let Some(table) = module.table(&update.table_name) else {
    warn!(table = %update.table_name, "Skipping update for a table not in the module");
    return Ok(None);
  };

  let mut operations = Vec::new();
  for query_update in update.updates {
    let query_update = match query_update {
      CompressableQueryUpdate::Uncompressed(query_update) => query_update,
      CompressableQueryUpdate::Gzip(bytes) => {
        let inflated = decompressor.decompress(Algorithm::Gzip, &bytes).await?;
        QueryUpdate::from_bytes(&inflated)?
      }
      CompressableQueryUpdate::Brotli(_) => {
        return Err(SyncError::UnsupportedCompression(Algorithm::Brotli.name().into()))
      }
    };
    operations.extend(parse_row_list(OperationKind::Insert, table, module.typespace(), &query_update.inserts)?);
    operations.extend(parse_row_list(OperationKind::Delete, table, module.typespace(), &query_update.deletes)?);
  }

  Ok(Some(TableOperations {
    table_name: update.table_name,
    operations,
  }))
}

/// Decode rows back to back until the buffer is used up.
pub(crate) fn parse_row_list(
  kind: OperationKind,
  table: &TableDef,
  typespace: &Typespace,
  list: &BsatnRowList,
) -> Result<Vec<RowOperation>> {
  let data = list.rows_data.as_slice();
  let mut reader = BinaryReader::new(data);
  let mut operations = Vec::new();

  while reader.remaining() > 0 {
    let start = reader.offset();
    let row = deserialize_product(&mut reader, &table.row_type, typespace)?;
    let end = reader.offset();
    if end == start {
      return Err(SyncError::MalformedRowList(format!(
        "zero-width rows for table '{}' with {} bytes left",
        table.name,
        reader.remaining()
      )));
    }
    list.size_hint.check_row(operations.len(), start, end)?;

    let row_key = table.row_key(&row, &data[start..end], typespace)?;
    operations.push(RowOperation { kind, row_key, row });
  }
  Ok(operations)
}
