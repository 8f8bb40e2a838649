use std::collections::HashMap;
use std::sync::Arc;

use tracing::{debug, warn};

use super::operation::{PendingCallback, TableOperations};
use super::table::TableCache;
use crate::schema::ModuleDef;

/// Every table of a module, addressed by name. Built once from the module
/// definition at connect time.
#[derive(Debug, Clone, Default)]
pub struct ClientCache {
  tables: HashMap<String, TableCache>,
}

impl ClientCache {
  pub fn new(module: &ModuleDef) -> Self {
    let tables = module
      .tables()
      .iter()
      .map(|def| (def.name.clone(), TableCache::new(Arc::new(def.clone()))))
      .collect();
    Self { tables }
  }

  pub fn table(&self, name: &str) -> Option<&TableCache> {
    self.tables.get(name)
  }

  pub fn table_names(&self) -> impl Iterator<Item = &str> + '_ {
    self.tables.keys().map(String::as_str)
  }

  /// Apply a whole message's table updates. Callbacks come back in the
  /// order the updates were supplied.
  pub fn apply(&mut self, updates: Vec<TableOperations>) -> Vec<PendingCallback> {
    let mut pending = Vec::new();
    for update in updates {
      let Some(table) = self.tables.get_mut(&update.table_name) else {
        warn!(table = %update.table_name, "Skipping update for a table not in the module");
        continue;
      };
      debug!(table = %update.table_name, ops = update.operations.len(), "applying table update");
      pending.extend(table.apply_operations(update.operations));
    }
    pending
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::cache::RowOperation;
  use crate::schema::TableDef;
  use shared::algebraic::{AlgebraicType, AlgebraicValue, ProductType, ProductValue, RowKey, Typespace};

  #[test]
  fn unknown_tables_are_skipped() {
    let mut module = ModuleDef::new(Typespace::new());
    module.add_table(TableDef::new("a", ProductType::new([("x", AlgebraicType::U8)])));
    let mut cache = ClientCache::new(&module);

    let op = |v: u8| RowOperation::insert(RowKey::Unsigned(v as u128), ProductValue::new([AlgebraicValue::U8(v)]));
    let pending = cache.apply(vec![
      TableOperations {
        table_name: "missing".into(),
        operations: vec![op(1)],
      },
      TableOperations {
        table_name: "a".into(),
        operations: vec![op(2)],
      },
    ]);
    assert_eq!(pending.len(), 1);
    assert_eq!(pending[0].table, "a");
    assert_eq!(cache.table("a").unwrap().count(), 1);
  }
}
