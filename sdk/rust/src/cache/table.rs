//! Reference-counted row store for one table.

use std::collections::{BTreeMap, HashMap};
use std::ops::RangeBounds;
use std::sync::Arc;

use shared::algebraic::{AlgebraicValue, ProductValue, RowKey};
use shared::{Result, SyncError};
use tracing::{error, warn};

use super::index;
use super::operation::{OperationKind, PendingCallback, RowChange, RowOperation};
use crate::schema::TableDef;

#[derive(Debug, Clone)]
struct CachedRow {
  row: ProductValue,
  ref_count: u64,
}

/// Live rows of one table keyed by row identity.
///
/// Each entry counts how many active subscriptions claim it. A row is only
/// removed when a delete brings that count to zero.
#[derive(Debug, Clone)]
pub struct TableCache {
  def: Arc<TableDef>,
  rows: BTreeMap<RowKey, CachedRow>,
}

/// Per-identity tally used while applying a keyed batch. The last
/// operation's row wins.
struct Tally {
  row: ProductValue,
  count: u64,
}

impl TableCache {
  pub fn new(def: Arc<TableDef>) -> Self {
    Self {
      def,
      rows: BTreeMap::new(),
    }
  }

  pub fn def(&self) -> &TableDef {
    &self.def
  }

  pub fn name(&self) -> &str {
    &self.def.name
  }

  pub fn count(&self) -> usize {
    self.rows.len()
  }

  pub fn is_empty(&self) -> bool {
    self.rows.is_empty()
  }

  pub fn contains(&self, key: &RowKey) -> bool {
    self.rows.contains_key(key)
  }

  pub fn get(&self, key: &RowKey) -> Option<&ProductValue> {
    self.rows.get(key).map(|c| &c.row)
  }

  /// Current reference count of a row; zero when absent.
  pub fn ref_count(&self, key: &RowKey) -> u64 {
    self.rows.get(key).map_or(0, |c| c.ref_count)
  }

  pub fn iter(&self) -> impl Iterator<Item = &ProductValue> + '_ {
    self.rows.values().map(|c| &c.row)
  }

  /// Apply one message's operations for this table and return the
  /// notifications they produce, in order. Nothing is dispatched here.
  pub fn apply_operations(&mut self, operations: Vec<RowOperation>) -> Vec<PendingCallback> {
    if self.def.primary_key.is_some() {
      self.apply_keyed(operations)
    } else {
      self.apply_unkeyed(operations)
    }
  }

  fn apply_keyed(&mut self, operations: Vec<RowOperation>) -> Vec<PendingCallback> {
    let mut inserts: Vec<(RowKey, Tally)> = Vec::new();
    let mut deletes: Vec<(RowKey, Tally)> = Vec::new();
    let mut insert_pos: HashMap<RowKey, usize> = HashMap::new();
    let mut delete_pos: HashMap<RowKey, usize> = HashMap::new();

    for op in operations {
      let (list, pos) = match op.kind {
        OperationKind::Insert => (&mut inserts, &mut insert_pos),
        OperationKind::Delete => (&mut deletes, &mut delete_pos),
      };
      match pos.get(&op.row_key) {
        Some(&i) => {
          let tally = &mut list[i].1;
          tally.row = op.row;
          tally.count += 1;
        }
        None => {
          pos.insert(op.row_key.clone(), list.len());
          list.push((op.row_key, Tally { row: op.row, count: 1 }));
        }
      }
    }

    let mut pending = Vec::new();
    let mut updated = vec![false; deletes.len()];
    for (key, tally) in inserts {
      match delete_pos.get(&key) {
        Some(&i) => {
          let delta = tally.count as i64 - deletes[i].1.count as i64;
          pending.extend(self.update(key, tally.row, delta));
          updated[i] = true;
        }
        None => pending.extend(self.insert(key, tally.row, tally.count)),
      }
    }
    for ((key, tally), skip) in deletes.into_iter().zip(updated) {
      if !skip {
        pending.extend(self.delete(key, tally.row, tally.count));
      }
    }
    pending
  }

  fn apply_unkeyed(&mut self, operations: Vec<RowOperation>) -> Vec<PendingCallback> {
    operations
      .into_iter()
      .filter_map(|op| match op.kind {
        OperationKind::Insert => self.insert(op.row_key, op.row, 1),
        OperationKind::Delete => self.delete(op.row_key, op.row, 1),
      })
      .collect()
  }

  fn insert(&mut self, key: RowKey, row: ProductValue, count: u64) -> Option<PendingCallback> {
    let previous = self.ref_count(&key);
    self.rows.insert(
      key,
      CachedRow {
        row: row.clone(),
        ref_count: previous + count,
      },
    );
    (previous == 0).then(|| self.pending(RowChange::Insert(row)))
  }

  fn delete(&mut self, key: RowKey, row: ProductValue, count: u64) -> Option<PendingCallback> {
    let previous = self.ref_count(&key);
    if previous == 0 {
      warn!(table = %self.def.name, row_key = %key, "Deleting a row that was not present in the cache");
      return None;
    }
    if previous <= count {
      self.rows.remove(&key);
      return Some(self.pending(RowChange::Delete(row)));
    }
    self.rows.insert(
      key,
      CachedRow {
        row,
        ref_count: previous - count,
      },
    );
    None
  }

  fn update(&mut self, key: RowKey, new: ProductValue, delta: i64) -> Option<PendingCallback> {
    let Some(existing) = self.rows.get(&key) else {
      error!(table = %self.def.name, row_key = %key, "Updating a row that was not present in the cache");
      return None;
    };
    let previous = existing.ref_count as i64;
    if previous + delta <= 0 {
      error!(
        table = %self.def.name,
        row_key = %key,
        previous,
        delta,
        "Negative reference count"
      );
      return None;
    }
    let old = existing.row.clone();
    self.rows.insert(
      key,
      CachedRow {
        row: new.clone(),
        ref_count: (previous + delta).max(1) as u64,
      },
    );
    if previous == 0 {
      return Some(self.pending(RowChange::Insert(new)));
    }
    Some(self.pending(RowChange::Update { old, new }))
  }

  fn pending(&self, change: RowChange) -> PendingCallback {
    PendingCallback {
      table: self.def.name.clone(),
      change,
    }
  }

  // ── Indexes ─────────────────────────────────────────────────────────

  /// Look up a row through a unique index. `key` holds one value per
  /// indexed column.
  pub fn find(&self, index_name: &str, key: &[AlgebraicValue]) -> Result<Option<&ProductValue>> {
    let index = self.index(index_name)?;
    if !index.unique {
      return Err(SyncError::UnexpectedMessage(format!(
        "index '{index_name}' on '{}' is not unique, use filter",
        self.def.name
      )));
    }
    Ok(self.iter().find(|row| index::key_equals(row, &index.columns, key)))
  }

  /// Scan a btree index. All columns before the last indexed one must equal
  /// `prefix`; the last column must fall in `range`.
  pub fn filter<'a, R>(
    &'a self,
    index_name: &str,
    prefix: &'a [AlgebraicValue],
    range: R,
  ) -> Result<impl Iterator<Item = &'a ProductValue> + 'a>
  where
    R: RangeBounds<AlgebraicValue> + 'a,
  {
    let columns = self.index(index_name)?.columns.clone();
    if prefix.len() + 1 != columns.len() {
      return Err(SyncError::mismatch(
        format!("{} prefix values for index '{index_name}'", columns.len().saturating_sub(1)),
        format!("{} values", prefix.len()),
      ));
    }
    Ok(
      self
        .iter()
        .filter(move |row| index::in_range(row, &columns, prefix, &range)),
    )
  }

  fn index(&self, name: &str) -> Result<&crate::schema::IndexDef> {
    self.def.index(name).ok_or_else(|| {
      SyncError::mismatch(
        format!("index on table '{}'", self.def.name),
        format!("unknown index '{name}'"),
      )
    })
  }
}
