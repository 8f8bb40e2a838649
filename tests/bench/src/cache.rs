use std::sync::Arc;

use criterion::{black_box, criterion_group, criterion_main, BatchSize, Criterion};

use bench::{encoded_rows, row_type, row_value};
use shared::algebraic::{RowKey, Typespace};
use spacesync_sdk::cache::{RowOperation, TableCache};
use spacesync_sdk::schema::TableDef;

fn operations(def: &TableDef, rows: &[Vec<u8>], start: u64, delete: bool) -> Vec<RowOperation> {
  let typespace = Typespace::new();
  rows
    .iter()
    .zip(start..)
    .map(|(raw, id)| {
      let row = row_value(id);
      let key: RowKey = def.row_key(&row, raw, &typespace).unwrap();
      if delete {
        RowOperation::delete(key, row)
      } else {
        RowOperation::insert(key, row)
      }
    })
    .collect()
}

fn benchmark_cache(c: &mut Criterion) {
  let mut group = c.benchmark_group("cache");

  for (name, def) in [
    ("keyed", TableDef::new("player", row_type()).with_primary_key(0)),
    ("unkeyed", TableDef::new("player", row_type())),
  ] {
    let def = Arc::new(def);
    let rows = encoded_rows(0, 1_000);
    let inserts = operations(&def, &rows, 0, false);
    let deletes = operations(&def, &rows, 0, true);

    group.bench_function(format!("{name}_insert_1k"), |b| {
      b.iter_batched(
        || (TableCache::new(def.clone()), inserts.clone()),
        |(mut table, ops)| black_box(table.apply_operations(ops)),
        BatchSize::SmallInput,
      )
    });

    group.bench_function(format!("{name}_insert_then_delete_1k"), |b| {
      b.iter_batched(
        || (TableCache::new(def.clone()), inserts.clone(), deletes.clone()),
        |(mut table, ins, del)| {
          table.apply_operations(ins);
          black_box(table.apply_operations(del))
        },
        BatchSize::SmallInput,
      )
    });
  }

  group.finish();
}

criterion_group!(benches, benchmark_cache);
criterion_main!(benches);
