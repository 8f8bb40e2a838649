//! Btree index matching over cached rows.

use std::cmp::Ordering;
use std::ops::{Bound, RangeBounds};

use shared::algebraic::{AlgebraicValue, ProductValue};

/// Whether the indexed columns of `row` equal `key` exactly.
pub(crate) fn key_equals(row: &ProductValue, columns: &[usize], key: &[AlgebraicValue]) -> bool {
  columns.len() == key.len()
    && columns
      .iter()
      .zip(key)
      .all(|(&c, expected)| row.elements.get(c) == Some(expected))
}

/// Whether `row` matches `prefix` on all but the last indexed column and
/// its last indexed column falls inside `range`.
pub(crate) fn in_range<R: RangeBounds<AlgebraicValue>>(
  row: &ProductValue,
  columns: &[usize],
  prefix: &[AlgebraicValue],
  range: &R,
) -> bool {
  let Some((&last, leading)) = columns.split_last() else {
    return false;
  };
  if !key_equals(row, leading, prefix) {
    return false;
  }
  let Some(value) = row.elements.get(last) else {
    return false;
  };
  above_start(value, range.start_bound()) && below_end(value, range.end_bound())
}

/// Values of different kinds are unordered.
fn compare(a: &AlgebraicValue, b: &AlgebraicValue) -> Option<Ordering> {
  if std::mem::discriminant(a) != std::mem::discriminant(b) {
    return None;
  }
  a.partial_cmp(b)
}

fn above_start(value: &AlgebraicValue, bound: Bound<&AlgebraicValue>) -> bool {
  match bound {
    Bound::Unbounded => true,
    Bound::Included(from) => matches!(compare(value, from), Some(Ordering::Greater | Ordering::Equal)),
    Bound::Excluded(from) => matches!(compare(value, from), Some(Ordering::Greater)),
  }
}

fn below_end(value: &AlgebraicValue, bound: Bound<&AlgebraicValue>) -> bool {
  match bound {
    Bound::Unbounded => true,
    Bound::Included(to) => matches!(compare(value, to), Some(Ordering::Less | Ordering::Equal)),
    Bound::Excluded(to) => matches!(compare(value, to), Some(Ordering::Less)),
  }
}
