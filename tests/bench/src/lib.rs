//! Fixtures shared by the benchmarks.

use shared::algebraic::codec::serialize_product_value;
use shared::algebraic::{AlgebraicType, AlgebraicValue, ProductType, ProductValue, Typespace};
use shared::types::U256;

/// `{ id: u64, owner: identity, name: string, tags: array<string>, score: option<f64> }`
pub fn row_type() -> ProductType {
  ProductType::new([
    ("id", AlgebraicType::U64),
    ("owner", AlgebraicType::identity()),
    ("name", AlgebraicType::String),
    ("tags", AlgebraicType::array(AlgebraicType::String)),
    ("score", AlgebraicType::option(AlgebraicType::F64)),
  ])
}

pub fn row_value(id: u64) -> ProductValue {
  ProductValue::new([
    AlgebraicValue::U64(id),
    AlgebraicValue::product([AlgebraicValue::U256(U256::from(id as u128))]),
    AlgebraicValue::String(format!("player-{id}")),
    AlgebraicValue::Array(vec![
      AlgebraicValue::String("red".into()),
      AlgebraicValue::String("fast".into()),
    ]),
    AlgebraicValue::some(AlgebraicValue::F64(id as f64 * 1.5)),
  ])
}

/// `count` encoded rows with ids `start..start + count`.
pub fn encoded_rows(start: u64, count: u64) -> Vec<Vec<u8>> {
  let ty = row_type();
  let typespace = Typespace::new();
  (start..start + count)
    .map(|id| serialize_product_value(&ty, &row_value(id), &typespace).expect("row matches type"))
    .collect()
}
