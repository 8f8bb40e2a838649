//! Schema-driven value model: type descriptions, dynamic values, and the
//! binary codec that maps one onto the other.

pub mod codec;
pub mod convert;
pub mod key;
pub mod types;
pub mod value;

pub use codec::{deserialize, deserialize_value, serialize, serialize_value};
pub use convert::{FromValue, IntoValue};
pub use key::RowKey;
pub use types::{
    AlgebraicType, ProductType, ProductTypeElement, SpecialKind, SumType, SumTypeVariant, TypeRef,
    Typespace,
};
pub use value::{AlgebraicValue, ProductValue, SumValue};
