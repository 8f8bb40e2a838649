use std::fmt;

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;

use super::codec::serialize_value;
use super::types::{AlgebraicType, SpecialKind, Typespace};
use super::value::AlgebraicValue;
use crate::error::{Result, SyncError};
use crate::serialize::BinaryWriter;
use crate::types::{I256, U256};

/// Hashable identity of a cached row.
///
/// Keyed tables use the primary-key column's value: scalars directly, the
/// identity/connection-id/timestamp/duration wrappers through their inner
/// scalar, anything else through the base64 of its encoding. Unkeyed tables
/// use the base64 of the whole row's bytes, so identically encoded rows
/// collapse onto one entry.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum RowKey {
    Bool(bool),
    Unsigned(u128),
    Signed(i128),
    U256(U256),
    I256(I256),
    /// IEEE bit pattern widened to 64 bits.
    Float(u64),
    String(String),
    /// Base64 of an encoded value or row.
    Encoded(String),
}

impl RowKey {
    /// `-0.0` and `0.0` share a key.
    fn float(v: f64) -> Self {
        let v = if v == 0.0 { 0.0 } else { v };
        Self::Float(v.to_bits())
    }

    /// Key for raw row bytes of an unkeyed table.
    pub fn from_row_bytes(bytes: &[u8]) -> Self {
        Self::Encoded(BASE64.encode(bytes))
    }

    /// Key for a primary-key column value of type `ty`.
    pub fn from_value(ty: &AlgebraicType, value: &AlgebraicValue, typespace: &Typespace) -> Result<Self> {
        let ty = typespace.resolve(ty)?;
        let key = match (ty, value) {
            (AlgebraicType::Bool, AlgebraicValue::Bool(v)) => Self::Bool(*v),
            (AlgebraicType::U8, AlgebraicValue::U8(v)) => Self::Unsigned(*v as u128),
            (AlgebraicType::U16, AlgebraicValue::U16(v)) => Self::Unsigned(*v as u128),
            (AlgebraicType::U32, AlgebraicValue::U32(v)) => Self::Unsigned(*v as u128),
            (AlgebraicType::U64, AlgebraicValue::U64(v)) => Self::Unsigned(*v as u128),
            (AlgebraicType::U128, AlgebraicValue::U128(v)) => Self::Unsigned(*v),
            (AlgebraicType::I8, AlgebraicValue::I8(v)) => Self::Signed(*v as i128),
            (AlgebraicType::I16, AlgebraicValue::I16(v)) => Self::Signed(*v as i128),
            (AlgebraicType::I32, AlgebraicValue::I32(v)) => Self::Signed(*v as i128),
            (AlgebraicType::I64, AlgebraicValue::I64(v)) => Self::Signed(*v as i128),
            (AlgebraicType::I128, AlgebraicValue::I128(v)) => Self::Signed(*v),
            (AlgebraicType::U256, AlgebraicValue::U256(v)) => Self::U256(*v),
            (AlgebraicType::I256, AlgebraicValue::I256(v)) => Self::I256(*v),
            (AlgebraicType::F32, AlgebraicValue::F32(v)) => Self::float(*v as f64),
            (AlgebraicType::F64, AlgebraicValue::F64(v)) => Self::float(*v),
            (AlgebraicType::String, AlgebraicValue::String(v)) => Self::String(v.clone()),
            (AlgebraicType::Product(pt), AlgebraicValue::Product(pv)) if pt.special_kind().is_some() => {
                let inner = pv.field(0)?;
                match pt.special_kind() {
                    Some(SpecialKind::Identity) => Self::from_value(&AlgebraicType::U256, inner, typespace)?,
                    Some(SpecialKind::ConnectionId) => Self::from_value(&AlgebraicType::U128, inner, typespace)?,
                    Some(SpecialKind::Timestamp) | Some(SpecialKind::TimeDuration) => {
                        Self::from_value(&AlgebraicType::I64, inner, typespace)?
                    }
                    None => return Err(SyncError::mismatch("special product", "product")),
                }
            }
            (ty, value) => {
                let mut writer = BinaryWriter::with_capacity(16);
                serialize_value(&mut writer, ty, value, typespace)?;
                Self::Encoded(writer.to_base64())
            }
        };
        Ok(key)
    }
}

impl fmt::Display for RowKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bool(v) => write!(f, "{v}"),
            Self::Unsigned(v) => write!(f, "{v}"),
            Self::Signed(v) => write!(f, "{v}"),
            Self::U256(v) => write!(f, "{v}"),
            Self::I256(v) => write!(f, "{v}"),
            Self::Float(bits) => write!(f, "{}", f64::from_bits(*bits)),
            Self::String(v) => write!(f, "{v:?}"),
            Self::Encoded(v) => f.write_str(v),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scalar_keys_are_used_directly() {
        let ts = Typespace::new();
        let key = RowKey::from_value(&AlgebraicType::U32, &AlgebraicValue::U32(42), &ts).unwrap();
        assert_eq!(key, RowKey::Unsigned(42));
        let key = RowKey::from_value(&AlgebraicType::String, &AlgebraicValue::String("a".into()), &ts).unwrap();
        assert_eq!(key, RowKey::String("a".into()));
    }

    #[test]
    fn signed_zero_floats_share_a_key() {
        let ts = Typespace::new();
        let neg = RowKey::from_value(&AlgebraicType::F64, &AlgebraicValue::F64(-0.0), &ts).unwrap();
        let pos = RowKey::from_value(&AlgebraicType::F64, &AlgebraicValue::F64(0.0), &ts).unwrap();
        assert_eq!(neg, pos);
        let neg = RowKey::from_value(&AlgebraicType::F32, &AlgebraicValue::F32(-0.0), &ts).unwrap();
        assert_eq!(neg, pos);
        let other = RowKey::from_value(&AlgebraicType::F64, &AlgebraicValue::F64(1.5), &ts).unwrap();
        assert_ne!(other, pos);
    }

    #[test]
    fn identity_key_uses_inner_u256() {
        let ts = Typespace::new();
        let inner = U256::from(5u128);
        let value = AlgebraicValue::product([AlgebraicValue::U256(inner)]);
        let key = RowKey::from_value(&AlgebraicType::identity(), &value, &ts).unwrap();
        assert_eq!(key, RowKey::U256(inner));
    }

    #[test]
    fn composite_key_is_base64_of_encoding() {
        let ts = Typespace::new();
        let ty = AlgebraicType::product([("x", AlgebraicType::U8), ("y", AlgebraicType::U8)]);
        let value = AlgebraicValue::product([AlgebraicValue::U8(1), AlgebraicValue::U8(2)]);
        let key = RowKey::from_value(&ty, &value, &ts).unwrap();
        assert_eq!(key, RowKey::Encoded(BASE64.encode([1u8, 2])));
    }

    #[test]
    fn equal_row_bytes_give_equal_keys() {
        assert_eq!(RowKey::from_row_bytes(b"abc"), RowKey::from_row_bytes(b"abc"));
        assert_ne!(RowKey::from_row_bytes(b"abc"), RowKey::from_row_bytes(b"abd"));
    }
}
