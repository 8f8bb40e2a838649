//! Conversions between dynamic `AlgebraicValue`s and Rust types.
//!
//! Used by the typed table and reducer accessors; the derive macros expand
//! to field-by-field calls of these traits.

use super::value::{AlgebraicValue, ProductValue};
use crate::error::{Result, SyncError};
use crate::types::{ConnectionId, I256, Identity, TimeDuration, Timestamp, U256};

pub trait FromValue: Sized {
    fn from_value(value: &AlgebraicValue) -> Result<Self>;
}

pub trait IntoValue {
    fn into_value(&self) -> AlgebraicValue;
}

macro_rules! scalar_conversions {
    ($($ty:ty => $variant:ident),* $(,)?) => {
        $(
            impl FromValue for $ty {
                fn from_value(value: &AlgebraicValue) -> Result<Self> {
                    match value {
                        AlgebraicValue::$variant(v) => Ok(v.clone()),
                        other => Err(SyncError::mismatch(stringify!($variant), other.kind_name())),
                    }
                }
            }

            impl IntoValue for $ty {
                fn into_value(&self) -> AlgebraicValue {
                    AlgebraicValue::$variant(self.clone())
                }
            }
        )*
    };
}

scalar_conversions! {
    bool => Bool,
    i8 => I8,
    u8 => U8,
    i16 => I16,
    u16 => U16,
    i32 => I32,
    u32 => U32,
    i64 => I64,
    u64 => U64,
    i128 => I128,
    u128 => U128,
    I256 => I256,
    U256 => U256,
    f32 => F32,
    f64 => F64,
    String => String,
}

impl<T: FromValue> FromValue for Vec<T> {
    fn from_value(value: &AlgebraicValue) -> Result<Self> {
        match value {
            AlgebraicValue::Array(items) => items.iter().map(T::from_value).collect(),
            AlgebraicValue::Bytes(bytes) => bytes
                .iter()
                .map(|b| T::from_value(&AlgebraicValue::U8(*b)))
                .collect(),
            other => Err(SyncError::mismatch("array", other.kind_name())),
        }
    }
}

impl<T: IntoValue> IntoValue for Vec<T> {
    fn into_value(&self) -> AlgebraicValue {
        AlgebraicValue::Array(self.iter().map(IntoValue::into_value).collect())
    }
}

impl<T: FromValue> FromValue for Option<T> {
    fn from_value(value: &AlgebraicValue) -> Result<Self> {
        match value.as_option() {
            Some(Some(inner)) => Ok(Some(T::from_value(inner)?)),
            Some(None) => Ok(None),
            None => Err(SyncError::mismatch("option", value.kind_name())),
        }
    }
}

impl<T: IntoValue> IntoValue for Option<T> {
    fn into_value(&self) -> AlgebraicValue {
        match self {
            Some(v) => AlgebraicValue::some(v.into_value()),
            None => AlgebraicValue::none(),
        }
    }
}

impl FromValue for AlgebraicValue {
    fn from_value(value: &AlgebraicValue) -> Result<Self> {
        Ok(value.clone())
    }
}

impl IntoValue for AlgebraicValue {
    fn into_value(&self) -> AlgebraicValue {
        self.clone()
    }
}

/// The single field of a special wrapper product.
fn wrapped(value: &AlgebraicValue, what: &str) -> Result<AlgebraicValue> {
    match value {
        AlgebraicValue::Product(ProductValue { elements }) if elements.len() == 1 => Ok(elements[0].clone()),
        other => Err(SyncError::mismatch(what, other.kind_name())),
    }
}

impl FromValue for Identity {
    fn from_value(value: &AlgebraicValue) -> Result<Self> {
        Ok(Identity::new(U256::from_value(&wrapped(value, "identity")?)?))
    }
}

impl IntoValue for Identity {
    fn into_value(&self) -> AlgebraicValue {
        AlgebraicValue::product([AlgebraicValue::U256(self.value())])
    }
}

impl FromValue for ConnectionId {
    fn from_value(value: &AlgebraicValue) -> Result<Self> {
        Ok(ConnectionId::new(u128::from_value(&wrapped(value, "connection id")?)?))
    }
}

impl IntoValue for ConnectionId {
    fn into_value(&self) -> AlgebraicValue {
        AlgebraicValue::product([AlgebraicValue::U128(self.value())])
    }
}

impl FromValue for Timestamp {
    fn from_value(value: &AlgebraicValue) -> Result<Self> {
        Ok(Timestamp::from_micros(i64::from_value(&wrapped(value, "timestamp")?)?))
    }
}

impl IntoValue for Timestamp {
    fn into_value(&self) -> AlgebraicValue {
        AlgebraicValue::product([AlgebraicValue::I64(self.micros())])
    }
}

impl FromValue for TimeDuration {
    fn from_value(value: &AlgebraicValue) -> Result<Self> {
        Ok(TimeDuration::from_micros(i64::from_value(&wrapped(value, "time duration")?)?))
    }
}

impl IntoValue for TimeDuration {
    fn into_value(&self) -> AlgebraicValue {
        AlgebraicValue::product([AlgebraicValue::I64(self.micros())])
    }
}
