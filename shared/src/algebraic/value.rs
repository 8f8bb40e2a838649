use std::fmt;

use crate::error::{Result, SyncError};
use crate::types::{I256, U256};

/// A decoded value of some `AlgebraicType`.
#[derive(Debug, Clone, PartialEq, PartialOrd)]
pub enum AlgebraicValue {
    Bool(bool),
    I8(i8),
    U8(u8),
    I16(i16),
    U16(u16),
    I32(i32),
    U32(u32),
    I64(i64),
    U64(u64),
    I128(i128),
    U128(u128),
    I256(I256),
    U256(U256),
    F32(f32),
    F64(f64),
    String(String),
    /// Value of an `Array(U8)`.
    Bytes(Vec<u8>),
    Array(Vec<AlgebraicValue>),
    Product(ProductValue),
    Sum(SumValue),
}

impl AlgebraicValue {
    pub fn unit() -> Self {
        Self::Product(ProductValue::default())
    }

    /// `some(value)` of an option-shaped sum.
    pub fn some(value: AlgebraicValue) -> Self {
        Self::Sum(SumValue::new(0, value))
    }

    /// `none` of an option-shaped sum.
    pub fn none() -> Self {
        Self::Sum(SumValue::new(1, Self::unit()))
    }

    pub fn product(elements: impl IntoIterator<Item = AlgebraicValue>) -> Self {
        Self::Product(ProductValue::new(elements))
    }

    pub fn kind_name(&self) -> &'static str {
        match self {
            Self::Bool(_) => "bool",
            Self::I8(_) => "i8",
            Self::U8(_) => "u8",
            Self::I16(_) => "i16",
            Self::U16(_) => "u16",
            Self::I32(_) => "i32",
            Self::U32(_) => "u32",
            Self::I64(_) => "i64",
            Self::U64(_) => "u64",
            Self::I128(_) => "i128",
            Self::U128(_) => "u128",
            Self::I256(_) => "i256",
            Self::U256(_) => "u256",
            Self::F32(_) => "f32",
            Self::F64(_) => "f64",
            Self::String(_) => "string",
            Self::Bytes(_) => "bytes",
            Self::Array(_) => "array",
            Self::Product(_) => "product",
            Self::Sum(_) => "sum",
        }
    }

    pub fn as_product(&self) -> Option<&ProductValue> {
        match self {
            Self::Product(p) => Some(p),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }

    /// Reads an option-shaped sum: `Some(Some(v))` for `some`, `Some(None)`
    /// for `none`, `None` if this is not a sum with tag 0 or 1.
    pub fn as_option(&self) -> Option<Option<&AlgebraicValue>> {
        match self {
            Self::Sum(SumValue { tag: 0, value }) => Some(Some(value.as_ref())),
            Self::Sum(SumValue { tag: 1, .. }) => Some(None),
            _ => None,
        }
    }
}

impl fmt::Display for AlgebraicValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bool(v) => write!(f, "{v}"),
            Self::I8(v) => write!(f, "{v}"),
            Self::U8(v) => write!(f, "{v}"),
            Self::I16(v) => write!(f, "{v}"),
            Self::U16(v) => write!(f, "{v}"),
            Self::I32(v) => write!(f, "{v}"),
            Self::U32(v) => write!(f, "{v}"),
            Self::I64(v) => write!(f, "{v}"),
            Self::U64(v) => write!(f, "{v}"),
            Self::I128(v) => write!(f, "{v}"),
            Self::U128(v) => write!(f, "{v}"),
            Self::I256(v) => write!(f, "{v}"),
            Self::U256(v) => write!(f, "{v}"),
            Self::F32(v) => write!(f, "{v}"),
            Self::F64(v) => write!(f, "{v}"),
            Self::String(v) => write!(f, "{v:?}"),
            Self::Bytes(v) => write!(f, "<{} bytes>", v.len()),
            Self::Array(items) => {
                f.write_str("[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{item}")?;
                }
                f.write_str("]")
            }
            Self::Product(p) => write!(f, "{p}"),
            Self::Sum(s) => write!(f, "#{}({})", s.tag, s.value),
        }
    }
}

/// Field values of a product, in declared order.
#[derive(Debug, Clone, PartialEq, PartialOrd, Default)]
pub struct ProductValue {
    pub elements: Vec<AlgebraicValue>,
}

impl ProductValue {
    pub fn new(elements: impl IntoIterator<Item = AlgebraicValue>) -> Self {
        Self {
            elements: elements.into_iter().collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.elements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    /// Field at position `index`.
    pub fn field(&self, index: usize) -> Result<&AlgebraicValue> {
        self.elements.get(index).ok_or_else(|| {
            SyncError::mismatch(
                format!("product with at least {} fields", index + 1),
                format!("product with {} fields", self.elements.len()),
            )
        })
    }
}

impl fmt::Display for ProductValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("(")?;
        for (i, item) in self.elements.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{item}")?;
        }
        f.write_str(")")
    }
}

/// Active variant of a sum.
#[derive(Debug, Clone, PartialEq, PartialOrd)]
pub struct SumValue {
    pub tag: u8,
    pub value: Box<AlgebraicValue>,
}

impl SumValue {
    pub fn new(tag: u8, value: AlgebraicValue) -> Self {
        Self {
            tag,
            value: Box::new(value),
        }
    }
}
