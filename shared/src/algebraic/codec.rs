//! Schema-driven binary encoding.
//!
//! The layout is entirely determined by the `AlgebraicType`; nothing about
//! the value's shape is written to the wire:
//!
//! | Type | Encoding |
//! |------|----------|
//! | bool | 1 byte, 0 or 1 |
//! | integers, floats | fixed-width little-endian |
//! | 128/256-bit integers | 64-bit little-endian limbs, lowest first |
//! | string | `u32` byte length + UTF-8 |
//! | `Array(U8)` | `u32` length + raw bytes |
//! | array | `u32` count + elements |
//! | product | fields in declared order, no tags |
//! | sum | `u8` variant index + payload (option: 0 = some, 1 = none) |

use super::types::{AlgebraicType, ProductType, SumType, Typespace};
use super::value::{AlgebraicValue, ProductValue, SumValue};
use crate::error::{Result, SyncError};
use crate::serialize::{BinaryReader, BinaryWriter};

/// Encode `value` as `ty` into a fresh buffer.
pub fn serialize(ty: &AlgebraicType, value: &AlgebraicValue, typespace: &Typespace) -> Result<Vec<u8>> {
    let mut writer = BinaryWriter::new();
    serialize_value(&mut writer, ty, value, typespace)?;
    Ok(writer.into_inner())
}

/// Decode one value of `ty` from the front of `bytes`.
///
/// Returns the value and the number of bytes it occupied.
pub fn deserialize(ty: &AlgebraicType, bytes: &[u8], typespace: &Typespace) -> Result<(AlgebraicValue, usize)> {
    let mut reader = BinaryReader::new(bytes);
    let value = deserialize_value(&mut reader, ty, typespace)?;
    Ok((value, reader.offset()))
}

pub fn serialize_value(
    writer: &mut BinaryWriter,
    ty: &AlgebraicType,
    value: &AlgebraicValue,
    typespace: &Typespace,
) -> Result<()> {
    let ty = typespace.resolve(ty)?;
    match (ty, value) {
        (AlgebraicType::Product(pt), AlgebraicValue::Product(pv)) => {
            serialize_product(writer, pt, pv, typespace)?
        }
        (AlgebraicType::Sum(st), AlgebraicValue::Sum(sv)) => serialize_sum(writer, st, sv, typespace)?,
        (AlgebraicType::Array(elem), AlgebraicValue::Bytes(bytes)) if **elem == AlgebraicType::U8 => {
            writer.write_byte_array(bytes)
        }
        (AlgebraicType::Array(elem), AlgebraicValue::Array(items)) => {
            writer.write_u32(items.len() as u32);
            for item in items {
                serialize_value(writer, elem, item, typespace)?;
            }
        }
        (AlgebraicType::String, AlgebraicValue::String(v)) => writer.write_string(v),
        (AlgebraicType::Bool, AlgebraicValue::Bool(v)) => writer.write_bool(*v),
        (AlgebraicType::I8, AlgebraicValue::I8(v)) => writer.write_i8(*v),
        (AlgebraicType::U8, AlgebraicValue::U8(v)) => writer.write_u8(*v),
        (AlgebraicType::I16, AlgebraicValue::I16(v)) => writer.write_i16(*v),
        (AlgebraicType::U16, AlgebraicValue::U16(v)) => writer.write_u16(*v),
        (AlgebraicType::I32, AlgebraicValue::I32(v)) => writer.write_i32(*v),
        (AlgebraicType::U32, AlgebraicValue::U32(v)) => writer.write_u32(*v),
        (AlgebraicType::I64, AlgebraicValue::I64(v)) => writer.write_i64(*v),
        (AlgebraicType::U64, AlgebraicValue::U64(v)) => writer.write_u64(*v),
        (AlgebraicType::I128, AlgebraicValue::I128(v)) => writer.write_i128(*v),
        (AlgebraicType::U128, AlgebraicValue::U128(v)) => writer.write_u128(*v),
        (AlgebraicType::I256, AlgebraicValue::I256(v)) => writer.write_limbs256(&v.limbs()),
        (AlgebraicType::U256, AlgebraicValue::U256(v)) => writer.write_limbs256(&v.limbs()),
        (AlgebraicType::F32, AlgebraicValue::F32(v)) => writer.write_f32(*v),
        (AlgebraicType::F64, AlgebraicValue::F64(v)) => writer.write_f64(*v),
        (ty, value) => return Err(SyncError::mismatch(ty.kind_name(), value.kind_name())),
    }
    Ok(())
}

fn serialize_product(
    writer: &mut BinaryWriter,
    ty: &ProductType,
    value: &ProductValue,
    typespace: &Typespace,
) -> Result<()> {
    if ty.elements.len() != value.elements.len() {
        return Err(SyncError::mismatch(
            format!("product with {} fields", ty.elements.len()),
            format!("product with {} fields", value.elements.len()),
        ));
    }
    for (element, field) in ty.elements.iter().zip(&value.elements) {
        serialize_value(writer, &element.algebraic_type, field, typespace)?;
    }
    Ok(())
}

fn serialize_sum(writer: &mut BinaryWriter, ty: &SumType, value: &SumValue, typespace: &Typespace) -> Result<()> {
    let variant = ty
        .variants
        .get(value.tag as usize)
        .ok_or(SyncError::UnknownVariant {
            tag: value.tag,
            variants: ty.variants.len(),
        })?;
    writer.write_u8(value.tag);
    serialize_value(writer, &variant.algebraic_type, &value.value, typespace)
}

/// Nesting limit for decoding. Each product, sum or array level counts once.
pub const MAX_DEPTH: usize = 256;

pub fn deserialize_value(
    reader: &mut BinaryReader<'_>,
    ty: &AlgebraicType,
    typespace: &Typespace,
) -> Result<AlgebraicValue> {
    decode_value(reader, ty, typespace, 0)
}

/// Decode a product's fields in declared order.
pub fn deserialize_product(
    reader: &mut BinaryReader<'_>,
    ty: &ProductType,
    typespace: &Typespace,
) -> Result<ProductValue> {
    decode_product(reader, ty, typespace, 0)
}

fn decode_value(
    reader: &mut BinaryReader<'_>,
    ty: &AlgebraicType,
    typespace: &Typespace,
    depth: usize,
) -> Result<AlgebraicValue> {
    let ty = typespace.resolve(ty)?;
    Ok(match ty {
        AlgebraicType::Product(pt) => AlgebraicValue::Product(decode_product(reader, pt, typespace, depth)?),
        AlgebraicType::Sum(st) => AlgebraicValue::Sum(decode_sum(reader, st, typespace, depth)?),
        AlgebraicType::Array(elem) if **elem == AlgebraicType::U8 => {
            AlgebraicValue::Bytes(reader.read_byte_array()?.to_vec())
        }
        AlgebraicType::Array(elem) => {
            let depth = descend(reader, depth)?;
            let len = reader.read_u32()? as usize;
            let mut items = Vec::with_capacity(len.min(reader.remaining()));
            for i in 0..len {
                let before = reader.offset();
                items.push(decode_value(reader, elem, typespace, depth)?);
                // Zero-width elements: the count alone can't be trusted.
                if i == 0 && reader.offset() == before && len > reader.remaining() {
                    return Err(SyncError::BufferTooShort {
                        offset: before,
                        requested: len,
                        remaining: reader.remaining(),
                    });
                }
            }
            AlgebraicValue::Array(items)
        }
        AlgebraicType::String => AlgebraicValue::String(reader.read_string()?),
        AlgebraicType::Bool => AlgebraicValue::Bool(reader.read_bool()?),
        AlgebraicType::I8 => AlgebraicValue::I8(reader.read_i8()?),
        AlgebraicType::U8 => AlgebraicValue::U8(reader.read_u8()?),
        AlgebraicType::I16 => AlgebraicValue::I16(reader.read_i16()?),
        AlgebraicType::U16 => AlgebraicValue::U16(reader.read_u16()?),
        AlgebraicType::I32 => AlgebraicValue::I32(reader.read_i32()?),
        AlgebraicType::U32 => AlgebraicValue::U32(reader.read_u32()?),
        AlgebraicType::I64 => AlgebraicValue::I64(reader.read_i64()?),
        AlgebraicType::U64 => AlgebraicValue::U64(reader.read_u64()?),
        AlgebraicType::I128 => AlgebraicValue::I128(reader.read_i128()?),
        AlgebraicType::U128 => AlgebraicValue::U128(reader.read_u128()?),
        AlgebraicType::I256 => AlgebraicValue::I256(crate::types::I256::from_limbs(reader.read_limbs256()?)),
        AlgebraicType::U256 => AlgebraicValue::U256(crate::types::U256::from_limbs(reader.read_limbs256()?)),
        AlgebraicType::F32 => AlgebraicValue::F32(reader.read_f32()?),
        AlgebraicType::F64 => AlgebraicValue::F64(reader.read_f64()?),
        // `resolve` never returns a Ref.
        AlgebraicType::Ref(slot) => return Err(SyncError::UnresolvedRef(slot.0)),
    })
}

fn descend(reader: &BinaryReader<'_>, depth: usize) -> Result<usize> {
    if depth >= MAX_DEPTH {
        return Err(SyncError::DepthLimitExceeded {
            offset: reader.offset(),
            limit: MAX_DEPTH,
        });
    }
    Ok(depth + 1)
}

fn decode_product(
    reader: &mut BinaryReader<'_>,
    ty: &ProductType,
    typespace: &Typespace,
    depth: usize,
) -> Result<ProductValue> {
    let depth = descend(reader, depth)?;
    let mut elements = Vec::with_capacity(ty.elements.len());
    for element in &ty.elements {
        elements.push(decode_value(reader, &element.algebraic_type, typespace, depth)?);
    }
    Ok(ProductValue { elements })
}

fn decode_sum(reader: &mut BinaryReader<'_>, ty: &SumType, typespace: &Typespace, depth: usize) -> Result<SumValue> {
    let depth = descend(reader, depth)?;
    let tag = reader.read_u8()?;
    if ty.is_option() && tag > 1 {
        return Err(SyncError::InvalidOptionTag(tag));
    }
    let variant = ty.variants.get(tag as usize).ok_or(SyncError::UnknownVariant {
        tag,
        variants: ty.variants.len(),
    })?;
    let value = decode_value(reader, &variant.algebraic_type, typespace, depth)?;
    Ok(SumValue::new(tag, value))
}

/// Encode a product value against a product type.
pub fn serialize_product_value(ty: &ProductType, value: &ProductValue, typespace: &Typespace) -> Result<Vec<u8>> {
    let mut writer = BinaryWriter::new();
    serialize_product(&mut writer, ty, value, typespace)?;
    Ok(writer.into_inner())
}
