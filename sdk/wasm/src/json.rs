//! Type-directed conversion between algebraic values and JSON.
//!
//! Products become objects keyed by field name, options become the inner
//! value or `null`, and the special wrapper products become their natural
//! JS form: identities and connection ids as hex strings, timestamps and
//! durations as microsecond numbers. 128- and 256-bit integers travel as
//! strings.

use serde_json::{json, Map, Value as JsonValue};
use shared::algebraic::{AlgebraicType, AlgebraicValue, ProductType, ProductValue, SpecialKind, SumValue, Typespace};
use shared::types::{ConnectionId, Identity};
use shared::{Result, SyncError};

pub fn value_to_json(ty: &AlgebraicType, value: &AlgebraicValue, typespace: &Typespace) -> Result<JsonValue> {
  let ty = typespace.resolve(ty)?;
  let json = match (ty, value) {
    (AlgebraicType::Product(pt), AlgebraicValue::Product(pv)) => product_to_json(pt, pv, typespace)?,
    (AlgebraicType::Sum(st), AlgebraicValue::Sum(SumValue { tag, value })) => {
      if st.is_option() {
        if *tag == 0 {
          value_to_json(&st.variants[0].algebraic_type, value, typespace)?
        } else {
          JsonValue::Null
        }
      } else {
        let variant = st.variants.get(*tag as usize).ok_or(SyncError::UnknownVariant {
          tag: *tag,
          variants: st.variants.len(),
        })?;
        let mut object = Map::new();
        object.insert(variant.name.clone(), value_to_json(&variant.algebraic_type, value, typespace)?);
        JsonValue::Object(object)
      }
    }
    (AlgebraicType::Array(elem), AlgebraicValue::Array(items)) => JsonValue::Array(
      items
        .iter()
        .map(|item| value_to_json(elem, item, typespace))
        .collect::<Result<_>>()?,
    ),
    (_, AlgebraicValue::Bytes(bytes)) => json!(bytes),
    (_, AlgebraicValue::Bool(v)) => json!(v),
    (_, AlgebraicValue::I8(v)) => json!(v),
    (_, AlgebraicValue::U8(v)) => json!(v),
    (_, AlgebraicValue::I16(v)) => json!(v),
    (_, AlgebraicValue::U16(v)) => json!(v),
    (_, AlgebraicValue::I32(v)) => json!(v),
    (_, AlgebraicValue::U32(v)) => json!(v),
    (_, AlgebraicValue::I64(v)) => json!(v),
    (_, AlgebraicValue::U64(v)) => json!(v),
    (_, AlgebraicValue::I128(v)) => json!(v.to_string()),
    (_, AlgebraicValue::U128(v)) => json!(v.to_string()),
    (_, AlgebraicValue::I256(v)) => json!(v.to_string()),
    (_, AlgebraicValue::U256(v)) => json!(v.to_string()),
    (_, AlgebraicValue::F32(v)) => json!(v),
    (_, AlgebraicValue::F64(v)) => json!(v),
    (_, AlgebraicValue::String(v)) => json!(v),
    (ty, other) => return Err(SyncError::mismatch(ty.kind_name(), other.kind_name())),
  };
  Ok(json)
}

/// A table row as an object keyed by column name.
pub fn row_to_json(ty: &ProductType, row: &ProductValue, typespace: &Typespace) -> Result<JsonValue> {
  product_to_json(ty, row, typespace)
}

fn product_to_json(ty: &ProductType, value: &ProductValue, typespace: &Typespace) -> Result<JsonValue> {
  if let (Some(kind), [inner]) = (ty.special_kind(), value.elements.as_slice()) {
    return Ok(match (kind, inner) {
      (SpecialKind::Identity, AlgebraicValue::U256(v)) => json!(Identity::new(*v).to_hex()),
      (SpecialKind::ConnectionId, AlgebraicValue::U128(v)) => json!(ConnectionId::new(*v).to_hex()),
      (SpecialKind::Timestamp | SpecialKind::TimeDuration, AlgebraicValue::I64(v)) => json!(v),
      (_, other) => return Err(SyncError::mismatch("special product", other.kind_name())),
    });
  }
  if ty.elements.len() != value.elements.len() {
    return Err(SyncError::mismatch(
      format!("product of {} fields", ty.elements.len()),
      format!("{} values", value.elements.len()),
    ));
  }
  let mut object = Map::new();
  for (element, value) in ty.elements.iter().zip(&value.elements) {
    object.insert(element.name.clone(), value_to_json(&element.algebraic_type, value, typespace)?);
  }
  Ok(JsonValue::Object(object))
}

/// Read a value of type `ty` from JSON. Products accept either an object
/// keyed by field name or a positional array.
pub fn json_to_value(ty: &AlgebraicType, json: &JsonValue, typespace: &Typespace) -> Result<AlgebraicValue> {
  let ty = typespace.resolve(ty)?;
  let mismatch = || SyncError::mismatch(ty.kind_name(), json_kind(json));
  let value = match ty {
    AlgebraicType::Product(pt) => AlgebraicValue::Product(json_to_product(pt, json, typespace)?),
    AlgebraicType::Sum(st) if st.is_option() => match json {
      JsonValue::Null => AlgebraicValue::none(),
      inner => AlgebraicValue::some(json_to_value(&st.variants[0].algebraic_type, inner, typespace)?),
    },
    AlgebraicType::Sum(st) => {
      let (name, inner) = json
        .as_object()
        .filter(|o| o.len() == 1)
        .and_then(|o| o.iter().next())
        .ok_or_else(mismatch)?;
      let tag = st.tag_of(name).ok_or_else(|| SyncError::mismatch("sum variant", name.as_str()))?;
      let variant = &st.variants[tag as usize];
      AlgebraicValue::Sum(SumValue::new(tag, json_to_value(&variant.algebraic_type, inner, typespace)?))
    }
    AlgebraicType::Array(elem) if **elem == AlgebraicType::U8 => {
      let items = json.as_array().ok_or_else(mismatch)?;
      let bytes = items
        .iter()
        .map(|b| b.as_u64().and_then(|b| u8::try_from(b).ok()).ok_or_else(mismatch))
        .collect::<Result<Vec<u8>>>()?;
      AlgebraicValue::Bytes(bytes)
    }
    AlgebraicType::Array(elem) => {
      let items = json.as_array().ok_or_else(mismatch)?;
      AlgebraicValue::Array(
        items
          .iter()
          .map(|item| json_to_value(elem, item, typespace))
          .collect::<Result<_>>()?,
      )
    }
    AlgebraicType::String => AlgebraicValue::String(json.as_str().ok_or_else(mismatch)?.to_string()),
    AlgebraicType::Bool => AlgebraicValue::Bool(json.as_bool().ok_or_else(mismatch)?),
    AlgebraicType::I8 => AlgebraicValue::I8(int(json).ok_or_else(mismatch)?),
    AlgebraicType::U8 => AlgebraicValue::U8(uint(json).ok_or_else(mismatch)?),
    AlgebraicType::I16 => AlgebraicValue::I16(int(json).ok_or_else(mismatch)?),
    AlgebraicType::U16 => AlgebraicValue::U16(uint(json).ok_or_else(mismatch)?),
    AlgebraicType::I32 => AlgebraicValue::I32(int(json).ok_or_else(mismatch)?),
    AlgebraicType::U32 => AlgebraicValue::U32(uint(json).ok_or_else(mismatch)?),
    AlgebraicType::I64 => AlgebraicValue::I64(int(json).ok_or_else(mismatch)?),
    AlgebraicType::U64 => AlgebraicValue::U64(uint(json).ok_or_else(mismatch)?),
    AlgebraicType::I128 => AlgebraicValue::I128(wide(json).ok_or_else(mismatch)?),
    AlgebraicType::U128 => AlgebraicValue::U128(wide(json).ok_or_else(mismatch)?),
    AlgebraicType::I256 => AlgebraicValue::I256(wide::<i128>(json).ok_or_else(mismatch)?.into()),
    AlgebraicType::U256 => AlgebraicValue::U256(wide::<u128>(json).ok_or_else(mismatch)?.into()),
    AlgebraicType::F32 => AlgebraicValue::F32(json.as_f64().ok_or_else(mismatch)? as f32),
    AlgebraicType::F64 => AlgebraicValue::F64(json.as_f64().ok_or_else(mismatch)?),
    AlgebraicType::Ref(_) => return Err(mismatch()),
  };
  Ok(value)
}

/// Reducer arguments or a row, from an object or a positional array.
pub fn json_to_row(ty: &ProductType, json: &JsonValue, typespace: &Typespace) -> Result<ProductValue> {
  json_to_product(ty, json, typespace)
}

fn json_to_product(ty: &ProductType, json: &JsonValue, typespace: &Typespace) -> Result<ProductValue> {
  if let Some(kind) = ty.special_kind() {
    let inner = match (kind, json) {
      (SpecialKind::Identity, JsonValue::String(hex)) => AlgebraicValue::U256(Identity::from_hex(hex)?.value()),
      (SpecialKind::ConnectionId, JsonValue::String(hex)) => AlgebraicValue::U128(ConnectionId::from_hex(hex)?.value()),
      (SpecialKind::Timestamp | SpecialKind::TimeDuration, micros) => {
        AlgebraicValue::I64(int(micros).ok_or_else(|| SyncError::mismatch("microseconds", json_kind(micros)))?)
      }
      (_, other) => return Err(SyncError::mismatch("hex string", json_kind(other))),
    };
    return Ok(ProductValue::new([inner]));
  }

  let elements = match json {
    JsonValue::Object(object) => ty
      .elements
      .iter()
      .map(|e| {
        let field = object.get(&e.name).unwrap_or(&JsonValue::Null);
        json_to_value(&e.algebraic_type, field, typespace)
      })
      .collect::<Result<Vec<_>>>()?,
    JsonValue::Array(items) if items.len() == ty.elements.len() => ty
      .elements
      .iter()
      .zip(items)
      .map(|(e, item)| json_to_value(&e.algebraic_type, item, typespace))
      .collect::<Result<Vec<_>>>()?,
    other => {
      return Err(SyncError::mismatch(
        format!("object or array of {} fields", ty.elements.len()),
        json_kind(other),
      ))
    }
  };
  Ok(ProductValue::new(elements))
}

fn int<T: TryFrom<i64>>(json: &JsonValue) -> Option<T> {
  json.as_i64().and_then(|v| T::try_from(v).ok())
}

fn uint<T: TryFrom<u64>>(json: &JsonValue) -> Option<T> {
  json.as_u64().and_then(|v| T::try_from(v).ok())
}

/// Wide integers come as decimal strings, or as plain numbers when small.
fn wide<T: std::str::FromStr + TryFrom<i64> + TryFrom<u64>>(json: &JsonValue) -> Option<T> {
  match json {
    JsonValue::String(s) => s.parse().ok(),
    JsonValue::Number(n) => n
      .as_u64()
      .and_then(|v| T::try_from(v).ok())
      .or_else(|| n.as_i64().and_then(|v| T::try_from(v).ok())),
    _ => None,
  }
}

fn json_kind(json: &JsonValue) -> &'static str {
  match json {
    JsonValue::Null => "null",
    JsonValue::Bool(_) => "boolean",
    JsonValue::Number(_) => "number",
    JsonValue::String(_) => "string",
    JsonValue::Array(_) => "array",
    JsonValue::Object(_) => "object",
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn user_type() -> AlgebraicType {
    AlgebraicType::Product(ProductType::new([
      ("owner", AlgebraicType::identity()),
      ("name", AlgebraicType::option(AlgebraicType::String)),
      ("score", AlgebraicType::U128),
      ("tags", AlgebraicType::array(AlgebraicType::String)),
    ]))
  }

  #[test]
  fn object_and_array_forms_agree() {
    let ts = Typespace::new();
    let owner = "00".repeat(31) + "2a";
    let from_object = json_to_value(
      &user_type(),
      &json!({ "owner": owner, "name": null, "score": "340282366920938463463374607431768211455", "tags": ["a"] }),
      &ts,
    )
    .unwrap();
    let from_array = json_to_value(
      &user_type(),
      &json!([owner, null, "340282366920938463463374607431768211455", ["a"]]),
      &ts,
    )
    .unwrap();
    assert_eq!(from_object, from_array);

    let back = value_to_json(&user_type(), &from_object, &ts).unwrap();
    assert_eq!(
      back,
      json!({ "owner": owner, "name": null, "score": u128::MAX.to_string(), "tags": ["a"] })
    );
  }

  #[test]
  fn wrong_kinds_are_mismatches() {
    let ts = Typespace::new();
    assert!(json_to_value(&AlgebraicType::U8, &json!(300), &ts).is_err());
    assert!(json_to_value(&AlgebraicType::String, &json!(1), &ts).is_err());
    assert!(json_to_value(&user_type(), &json!([1, 2]), &ts).is_err());
  }

  #[test]
  fn plain_sums_use_variant_name() {
    let ts = Typespace::new();
    let ty = AlgebraicType::sum([("circle", AlgebraicType::U32), ("square", AlgebraicType::U32)]);
    let value = json_to_value(&ty, &json!({ "square": 4 }), &ts).unwrap();
    assert_eq!(value, AlgebraicValue::Sum(SumValue::new(1, AlgebraicValue::U32(4))));
    assert_eq!(value_to_json(&ty, &value, &ts).unwrap(), json!({ "square": 4 }));
  }
}
