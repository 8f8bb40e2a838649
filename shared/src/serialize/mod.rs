pub mod reader;
pub mod writer;

pub use reader::BinaryReader;
pub use writer::BinaryWriter;

use crate::error::Result;
use crate::types::{ConnectionId, Identity, TimeDuration, Timestamp, U256};

/// A type with a fixed binary layout that can be written to a `BinaryWriter`.
pub trait Encode {
    fn encode(&self, writer: &mut BinaryWriter);

    /// Encode into a fresh buffer.
    fn to_bytes(&self) -> Vec<u8> {
        let mut writer = BinaryWriter::new();
        self.encode(&mut writer);
        writer.into_inner()
    }
}

/// A type with a fixed binary layout that can be read from a `BinaryReader`.
pub trait Decode: Sized {
    fn decode(reader: &mut BinaryReader<'_>) -> Result<Self>;

    /// Decode from a complete buffer. Trailing bytes are rejected.
    fn from_bytes(data: &[u8]) -> Result<Self> {
        let mut reader = BinaryReader::new(data);
        let value = Self::decode(&mut reader)?;
        reader.finish()?;
        Ok(value)
    }
}

impl Encode for String {
    fn encode(&self, writer: &mut BinaryWriter) {
        writer.write_string(self);
    }
}

impl Decode for String {
    fn decode(reader: &mut BinaryReader<'_>) -> Result<Self> {
        reader.read_string()
    }
}

impl Encode for u8 {
    fn encode(&self, writer: &mut BinaryWriter) {
        writer.write_u8(*self);
    }
}

impl Decode for u8 {
    fn decode(reader: &mut BinaryReader<'_>) -> Result<Self> {
        reader.read_u8()
    }
}

impl Encode for u16 {
    fn encode(&self, writer: &mut BinaryWriter) {
        writer.write_u16(*self);
    }
}

impl Decode for u16 {
    fn decode(reader: &mut BinaryReader<'_>) -> Result<Self> {
        reader.read_u16()
    }
}

impl Encode for u32 {
    fn encode(&self, writer: &mut BinaryWriter) {
        writer.write_u32(*self);
    }
}

impl Decode for u32 {
    fn decode(reader: &mut BinaryReader<'_>) -> Result<Self> {
        reader.read_u32()
    }
}

impl Encode for u64 {
    fn encode(&self, writer: &mut BinaryWriter) {
        writer.write_u64(*self);
    }
}

impl Decode for u64 {
    fn decode(reader: &mut BinaryReader<'_>) -> Result<Self> {
        reader.read_u64()
    }
}

impl<T: Encode> Encode for Vec<T> {
    fn encode(&self, writer: &mut BinaryWriter) {
        writer.write_u32(self.len() as u32);
        for item in self {
            item.encode(writer);
        }
    }
}

impl<T: Decode> Decode for Vec<T> {
    fn decode(reader: &mut BinaryReader<'_>) -> Result<Self> {
        let len = reader.read_u32()? as usize;
        // Preallocation is capped by the bytes left in the buffer.
        let mut items = Vec::with_capacity(len.min(reader.remaining()));
        for _ in 0..len {
            items.push(T::decode(reader)?);
        }
        Ok(items)
    }
}

/// Options use the `some = 0`, `none = 1` tag layout.
impl<T: Encode> Encode for Option<T> {
    fn encode(&self, writer: &mut BinaryWriter) {
        match self {
            Some(value) => {
                writer.write_u8(0);
                value.encode(writer);
            }
            None => writer.write_u8(1),
        }
    }
}

impl<T: Decode> Decode for Option<T> {
    fn decode(reader: &mut BinaryReader<'_>) -> Result<Self> {
        match reader.read_u8()? {
            0 => Ok(Some(T::decode(reader)?)),
            1 => Ok(None),
            tag => Err(crate::error::SyncError::InvalidOptionTag(tag)),
        }
    }
}

// ── Special products ────────────────────────────────────────────────
//
// Single-field products carry no framing, so each is laid out exactly like
// its inner scalar.

impl Encode for Identity {
    fn encode(&self, writer: &mut BinaryWriter) {
        writer.write_limbs256(&self.value().limbs());
    }
}

impl Decode for Identity {
    fn decode(reader: &mut BinaryReader<'_>) -> Result<Self> {
        Ok(Identity::new(U256::from_limbs(reader.read_limbs256()?)))
    }
}

impl Encode for ConnectionId {
    fn encode(&self, writer: &mut BinaryWriter) {
        writer.write_u128(self.value());
    }
}

impl Decode for ConnectionId {
    fn decode(reader: &mut BinaryReader<'_>) -> Result<Self> {
        Ok(ConnectionId::new(reader.read_u128()?))
    }
}

impl Encode for Timestamp {
    fn encode(&self, writer: &mut BinaryWriter) {
        writer.write_i64(self.micros());
    }
}

impl Decode for Timestamp {
    fn decode(reader: &mut BinaryReader<'_>) -> Result<Self> {
        Ok(Timestamp::from_micros(reader.read_i64()?))
    }
}

impl Encode for TimeDuration {
    fn encode(&self, writer: &mut BinaryWriter) {
        writer.write_i64(self.micros());
    }
}

impl Decode for TimeDuration {
    fn decode(reader: &mut BinaryReader<'_>) -> Result<Self> {
        Ok(TimeDuration::from_micros(reader.read_i64()?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn option_tags_follow_some_first_layout() {
        assert_eq!(Some(7u32).to_bytes(), vec![0, 7, 0, 0, 0]);
        assert_eq!(None::<u32>.to_bytes(), vec![1]);
        assert!(matches!(
            Option::<u32>::from_bytes(&[2]),
            Err(crate::error::SyncError::InvalidOptionTag(2))
        ));
    }

    #[test]
    fn special_products_match_inner_scalar_layout() {
        let id = ConnectionId::new(0x0102);
        let bytes = id.to_bytes();
        assert_eq!(bytes.len(), 16);
        assert_eq!(&bytes[..2], &[0x02, 0x01]);
        assert_eq!(ConnectionId::from_bytes(&bytes).unwrap(), id);

        let identity = Identity::new(U256::from(42u128));
        assert_eq!(identity.to_bytes().len(), 32);
        assert_eq!(Identity::from_bytes(&identity.to_bytes()).unwrap(), identity);
    }

    #[test]
    fn vec_decode_rejects_counts_past_the_buffer() {
        let bytes = [10, 0, 0, 0, 1, 0, 0, 0];
        assert!(Vec::<u32>::from_bytes(&bytes).unwrap_err().is_codec());
    }
}
