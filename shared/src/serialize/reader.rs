use crate::error::{Result, SyncError};

/// Cursor over a little-endian binary buffer.
///
/// Every read is bounds-checked; running off the end yields
/// `SyncError::BufferTooShort` carrying the offset, the requested length and
/// what was left, so a truncated frame can never be silently zero-filled.
#[derive(Debug, Clone)]
pub struct BinaryReader<'a> {
    data: &'a [u8],
    offset: usize,
}

impl<'a> BinaryReader<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, offset: 0 }
    }

    /// Current read position.
    pub fn offset(&self) -> usize {
        self.offset
    }

    /// Bytes not yet consumed.
    pub fn remaining(&self) -> usize {
        self.data.len() - self.offset
    }

    /// The full underlying buffer.
    pub fn buffer(&self) -> &'a [u8] {
        self.data
    }

    /// Fails with `TrailingBytes` unless the whole buffer was consumed.
    pub fn finish(&self) -> Result<()> {
        if self.remaining() != 0 {
            return Err(SyncError::TrailingBytes {
                consumed: self.offset,
                len: self.data.len(),
            });
        }
        Ok(())
    }

    /// Take the next `len` bytes as a slice of the underlying buffer.
    pub fn read_bytes(&mut self, len: usize) -> Result<&'a [u8]> {
        if len > self.remaining() {
            return Err(SyncError::BufferTooShort {
                offset: self.offset,
                requested: len,
                remaining: self.remaining(),
            });
        }
        let slice = &self.data[self.offset..self.offset + len];
        self.offset += len;
        Ok(slice)
    }

    fn read_array<const N: usize>(&mut self) -> Result<[u8; N]> {
        let mut out = [0u8; N];
        out.copy_from_slice(self.read_bytes(N)?);
        Ok(out)
    }

    pub fn read_bool(&mut self) -> Result<bool> {
        let offset = self.offset;
        match self.read_u8()? {
            0 => Ok(false),
            1 => Ok(true),
            byte => Err(SyncError::InvalidBool { offset, byte }),
        }
    }

    pub fn read_u8(&mut self) -> Result<u8> {
        Ok(self.read_bytes(1)?[0])
    }

    pub fn read_i8(&mut self) -> Result<i8> {
        Ok(self.read_u8()? as i8)
    }

    pub fn read_u16(&mut self) -> Result<u16> {
        Ok(u16::from_le_bytes(self.read_array()?))
    }

    pub fn read_i16(&mut self) -> Result<i16> {
        Ok(i16::from_le_bytes(self.read_array()?))
    }

    pub fn read_u32(&mut self) -> Result<u32> {
        Ok(u32::from_le_bytes(self.read_array()?))
    }

    pub fn read_i32(&mut self) -> Result<i32> {
        Ok(i32::from_le_bytes(self.read_array()?))
    }

    pub fn read_u64(&mut self) -> Result<u64> {
        Ok(u64::from_le_bytes(self.read_array()?))
    }

    pub fn read_i64(&mut self) -> Result<i64> {
        Ok(i64::from_le_bytes(self.read_array()?))
    }

    pub fn read_u128(&mut self) -> Result<u128> {
        let lo = self.read_u64()? as u128;
        let hi = self.read_u64()? as u128;
        Ok(lo | (hi << 64))
    }

    pub fn read_i128(&mut self) -> Result<i128> {
        Ok(self.read_u128()? as i128)
    }

    /// Four 64-bit limbs, least significant first.
    pub fn read_limbs256(&mut self) -> Result<[u64; 4]> {
        Ok([
            self.read_u64()?,
            self.read_u64()?,
            self.read_u64()?,
            self.read_u64()?,
        ])
    }

    pub fn read_f32(&mut self) -> Result<f32> {
        Ok(f32::from_le_bytes(self.read_array()?))
    }

    pub fn read_f64(&mut self) -> Result<f64> {
        Ok(f64::from_le_bytes(self.read_array()?))
    }

    /// A `u32` length prefix followed by that many bytes.
    pub fn read_byte_array(&mut self) -> Result<&'a [u8]> {
        let len = self.read_u32()? as usize;
        self.read_bytes(len)
    }

    /// A length-prefixed UTF-8 string.
    pub fn read_string(&mut self) -> Result<String> {
        let offset = self.offset;
        let bytes = self.read_byte_array()?;
        std::str::from_utf8(bytes)
            .map(str::to_owned)
            .map_err(|_| SyncError::InvalidUtf8 { offset })
    }
}
