//! Row-carrying structures shared by several server messages.

use shared::serialize::{BinaryReader, BinaryWriter, Decode, Encode};
use shared::{Result, SyncError};

/// How the flat `rows_data` buffer splits into rows.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RowSizeHint {
  /// Every row occupies exactly this many bytes.
  FixedSize(u16),
  /// Start offset of each row in the buffer.
  RowOffsets(Vec<u64>),
}

impl RowSizeHint {
  /// Whether a row decoded as `start..end` agrees with the hint.
  pub(crate) fn check_row(&self, index: usize, start: usize, end: usize) -> Result<()> {
    match self {
      RowSizeHint::FixedSize(0) => Err(SyncError::MalformedRowList(
        "fixed row size of zero with a non-empty buffer".into(),
      )),
      RowSizeHint::FixedSize(size) if end - start != *size as usize => Err(SyncError::MalformedRowList(format!(
        "row {index} spans {} bytes, expected fixed size {size}",
        end - start
      ))),
      RowSizeHint::RowOffsets(offsets) => match offsets.get(index) {
        Some(&offset) if offset as usize == start => Ok(()),
        Some(&offset) => Err(SyncError::MalformedRowList(format!(
          "row {index} starts at byte {start}, hint says {offset}"
        ))),
        // Servers may omit trailing offsets; the decoded boundary stands.
        None => Ok(()),
      },
      RowSizeHint::FixedSize(_) => Ok(()),
    }
  }
}

impl Encode for RowSizeHint {
  fn encode(&self, writer: &mut BinaryWriter) {
    match self {
      RowSizeHint::FixedSize(size) => {
        writer.write_u8(0);
        writer.write_u16(*size);
      }
      RowSizeHint::RowOffsets(offsets) => {
        writer.write_u8(1);
        offsets.encode(writer);
      }
    }
  }
}

impl Decode for RowSizeHint {
  fn decode(reader: &mut BinaryReader<'_>) -> Result<Self> {
    match reader.read_u8()? {
      0 => Ok(RowSizeHint::FixedSize(reader.read_u16()?)),
      1 => Ok(RowSizeHint::RowOffsets(Vec::decode(reader)?)),
      tag => Err(SyncError::UnknownVariant { tag, variants: 2 }),
    }
  }
}

/// A run of encoded rows of one table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BsatnRowList {
  pub size_hint: RowSizeHint,
  pub rows_data: Vec<u8>,
}

impl BsatnRowList {
  pub fn empty() -> Self {
    Self {
      size_hint: RowSizeHint::RowOffsets(Vec::new()),
      rows_data: Vec::new(),
    }
  }

  /// Build a list from individually encoded rows.
  pub fn from_rows<'a>(rows: impl IntoIterator<Item = &'a [u8]>) -> Self {
    let mut offsets = Vec::new();
    let mut rows_data = Vec::new();
    for row in rows {
      offsets.push(rows_data.len() as u64);
      rows_data.extend_from_slice(row);
    }
    Self {
      size_hint: RowSizeHint::RowOffsets(offsets),
      rows_data,
    }
  }

  pub fn is_empty(&self) -> bool {
    self.rows_data.is_empty()
  }
}

impl Encode for BsatnRowList {
  fn encode(&self, writer: &mut BinaryWriter) {
    self.size_hint.encode(writer);
    writer.write_byte_array(&self.rows_data);
  }
}

impl Decode for BsatnRowList {
  fn decode(reader: &mut BinaryReader<'_>) -> Result<Self> {
    Ok(Self {
      size_hint: RowSizeHint::decode(reader)?,
      rows_data: reader.read_byte_array()?.to_vec(),
    })
  }
}

/// Deletes and inserts of one table from one query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryUpdate {
  pub deletes: BsatnRowList,
  pub inserts: BsatnRowList,
}

impl Encode for QueryUpdate {
  fn encode(&self, writer: &mut BinaryWriter) {
    self.deletes.encode(writer);
    self.inserts.encode(writer);
  }
}

impl Decode for QueryUpdate {
  fn decode(reader: &mut BinaryReader<'_>) -> Result<Self> {
    Ok(Self {
      deletes: BsatnRowList::decode(reader)?,
      inserts: BsatnRowList::decode(reader)?,
    })
  }
}

/// A `QueryUpdate`, possibly compressed on its own.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CompressableQueryUpdate {
  Uncompressed(QueryUpdate),
  Brotli(Vec<u8>),
  Gzip(Vec<u8>),
}

impl Encode for CompressableQueryUpdate {
  fn encode(&self, writer: &mut BinaryWriter) {
    match self {
      CompressableQueryUpdate::Uncompressed(update) => {
        writer.write_u8(0);
        update.encode(writer);
      }
      CompressableQueryUpdate::Brotli(bytes) => {
        writer.write_u8(1);
        writer.write_byte_array(bytes);
      }
      CompressableQueryUpdate::Gzip(bytes) => {
        writer.write_u8(2);
        writer.write_byte_array(bytes);
      }
    }
  }
}

impl Decode for CompressableQueryUpdate {
  fn decode(reader: &mut BinaryReader<'_>) -> Result<Self> {
    match reader.read_u8()? {
      0 => Ok(Self::Uncompressed(QueryUpdate::decode(reader)?)),
      1 => Ok(Self::Brotli(reader.read_byte_array()?.to_vec())),
      2 => Ok(Self::Gzip(reader.read_byte_array()?.to_vec())),
      tag => Err(SyncError::UnknownVariant { tag, variants: 3 }),
    }
  }
}

/// All changes to one table carried by a message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableUpdate {
  pub table_id: u32,
  pub table_name: String,
  pub num_rows: u64,
  pub updates: Vec<CompressableQueryUpdate>,
}

impl Encode for TableUpdate {
  fn encode(&self, writer: &mut BinaryWriter) {
    writer.write_u32(self.table_id);
    writer.write_string(&self.table_name);
    writer.write_u64(self.num_rows);
    self.updates.encode(writer);
  }
}

impl Decode for TableUpdate {
  fn decode(reader: &mut BinaryReader<'_>) -> Result<Self> {
    Ok(Self {
      table_id: reader.read_u32()?,
      table_name: reader.read_string()?,
      num_rows: reader.read_u64()?,
      updates: Vec::decode(reader)?,
    })
  }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct DatabaseUpdate {
  pub tables: Vec<TableUpdate>,
}

impl Encode for DatabaseUpdate {
  fn encode(&self, writer: &mut BinaryWriter) {
    self.tables.encode(writer);
  }
}

impl Decode for DatabaseUpdate {
  fn decode(reader: &mut BinaryReader<'_>) -> Result<Self> {
    Ok(Self {
      tables: Vec::decode(reader)?,
    })
  }
}
