//! Client → server messages.
//!
//! Each outbound frame is one encoded `ClientMessage`; outgoing traffic has
//! no compression tag.

use shared::serialize::{BinaryReader, BinaryWriter, Decode, Encode};
use shared::{Result, SyncError};

/// Server-side handling requested for a reducer call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CallReducerFlags {
  /// Notify the caller of the outcome with the full transaction update.
  #[default]
  FullUpdate,
  /// Suppress the success notification to the caller.
  NoSuccessNotify,
}

impl CallReducerFlags {
  pub fn as_u8(self) -> u8 {
    match self {
      CallReducerFlags::FullUpdate => 0,
      CallReducerFlags::NoSuccessNotify => 1,
    }
  }

  pub fn from_u8(value: u8) -> Self {
    match value {
      1 => CallReducerFlags::NoSuccessNotify,
      _ => CallReducerFlags::FullUpdate,
    }
  }
}

/// Client-assigned subscription correlation id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct QueryId(pub u32);

impl Encode for QueryId {
  fn encode(&self, writer: &mut BinaryWriter) {
    writer.write_u32(self.0);
  }
}

impl Decode for QueryId {
  fn decode(reader: &mut BinaryReader<'_>) -> Result<Self> {
    Ok(QueryId(reader.read_u32()?))
  }
}

impl std::fmt::Display for QueryId {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    write!(f, "{}", self.0)
  }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClientMessage {
  CallReducer {
    reducer: String,
    args: Vec<u8>,
    request_id: u32,
    flags: CallReducerFlags,
  },
  Subscribe {
    query_strings: Vec<String>,
    request_id: u32,
  },
  OneOffQuery {
    message_id: Vec<u8>,
    query_string: String,
  },
  SubscribeSingle {
    query: String,
    request_id: u32,
    query_id: QueryId,
  },
  SubscribeMulti {
    query_strings: Vec<String>,
    request_id: u32,
    query_id: QueryId,
  },
  Unsubscribe {
    request_id: u32,
    query_id: QueryId,
  },
  UnsubscribeMulti {
    request_id: u32,
    query_id: QueryId,
  },
  CallProcedure {
    procedure: String,
    args: Vec<u8>,
    request_id: u32,
    flags: u8,
  },
}

impl ClientMessage {
  /// Variant name, for logs.
  pub fn kind(&self) -> &'static str {
    match self {
      ClientMessage::CallReducer { .. } => "CallReducer",
      ClientMessage::Subscribe { .. } => "Subscribe",
      ClientMessage::OneOffQuery { .. } => "OneOffQuery",
      ClientMessage::SubscribeSingle { .. } => "SubscribeSingle",
      ClientMessage::SubscribeMulti { .. } => "SubscribeMulti",
      ClientMessage::Unsubscribe { .. } => "Unsubscribe",
      ClientMessage::UnsubscribeMulti { .. } => "UnsubscribeMulti",
      ClientMessage::CallProcedure { .. } => "CallProcedure",
    }
  }
}

impl Encode for ClientMessage {
  fn encode(&self, writer: &mut BinaryWriter) {
    match self {
      ClientMessage::CallReducer {
        reducer,
        args,
        request_id,
        flags,
      } => {
        writer.write_u8(0);
        writer.write_string(reducer);
        writer.write_byte_array(args);
        writer.write_u32(*request_id);
        writer.write_u8(flags.as_u8());
      }
      ClientMessage::Subscribe {
        query_strings,
        request_id,
      } => {
        writer.write_u8(1);
        query_strings.encode(writer);
        writer.write_u32(*request_id);
      }
      ClientMessage::OneOffQuery {
        message_id,
        query_string,
      } => {
        writer.write_u8(2);
        writer.write_byte_array(message_id);
        writer.write_string(query_string);
      }
      ClientMessage::SubscribeSingle {
        query,
        request_id,
        query_id,
      } => {
        writer.write_u8(3);
        writer.write_string(query);
        writer.write_u32(*request_id);
        query_id.encode(writer);
      }
      ClientMessage::SubscribeMulti {
        query_strings,
        request_id,
        query_id,
      } => {
        writer.write_u8(4);
        query_strings.encode(writer);
        writer.write_u32(*request_id);
        query_id.encode(writer);
      }
      ClientMessage::Unsubscribe { request_id, query_id } => {
        writer.write_u8(5);
        writer.write_u32(*request_id);
        query_id.encode(writer);
      }
      ClientMessage::UnsubscribeMulti { request_id, query_id } => {
        writer.write_u8(6);
        writer.write_u32(*request_id);
        query_id.encode(writer);
      }
      ClientMessage::CallProcedure {
        procedure,
        args,
        request_id,
        flags,
      } => {
        writer.write_u8(7);
        writer.write_string(procedure);
        writer.write_byte_array(args);
        writer.write_u32(*request_id);
        writer.write_u8(*flags);
      }
    }
  }
}

impl Decode for ClientMessage {
  fn decode(reader: &mut BinaryReader<'_>) -> Result<Self> {
    let message = match reader.read_u8()? {
      0 => ClientMessage::CallReducer {
        reducer: reader.read_string()?,
        args: reader.read_byte_array()?.to_vec(),
        request_id: reader.read_u32()?,
        flags: CallReducerFlags::from_u8(reader.read_u8()?),
      },
      1 => ClientMessage::Subscribe {
        query_strings: Vec::decode(reader)?,
        request_id: reader.read_u32()?,
      },
      2 => ClientMessage::OneOffQuery {
        message_id: reader.read_byte_array()?.to_vec(),
        query_string: reader.read_string()?,
      },
      3 => ClientMessage::SubscribeSingle {
        query: reader.read_string()?,
        request_id: reader.read_u32()?,
        query_id: QueryId::decode(reader)?,
      },
      4 => ClientMessage::SubscribeMulti {
        query_strings: Vec::decode(reader)?,
        request_id: reader.read_u32()?,
        query_id: QueryId::decode(reader)?,
      },
      5 => ClientMessage::Unsubscribe {
        request_id: reader.read_u32()?,
        query_id: QueryId::decode(reader)?,
      },
      6 => ClientMessage::UnsubscribeMulti {
        request_id: reader.read_u32()?,
        query_id: QueryId::decode(reader)?,
      },
      7 => ClientMessage::CallProcedure {
        procedure: reader.read_string()?,
        args: reader.read_byte_array()?.to_vec(),
        request_id: reader.read_u32()?,
        flags: reader.read_u8()?,
      },
      tag => return Err(SyncError::UnknownVariant { tag, variants: 8 }),
    };
    Ok(message)
  }
}
