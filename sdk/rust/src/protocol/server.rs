//! Server → client messages.

use shared::serialize::{BinaryReader, BinaryWriter, Decode, Encode};
use shared::types::{ConnectionId, Identity, TimeDuration, Timestamp};
use shared::{Result, SyncError};

use super::client::QueryId;
use super::rows::{BsatnRowList, DatabaseUpdate, TableUpdate};

/// Outcome of the transaction a `TransactionUpdate` reports.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UpdateStatus {
  Committed(DatabaseUpdate),
  Failed(String),
  OutOfEnergy,
}

impl Encode for UpdateStatus {
  fn encode(&self, writer: &mut BinaryWriter) {
    match self {
      UpdateStatus::Committed(update) => {
        writer.write_u8(0);
        update.encode(writer);
      }
      UpdateStatus::Failed(message) => {
        writer.write_u8(1);
        writer.write_string(message);
      }
      UpdateStatus::OutOfEnergy => writer.write_u8(2),
    }
  }
}

impl Decode for UpdateStatus {
  fn decode(reader: &mut BinaryReader<'_>) -> Result<Self> {
    match reader.read_u8()? {
      0 => Ok(UpdateStatus::Committed(DatabaseUpdate::decode(reader)?)),
      1 => Ok(UpdateStatus::Failed(reader.read_string()?)),
      2 => Ok(UpdateStatus::OutOfEnergy),
      tag => Err(SyncError::UnknownVariant { tag, variants: 3 }),
    }
  }
}

/// The reducer invocation a transaction came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReducerCallInfo {
  pub reducer_name: String,
  pub reducer_id: u32,
  pub args: Vec<u8>,
  pub request_id: u32,
}

impl Encode for ReducerCallInfo {
  fn encode(&self, writer: &mut BinaryWriter) {
    writer.write_string(&self.reducer_name);
    writer.write_u32(self.reducer_id);
    writer.write_byte_array(&self.args);
    writer.write_u32(self.request_id);
  }
}

impl Decode for ReducerCallInfo {
  fn decode(reader: &mut BinaryReader<'_>) -> Result<Self> {
    Ok(Self {
      reducer_name: reader.read_string()?,
      reducer_id: reader.read_u32()?,
      args: reader.read_byte_array()?.to_vec(),
      request_id: reader.read_u32()?,
    })
  }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransactionUpdate {
  pub status: UpdateStatus,
  pub timestamp: Timestamp,
  pub caller_identity: Identity,
  pub caller_connection_id: ConnectionId,
  pub reducer_call: ReducerCallInfo,
  pub energy_quanta_used: u128,
  pub total_host_execution_duration: TimeDuration,
}

impl Encode for TransactionUpdate {
  fn encode(&self, writer: &mut BinaryWriter) {
    self.status.encode(writer);
    self.timestamp.encode(writer);
    self.caller_identity.encode(writer);
    self.caller_connection_id.encode(writer);
    self.reducer_call.encode(writer);
    writer.write_u128(self.energy_quanta_used);
    self.total_host_execution_duration.encode(writer);
  }
}

impl Decode for TransactionUpdate {
  fn decode(reader: &mut BinaryReader<'_>) -> Result<Self> {
    Ok(Self {
      status: UpdateStatus::decode(reader)?,
      timestamp: Timestamp::decode(reader)?,
      caller_identity: Identity::decode(reader)?,
      caller_connection_id: ConnectionId::decode(reader)?,
      reducer_call: ReducerCallInfo::decode(reader)?,
      energy_quanta_used: reader.read_u128()?,
      total_host_execution_duration: TimeDuration::decode(reader)?,
    })
  }
}

/// Rows returned by one table of a one-off query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OneOffTable {
  pub table_name: String,
  pub rows: BsatnRowList,
}

impl Encode for OneOffTable {
  fn encode(&self, writer: &mut BinaryWriter) {
    writer.write_string(&self.table_name);
    self.rows.encode(writer);
  }
}

impl Decode for OneOffTable {
  fn decode(reader: &mut BinaryReader<'_>) -> Result<Self> {
    Ok(Self {
      table_name: reader.read_string()?,
      rows: BsatnRowList::decode(reader)?,
    })
  }
}

/// Rows of a single-query subscribe/unsubscribe acknowledgement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubscribeRows {
  pub table_id: u32,
  pub table_name: String,
  pub table_rows: TableUpdate,
}

impl Encode for SubscribeRows {
  fn encode(&self, writer: &mut BinaryWriter) {
    writer.write_u32(self.table_id);
    writer.write_string(&self.table_name);
    self.table_rows.encode(writer);
  }
}

impl Decode for SubscribeRows {
  fn decode(reader: &mut BinaryReader<'_>) -> Result<Self> {
    Ok(Self {
      table_id: reader.read_u32()?,
      table_name: reader.read_string()?,
      table_rows: TableUpdate::decode(reader)?,
    })
  }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProcedureStatus {
  Returned(Vec<u8>),
  OutOfEnergy,
  InternalError(String),
}

impl Encode for ProcedureStatus {
  fn encode(&self, writer: &mut BinaryWriter) {
    match self {
      ProcedureStatus::Returned(bytes) => {
        writer.write_u8(0);
        writer.write_byte_array(bytes);
      }
      ProcedureStatus::OutOfEnergy => writer.write_u8(1),
      ProcedureStatus::InternalError(message) => {
        writer.write_u8(2);
        writer.write_string(message);
      }
    }
  }
}

impl Decode for ProcedureStatus {
  fn decode(reader: &mut BinaryReader<'_>) -> Result<Self> {
    match reader.read_u8()? {
      0 => Ok(ProcedureStatus::Returned(reader.read_byte_array()?.to_vec())),
      1 => Ok(ProcedureStatus::OutOfEnergy),
      2 => Ok(ProcedureStatus::InternalError(reader.read_string()?)),
      tag => Err(SyncError::UnknownVariant { tag, variants: 3 }),
    }
  }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcedureResult {
  pub status: ProcedureStatus,
  pub timestamp: Timestamp,
  pub total_host_execution_duration: TimeDuration,
  pub request_id: u32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ServerMessage {
  InitialSubscription {
    database_update: DatabaseUpdate,
    request_id: u32,
    total_host_execution_duration: TimeDuration,
  },
  TransactionUpdate(TransactionUpdate),
  TransactionUpdateLight {
    request_id: u32,
    update: DatabaseUpdate,
  },
  IdentityToken {
    identity: Identity,
    token: String,
    connection_id: ConnectionId,
  },
  OneOffQueryResponse {
    message_id: Vec<u8>,
    error: Option<String>,
    tables: Vec<OneOffTable>,
    total_host_execution_duration: TimeDuration,
  },
  SubscribeApplied {
    request_id: u32,
    total_host_execution_duration_micros: u64,
    query_id: QueryId,
    rows: SubscribeRows,
  },
  UnsubscribeApplied {
    request_id: u32,
    total_host_execution_duration_micros: u64,
    query_id: QueryId,
    rows: SubscribeRows,
  },
  SubscriptionError {
    total_host_execution_duration_micros: u64,
    request_id: Option<u32>,
    query_id: Option<u32>,
    table_id: Option<u32>,
    error: String,
  },
  SubscribeMultiApplied {
    request_id: u32,
    total_host_execution_duration_micros: u64,
    query_id: QueryId,
    update: DatabaseUpdate,
  },
  UnsubscribeMultiApplied {
    request_id: u32,
    total_host_execution_duration_micros: u64,
    query_id: QueryId,
    update: DatabaseUpdate,
  },
  ProcedureResult(ProcedureResult),
}

impl ServerMessage {
  /// Variant name, for logs.
  pub fn kind(&self) -> &'static str {
    match self {
      ServerMessage::InitialSubscription { .. } => "InitialSubscription",
      ServerMessage::TransactionUpdate(_) => "TransactionUpdate",
      ServerMessage::TransactionUpdateLight { .. } => "TransactionUpdateLight",
      ServerMessage::IdentityToken { .. } => "IdentityToken",
      ServerMessage::OneOffQueryResponse { .. } => "OneOffQueryResponse",
      ServerMessage::SubscribeApplied { .. } => "SubscribeApplied",
      ServerMessage::UnsubscribeApplied { .. } => "UnsubscribeApplied",
      ServerMessage::SubscriptionError { .. } => "SubscriptionError",
      ServerMessage::SubscribeMultiApplied { .. } => "SubscribeMultiApplied",
      ServerMessage::UnsubscribeMultiApplied { .. } => "UnsubscribeMultiApplied",
      ServerMessage::ProcedureResult(_) => "ProcedureResult",
    }
  }
}

impl Encode for ServerMessage {
  fn encode(&self, writer: &mut BinaryWriter) {
    match self {
      ServerMessage::InitialSubscription {
        database_update,
        request_id,
        total_host_execution_duration,
      } => {
        writer.write_u8(0);
        database_update.encode(writer);
        writer.write_u32(*request_id);
        total_host_execution_duration.encode(writer);
      }
      ServerMessage::TransactionUpdate(update) => {
        writer.write_u8(1);
        update.encode(writer);
      }
      ServerMessage::TransactionUpdateLight { request_id, update } => {
        writer.write_u8(2);
        writer.write_u32(*request_id);
        update.encode(writer);
      }
      ServerMessage::IdentityToken {
        identity,
        token,
        connection_id,
      } => {
        writer.write_u8(3);
        identity.encode(writer);
        writer.write_string(token);
        connection_id.encode(writer);
      }
      ServerMessage::OneOffQueryResponse {
        message_id,
        error,
        tables,
        total_host_execution_duration,
      } => {
        writer.write_u8(4);
        writer.write_byte_array(message_id);
        error.encode(writer);
        tables.encode(writer);
        total_host_execution_duration.encode(writer);
      }
      ServerMessage::SubscribeApplied {
        request_id,
        total_host_execution_duration_micros,
        query_id,
        rows,
      } => {
        writer.write_u8(5);
        writer.write_u32(*request_id);
        writer.write_u64(*total_host_execution_duration_micros);
        query_id.encode(writer);
        rows.encode(writer);
      }
      ServerMessage::UnsubscribeApplied {
        request_id,
        total_host_execution_duration_micros,
        query_id,
        rows,
      } => {
        writer.write_u8(6);
        writer.write_u32(*request_id);
        writer.write_u64(*total_host_execution_duration_micros);
        query_id.encode(writer);
        rows.encode(writer);
      }
      ServerMessage::SubscriptionError {
        total_host_execution_duration_micros,
        request_id,
        query_id,
        table_id,
        error,
      } => {
        writer.write_u8(7);
        writer.write_u64(*total_host_execution_duration_micros);
        request_id.encode(writer);
        query_id.encode(writer);
        table_id.encode(writer);
        writer.write_string(error);
      }
      ServerMessage::SubscribeMultiApplied {
        request_id,
        total_host_execution_duration_micros,
        query_id,
        update,
      } => {
        writer.write_u8(8);
        writer.write_u32(*request_id);
        writer.write_u64(*total_host_execution_duration_micros);
        query_id.encode(writer);
        update.encode(writer);
      }
      ServerMessage::UnsubscribeMultiApplied {
        request_id,
        total_host_execution_duration_micros,
        query_id,
        update,
      } => {
        writer.write_u8(9);
        writer.write_u32(*request_id);
        writer.write_u64(*total_host_execution_duration_micros);
        query_id.encode(writer);
        update.encode(writer);
      }
      ServerMessage::ProcedureResult(result) => {
        writer.write_u8(10);
        result.status.encode(writer);
        result.timestamp.encode(writer);
        result.total_host_execution_duration.encode(writer);
        writer.write_u32(result.request_id);
      }
    }
  }
}

impl Decode for ServerMessage {
  fn decode(reader: &mut BinaryReader<'_>) -> Result<Self> {
    let message = match reader.read_u8()? {
      0 => ServerMessage::InitialSubscription {
        database_update: DatabaseUpdate::decode(reader)?,
        request_id: reader.read_u32()?,
        total_host_execution_duration: TimeDuration::decode(reader)?,
      },
      1 => ServerMessage::TransactionUpdate(TransactionUpdate::decode(reader)?),
      2 => ServerMessage::TransactionUpdateLight {
        request_id: reader.read_u32()?,
        update: DatabaseUpdate::decode(reader)?,
      },
      3 => ServerMessage::IdentityToken {
        identity: Identity::decode(reader)?,
        token: reader.read_string()?,
        connection_id: ConnectionId::decode(reader)?,
      },
      4 => ServerMessage::OneOffQueryResponse {
        message_id: reader.read_byte_array()?.to_vec(),
        error: Option::decode(reader)?,
        tables: Vec::decode(reader)?,
        total_host_execution_duration: TimeDuration::decode(reader)?,
      },
      5 => ServerMessage::SubscribeApplied {
        request_id: reader.read_u32()?,
        total_host_execution_duration_micros: reader.read_u64()?,
        query_id: QueryId::decode(reader)?,
        rows: SubscribeRows::decode(reader)?,
      },
      6 => ServerMessage::UnsubscribeApplied {
        request_id: reader.read_u32()?,
        total_host_execution_duration_micros: reader.read_u64()?,
        query_id: QueryId::decode(reader)?,
        rows: SubscribeRows::decode(reader)?,
      },
      7 => ServerMessage::SubscriptionError {
        total_host_execution_duration_micros: reader.read_u64()?,
        request_id: Option::decode(reader)?,
        query_id: Option::decode(reader)?,
        table_id: Option::decode(reader)?,
        error: reader.read_string()?,
      },
      8 => ServerMessage::SubscribeMultiApplied {
        request_id: reader.read_u32()?,
        total_host_execution_duration_micros: reader.read_u64()?,
        query_id: QueryId::decode(reader)?,
        update: DatabaseUpdate::decode(reader)?,
      },
      9 => ServerMessage::UnsubscribeMultiApplied {
        request_id: reader.read_u32()?,
        total_host_execution_duration_micros: reader.read_u64()?,
        query_id: QueryId::decode(reader)?,
        update: DatabaseUpdate::decode(reader)?,
      },
      10 => ServerMessage::ProcedureResult(ProcedureResult {
        status: ProcedureStatus::decode(reader)?,
        timestamp: Timestamp::decode(reader)?,
        total_host_execution_duration: TimeDuration::decode(reader)?,
        request_id: reader.read_u32()?,
      }),
      tag => return Err(SyncError::UnknownVariant { tag, variants: 11 }),
    };
    Ok(message)
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use shared::types::U256;

  #[test]
  fn identity_token_decodes() {
    let msg = ServerMessage::IdentityToken {
      identity: Identity::new(U256::from(5u128)),
      token: "tok".into(),
      connection_id: ConnectionId::new(77),
    };
    let bytes = msg.to_bytes();
    assert_eq!(bytes[0], 3);
    assert_eq!(bytes.len(), 1 + 32 + 4 + 3 + 16);
    assert_eq!(ServerMessage::from_bytes(&bytes).unwrap(), msg);
  }

  #[test]
  fn subscription_error_without_query_id() {
    let msg = ServerMessage::SubscriptionError {
      total_host_execution_duration_micros: 10,
      request_id: None,
      query_id: None,
      table_id: None,
      error: "bad query".into(),
    };
    let decoded = ServerMessage::from_bytes(&msg.to_bytes()).unwrap();
    assert_eq!(decoded.kind(), "SubscriptionError");
    assert_eq!(decoded, msg);
  }

  #[test]
  fn truncated_transaction_update_is_a_codec_error() {
    let msg = ServerMessage::TransactionUpdate(TransactionUpdate {
      status: UpdateStatus::Failed("boom".into()),
      timestamp: Timestamp::from_micros(1),
      caller_identity: Identity::ZERO,
      caller_connection_id: ConnectionId::ZERO,
      reducer_call: ReducerCallInfo {
        reducer_name: "r".into(),
        reducer_id: 0,
        args: vec![],
        request_id: 0,
      },
      energy_quanta_used: 0,
      total_host_execution_duration: TimeDuration::from_micros(0),
    });
    let bytes = msg.to_bytes();
    let err = ServerMessage::from_bytes(&bytes[..bytes.len() - 3]).unwrap_err();
    assert!(err.is_codec());
  }

  #[test]
  fn unknown_server_tag() {
    assert!(matches!(
      ServerMessage::from_bytes(&[11]),
      Err(SyncError::UnknownVariant { tag: 11, variants: 11 })
    ));
  }
}
