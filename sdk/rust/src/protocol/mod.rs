//! Wire protocol: message types exchanged over the socket.

pub mod client;
pub mod compression;
pub mod rows;
pub mod server;

pub use client::{CallReducerFlags, ClientMessage, QueryId};
pub use compression::{unwrap_frame, Algorithm, Decompressor, GzipDecompressor};
pub use rows::{BsatnRowList, CompressableQueryUpdate, DatabaseUpdate, QueryUpdate, RowSizeHint, TableUpdate};
pub use server::{
  OneOffTable, ProcedureResult, ProcedureStatus, ReducerCallInfo, ServerMessage, SubscribeRows, TransactionUpdate,
  UpdateStatus,
};

/// WebSocket sub-protocol for binary messages.
pub const WS_PROTOCOL: &str = "v1.bsatn.spacetimedb";
