use std::ops::Deref;

use shared::algebraic::ProductValue;
use shared::types::{ConnectionId, Identity, Timestamp};
use shared::Result;

use crate::connection::DbConnection;
use crate::row::ReducerArgs;

/// What caused a batch of row callbacks.
#[derive(Debug, Clone, PartialEq)]
pub enum Event {
  /// A reducer call this client can attribute.
  Reducer(ReducerEvent),
  /// Rows delivered because a subscription was applied.
  SubscribeApplied,
  /// Rows removed because a subscription ended.
  UnsubscribeApplied,
  /// A subscription failed or was dropped by the server.
  SubscribeError(String),
  /// A transaction whose reducer is unknown or whose arguments could not
  /// be decoded. Its rows still apply.
  UnknownTransaction,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReducerStatus {
  Committed,
  Failed(String),
  OutOfEnergy,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ReducerEvent {
  pub caller_identity: Identity,
  /// `None` for calls not made over a client connection.
  pub caller_connection_id: Option<ConnectionId>,
  pub timestamp: Timestamp,
  pub status: ReducerStatus,
  pub energy_consumed: u128,
  pub reducer_name: String,
  pub args: ProductValue,
}

impl ReducerEvent {
  /// Decode the arguments as a typed reducer-argument struct.
  pub fn args_as<A: ReducerArgs>(&self) -> Result<A> {
    A::from_args(&self.args)
  }
}

/// Passed to every callback fired for one inbound message.
///
/// Dereferences to the connection, so tables and reducers are reachable
/// directly from the context.
#[derive(Clone)]
pub struct EventContext {
  conn: DbConnection,
  pub event: Event,
}

impl EventContext {
  pub(crate) fn new(conn: DbConnection, event: Event) -> Self {
    Self { conn, event }
  }

  pub fn conn(&self) -> &DbConnection {
    &self.conn
  }

  pub fn reducer_event(&self) -> Option<&ReducerEvent> {
    match &self.event {
      Event::Reducer(event) => Some(event),
      _ => None,
    }
  }
}

impl Deref for EventContext {
  type Target = DbConnection;

  fn deref(&self) -> &DbConnection {
    &self.conn
  }
}

impl std::fmt::Debug for EventContext {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("EventContext").field("event", &self.event).finish()
  }
}
