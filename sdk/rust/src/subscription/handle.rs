use std::sync::Arc;

use shared::Result;
use tracing::debug;

use super::manager::SubscriptionState;
use crate::connection::DbConnection;
use crate::event::EventContext;
use crate::protocol::{ClientMessage, QueryId};

/// Caller's view of one subscription.
#[derive(Clone)]
pub struct SubscriptionHandle {
  state: Arc<SubscriptionState>,
  conn: DbConnection,
}

impl SubscriptionHandle {
  pub(crate) fn new(state: Arc<SubscriptionState>, conn: DbConnection) -> Self {
    Self { state, conn }
  }

  pub fn query_id(&self) -> QueryId {
    self.state.query_id()
  }

  pub fn queries(&self) -> &[String] {
    self.state.queries()
  }

  /// Applied and not yet ended.
  pub fn is_active(&self) -> bool {
    self.state.is_active()
  }

  /// Ended by unsubscribe or by an error.
  pub fn is_ended(&self) -> bool {
    self.state.is_ended()
  }

  /// Ask the server to drop this subscription. Fails if called twice or
  /// after the subscription ended.
  pub fn unsubscribe(&self) -> Result<()> {
    self.state.begin_unsubscribe(None)?;
    self.send_unsubscribe()
  }

  /// Like `unsubscribe`, and run `on_end` once the server confirms.
  ///
  /// `on_end` is not run if the subscription errors first.
  pub fn unsubscribe_then<F>(&self, on_end: F) -> Result<()>
  where
    F: Fn(&EventContext) + Send + Sync + 'static,
  {
    self.state.begin_unsubscribe(Some(Arc::new(on_end)))?;
    self.send_unsubscribe()
  }

  fn send_unsubscribe(&self) -> Result<()> {
    debug!(query_id = %self.query_id(), "unsubscribing");
    self.conn.send(ClientMessage::UnsubscribeMulti {
      request_id: 0,
      query_id: self.query_id(),
    })
  }
}

impl std::fmt::Debug for SubscriptionHandle {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_tuple("SubscriptionHandle").field(&self.state).finish()
  }
}
