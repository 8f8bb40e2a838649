use std::sync::Arc;

use shared::Result;
use tracing::debug;

use super::handle::SubscriptionHandle;
use super::manager::ALL_TABLES_QUERY;
use crate::connection::DbConnection;
use crate::event::callbacks::lock;
use crate::event::{EventContext, SubscriptionCallback, SubscriptionErrorCallback};
use crate::protocol::ClientMessage;

/// Collects per-subscription callbacks, then issues the subscribe request.
pub struct SubscriptionBuilder {
  conn: DbConnection,
  on_applied: Vec<Arc<SubscriptionCallback>>,
  on_error: Vec<Arc<SubscriptionErrorCallback>>,
}

impl SubscriptionBuilder {
  pub(crate) fn new(conn: DbConnection) -> Self {
    Self {
      conn,
      on_applied: Vec::new(),
      on_error: Vec::new(),
    }
  }

  /// Run when the server confirms the subscription. The cache already holds
  /// its initial rows.
  pub fn on_applied<F>(mut self, callback: F) -> Self
  where
    F: Fn(&EventContext) + Send + Sync + 'static,
  {
    self.on_applied.push(Arc::new(callback));
    self
  }

  /// Run when the subscription fails or is dropped by the server.
  pub fn on_error<F>(mut self, callback: F) -> Self
  where
    F: Fn(&EventContext, &str) + Send + Sync + 'static,
  {
    self.on_error.push(Arc::new(callback));
    self
  }

  /// Subscribe to one or more SQL queries as a single subscription.
  pub fn subscribe<I, Q>(self, queries: I) -> Result<SubscriptionHandle>
  where
    I: IntoIterator<Item = Q>,
    Q: Into<String>,
  {
    let queries: Vec<String> = queries.into_iter().map(Into::into).collect();
    let state = lock(self.conn.subscriptions()).register(queries, self.on_applied, self.on_error)?;

    debug!(query_id = %state.query_id(), queries = state.queries().len(), "subscribing");
    let sent = self.conn.send(ClientMessage::SubscribeMulti {
      query_strings: state.queries().to_vec(),
      request_id: 0,
      query_id: state.query_id(),
    });
    if let Err(e) = sent {
      lock(self.conn.subscriptions()).remove(state.query_id());
      return Err(e);
    }
    Ok(SubscriptionHandle::new(state, self.conn))
  }

  /// Subscribe to every row of every table. Cannot be combined with
  /// targeted subscriptions on the same connection.
  pub fn subscribe_to_all_tables(self) -> Result<SubscriptionHandle> {
    self.subscribe([ALL_TABLES_QUERY])
  }
}
