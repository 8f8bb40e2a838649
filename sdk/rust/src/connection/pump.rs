//! The single consumer of inbound socket events.
//!
//! Frames are handled strictly one at a time: a frame's decompression and
//! decoding finish, and its cache changes and callbacks run, before the
//! next frame is looked at. Callbacks always run with no cache or
//! subscription lock held, so they may read tables and register or remove
//! callbacks freely.

use std::ops::ControlFlow;

use shared::algebraic::codec::deserialize_product;
use shared::serialize::{BinaryReader, Decode};
use shared::{Result, SyncError};
use tokio::sync::mpsc::UnboundedReceiver;
use tracing::{debug, error, info, warn};

use super::socket::SocketEvent;
use super::updates::parse_database_update;
use super::DbConnection;
use crate::cache::{PendingCallback, RowChange};
use crate::event::callbacks::lock;
use crate::event::{Event, EventContext, ReducerEvent, ReducerStatus};
use crate::protocol::{
  unwrap_frame, DatabaseUpdate, ProcedureResult, QueryId, ServerMessage, TransactionUpdate, UpdateStatus,
};

/// Reducer name the server reports for transactions with no reducer.
const NO_REDUCER: &str = "<none>";

/// Drives a connection from its inbound socket events.
///
/// Spawn [`MessagePump::run`] on the runtime; it returns after the socket
/// closes.
pub struct MessagePump {
  conn: DbConnection,
  inbound: UnboundedReceiver<SocketEvent>,
}

impl MessagePump {
  pub(crate) fn new(conn: DbConnection, inbound: UnboundedReceiver<SocketEvent>) -> Self {
    Self { conn, inbound }
  }

  pub fn connection(&self) -> &DbConnection {
    &self.conn
  }

  /// Process events until the socket closes or the transport is dropped.
  /// A frame that fails to decode or apply is logged and skipped.
  pub async fn run(mut self) {
    while let Some(event) = self.inbound.recv().await {
      match self.handle_event(event).await {
        Ok(ControlFlow::Continue(())) => {}
        Ok(ControlFlow::Break(())) => break,
        Err(e) => error!(error = %e, "Failed to process server message"),
      }
    }
    self.conn.set_active(false);
    debug!("message pump stopped");
  }

  /// Handle one socket event. Breaks once the socket has closed.
  pub async fn handle_event(&self, event: SocketEvent) -> Result<ControlFlow<()>> {
    match event {
      SocketEvent::Open => {
        info!("Socket opened");
        self.conn.set_active(true);
      }
      SocketEvent::Frame(frame) => self.process_frame(&frame).await?,
      SocketEvent::Error(message) => {
        error!(error = %message, "Socket error");
        self.conn.set_active(false);
        for callback in self.conn.inner.on_connect_error.snapshot() {
          callback(&self.conn, &message);
        }
      }
      SocketEvent::Close(reason) => {
        info!(reason = reason.as_deref().unwrap_or(""), "Socket closed");
        self.conn.set_active(false);
        for callback in self.conn.inner.on_disconnect.snapshot() {
          callback(&self.conn, reason.as_deref());
        }
        return Ok(ControlFlow::Break(()));
      }
    }
    Ok(ControlFlow::Continue(()))
  }

  /// Unwrap, decode and handle one binary frame.
  pub async fn process_frame(&self, frame: &[u8]) -> Result<()> {
    let payload = unwrap_frame(frame, &*self.conn.inner.decompressor).await?;
    let message = ServerMessage::from_bytes(&payload)?;
    debug!(message = message.kind(), bytes = payload.len(), "received server message");
    self.handle_message(message).await
  }

  async fn handle_message(&self, message: ServerMessage) -> Result<()> {
    match message {
      ServerMessage::IdentityToken {
        identity,
        token,
        connection_id,
      } => {
        info!(identity = %identity.short_hex(), "Received identity");
        self.conn.set_identity(identity, token.clone(), connection_id);
        for callback in self.conn.inner.on_connect.snapshot() {
          callback(&self.conn, identity, &token);
        }
      }
      ServerMessage::InitialSubscription { database_update, .. } => {
        let pending = self.apply(database_update).await?;
        self.fire_rows(&self.context(Event::SubscribeApplied), pending);
      }
      ServerMessage::SubscribeApplied { query_id, rows, .. } => {
        let update = DatabaseUpdate {
          tables: vec![rows.table_rows],
        };
        self.subscribe_applied(query_id, update).await?;
      }
      ServerMessage::SubscribeMultiApplied { query_id, update, .. } => {
        self.subscribe_applied(query_id, update).await?;
      }
      ServerMessage::UnsubscribeApplied { query_id, rows, .. } => {
        let update = DatabaseUpdate {
          tables: vec![rows.table_rows],
        };
        self.unsubscribe_applied(query_id, update).await?;
      }
      ServerMessage::UnsubscribeMultiApplied { query_id, update, .. } => {
        self.unsubscribe_applied(query_id, update).await?;
      }
      ServerMessage::SubscriptionError { query_id, error, .. } => self.subscription_error(query_id, error),
      ServerMessage::TransactionUpdate(update) => self.transaction_update(update).await?,
      ServerMessage::TransactionUpdateLight { update, .. } => {
        let pending = self.apply(update).await?;
        self.fire_rows(&self.context(Event::UnknownTransaction), pending);
      }
      ServerMessage::ProcedureResult(result) => self.procedure_result(&result),
      ServerMessage::OneOffQueryResponse { .. } => {
        return Err(SyncError::UnexpectedMessage("OneOffQueryResponse".to_string()));
      }
    }
    Ok(())
  }

  async fn subscribe_applied(&self, query_id: QueryId, update: DatabaseUpdate) -> Result<()> {
    let state = lock(self.conn.subscriptions()).get(query_id);
    let Some(state) = state else {
      error!(query_id = %query_id, "Received SubscribeApplied for an unknown query id");
      return Ok(());
    };

    let pending = self.apply(update).await?;
    let applied = state.mark_applied();
    let ctx = self.context(Event::SubscribeApplied);
    self.fire_rows(&ctx, pending);
    for callback in applied {
      callback(&ctx);
    }
    Ok(())
  }

  async fn unsubscribe_applied(&self, query_id: QueryId, update: DatabaseUpdate) -> Result<()> {
    let state = lock(self.conn.subscriptions()).get(query_id);
    let Some(state) = state else {
      error!(query_id = %query_id, "Received UnsubscribeApplied for an unknown query id");
      return Ok(());
    };

    let pending = self.apply(update).await?;
    let on_end = state.mark_ended();
    lock(self.conn.subscriptions()).remove(query_id);
    let ctx = self.context(Event::UnsubscribeApplied);
    self.fire_rows(&ctx, pending);
    if let Some(callback) = on_end {
      callback(&ctx);
    }
    Ok(())
  }

  fn subscription_error(&self, query_id: Option<u32>, message: String) {
    let failed = match query_id {
      Some(id) => {
        let removed = lock(self.conn.subscriptions()).remove(QueryId(id));
        if removed.is_none() {
          error!(query_id = id, error = %message, "Subscription error for an unknown query id");
        }
        removed.into_iter().collect::<Vec<_>>()
      }
      None => {
        error!(error = %message, "Subscription error without a query id, failing every subscription");
        lock(self.conn.subscriptions()).drain()
      }
    };

    let ctx = self.context(Event::SubscribeError(message.clone()));
    for state in failed {
      debug!(query_id = %state.query_id(), "subscription failed");
      for callback in state.mark_error() {
        callback(&ctx, &message);
      }
    }
  }

  async fn transaction_update(&self, update: TransactionUpdate) -> Result<()> {
    if update.reducer_call.reducer_name == NO_REDUCER {
      error!("Received a transaction update with no reducer");
      return Ok(());
    }

    let (database_update, status) = match update.status.clone() {
      UpdateStatus::Committed(database_update) => (database_update, ReducerStatus::Committed),
      UpdateStatus::Failed(message) => (DatabaseUpdate::default(), ReducerStatus::Failed(message)),
      UpdateStatus::OutOfEnergy => (DatabaseUpdate::default(), ReducerStatus::OutOfEnergy),
    };
    let event = self.reducer_event(&update, status);

    let pending = self.apply(database_update).await?;
    let ctx = self.context(event);
    self.fire_rows(&ctx, pending);

    if let Event::Reducer(reducer_event) = &ctx.event {
      let callbacks = self
        .conn
        .inner
        .reducer_callbacks
        .get(&reducer_event.reducer_name)
        .map(|list| list.snapshot())
        .unwrap_or_default();
      for callback in callbacks {
        callback(&ctx, reducer_event);
      }
    }
    Ok(())
  }

  /// Attribute a transaction to a reducer of the module, or fall back to
  /// an unknown transaction when the name or arguments don't match.
  fn reducer_event(&self, update: &TransactionUpdate, status: ReducerStatus) -> Event {
    let call = &update.reducer_call;
    if call.reducer_name.is_empty() {
      return Event::UnknownTransaction;
    }
    let module = self.conn.module();
    let Some(def) = module.reducer(&call.reducer_name) else {
      warn!(reducer = %call.reducer_name, "Transaction from a reducer not in the module");
      return Event::UnknownTransaction;
    };

    let mut reader = BinaryReader::new(&call.args);
    let args = deserialize_product(&mut reader, &def.params, module.typespace()).and_then(|args| {
      reader.finish()?;
      Ok(args)
    });
    match args {
      Ok(args) => Event::Reducer(ReducerEvent {
        caller_identity: update.caller_identity,
        caller_connection_id: update.caller_connection_id.none_if_zero(),
        timestamp: update.timestamp,
        status,
        energy_consumed: update.energy_quanta_used,
        reducer_name: call.reducer_name.clone(),
        args,
      }),
      Err(e) => {
        warn!(reducer = %call.reducer_name, error = %e, "Failed to decode reducer arguments");
        Event::UnknownTransaction
      }
    }
  }

  fn procedure_result(&self, result: &ProcedureResult) {
    debug!(request_id = result.request_id, "procedure result");
    for callback in self.conn.inner.on_procedure_result.snapshot() {
      callback(&self.conn, result);
    }
  }

  /// Decode a database update and apply it to the cache. Decoding finishes
  /// before the cache lock is taken.
  async fn apply(&self, update: DatabaseUpdate) -> Result<Vec<PendingCallback>> {
    let operations = parse_database_update(self.conn.module(), update, &*self.conn.inner.decompressor).await?;
    let pending = self.conn.cache_mut().apply(operations);
    Ok(pending)
  }

  fn context(&self, event: Event) -> EventContext {
    EventContext::new(self.conn.clone(), event)
  }

  fn fire_rows(&self, ctx: &EventContext, pending: Vec<PendingCallback>) {
    for PendingCallback { table, change } in pending {
      let Some(callbacks) = self.conn.inner.table_callbacks.get(&table) else {
        continue;
      };
      match change {
        RowChange::Insert(row) => {
          for callback in callbacks.insert.snapshot() {
            callback(ctx, &row);
          }
        }
        RowChange::Update { old, new } => {
          for callback in callbacks.update.snapshot() {
            callback(ctx, &old, &new);
          }
        }
        RowChange::Delete(row) => {
          for callback in callbacks.delete.snapshot() {
            callback(ctx, &row);
          }
        }
      }
    }
  }
}
