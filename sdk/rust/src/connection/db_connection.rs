//! The connection object shared by callers, callbacks and the pump.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, RwLock, RwLockReadGuard, RwLockWriteGuard, PoisonError};

use dashmap::DashMap;
use shared::algebraic::codec::serialize_product_value;
use shared::algebraic::ProductValue;
use shared::config::ConnectionConfig;
use shared::serialize::Encode;
use shared::types::{ConnectionId, Identity};
use shared::{Result, SyncError};
use tracing::{debug, info};

use super::pump::MessagePump;
use super::socket::{socket_pair, ConnectRequest, Outbound, Transport};
use super::table_handle::{TableCallbacks, TableHandle};
use super::url::connect_url;
use crate::cache::ClientCache;
use crate::event::callbacks::lock;
use crate::event::{
  CallbackId, CallbackList, ConnectCallback, ConnectErrorCallback, DisconnectCallback, EventContext,
  ProcedureCallback, ReducerCallback, ReducerEvent,
};
use crate::protocol::{CallReducerFlags, ClientMessage, Decompressor, GzipDecompressor, WS_PROTOCOL};
use crate::row::ReducerArgs;
use crate::schema::ModuleDef;
use crate::subscription::{SubscriptionBuilder, SubscriptionManager};

pub(crate) struct ConnectionInner {
  pub(crate) module: Arc<ModuleDef>,
  pub(crate) cache: RwLock<ClientCache>,
  pub(crate) subscriptions: Mutex<SubscriptionManager>,
  pub(crate) table_callbacks: HashMap<String, TableCallbacks>,
  pub(crate) reducer_callbacks: DashMap<String, CallbackList<ReducerCallback>>,
  pub(crate) on_connect: CallbackList<ConnectCallback>,
  pub(crate) on_disconnect: CallbackList<DisconnectCallback>,
  pub(crate) on_connect_error: CallbackList<ConnectErrorCallback>,
  pub(crate) on_procedure_result: CallbackList<ProcedureCallback>,
  pub(crate) identity: RwLock<Option<Identity>>,
  pub(crate) token: RwLock<Option<String>>,
  pub(crate) connection_id: RwLock<ConnectionId>,
  pub(crate) is_active: AtomicBool,
  pub(crate) reducer_flags: DashMap<String, CallReducerFlags>,
  pub(crate) decompressor: Arc<dyn Decompressor>,
  outbound: tokio::sync::mpsc::UnboundedSender<Outbound>,
}

/// A client connection to one database.
///
/// Cheap to clone; every clone refers to the same connection. Created by
/// [`DbConnection::connect`], which also returns the [`MessagePump`] that
/// must be spawned and the [`Transport`] half a socket driver consumes.
#[derive(Clone)]
pub struct DbConnection {
  pub(crate) inner: Arc<ConnectionInner>,
}

impl DbConnection {
  /// Set up a connection with gzip decompression.
  pub fn connect(config: ConnectionConfig, module: ModuleDef) -> Result<(DbConnection, MessagePump, Transport)> {
    Self::connect_with_decompressor(config, module, Arc::new(GzipDecompressor))
  }

  /// Set up a connection with a custom decompression step.
  pub fn connect_with_decompressor(
    config: ConnectionConfig,
    module: ModuleDef,
    decompressor: Arc<dyn Decompressor>,
  ) -> Result<(DbConnection, MessagePump, Transport)> {
    let connection_id = config.connection_id.unwrap_or_else(ConnectionId::random);
    let url = connect_url(&config, connection_id)?;
    info!(module = %config.module_name, connection_id = %connection_id, "Connecting to database");

    let request = ConnectRequest {
      url,
      protocol: WS_PROTOCOL,
      token: config.token.clone(),
    };
    let (channels, transport) = socket_pair(request);

    let table_callbacks = module
      .tables()
      .iter()
      .map(|t| (t.name.clone(), TableCallbacks::default()))
      .collect();
    let inner = ConnectionInner {
      cache: RwLock::new(ClientCache::new(&module)),
      module: Arc::new(module),
      subscriptions: Mutex::new(SubscriptionManager::new()),
      table_callbacks,
      reducer_callbacks: DashMap::new(),
      on_connect: CallbackList::new(),
      on_disconnect: CallbackList::new(),
      on_connect_error: CallbackList::new(),
      on_procedure_result: CallbackList::new(),
      identity: RwLock::new(None),
      token: RwLock::new(config.token.filter(|t| !t.is_empty())),
      connection_id: RwLock::new(connection_id),
      is_active: AtomicBool::new(false),
      reducer_flags: DashMap::new(),
      decompressor,
      outbound: channels.outbound,
    };
    let conn = DbConnection { inner: Arc::new(inner) };
    let pump = MessagePump::new(conn.clone(), channels.inbound);
    Ok((conn, pump, transport))
  }

  // ── State ───────────────────────────────────────────────────────────

  pub fn module(&self) -> &ModuleDef {
    &self.inner.module
  }

  /// Whether the socket is open.
  pub fn is_active(&self) -> bool {
    self.inner.is_active.load(Ordering::Acquire)
  }

  /// Identity assigned by the server; `None` until the handshake arrives.
  pub fn identity(&self) -> Option<Identity> {
    *read(&self.inner.identity)
  }

  pub fn token(&self) -> Option<String> {
    read(&self.inner.token).clone()
  }

  pub fn connection_id(&self) -> ConnectionId {
    *read(&self.inner.connection_id)
  }

  /// Close the socket. Callbacks already scheduled still run.
  pub fn disconnect(&self) -> Result<()> {
    info!("Disconnecting");
    self
      .inner
      .outbound
      .send(Outbound::Close)
      .map_err(|_| SyncError::ChannelClosed)
  }

  // ── Tables and subscriptions ────────────────────────────────────────

  /// Accessor for a table by name.
  pub fn table(&self, name: &str) -> Result<TableHandle> {
    self.inner.module.require_table(name)?;
    Ok(TableHandle::new(self.clone(), name))
  }

  pub fn subscription_builder(&self) -> SubscriptionBuilder {
    SubscriptionBuilder::new(self.clone())
  }

  // ── Reducers and procedures ─────────────────────────────────────────

  /// Call a reducer with arguments matching its parameter product type.
  pub fn call_reducer(&self, name: &str, args: &ProductValue) -> Result<()> {
    let def = self.inner.module.require_reducer(name)?;
    let bytes = serialize_product_value(&def.params, args, self.inner.module.typespace())?;
    self.call_reducer_raw(name, bytes)
  }

  /// Call a reducer with already encoded arguments.
  pub fn call_reducer_raw(&self, name: &str, args: Vec<u8>) -> Result<()> {
    let flags = self.reducer_flags(name);
    debug!(reducer = name, ?flags, bytes = args.len(), "calling reducer");
    self.send(ClientMessage::CallReducer {
      reducer: name.to_string(),
      args,
      request_id: 0,
      flags,
    })
  }

  /// Call a reducer through its typed argument struct.
  pub fn call<A: ReducerArgs>(&self, args: &A) -> Result<()> {
    self.call_reducer(A::REDUCER_NAME, &args.to_args())
  }

  pub fn call_procedure(&self, name: &str, args: &ProductValue) -> Result<()> {
    let def = self
      .inner
      .module
      .procedure(name)
      .ok_or_else(|| SyncError::UnknownReducer(name.to_string()))?;
    let bytes = serialize_product_value(&def.params, args, self.inner.module.typespace())?;
    self.send(ClientMessage::CallProcedure {
      procedure: name.to_string(),
      args: bytes,
      request_id: 0,
      flags: 0,
    })
  }

  /// Flags used for every later call of `reducer`.
  pub fn set_reducer_flags(&self, reducer: &str, flags: CallReducerFlags) {
    self.inner.reducer_flags.insert(reducer.to_string(), flags);
  }

  pub fn reducer_flags(&self, reducer: &str) -> CallReducerFlags {
    self
      .inner
      .reducer_flags
      .get(reducer)
      .map(|f| *f)
      .unwrap_or_default()
  }

  // ── Callback registration ───────────────────────────────────────────

  pub fn on_connect<F>(&self, callback: F) -> CallbackId
  where
    F: Fn(&DbConnection, Identity, &str) + Send + Sync + 'static,
  {
    self.inner.on_connect.add(Arc::new(callback))
  }

  pub fn remove_on_connect(&self, id: CallbackId) -> bool {
    self.inner.on_connect.remove(id)
  }

  pub fn on_disconnect<F>(&self, callback: F) -> CallbackId
  where
    F: Fn(&DbConnection, Option<&str>) + Send + Sync + 'static,
  {
    self.inner.on_disconnect.add(Arc::new(callback))
  }

  pub fn remove_on_disconnect(&self, id: CallbackId) -> bool {
    self.inner.on_disconnect.remove(id)
  }

  pub fn on_connect_error<F>(&self, callback: F) -> CallbackId
  where
    F: Fn(&DbConnection, &str) + Send + Sync + 'static,
  {
    self.inner.on_connect_error.add(Arc::new(callback))
  }

  pub fn remove_on_connect_error(&self, id: CallbackId) -> bool {
    self.inner.on_connect_error.remove(id)
  }

  /// Run `callback` after every committed or failed call of `reducer`,
  /// once its row callbacks have fired.
  pub fn on_reducer<F>(&self, reducer: &str, callback: F) -> Result<CallbackId>
  where
    F: Fn(&EventContext, &ReducerEvent) + Send + Sync + 'static,
  {
    self.inner.module.require_reducer(reducer)?;
    Ok(
      self
        .inner
        .reducer_callbacks
        .entry(reducer.to_string())
        .or_default()
        .add(Arc::new(callback)),
    )
  }

  pub fn remove_on_reducer(&self, reducer: &str, id: CallbackId) -> bool {
    self
      .inner
      .reducer_callbacks
      .get(reducer)
      .map_or(false, |list| list.remove(id))
  }

  pub fn on_procedure_result<F>(&self, callback: F) -> CallbackId
  where
    F: Fn(&DbConnection, &crate::protocol::ProcedureResult) + Send + Sync + 'static,
  {
    self.inner.on_procedure_result.add(Arc::new(callback))
  }

  pub fn remove_on_procedure_result(&self, id: CallbackId) -> bool {
    self.inner.on_procedure_result.remove(id)
  }

  // ── Internals ───────────────────────────────────────────────────────

  pub(crate) fn send(&self, message: ClientMessage) -> Result<()> {
    let kind = message.kind();
    self
      .inner
      .outbound
      .send(Outbound::Message(message.to_bytes()))
      .map_err(|_| SyncError::ChannelClosed)?;
    debug!(message = kind, "queued client message");
    Ok(())
  }

  pub(crate) fn subscriptions(&self) -> &Mutex<SubscriptionManager> {
    &self.inner.subscriptions
  }

  pub(crate) fn cache(&self) -> RwLockReadGuard<'_, ClientCache> {
    read(&self.inner.cache)
  }

  pub(crate) fn cache_mut(&self) -> RwLockWriteGuard<'_, ClientCache> {
    self.inner.cache.write().unwrap_or_else(PoisonError::into_inner)
  }

  pub(crate) fn set_active(&self, active: bool) {
    self.inner.is_active.store(active, Ordering::Release);
  }

  /// Record the handshake. A token supplied at connect time is kept.
  pub(crate) fn set_identity(&self, identity: Identity, token: String, connection_id: ConnectionId) {
    *self.inner.identity.write().unwrap_or_else(PoisonError::into_inner) = Some(identity);
    {
      let mut current = self.inner.token.write().unwrap_or_else(PoisonError::into_inner);
      if current.is_none() && !token.is_empty() {
        *current = Some(token);
      }
    }
    *self.inner.connection_id.write().unwrap_or_else(PoisonError::into_inner) = connection_id;
  }

  pub(crate) fn active_subscription_count(&self) -> usize {
    lock(&self.inner.subscriptions).len()
  }
}

fn read<T>(lock: &RwLock<T>) -> RwLockReadGuard<'_, T> {
  lock.read().unwrap_or_else(PoisonError::into_inner)
}

impl std::fmt::Debug for DbConnection {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("DbConnection")
      .field("module_tables", &self.inner.module.tables().len())
      .field("identity", &self.identity())
      .field("connection_id", &self.connection_id())
      .field("is_active", &self.is_active())
      .finish()
  }
}
