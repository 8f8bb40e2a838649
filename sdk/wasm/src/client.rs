//! `WasmConnection`: a database connection driven by a browser WebSocket.
//!
//! The SDK core talks to its socket through channels. This module owns the
//! `web_sys::WebSocket`, forwards its open/message/error/close events into
//! the inbound channel, and writes the outbound channel to the socket once
//! it has opened. The message pump runs on the browser event loop with
//! `spawn_local`.
//!
//! ## Usage (JavaScript)
//! ```js
//! const conn = new WasmConnection("https://db.example.com", "chat", schemaJson, token);
//! conn.subscribe(["SELECT * FROM user"]);
//! setInterval(() => {
//!   for (const ev of conn.poll_events()) console.log(ev.type, ev);
//! }, 50);
//! conn.call_reducer("set_name", JSON.stringify({ name: "ada" }));
//! ```

use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::rc::Rc;

use js_sys::{Array, Uint8Array};
use serde::Serialize;
use serde_json::{json, Value as JsonValue};
use shared::config::ConnectionConfig;
use shared::SyncError;
use spacesync_sdk::connection::{Outbound, SocketEvent, Transport};
use spacesync_sdk::subscription::SubscriptionHandle;
use spacesync_sdk::DbConnection;
use tokio::sync::mpsc::UnboundedReceiver;
use tracing::{info, warn};
use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;
use wasm_bindgen_futures::spawn_local;
use web_sys::{BinaryType, CloseEvent, MessageEvent, WebSocket};

use crate::event::{forward_events, EventQueue};
use crate::json::{json_to_row, row_to_json};
use crate::schema::parse_module;

// ─── WasmConnection ──────────────────────────────────────────────────────────

/// A connection to one database, usable from JavaScript.
#[wasm_bindgen]
pub struct WasmConnection {
  conn: DbConnection,
  socket: WebSocket,
  events: EventQueue,
  next_handle: Cell<u32>,
  subscriptions: RefCell<HashMap<u32, SubscriptionHandle>>,
}

#[wasm_bindgen]
impl WasmConnection {
  /// Open a connection.
  ///
  /// - `uri`: server address, `http(s)://` or `ws(s)://`.
  /// - `module`: database name.
  /// - `schema_json`: tables and reducers of the module (see `schema.rs`).
  /// - `token`: auth token from a previous session, if any.
  #[wasm_bindgen(constructor)]
  pub fn new(uri: &str, module: &str, schema_json: &str, token: Option<String>) -> Result<WasmConnection, JsValue> {
    let module_def = parse_module(schema_json).map_err(to_js)?;
    let mut config = ConnectionConfig::new(uri, module);
    config.token = token.filter(|t| !t.is_empty());

    let (conn, pump, transport) = DbConnection::connect(config, module_def).map_err(to_js)?;
    let events = EventQueue::default();
    forward_events(&conn, &events);

    let socket = open_socket(transport)?;
    spawn_local(pump.run());
    info!(module, "wasm connection started");

    Ok(WasmConnection {
      conn,
      socket,
      events,
      next_handle: Cell::new(0),
      subscriptions: RefCell::new(HashMap::new()),
    })
  }

  /// Drain queued events as an array of plain objects, oldest first.
  pub fn poll_events(&self) -> Result<JsValue, JsValue> {
    to_js_value(&self.events.drain())
  }

  /// Subscribe to `queries` (a JS array of SQL strings). Returns a handle
  /// for `unsubscribe`. Completion arrives as a `subscription_applied` or
  /// `subscription_error` event carrying the same handle.
  pub fn subscribe(&self, queries: Array) -> Result<u32, JsValue> {
    let queries: Vec<String> = queries.iter().filter_map(|q| q.as_string()).collect();
    let handle_id = self.next_handle.get();
    self.next_handle.set(handle_id + 1);

    let (applied, failed) = (self.events.clone(), self.events.clone());
    let handle = self
      .conn
      .subscription_builder()
      .on_applied(move |_| applied.push(json!({ "type": "subscription_applied", "handle": handle_id })))
      .on_error(move |_, error| {
        failed.push(json!({ "type": "subscription_error", "handle": handle_id, "error": error }))
      })
      .subscribe(queries)
      .map_err(to_js)?;
    self.subscriptions.borrow_mut().insert(handle_id, handle);
    Ok(handle_id)
  }

  /// End a subscription. A `subscription_ended` event follows once the
  /// server confirms.
  pub fn unsubscribe(&self, handle_id: u32) -> Result<(), JsValue> {
    let handle = self
      .subscriptions
      .borrow_mut()
      .remove(&handle_id)
      .ok_or_else(|| JsValue::from_str(&format!("unknown subscription handle {handle_id}")))?;
    let ended = self.events.clone();
    handle
      .unsubscribe_then(move |_| ended.push(json!({ "type": "subscription_ended", "handle": handle_id })))
      .map_err(to_js)
  }

  /// Call a reducer. `args_json` is an object keyed by parameter name or a
  /// positional array.
  pub fn call_reducer(&self, name: &str, args_json: &str) -> Result<(), JsValue> {
    let module = self.conn.module();
    let reducer = module
      .reducer(name)
      .ok_or_else(|| to_js(SyncError::UnknownReducer(name.to_string())))?;
    let json: JsonValue = serde_json::from_str(args_json).map_err(|e| JsValue::from_str(&e.to_string()))?;
    let args = json_to_row(&reducer.params, &json, module.typespace()).map_err(to_js)?;
    self.conn.call_reducer(name, &args).map_err(to_js)
  }

  /// Cached rows of `table` as plain objects.
  pub fn rows(&self, table: &str) -> Result<JsValue, JsValue> {
    let module = self.conn.module();
    let def = module
      .table(table)
      .ok_or_else(|| to_js(SyncError::UnknownTable(table.to_string())))?;
    let rows = self
      .conn
      .table(table)
      .map_err(to_js)?
      .rows()
      .iter()
      .map(|row| row_to_json(&def.row_type, row, module.typespace()))
      .collect::<shared::Result<Vec<_>>>()
      .map_err(to_js)?;
    to_js_value(&rows)
  }

  pub fn count(&self, table: &str) -> Result<usize, JsValue> {
    Ok(self.conn.table(table).map_err(to_js)?.count())
  }

  /// Hex identity, once the server has sent it.
  pub fn identity(&self) -> Option<String> {
    self.conn.identity().map(|id| id.to_hex())
  }

  pub fn token(&self) -> Option<String> {
    self.conn.token()
  }

  pub fn is_active(&self) -> bool {
    self.conn.is_active()
  }

  /// Close the socket. A `disconnect` event follows.
  pub fn disconnect(&self) -> Result<(), JsValue> {
    if self.conn.disconnect().is_err() {
      // The drain task is gone; close the socket directly.
      self.socket.close()?;
    }
    Ok(())
  }
}

// ─── Socket driver ───────────────────────────────────────────────────────────

fn open_socket(transport: Transport) -> Result<WebSocket, JsValue> {
  let Transport {
    request,
    events,
    outgoing,
  } = transport;
  let ws = WebSocket::new_with_str(&request.url, request.protocol)?;
  ws.set_binary_type(BinaryType::Arraybuffer);
  let outgoing = Rc::new(RefCell::new(Some(outgoing)));

  // ── onopen: report, then start writing queued messages ─────────────────
  {
    let events = events.clone();
    let ws_clone = ws.clone();
    let on_open = Closure::<dyn FnMut(_)>::new(move |_: web_sys::Event| {
      let _ = events.send(SocketEvent::Open);
      if let Some(rx) = outgoing.borrow_mut().take() {
        spawn_local(drain_outgoing(ws_clone.clone(), rx));
      }
    });
    ws.set_onopen(Some(on_open.as_ref().unchecked_ref()));
    on_open.forget();
  }

  // ── onmessage: binary frames into the pump ─────────────────────────────
  {
    let events = events.clone();
    let on_message = Closure::<dyn FnMut(_)>::new(move |ev: MessageEvent| {
      let data = ev.data();
      if let Some(buffer) = data.dyn_ref::<js_sys::ArrayBuffer>() {
        let bytes = Uint8Array::new(buffer).to_vec();
        let _ = events.send(SocketEvent::Frame(bytes.into()));
      } else {
        warn!("ignoring non-binary WebSocket message");
      }
    });
    ws.set_onmessage(Some(on_message.as_ref().unchecked_ref()));
    on_message.forget();
  }

  // ── onerror ────────────────────────────────────────────────────────────
  {
    let events = events.clone();
    let on_error = Closure::<dyn FnMut(_)>::new(move |ev: web_sys::Event| {
      let _ = events.send(SocketEvent::Error(format!("WebSocket error ({})", ev.type_())));
    });
    ws.set_onerror(Some(on_error.as_ref().unchecked_ref()));
    on_error.forget();
  }

  // ── onclose ────────────────────────────────────────────────────────────
  {
    let on_close = Closure::<dyn FnMut(_)>::new(move |ev: CloseEvent| {
      let reason = ev.reason();
      let _ = events.send(SocketEvent::Close((!reason.is_empty()).then_some(reason)));
    });
    ws.set_onclose(Some(on_close.as_ref().unchecked_ref()));
    on_close.forget();
  }

  Ok(ws)
}

async fn drain_outgoing(ws: WebSocket, mut outgoing: UnboundedReceiver<Outbound>) {
  while let Some(message) = outgoing.recv().await {
    match message {
      Outbound::Message(bytes) => {
        if let Err(e) = ws.send_with_u8_array(&bytes) {
          warn!(error = ?e, "failed to send WebSocket message");
        }
      }
      Outbound::Close => {
        let _ = ws.close();
        break;
      }
    }
  }
}

fn to_js(e: SyncError) -> JsValue {
  JsValue::from_str(&e.to_string())
}

fn to_js_value<T: Serialize>(value: &T) -> Result<JsValue, JsValue> {
  value
    .serialize(&serde_wasm_bindgen::Serializer::json_compatible())
    .map_err(JsValue::from)
}
