//! Queue of JSON events drained by JavaScript through `poll_events()`.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, PoisonError};

use serde_json::{json, Value as JsonValue};
use shared::algebraic::ProductValue;
use spacesync_sdk::event::{Event, EventContext, ReducerStatus};
use spacesync_sdk::schema::TableDef;
use spacesync_sdk::DbConnection;
use tracing::{debug, warn};

use crate::json::row_to_json;

/// Events waiting for the next poll, oldest first.
#[derive(Debug, Clone, Default)]
pub struct EventQueue {
  events: Arc<Mutex<VecDeque<JsonValue>>>,
}

impl EventQueue {
  pub fn push(&self, event: JsonValue) {
    self.events.lock().unwrap_or_else(PoisonError::into_inner).push_back(event);
  }

  pub fn drain(&self) -> Vec<JsonValue> {
    self
      .events
      .lock()
      .unwrap_or_else(PoisonError::into_inner)
      .drain(..)
      .collect()
  }

  pub fn len(&self) -> usize {
    self.events.lock().unwrap_or_else(PoisonError::into_inner).len()
  }

  pub fn is_empty(&self) -> bool {
    self.len() == 0
  }
}

/// Forward connection, row and reducer callbacks into `queue`.
pub fn forward_events(conn: &DbConnection, queue: &EventQueue) {
  let q = queue.clone();
  conn.on_connect(move |_, identity, token| {
    q.push(json!({ "type": "connect", "identity": identity.to_hex(), "token": token }));
  });
  let q = queue.clone();
  conn.on_disconnect(move |_, reason| {
    q.push(json!({ "type": "disconnect", "reason": reason }));
  });
  let q = queue.clone();
  conn.on_connect_error(move |_, error| {
    q.push(json!({ "type": "connect_error", "error": error }));
  });

  for table in conn.module().tables() {
    forward_table(conn, table, queue);
  }

  for reducer in conn.module().reducers() {
    let q = queue.clone();
    let params = reducer.params.clone();
    let registered = conn.on_reducer(&reducer.name, move |ctx, event| {
      let args = row_to_json(&params, &event.args, ctx.module().typespace()).unwrap_or(JsonValue::Null);
      q.push(json!({
        "type": "reducer",
        "reducer": event.reducer_name,
        "status": status_json(&event.status),
        "caller": event.caller_identity.to_hex(),
        "timestamp": event.timestamp.micros(),
        "args": args,
      }));
    });
    if let Err(e) = registered {
      warn!(reducer = %reducer.name, error = %e, "Failed to forward reducer events");
    }
  }
}

fn forward_table(conn: &DbConnection, table: &TableDef, queue: &EventQueue) {
  let Ok(handle) = conn.table(&table.name) else {
    return;
  };
  let (q, def) = (queue.clone(), table.clone());
  handle.on_insert(move |ctx, row| q.push(row_event("insert", ctx, &def, row)));
  let (q, def) = (queue.clone(), table.clone());
  handle.on_delete(move |ctx, row| q.push(row_event("delete", ctx, &def, row)));
  let (q, def) = (queue.clone(), table.clone());
  handle.on_update(move |ctx, old, new| {
    let ts = ctx.module().typespace();
    q.push(json!({
      "type": "update",
      "table": def.name,
      "event": event_json(&ctx.event),
      "old": row_to_json(&def.row_type, old, ts).unwrap_or(JsonValue::Null),
      "row": row_to_json(&def.row_type, new, ts).unwrap_or(JsonValue::Null),
    }));
  });
  debug!(table = %table.name, "forwarding row events");
}

fn row_event(kind: &str, ctx: &EventContext, def: &TableDef, row: &ProductValue) -> JsonValue {
  let row = row_to_json(&def.row_type, row, ctx.module().typespace()).unwrap_or_else(|e| {
    warn!(table = %def.name, error = %e, "Failed to convert row to JSON");
    JsonValue::Null
  });
  json!({ "type": kind, "table": def.name, "event": event_json(&ctx.event), "row": row })
}

/// Short description of what caused a callback.
pub fn event_json(event: &Event) -> JsonValue {
  match event {
    Event::Reducer(reducer) => json!({ "kind": "reducer", "reducer": reducer.reducer_name }),
    Event::SubscribeApplied => json!({ "kind": "subscribe_applied" }),
    Event::UnsubscribeApplied => json!({ "kind": "unsubscribe_applied" }),
    Event::SubscribeError(error) => json!({ "kind": "subscribe_error", "error": error }),
    Event::UnknownTransaction => json!({ "kind": "unknown_transaction" }),
  }
}

fn status_json(status: &ReducerStatus) -> JsonValue {
  match status {
    ReducerStatus::Committed => json!("committed"),
    ReducerStatus::Failed(message) => json!({ "failed": message }),
    ReducerStatus::OutOfEnergy => json!("out_of_energy"),
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn drain_empties_in_order() {
    let queue = EventQueue::default();
    queue.push(json!(1));
    queue.clone().push(json!(2));
    assert_eq!(queue.len(), 2);
    assert_eq!(queue.drain(), vec![json!(1), json!(2)]);
    assert!(queue.is_empty());
  }

  #[test]
  fn events_describe_their_cause() {
    assert_eq!(event_json(&Event::SubscribeApplied), json!({ "kind": "subscribe_applied" }));
    assert_eq!(
      event_json(&Event::SubscribeError("bad query".into())),
      json!({ "kind": "subscribe_error", "error": "bad query" })
    );
    assert_eq!(status_json(&ReducerStatus::Failed("x".into())), json!({ "failed": "x" }));
  }
}
