#![cfg(test)]
use std::sync::{Arc, Mutex};

use shared::algebraic::{AlgebraicValue, IntoValue};
use shared::types::{TimeDuration, Timestamp};
use spacesync_sdk::event::{Event, ReducerStatus};
use spacesync_sdk::protocol::{ProcedureResult, ProcedureStatus, ServerMessage, UpdateStatus};
use spacesync_sdk::{CallbackId, TableRow};

use crate::fixtures::*;
use crate::harness::{Harness, Log};

async fn subscribed_with(harness: &Harness, users: &[Vec<u8>]) {
  harness.conn.subscription_builder().subscribe(["SELECT * FROM *"]).unwrap();
  harness
    .deliver(&subscribe_applied(0, database_update(vec![table_update("user", users, &[])])))
    .await;
}

#[tokio::test]
async fn committed_reducer_fires_rows_then_reducer_callbacks() {
  let harness = Harness::new();
  subscribed_with(&harness, &[user(1, Some("old"), true)]).await;
  let log = Log::default();

  let sink = log.clone();
  harness.conn.table("user").unwrap().on_update(move |ctx, old, new| {
    let (old, new) = (User::from_row(old).unwrap(), User::from_row(new).unwrap());
    assert!(matches!(ctx.event, Event::Reducer(_)));
    sink.push(format!("update {:?} -> {:?}", old.name, new.name));
  });
  let sink = log.clone();
  harness
    .conn
    .on_reducer("set_name", move |ctx, event| {
      // Rows are already in the cache when reducer callbacks run.
      let current = ctx.table("user").unwrap().typed_rows::<User>().unwrap();
      let args: SetName = event.args_as().unwrap();
      sink.push(format!(
        "reducer {} {:?} {:?} energy={} cache={:?}",
        event.reducer_name,
        event.status,
        args.name,
        event.energy_consumed,
        current[0].name
      ));
      assert_eq!(event.caller_identity, identity(1));
      assert_eq!(event.caller_connection_id.map(|c| c.value()), Some(77));
    })
    .unwrap();

  let update = database_update(vec![table_update(
    "user",
    &[user(1, Some("new"), true)],
    &[user(1, Some("old"), true)],
  )]);
  harness
    .deliver(&transaction("set_name", set_name_args("new"), UpdateStatus::Committed(update)))
    .await;

  assert_eq!(
    log.entries(),
    vec![
      "update Some(\"old\") -> Some(\"new\")".to_string(),
      "reducer set_name Committed \"new\" energy=1000 cache=Some(\"new\")".to_string(),
    ]
  );
}

#[tokio::test]
async fn failed_reducer_reports_status_without_row_changes() {
  let harness = Harness::new();
  subscribed_with(&harness, &[user(1, None, true)]).await;
  let statuses = Arc::new(Mutex::new(Vec::new()));
  let sink = statuses.clone();
  harness
    .conn
    .on_reducer("set_name", move |_, event| sink.lock().unwrap().push(event.status.clone()))
    .unwrap();

  harness
    .deliver(&transaction(
      "set_name",
      set_name_args(""),
      UpdateStatus::Failed("names must not be empty".into()),
    ))
    .await;
  harness
    .deliver(&transaction("set_name", set_name_args("x"), UpdateStatus::OutOfEnergy))
    .await;

  assert_eq!(
    *statuses.lock().unwrap(),
    vec![
      ReducerStatus::Failed("names must not be empty".into()),
      ReducerStatus::OutOfEnergy
    ]
  );
  assert_eq!(harness.conn.table("user").unwrap().count(), 1);
}

#[tokio::test]
async fn unattributable_transactions_still_apply_rows() {
  let harness = Harness::new();
  subscribed_with(&harness, &[]).await;
  let events = Arc::new(Mutex::new(Vec::new()));
  let sink = events.clone();
  harness
    .conn
    .table("message")
    .unwrap()
    .on_insert(move |ctx, _| sink.lock().unwrap().push(ctx.event.clone()));

  let rows = |text: &str| {
    UpdateStatus::Committed(database_update(vec![table_update("message", &[message(1, 5, text)], &[])]))
  };
  harness.deliver(&transaction("", vec![], rows("a"))).await;
  harness.deliver(&transaction("not_in_module", vec![], rows("b"))).await;
  harness.deliver(&transaction("send_message", vec![0xff], rows("c"))).await;
  harness
    .deliver(&ServerMessage::TransactionUpdateLight {
      request_id: 0,
      update: database_update(vec![table_update("message", &[message(1, 6, "d")], &[])]),
    })
    .await;
  // No reducer at all: logged and dropped.
  harness.deliver(&transaction("<none>", vec![], rows("e"))).await;

  assert_eq!(*events.lock().unwrap(), vec![Event::UnknownTransaction; 4]);
  assert_eq!(harness.conn.table("message").unwrap().count(), 4);
}

#[tokio::test]
async fn unkeyed_duplicates_are_reference_counted() {
  let harness = Harness::new();
  subscribed_with(&harness, &[]).await;
  let log = Log::default();
  let sink = log.clone();
  harness.conn.table("message").unwrap().on_insert(move |_, _| sink.push("insert"));
  let sink = log.clone();
  harness.conn.table("message").unwrap().on_delete(move |_, _| sink.push("delete"));

  let hello = message(3, 10, "hello");
  let tx = |inserts: &[Vec<u8>], deletes: &[Vec<u8>]| {
    transaction(
      "send_message",
      vec![],
      UpdateStatus::Committed(database_update(vec![table_update("message", inserts, deletes)])),
    )
  };
  harness.deliver(&tx(&[hello.clone(), hello.clone()], &[])).await;
  assert_eq!(harness.conn.table("message").unwrap().count(), 1);
  harness.deliver(&tx(&[], &[hello.clone()])).await;
  assert_eq!(harness.conn.table("message").unwrap().count(), 1);
  harness.deliver(&tx(&[], &[hello.clone()])).await;
  assert_eq!(harness.conn.table("message").unwrap().count(), 0);

  assert_eq!(log.entries(), vec!["insert", "delete"]);
}

#[tokio::test]
async fn initial_subscription_applies_without_routing() {
  let harness = Harness::new();
  harness
    .deliver(&ServerMessage::InitialSubscription {
      database_update: database_update(vec![
        table_update("user", &[user(1, None, false), user(2, None, true)], &[]),
        table_update("unknown_table", &[vec![1, 2, 3]], &[]),
      ]),
      request_id: 0,
      total_host_execution_duration: TimeDuration::from_micros(5),
    })
    .await;

  let user_table = harness.conn.table("user").unwrap();
  assert_eq!(user_table.count(), 2);
  let found = user_table.find("identity", &[identity(2).into_value()]).unwrap();
  assert_eq!(found.map(|row| row.elements[2].clone()), Some(AlgebraicValue::Bool(true)));
}

#[tokio::test]
async fn callbacks_may_mutate_registrations_while_dispatching() {
  let harness = Harness::new();
  subscribed_with(&harness, &[]).await;
  let log = Log::default();
  let own_id: Arc<Mutex<Option<CallbackId>>> = Arc::default();

  let sink = log.clone();
  let id_slot = own_id.clone();
  let id = harness.conn.table("user").unwrap().on_insert(move |ctx, _| {
    sink.push("once");
    if let Some(id) = id_slot.lock().unwrap().take() {
      assert!(ctx.table("user").unwrap().remove_on_insert(id));
    }
    // Reading the cache from inside a callback does not deadlock.
    let _ = ctx.table("user").unwrap().count();
  });
  *own_id.lock().unwrap() = Some(id);

  let tx = |id: u128| {
    transaction(
      "set_name",
      set_name_args("x"),
      UpdateStatus::Committed(database_update(vec![table_update("user", &[user(id, None, true)], &[])])),
    )
  };
  harness.deliver(&tx(10)).await;
  harness.deliver(&tx(11)).await;

  assert_eq!(log.entries(), vec!["once"]);
}

#[tokio::test]
async fn procedure_results_reach_observers() {
  let harness = Harness::new();
  let seen = Arc::new(Mutex::new(Vec::new()));
  let sink = seen.clone();
  harness
    .conn
    .on_procedure_result(move |_, result| sink.lock().unwrap().push(result.clone()));

  let result = ProcedureResult {
    status: ProcedureStatus::Returned(vec![1, 2]),
    timestamp: Timestamp::from_micros(9),
    total_host_execution_duration: TimeDuration::from_micros(1),
    request_id: 0,
  };
  harness.deliver(&ServerMessage::ProcedureResult(result.clone())).await;

  assert_eq!(*seen.lock().unwrap(), vec![result]);
}
