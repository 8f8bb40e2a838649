#![cfg(test)]
use shared::SyncError;
use spacesync_sdk::event::Event;
use spacesync_sdk::protocol::{ClientMessage, QueryId};
use spacesync_sdk::TableRow;

use crate::fixtures::*;
use crate::harness::{Harness, Log};

#[tokio::test]
async fn subscription_lifecycle() {
  let mut harness = Harness::new();
  let log = Log::default();

  let sink = log.clone();
  harness.conn.table("user").unwrap().on_insert(move |ctx, row| {
    let user = User::from_row(row).unwrap();
    sink.push(format!("insert {:?} during {:?}", user.name, ctx.event));
  });
  let sink = log.clone();
  harness.conn.table("user").unwrap().on_delete(move |ctx, _| {
    sink.push(format!("delete during {:?}", ctx.event));
  });

  let sink = log.clone();
  let handle = harness
    .conn
    .subscription_builder()
    .on_applied(move |_| sink.push("applied"))
    .subscribe(["SELECT * FROM user WHERE online = true"])
    .unwrap();
  assert_eq!(handle.query_id(), QueryId(0));
  assert!(!handle.is_active());
  assert_eq!(
    harness.sent(),
    vec![ClientMessage::SubscribeMulti {
      query_strings: vec!["SELECT * FROM user WHERE online = true".into()],
      request_id: 0,
      query_id: QueryId(0),
    }]
  );

  let rows = [user(1, Some("ada"), true)];
  harness
    .deliver(&subscribe_applied(0, database_update(vec![table_update("user", &rows, &[])])))
    .await;
  assert!(handle.is_active());
  assert_eq!(
    harness.conn.table("user").unwrap().typed_rows::<User>().unwrap(),
    vec![User {
      identity: identity(1),
      name: Some("ada".into()),
      online: true,
    }]
  );

  let sink = log.clone();
  handle.unsubscribe_then(move |_| sink.push("ended")).unwrap();
  assert!(matches!(handle.unsubscribe(), Err(SyncError::AlreadyUnsubscribed)));
  assert_eq!(
    harness.sent(),
    vec![ClientMessage::UnsubscribeMulti {
      request_id: 0,
      query_id: QueryId(0),
    }]
  );

  harness
    .deliver(&unsubscribe_applied(0, database_update(vec![table_update("user", &[], &rows)])))
    .await;
  assert!(handle.is_ended());
  assert!(!handle.is_active());
  assert!(matches!(handle.unsubscribe(), Err(SyncError::AlreadyEnded)));
  assert_eq!(harness.conn.table("user").unwrap().count(), 0);

  assert_eq!(
    log.entries(),
    vec![
      "insert Some(\"ada\") during SubscribeApplied".to_string(),
      "applied".to_string(),
      "delete during UnsubscribeApplied".to_string(),
      "ended".to_string(),
    ]
  );
}

#[tokio::test]
async fn overlapping_subscriptions_share_rows() {
  let harness = Harness::new();
  let log = Log::default();
  let sink = log.clone();
  harness.conn.table("user").unwrap().on_insert(move |_, _| sink.push("insert"));
  let sink = log.clone();
  harness.conn.table("user").unwrap().on_delete(move |_, _| sink.push("delete"));

  let first = harness.conn.subscription_builder().subscribe(["SELECT * FROM user"]).unwrap();
  let second = harness
    .conn
    .subscription_builder()
    .subscribe(["SELECT * FROM user WHERE online = true"])
    .unwrap();
  let row = [user(9, None, true)];

  harness
    .deliver(&subscribe_applied(0, database_update(vec![table_update("user", &row, &[])])))
    .await;
  harness
    .deliver(&subscribe_applied(1, database_update(vec![table_update("user", &row, &[])])))
    .await;
  assert_eq!(harness.conn.table("user").unwrap().count(), 1);

  first.unsubscribe().unwrap();
  harness
    .deliver(&unsubscribe_applied(0, database_update(vec![table_update("user", &[], &row)])))
    .await;
  assert_eq!(harness.conn.table("user").unwrap().count(), 1);

  second.unsubscribe().unwrap();
  harness
    .deliver(&unsubscribe_applied(1, database_update(vec![table_update("user", &[], &row)])))
    .await;
  assert_eq!(harness.conn.table("user").unwrap().count(), 0);
  assert_eq!(log.entries(), vec!["insert", "delete"]);
}

#[tokio::test]
async fn applied_for_unknown_query_id_changes_nothing() {
  let harness = Harness::new();
  let handle = harness.conn.subscription_builder().subscribe(["SELECT * FROM user"]).unwrap();

  harness
    .deliver(&subscribe_applied(
      42,
      database_update(vec![table_update("user", &[user(1, None, false)], &[])]),
    ))
    .await;

  assert!(!handle.is_active());
  assert_eq!(harness.conn.table("user").unwrap().count(), 0);
}

#[tokio::test]
async fn targeted_error_ends_only_that_subscription() {
  let harness = Harness::new();
  let log = Log::default();
  let sink = log.clone();
  let bad = harness
    .conn
    .subscription_builder()
    .on_error(move |ctx, error| {
      assert_eq!(ctx.event, Event::SubscribeError(error.to_string()));
      sink.push(format!("bad: {error}"));
    })
    .subscribe(["SELECT * FROM nope"])
    .unwrap();
  let good = harness.conn.subscription_builder().subscribe(["SELECT * FROM user"]).unwrap();

  harness.deliver(&subscription_error(Some(0), "no such table: nope")).await;

  assert!(bad.is_ended());
  assert!(!good.is_ended());
  assert_eq!(log.entries(), vec!["bad: no such table: nope"]);
  assert!(matches!(bad.unsubscribe(), Err(SyncError::AlreadyEnded)));
}

#[tokio::test]
async fn error_without_query_id_ends_every_subscription() {
  let harness = Harness::new();
  let log = Log::default();
  let handles: Vec<_> = (0..2)
    .map(|i| {
      let sink = log.clone();
      harness
        .conn
        .subscription_builder()
        .on_error(move |_, error| sink.push(format!("{i}: {error}")))
        .subscribe([format!("SELECT * FROM user WHERE id = {i}")])
        .unwrap()
    })
    .collect();

  harness.deliver(&subscription_error(None, "module updated")).await;

  assert!(handles.iter().all(|h| h.is_ended()));
  assert_eq!(log.entries(), vec!["0: module updated", "1: module updated"]);

  // Everything was dropped, so the next subscription may switch modes.
  harness.conn.subscription_builder().subscribe_to_all_tables().unwrap();
}

#[tokio::test]
async fn subscribe_to_all_tables_excludes_targeted_queries() {
  let harness = Harness::new();
  let all = harness.conn.subscription_builder().subscribe_to_all_tables().unwrap();
  assert_eq!(all.queries(), ["SELECT * FROM *".to_string()]);
  assert!(matches!(
    harness.conn.subscription_builder().subscribe(["SELECT * FROM user"]),
    Err(SyncError::MixedSubscriptionModes)
  ));
  assert!(matches!(
    harness.conn.subscription_builder().subscribe(Vec::<String>::new()),
    Err(SyncError::EmptyQuerySet)
  ));
}
