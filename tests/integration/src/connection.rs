#![cfg(test)]
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use shared::SyncError;
use spacesync_sdk::connection::SocketEvent;
use spacesync_sdk::protocol::{Algorithm, Decompressor, GzipDecompressor};

use crate::fixtures::*;
use crate::harness::{gzip_frame, plain_frame, Harness, Log};

/// Gzip, but the first call takes much longer than the rest.
struct SlowFirstGzip {
  calls: std::sync::atomic::AtomicUsize,
}

#[async_trait]
impl Decompressor for SlowFirstGzip {
  async fn decompress(&self, algorithm: Algorithm, data: &[u8]) -> shared::Result<Vec<u8>> {
    if self.calls.fetch_add(1, std::sync::atomic::Ordering::SeqCst) == 0 {
      tokio::time::sleep(Duration::from_millis(50)).await;
    }
    GzipDecompressor.decompress(algorithm, data).await
  }
}

#[tokio::test]
async fn identity_token_without_configured_token_is_stored() {
  let harness = Harness::new();
  let log = Log::default();
  let sink = log.clone();
  harness
    .conn
    .on_connect(move |conn, identity, token| {
      assert_eq!(conn.identity(), Some(identity));
      sink.push(format!("connect {} {token}", identity.short_hex()));
    });

  harness.deliver(&identity_token(0xabcdef, "issued", 12)).await;

  assert_eq!(harness.conn.token().as_deref(), Some("issued"));
  assert_eq!(harness.conn.connection_id().value(), 12);
  assert_eq!(log.entries(), vec![format!("connect {} issued", identity(0xabcdef).short_hex())]);
}

#[tokio::test]
async fn configured_token_survives_handshake() {
  let harness = Harness::with_token("saved");
  assert_eq!(harness.transport.request.token.as_deref(), Some("saved"));
  assert!(harness.transport.request.url.contains("token=saved"));

  harness.deliver(&identity_token(1, "fresh", 2)).await;
  assert_eq!(harness.conn.token().as_deref(), Some("saved"));
}

#[tokio::test]
async fn frames_apply_in_arrival_order_despite_slow_decompression() {
  let mut harness = Harness::with_decompressor(Arc::new(SlowFirstGzip {
    calls: Default::default(),
  }));
  let log = Log::default();
  let sink = log.clone();
  harness.conn.table("message").unwrap().on_insert(move |_, row| {
    sink.push(format!("{:?}", row.elements[2]));
  });
  harness.conn.subscription_builder().subscribe(["SELECT * FROM message"]).unwrap();

  harness.queue(SocketEvent::Open);
  // Slow gzip frame, then a plain one, then a fast gzip one.
  harness.queue_frame(gzip_frame(&subscribe_applied(
    0,
    database_update(vec![table_update("message", &[message(1, 1, "first")], &[])]),
  )));
  harness.queue_frame(plain_frame(&transaction(
    "send_message",
    vec![],
    spacesync_sdk::protocol::UpdateStatus::Committed(database_update(vec![table_update(
      "message",
      &[message(1, 2, "second")],
      &[],
    )])),
  )));
  harness.queue_frame(gzip_frame(&transaction(
    "send_message",
    vec![],
    spacesync_sdk::protocol::UpdateStatus::Committed(database_update(vec![table_update(
      "message",
      &[message(1, 3, "third")],
      &[],
    )])),
  )));
  harness.close_and_drain().await;

  assert_eq!(
    log.entries(),
    vec!["String(\"first\")", "String(\"second\")", "String(\"third\")"]
  );
}

#[tokio::test]
async fn brotli_frame_is_rejected_and_later_frames_still_apply() {
  let mut harness = Harness::new();

  let err = harness.pump().process_frame(&[1, 0xde, 0xad]).await.unwrap_err();
  assert!(matches!(err, SyncError::UnsupportedCompression(_)));
  let err = harness.pump().process_frame(&[7]).await.unwrap_err();
  assert!(matches!(err, SyncError::UnexpectedCompressionTag(7)));
  let err = harness.pump().process_frame(&[]).await.unwrap_err();
  assert!(err.is_codec());

  harness.conn.subscription_builder().subscribe(["SELECT * FROM user"]).unwrap();
  harness.queue_frame(vec![1, 2, 3]);
  harness.queue_frame(plain_frame(&subscribe_applied(
    0,
    database_update(vec![table_update("user", &[user(5, None, true)], &[])]),
  )));
  harness.close_and_drain().await;

  assert_eq!(harness.conn.table("user").unwrap().count(), 1);
}

#[tokio::test]
async fn socket_lifecycle_reaches_callbacks() {
  let mut harness = Harness::new();
  let log = Log::default();
  let sink = log.clone();
  harness.conn.on_connect_error(move |_, error| sink.push(format!("error {error}")));
  let sink = log.clone();
  harness
    .conn
    .on_disconnect(move |conn, reason| sink.push(format!("closed {reason:?} active={}", conn.is_active())));

  harness.queue(SocketEvent::Open);
  harness.queue(SocketEvent::Error("reset by peer".into()));
  harness.close_and_drain().await;

  assert_eq!(log.entries(), vec!["error reset by peer", "closed None active=false"]);
  assert!(!harness.conn.is_active());
}

#[tokio::test]
async fn disconnect_and_outbound_order() {
  let mut harness = Harness::new();
  harness.conn.call_reducer_raw("set_name", set_name_args("a")).unwrap();
  harness.conn.call(&SetName { name: "b".into() }).unwrap();
  harness.conn.disconnect().unwrap();

  let names: Vec<_> = harness
    .sent()
    .into_iter()
    .map(|m| match m {
      spacesync_sdk::protocol::ClientMessage::CallReducer { args, .. } => args,
      other => panic!("unexpected {other:?}"),
    })
    .collect();
  assert_eq!(names, vec![set_name_args("a"), set_name_args("b")]);
}
