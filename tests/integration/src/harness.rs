//! Plays the server side of a connection over the in-memory transport.

use std::io::Write;
use std::sync::{Arc, Mutex};

use flate2::write::GzEncoder;
use shared::config::ConnectionConfig;
use shared::serialize::{Decode, Encode};
use shared::types::ConnectionId;
use spacesync_sdk::connection::{MessagePump, Outbound, SocketEvent, Transport};
use spacesync_sdk::protocol::{ClientMessage, Decompressor, GzipDecompressor, ServerMessage};
use spacesync_sdk::DbConnection;

use crate::fixtures::chat_module;

pub struct Harness {
  pub conn: DbConnection,
  pub transport: Transport,
  pump: Option<MessagePump>,
}

impl Harness {
  pub fn new() -> Self {
    Self::build(None, Arc::new(GzipDecompressor))
  }

  pub fn with_token(token: &str) -> Self {
    Self::build(Some(token.to_string()), Arc::new(GzipDecompressor))
  }

  pub fn with_decompressor(decompressor: Arc<dyn Decompressor>) -> Self {
    Self::build(None, decompressor)
  }

  fn build(token: Option<String>, decompressor: Arc<dyn Decompressor>) -> Self {
    let mut config = ConnectionConfig::new("http://localhost:3000", "quickstart-chat");
    config.token = token;
    config.connection_id = Some(ConnectionId::new(0x5eed));
    let (conn, pump, transport) =
      DbConnection::connect_with_decompressor(config, chat_module(), decompressor).expect("valid config");
    Self {
      conn,
      transport,
      pump: Some(pump),
    }
  }

  /// Direct access to the pump, for step-by-step tests.
  pub fn pump(&self) -> &MessagePump {
    self.pump.as_ref().expect("pump already running")
  }

  /// Feed one uncompressed message straight through the pump.
  pub async fn deliver(&self, message: &ServerMessage) {
    self.pump().process_frame(&plain_frame(message)).await.expect("frame processed");
  }

  pub fn queue(&self, event: SocketEvent) {
    self.transport.events.send(event).expect("pump alive");
  }

  pub fn queue_frame(&self, frame: Vec<u8>) {
    self.queue(SocketEvent::Frame(frame.into()));
  }

  /// Close the socket and run the pump over everything queued so far.
  pub async fn close_and_drain(&mut self) {
    self.queue(SocketEvent::Close(None));
    let pump = self.pump.take().expect("pump already running");
    pump.run().await;
  }

  /// Client messages sent since the last call.
  pub fn sent(&mut self) -> Vec<ClientMessage> {
    let mut sent = Vec::new();
    while let Ok(out) = self.transport.outgoing.try_recv() {
      if let Outbound::Message(bytes) = out {
        sent.push(ClientMessage::from_bytes(&bytes).expect("client message decodes"));
      }
    }
    sent
  }
}

impl Default for Harness {
  fn default() -> Self {
    Self::new()
  }
}

/// Frame with the "no compression" tag.
pub fn plain_frame(message: &ServerMessage) -> Vec<u8> {
  let mut frame = vec![0];
  frame.extend(message.to_bytes());
  frame
}

/// Frame with the gzip tag.
pub fn gzip_frame(message: &ServerMessage) -> Vec<u8> {
  let mut encoder = GzEncoder::new(Vec::new(), flate2::Compression::fast());
  encoder.write_all(&message.to_bytes()).expect("in-memory write");
  let mut frame = vec![2];
  frame.extend(encoder.finish().expect("in-memory write"));
  frame
}

/// Shared, ordered record of what callbacks saw.
#[derive(Clone, Default)]
pub struct Log(Arc<Mutex<Vec<String>>>);

impl Log {
  pub fn push(&self, entry: impl Into<String>) {
    self.0.lock().unwrap().push(entry.into());
  }

  pub fn entries(&self) -> Vec<String> {
    self.0.lock().unwrap().clone()
  }
}
