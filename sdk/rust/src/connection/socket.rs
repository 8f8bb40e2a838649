//! Channel pair between the sync engine and whatever drives the real socket.
//!
//! The engine never owns a socket object. A transport driver (a browser
//! WebSocket, a native client, a test harness) takes the `Transport` half,
//! opens the connection described by its `ConnectRequest`, forwards socket
//! events into `events`, and writes everything from `outgoing` once open.
//! Sends issued before the socket opens wait in `outgoing`.

use bytes::Bytes;
use tokio::sync::mpsc;

/// What the transport driver should open.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectRequest {
  pub url: String,
  /// WebSocket sub-protocol.
  pub protocol: &'static str,
  /// Bearer token, for drivers that can set an `Authorization` header.
  pub token: Option<String>,
}

/// Socket activity reported by the transport driver, in arrival order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SocketEvent {
  Open,
  /// One binary message, still carrying its compression tag.
  Frame(Bytes),
  Error(String),
  Close(Option<String>),
}

/// Requests from the engine to the transport driver.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outbound {
  /// One encoded client message.
  Message(Vec<u8>),
  Close,
}

/// The driver's half.
#[derive(Debug)]
pub struct Transport {
  pub request: ConnectRequest,
  pub events: mpsc::UnboundedSender<SocketEvent>,
  pub outgoing: mpsc::UnboundedReceiver<Outbound>,
}

/// The engine's half.
#[derive(Debug)]
pub(crate) struct SocketChannels {
  pub inbound: mpsc::UnboundedReceiver<SocketEvent>,
  pub outbound: mpsc::UnboundedSender<Outbound>,
}

pub(crate) fn socket_pair(request: ConnectRequest) -> (SocketChannels, Transport) {
  let (events, inbound) = mpsc::unbounded_channel();
  let (outbound, outgoing) = mpsc::unbounded_channel();
  (
    SocketChannels { inbound, outbound },
    Transport {
      request,
      events,
      outgoing,
    },
  )
}
