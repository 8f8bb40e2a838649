//! WebSocket URL for the subscribe endpoint.

use shared::config::ConnectionConfig;
use shared::types::ConnectionId;
use shared::Result;

/// `{ws-uri}/v1/database/{module}/subscribe?connection_id=..&compression=..`
///
/// `http` becomes `ws` and `https` becomes `wss`; `ws`/`wss` are kept.
pub fn connect_url(config: &ConnectionConfig, connection_id: ConnectionId) -> Result<String> {
  config.validate()?;

  let uri = config.uri.trim().trim_end_matches('/');
  let base = if let Some(rest) = uri.strip_prefix("https://") {
    format!("wss://{rest}")
  } else if let Some(rest) = uri.strip_prefix("http://") {
    format!("ws://{rest}")
  } else {
    uri.to_string()
  };

  let mut url = format!(
    "{base}/v1/database/{}/subscribe?connection_id={}&compression={}",
    encode_component(config.module_name.trim()),
    connection_id.to_hex(),
    config.compression.as_query_param(),
  );
  if let Some(token) = config.token.as_deref().filter(|t| !t.is_empty()) {
    url.push_str("&token=");
    url.push_str(&encode_component(token));
  }
  if config.light_mode {
    url.push_str("&light=true");
  }
  if let Some(confirmed) = config.confirmed_reads {
    url.push_str(&format!("&confirmed={confirmed}"));
  }
  Ok(url)
}

/// Percent-encode everything outside the RFC 3986 unreserved set.
fn encode_component(s: &str) -> String {
  let mut out = String::with_capacity(s.len());
  for byte in s.bytes() {
    match byte {
      b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' => out.push(byte as char),
      _ => out.push_str(&format!("%{byte:02X}")),
    }
  }
  out
}

#[cfg(test)]
mod tests {
  use super::*;
  use shared::config::Compression;

  #[test]
  fn http_becomes_ws_with_defaults() {
    let config = ConnectionConfig::new("http://localhost:3000/", "chat");
    let url = connect_url(&config, ConnectionId::new(1)).unwrap();
    assert_eq!(
      url,
      "ws://localhost:3000/v1/database/chat/subscribe?connection_id=00000000000000000000000000000001&compression=Gzip"
    );
  }

  #[test]
  fn optional_parameters() {
    let mut config = ConnectionConfig::new("https://example.com", "chat");
    config.token = Some("a b".into());
    config.compression = Compression::None;
    config.light_mode = true;
    config.confirmed_reads = Some(false);
    let url = connect_url(&config, ConnectionId::ZERO).unwrap();
    assert!(url.starts_with("wss://example.com/v1/database/chat/subscribe?"));
    assert!(url.contains("&compression=None"));
    assert!(url.contains("&token=a%20b"));
    assert!(url.ends_with("&light=true&confirmed=false"));
  }

  #[test]
  fn invalid_config_is_rejected() {
    let config = ConnectionConfig::new("ftp://example.com", "chat");
    assert!(connect_url(&config, ConnectionId::ZERO).is_err());
  }
}
