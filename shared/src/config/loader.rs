use serde::Deserialize;

use crate::error::{Result, SyncError};
use crate::types::ConnectionId;

/// Root configuration, as loaded by `load_config`.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct SyncConfig {
    /// Where and how to connect.
    pub connection: ConnectionConfig,
    /// Log output settings.
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Everything needed to open one connection.
///
/// Populated field by field (or deserialized) and handed to the connect
/// function as a whole.
#[derive(Debug, Clone, Deserialize)]
pub struct ConnectionConfig {
    /// Server base URI: `http`, `https`, `ws` or `wss`.
    pub uri: String,
    /// Database name or address.
    pub module_name: String,
    /// Bearer token from a previous session; the server issues one if absent.
    #[serde(default)]
    pub token: Option<String>,
    /// Compression the server should apply to outgoing frames.
    #[serde(default)]
    pub compression: Compression,
    /// Ask for transaction updates without reducer metadata.
    #[serde(default)]
    pub light_mode: bool,
    /// Ask the server to delay updates until they are durable.
    #[serde(default)]
    pub confirmed_reads: Option<bool>,
    /// Client-chosen connection id; a random one is used when absent.
    #[serde(default)]
    pub connection_id: Option<ConnectionId>,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            uri: "http://localhost:3000".into(),
            module_name: String::new(),
            token: None,
            compression: Compression::default(),
            light_mode: false,
            confirmed_reads: None,
            connection_id: None,
        }
    }
}

impl ConnectionConfig {
    pub fn new(uri: impl Into<String>, module_name: impl Into<String>) -> Self {
        Self {
            uri: uri.into(),
            module_name: module_name.into(),
            ..Self::default()
        }
    }

    /// Reject configurations that could never connect.
    pub fn validate(&self) -> Result<()> {
        if self.uri.trim().is_empty() {
            return Err(SyncError::ConfigInvalid {
                key: "uri".into(),
                reason: "URI is required".into(),
            });
        }
        let scheme_ok = ["http://", "https://", "ws://", "wss://"]
            .iter()
            .any(|scheme| self.uri.starts_with(scheme));
        if !scheme_ok {
            return Err(SyncError::ConfigInvalid {
                key: "uri".into(),
                reason: format!("unsupported scheme in '{}'", self.uri),
            });
        }
        if self.module_name.trim().is_empty() {
            return Err(SyncError::ConfigInvalid {
                key: "module_name".into(),
                reason: "database name or address is required".into(),
            });
        }
        Ok(())
    }
}

/// Server-to-client frame compression preference.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Compression {
    None,
    #[default]
    Gzip,
}

impl Compression {
    /// Value of the `compression` query parameter.
    pub fn as_query_param(&self) -> &'static str {
        match self {
            Compression::None => "None",
            Compression::Gzip => "Gzip",
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Filter directive when `RUST_LOG` is unset (e.g. `info`, `spacesync_sdk=debug`).
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

// ── Default value functions ─────────────────────────────────────────

fn default_log_level() -> String {
    "info".to_string()
}
