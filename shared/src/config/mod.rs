pub mod loader;

pub use loader::{Compression, ConnectionConfig, LoggingConfig, SyncConfig};

use std::path::Path;

use crate::error::{Result, SyncError};

/// Load configuration from TOML files with environment-variable overrides.
///
/// Resolution order:
/// 1. `config/default.toml` (base configuration)
/// 2. `config/{env}.toml` (optional environment overlay)
/// 3. Environment variables with prefix `SPACESYNC_` (double underscore for nesting)
///
/// # Example
///
/// `SPACESYNC_CONNECTION__TOKEN=eyJ...` overrides `connection.token`.
pub fn load_config(config_dir: &Path, env: &str) -> Result<SyncConfig> {
    let settings = config::Config::builder()
        .add_source(config::File::from(config_dir.join("default.toml")).required(true))
        .add_source(config::File::from(config_dir.join(format!("{}.toml", env))).required(false))
        .add_source(
            config::Environment::with_prefix("SPACESYNC")
                .separator("__")
                .try_parsing(true),
        )
        .build()
        .map_err(|e| SyncError::ConfigLoadFailed(Box::new(e)))?;

    let cfg: SyncConfig = settings
        .try_deserialize()
        .map_err(|e| SyncError::ConfigLoadFailed(Box::new(e)))?;
    cfg.connection.validate()?;
    Ok(cfg)
}
