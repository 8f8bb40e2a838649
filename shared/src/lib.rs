//! Building blocks shared by every spacesync crate: the schema-driven binary
//! codec, the special scalar types, the error taxonomy, configuration loading
//! and logging setup.

pub mod algebraic;
pub mod config;
pub mod error;
pub mod logging;
pub mod serialize;
pub mod types;

pub use error::{Result, SyncError};
