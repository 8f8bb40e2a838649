pub mod types;

pub use types::SyncError;

/// Shorthand Result type used throughout spacesync.
pub type Result<T> = std::result::Result<T, SyncError>;
