use thiserror::Error;

/// Top-level error type for the sync engine.
///
/// Variants are grouped by the subsystem that raises them. Cache consistency
/// anomalies are not represented here: they are logged and skipped, never
/// propagated.
#[derive(Debug, Error)]
pub enum SyncError {
    // ── Codec ──────────────────────────────────────────────────
    #[error("codec: read of {requested} bytes at offset {offset} exceeds buffer ({remaining} bytes remaining)")]
    BufferTooShort {
        offset: usize,
        requested: usize,
        remaining: usize,
    },

    #[error("codec: invalid UTF-8 in string at offset {offset}")]
    InvalidUtf8 { offset: usize },

    #[error("codec: invalid bool byte {byte:#04x} at offset {offset}")]
    InvalidBool { offset: usize, byte: u8 },

    #[error("codec: variant tag {tag} out of range for sum type with {variants} variants")]
    UnknownVariant { tag: u8, variants: usize },

    #[error("codec: can't deserialize an option type, couldn't find {0} tag")]
    InvalidOptionTag(u8),

    #[error("codec: expected a {expected} value, found {found}")]
    TypeMismatch {
        expected: String,
        found: String,
    },

    #[error("codec: type reference {0} does not resolve in the typespace")]
    UnresolvedRef(u32),

    #[error("codec: {consumed} of {len} bytes consumed, trailing data left")]
    TrailingBytes { consumed: usize, len: usize },

    #[error("codec: nesting deeper than {limit} levels at offset {offset}")]
    DepthLimitExceeded { offset: usize, limit: usize },

    // ── Compression ────────────────────────────────────────────
    #[error("compression: {0} compression is not supported, use gzip or none")]
    UnsupportedCompression(String),

    #[error("compression: unexpected compression tag {0}")]
    UnexpectedCompressionTag(u8),

    #[error("compression: failed to decompress payload")]
    DecompressFailed(#[source] std::io::Error),

    // ── Protocol ───────────────────────────────────────────────
    #[error("protocol: unexpected server message: {0}")]
    UnexpectedMessage(String),

    #[error("protocol: table '{0}' is not defined in the module")]
    UnknownTable(String),

    #[error("protocol: reducer '{0}' is not defined in the module")]
    UnknownReducer(String),

    #[error("protocol: malformed row list: {0}")]
    MalformedRowList(String),

    // ── Subscription ───────────────────────────────────────────
    #[error("subscription: subscriptions must have at least one query")]
    EmptyQuerySet,

    #[error("subscription: unsubscribe has already been called")]
    AlreadyUnsubscribed,

    #[error("subscription: subscription has already ended")]
    AlreadyEnded,

    #[error("subscription: subscribe-to-all cannot be combined with targeted queries on one connection")]
    MixedSubscriptionModes,

    // ── Transport ──────────────────────────────────────────────
    #[error("transport: failed to connect: {0}")]
    ConnectFailed(String),

    #[error("transport: socket channel closed")]
    ChannelClosed,

    #[error("transport: connection is not active")]
    NotConnected,

    // ── Config ─────────────────────────────────────────────────
    #[error("config: failed to load configuration")]
    ConfigLoadFailed(#[source] Box<dyn std::error::Error + Send + Sync>),

    #[error("config: invalid value for '{key}': {reason}")]
    ConfigInvalid { key: String, reason: String },

    // ── Generic ────────────────────────────────────────────────
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl SyncError {
    /// Shorthand for a `TypeMismatch` built from displayable names.
    pub fn mismatch(expected: impl Into<String>, found: impl Into<String>) -> Self {
        Self::TypeMismatch {
            expected: expected.into(),
            found: found.into(),
        }
    }

    /// Whether this error came from malformed or truncated binary input.
    pub fn is_codec(&self) -> bool {
        matches!(
            self,
            Self::BufferTooShort { .. }
                | Self::InvalidUtf8 { .. }
                | Self::InvalidBool { .. }
                | Self::UnknownVariant { .. }
                | Self::InvalidOptionTag(_)
                | Self::TypeMismatch { .. }
                | Self::UnresolvedRef(_)
                | Self::TrailingBytes { .. }
                | Self::DepthLimitExceeded { .. }
        )
    }
}
