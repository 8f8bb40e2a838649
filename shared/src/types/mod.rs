//! Scalar types with dedicated wire representations.

pub mod identity;
pub mod time;
pub mod wide;

pub use identity::{ConnectionId, Identity};
pub use time::{TimeDuration, Timestamp};
pub use wide::{I256, U256};

use crate::error::{Result, SyncError};

/// Parse big-endian hex (optional `0x` prefix) into exactly `N` bytes.
pub(crate) fn parse_hex<const N: usize>(key: &str, s: &str) -> Result<[u8; N]> {
    let s = s.strip_prefix("0x").unwrap_or(s);
    if !s.is_ascii() || s.len() != N * 2 {
        return Err(SyncError::ConfigInvalid {
            key: key.to_string(),
            reason: format!("expected {} hex characters, got {}", N * 2, s.len()),
        });
    }
    let mut out = [0u8; N];
    for (i, byte) in out.iter_mut().enumerate() {
        *byte = u8::from_str_radix(&s[i * 2..i * 2 + 2], 16).map_err(|_| {
            SyncError::ConfigInvalid {
                key: key.to_string(),
                reason: "invalid hex encoding".to_string(),
            }
        })?;
    }
    Ok(out)
}
