use std::fmt;

use rand::Rng;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use super::{parse_hex, U256};
use crate::error::Result;

/// Server-assigned identity of a client. 256 bits, travels as the product
/// type `{ __identity__: u256 }`.
///
/// Serializes through serde as a 64-character hex string.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct Identity(U256);

impl Identity {
    pub const ZERO: Identity = Identity(U256::ZERO);

    pub const fn new(value: U256) -> Self {
        Self(value)
    }

    pub const fn value(&self) -> U256 {
        self.0
    }

    /// 64 lowercase hex characters, most significant byte first.
    pub fn to_hex(&self) -> String {
        self.0.to_be_bytes().iter().map(|b| format!("{b:02x}")).collect()
    }

    pub fn from_hex(s: &str) -> Result<Self> {
        Ok(Self(U256::from_be_bytes(parse_hex::<32>("identity", s)?)))
    }

    /// First 8 hex characters, for display.
    pub fn short_hex(&self) -> String {
        self.to_hex()[..8].to_string()
    }
}

impl fmt::Display for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl Serialize for Identity {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for Identity {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Identity::from_hex(&s).map_err(serde::de::Error::custom)
    }
}

/// Per-connection id. 128 bits, travels as `{ __connection_id__: u128 }`.
/// The all-zero id means "no connection" in caller fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct ConnectionId(u128);

impl ConnectionId {
    pub const ZERO: ConnectionId = ConnectionId(0);

    pub const fn new(value: u128) -> Self {
        Self(value)
    }

    pub const fn value(&self) -> u128 {
        self.0
    }

    /// A fresh random id, generated client-side before connecting.
    pub fn random() -> Self {
        Self(rand::thread_rng().gen())
    }

    pub fn is_zero(&self) -> bool {
        self.0 == 0
    }

    /// `None` for the zero id.
    pub fn none_if_zero(self) -> Option<Self> {
        (!self.is_zero()).then_some(self)
    }

    /// 32 lowercase hex characters, most significant byte first.
    pub fn to_hex(&self) -> String {
        format!("{:032x}", self.0)
    }

    pub fn from_hex(s: &str) -> Result<Self> {
        Ok(Self(u128::from_be_bytes(parse_hex::<16>("connection_id", s)?)))
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl Serialize for ConnectionId {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for ConnectionId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        ConnectionId::from_hex(&s).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identity_hex_roundtrip() {
        let identity = Identity::new(U256::from_limbs([0xff, 0, 0, 0x1234 << 48]));
        let hex = identity.to_hex();
        assert_eq!(hex.len(), 64);
        assert!(hex.starts_with("1234"));
        assert!(hex.ends_with("ff"));
        assert_eq!(Identity::from_hex(&hex).unwrap(), identity);
        assert_eq!(identity.short_hex(), "12340000");
    }

    #[test]
    fn identity_rejects_bad_hex() {
        assert!(Identity::from_hex("abc").is_err());
        assert!(Identity::from_hex(&"zz".repeat(32)).is_err());
    }

    #[test]
    fn identity_serde_as_hex_string() {
        let identity = Identity::new(U256::from(7u128));
        let json = serde_json::to_string(&identity).unwrap();
        assert_eq!(json, format!("\"{}\"", identity.to_hex()));
        let back: Identity = serde_json::from_str(&json).unwrap();
        assert_eq!(back, identity);
    }

    #[test]
    fn connection_id_hex_accepts_prefix() {
        let id = ConnectionId::new(0xabcdef);
        assert_eq!(id.to_hex(), format!("{:032x}", 0xabcdefu128));
        assert_eq!(ConnectionId::from_hex(&format!("0x{}", id.to_hex())).unwrap(), id);
        assert_eq!(ConnectionId::ZERO.none_if_zero(), None);
        assert_eq!(id.none_if_zero(), Some(id));
    }
}
