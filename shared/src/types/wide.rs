use std::fmt;

/// Unsigned 256-bit integer stored as four 64-bit limbs, least significant
/// first. This is also its wire order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct U256 {
    limbs: [u64; 4],
}

impl U256 {
    pub const ZERO: U256 = U256 { limbs: [0; 4] };

    pub const fn from_limbs(limbs: [u64; 4]) -> Self {
        Self { limbs }
    }

    pub const fn limbs(&self) -> [u64; 4] {
        self.limbs
    }

    pub fn is_zero(&self) -> bool {
        self.limbs == [0; 4]
    }

    /// Big-endian byte representation (most significant byte first).
    pub fn to_be_bytes(&self) -> [u8; 32] {
        let mut out = [0u8; 32];
        for (i, limb) in self.limbs.iter().rev().enumerate() {
            out[i * 8..i * 8 + 8].copy_from_slice(&limb.to_be_bytes());
        }
        out
    }

    pub fn from_be_bytes(bytes: [u8; 32]) -> Self {
        let mut limbs = [0u64; 4];
        for (i, limb) in limbs.iter_mut().rev().enumerate() {
            let mut chunk = [0u8; 8];
            chunk.copy_from_slice(&bytes[i * 8..i * 8 + 8]);
            *limb = u64::from_be_bytes(chunk);
        }
        Self { limbs }
    }
}

impl PartialOrd for U256 {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for U256 {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.limbs.iter().rev().cmp(other.limbs.iter().rev())
    }
}

impl From<u128> for U256 {
    fn from(value: u128) -> Self {
        Self::from_limbs([value as u64, (value >> 64) as u64, 0, 0])
    }
}

impl fmt::Display for U256 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let [a, b, c, d] = self.limbs;
        write!(f, "0x{d:016x}{c:016x}{b:016x}{a:016x}")
    }
}

/// Signed 256-bit integer in two's complement. Same limb layout as `U256`;
/// only the top limb carries the sign.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct I256 {
    limbs: [u64; 4],
}

impl I256 {
    pub const ZERO: I256 = I256 { limbs: [0; 4] };

    pub const fn from_limbs(limbs: [u64; 4]) -> Self {
        Self { limbs }
    }

    pub const fn limbs(&self) -> [u64; 4] {
        self.limbs
    }

    pub fn is_negative(&self) -> bool {
        (self.limbs[3] as i64) < 0
    }
}

impl From<i128> for I256 {
    fn from(value: i128) -> Self {
        let ext = if value < 0 { u64::MAX } else { 0 };
        Self::from_limbs([value as u64, (value >> 64) as u64, ext, ext])
    }
}

impl PartialOrd for I256 {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for I256 {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        (self.limbs[3] as i64)
            .cmp(&(other.limbs[3] as i64))
            .then_with(|| self.limbs[2].cmp(&other.limbs[2]))
            .then_with(|| self.limbs[1].cmp(&other.limbs[1]))
            .then_with(|| self.limbs[0].cmp(&other.limbs[0]))
    }
}

impl fmt::Display for I256 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let [a, b, c, d] = self.limbs;
        write!(f, "0x{d:016x}{c:016x}{b:016x}{a:016x}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn u256_be_bytes_roundtrip() {
        let value = U256::from_limbs([1, 2, 3, 4]);
        let bytes = value.to_be_bytes();
        assert_eq!(bytes[31], 1);
        assert_eq!(bytes[7], 4);
        assert_eq!(U256::from_be_bytes(bytes), value);
    }

    #[test]
    fn i256_sign_extends_from_i128() {
        let value = I256::from(-1i128);
        assert_eq!(value.limbs(), [u64::MAX; 4]);
        assert!(value.is_negative());
        assert!(I256::from(-5i128) < I256::from(3i128));
    }

    #[test]
    fn u256_orders_by_most_significant_limb() {
        assert!(U256::from_limbs([0, 0, 0, 1]) > U256::from_limbs([u64::MAX, 0, 0, 0]));
        assert!(U256::from(2u128) > U256::from(1u128));
    }
}
