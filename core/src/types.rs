//! Fixed-length value types shared by every component.
//!
//! Hex text is accepted only at this boundary (`FromStr`, serde): an
//! optional `0x`/`0X` marker is stripped once and the bytes land in a
//! fixed-size buffer. Nothing past this module sees variable-format input.

use std::fmt;
use std::str::FromStr;

use serde::{de, Deserialize, Deserializer, Serialize, Serializer};

use crate::error::{GrantsError, Result};

/// Value in the host's smallest unit.
pub type Amount = u128;

/// Seconds since the Unix epoch.
pub type Timestamp = u64;

pub const ADDRESS_LEN: usize = 20;
pub const COMPRESSED_KEY_LEN: usize = 33;
pub const DECOMPRESSED_KEY_LEN: usize = 64;

pub const PREFIX_EVEN_Y: u8 = 0x02;
pub const PREFIX_ODD_Y: u8 = 0x03;

/// Strip an optional `0x` marker and decode the remaining hex digits.
pub fn decode_hex(input: &str) -> Result<Vec<u8>> {
    let trimmed = input.trim();
    let digits = trimmed
        .strip_prefix("0x")
        .or_else(|| trimmed.strip_prefix("0X"))
        .unwrap_or(trimmed);
    hex::decode(digits).map_err(|e| GrantsError::InvalidHex(format!("{input}: {e}")))
}

// ---------------------------------------------------------------------------
// Address
// ---------------------------------------------------------------------------

/// 20-byte account identifier.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct Address(pub [u8; ADDRESS_LEN]);

impl Address {
    pub fn from_slice(bytes: &[u8]) -> Result<Self> {
        let arr: [u8; ADDRESS_LEN] = bytes
            .try_into()
            .map_err(|_| GrantsError::InvalidAddressLength(bytes.len()))?;
        Ok(Self(arr))
    }

    pub fn as_bytes(&self) -> &[u8; ADDRESS_LEN] {
        &self.0
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", hex::encode(self.0))
    }
}

impl fmt::Debug for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Address({self})")
    }
}

impl FromStr for Address {
    type Err = GrantsError;

    fn from_str(s: &str) -> Result<Self> {
        Self::from_slice(&decode_hex(s)?)
    }
}

impl From<[u8; ADDRESS_LEN]> for Address {
    fn from(bytes: [u8; ADDRESS_LEN]) -> Self {
        Self(bytes)
    }
}

// ---------------------------------------------------------------------------
// Public keys
// ---------------------------------------------------------------------------

/// 33-byte SEC1 compressed secp256k1 key: parity prefix followed by x.
///
/// Construction checks length and prefix only; whether x names a curve
/// point is decided by [`crate::crypto::keys::check_on_curve`].
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct CompressedPublicKey([u8; COMPRESSED_KEY_LEN]);

impl CompressedPublicKey {
    pub fn from_slice(bytes: &[u8]) -> Result<Self> {
        let arr: [u8; COMPRESSED_KEY_LEN] = bytes
            .try_into()
            .map_err(|_| GrantsError::InvalidPublicKeyLength(bytes.len()))?;
        match arr[0] {
            PREFIX_EVEN_Y | PREFIX_ODD_Y => Ok(Self(arr)),
            other => Err(GrantsError::InvalidPublicKeyPrefix(other)),
        }
    }

    /// True when the prefix selects the odd y root.
    pub fn wants_odd_y(&self) -> bool {
        self.0[0] == PREFIX_ODD_Y
    }

    pub fn x_bytes(&self) -> &[u8] {
        &self.0[1..]
    }

    pub fn as_bytes(&self) -> &[u8; COMPRESSED_KEY_LEN] {
        &self.0
    }
}

impl AsRef<[u8]> for CompressedPublicKey {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl fmt::Display for CompressedPublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", hex::encode(self.0))
    }
}

impl fmt::Debug for CompressedPublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "CompressedPublicKey({self})")
    }
}

impl FromStr for CompressedPublicKey {
    type Err = GrantsError;

    fn from_str(s: &str) -> Result<Self> {
        Self::from_slice(&decode_hex(s)?)
    }
}

/// 64-byte raw point encoding: x ‖ y, both big-endian, no prefix.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct DecompressedPublicKey([u8; DECOMPRESSED_KEY_LEN]);

impl DecompressedPublicKey {
    pub(crate) fn from_coordinates(x: [u8; 32], y: [u8; 32]) -> Self {
        let mut out = [0u8; DECOMPRESSED_KEY_LEN];
        out[..32].copy_from_slice(&x);
        out[32..].copy_from_slice(&y);
        Self(out)
    }

    pub fn x(&self) -> &[u8] {
        &self.0[..32]
    }

    pub fn y(&self) -> &[u8] {
        &self.0[32..]
    }

    pub fn y_is_odd(&self) -> bool {
        self.0[DECOMPRESSED_KEY_LEN - 1] & 1 == 1
    }

    pub fn as_bytes(&self) -> &[u8; DECOMPRESSED_KEY_LEN] {
        &self.0
    }
}

impl AsRef<[u8]> for DecompressedPublicKey {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl fmt::Display for DecompressedPublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", hex::encode(self.0))
    }
}

impl fmt::Debug for DecompressedPublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "DecompressedPublicKey({self})")
    }
}

// ---------------------------------------------------------------------------
// Serde: hex strings on the wire
// ---------------------------------------------------------------------------

macro_rules! hex_serde {
    ($ty:ty) => {
        impl Serialize for $ty {
            fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
                serializer.collect_str(self)
            }
        }

        impl<'de> Deserialize<'de> for $ty {
            fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
                let s = String::deserialize(deserializer)?;
                s.parse().map_err(de::Error::custom)
            }
        }
    };
}

hex_serde!(Address);
hex_serde!(CompressedPublicKey);

// ---------------------------------------------------------------------------
// Call context
// ---------------------------------------------------------------------------

/// Who is calling and when. Supplied by the host for every mutation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CallContext {
    pub caller: Address,
    pub now: Timestamp,
}

impl CallContext {
    pub fn new(caller: Address, now: Timestamp) -> Self {
        Self { caller, now }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const FED1: &str = "0x0368fd0a659e0e1e56752b093f9ef2bf529f0ba0c336b05660d1739c5803c48d74";

    #[test]
    fn test_address_parses_with_and_without_marker() {
        let a: Address = "0xb50557e825cc29d1448459797568480c0a5e1df5".parse().unwrap();
        let b: Address = "B50557E825CC29D1448459797568480C0A5E1DF5".parse().unwrap();
        assert_eq!(a, b);
        assert_eq!(a.to_string(), "0xb50557e825cc29d1448459797568480c0a5e1df5");
    }

    #[test]
    fn test_address_rejects_wrong_length() {
        assert_eq!(
            "0xb50557e825cc29d1".parse::<Address>(),
            Err(GrantsError::InvalidAddressLength(8))
        );
    }

    #[test]
    fn test_address_rejects_non_hex() {
        assert!(matches!(
            "0xzz0557e825cc29d1448459797568480c0a5e1df5".parse::<Address>(),
            Err(GrantsError::InvalidHex(_))
        ));
    }

    #[test]
    fn test_compressed_key_accepts_missing_marker() {
        let with: CompressedPublicKey = FED1.parse().unwrap();
        let without: CompressedPublicKey = FED1.trim_start_matches("0x").parse().unwrap();
        assert_eq!(with, without);
        assert_eq!(with.to_string(), FED1);
        assert!(with.wants_odd_y());
    }

    #[test]
    fn test_compressed_key_length_and_prefix() {
        assert_eq!(
            CompressedPublicKey::from_slice(&[0x02; 32]),
            Err(GrantsError::InvalidPublicKeyLength(32))
        );
        let mut bytes = [0x11u8; 33];
        bytes[0] = 0x04;
        assert_eq!(
            CompressedPublicKey::from_slice(&bytes),
            Err(GrantsError::InvalidPublicKeyPrefix(0x04))
        );
    }

    #[test]
    fn test_serde_uses_hex_strings() {
        let key: CompressedPublicKey = FED1.parse().unwrap();
        let json = serde_json::to_string(&key).unwrap();
        assert_eq!(json, format!("\"{FED1}\""));
        let back: CompressedPublicKey = serde_json::from_str(&json).unwrap();
        assert_eq!(back, key);
    }
}
