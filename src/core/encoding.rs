//! Fixed-width hex helpers and the 256-bit digest type
//!
//! Digests travel in two byte orders: wire order (as they sit inside a
//! serialized header or come out of a hash function) and display order
//! (reversed, the form shown to users and compared in linkage checks).
//! [`Hash256`] always stores display order.

use crate::error::{VerifyError, VerifyResult};
use num_bigint::BigUint;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Little-endian, fixed-width hex encoding of a signed integer
///
/// Negative values are written in two's complement. Fails with
/// [`VerifyError::Range`] unless `-(256^length / 2) <= value < 256^length`.
pub fn int_to_hex(value: i128, length: usize) -> VerifyResult<String> {
    if length < 16 {
        let range = 1i128 << (8 * length);
        if value < -(range / 2) || value >= range {
            return Err(VerifyError::Range {
                value: value.to_string(),
                length,
            });
        }
    }

    let le = value.to_le_bytes();
    let fill = if value < 0 { 0xff } else { 0x00 };
    let bytes: Vec<u8> = (0..length)
        .map(|i| le.get(i).copied().unwrap_or(fill))
        .collect();
    Ok(hex::encode(bytes))
}

/// Reverse the byte order of a hex string
pub fn rev_hex(s: &str) -> VerifyResult<String> {
    let mut bytes =
        hex::decode(s).map_err(|e| VerifyError::format(format!("invalid hex: {}", e)))?;
    bytes.reverse();
    Ok(hex::encode(bytes))
}

/// Hex of a wire-order digest in display order
pub fn hash_encode(bytes: &[u8]) -> String {
    let mut reversed = bytes.to_vec();
    reversed.reverse();
    hex::encode(reversed)
}

/// 256-bit digest kept in display (big-endian) order
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Hash256([u8; 32]);

impl Hash256 {
    /// Digest length in bytes
    pub const LEN: usize = 32;

    /// The all-zero hash, used as the parent of the first block
    pub const fn zero() -> Self {
        Self([0u8; 32])
    }

    /// Wrap bytes that are already in display order
    pub const fn from_display(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// Build from wire-order bytes
    pub fn from_wire(bytes: &[u8]) -> VerifyResult<Self> {
        if bytes.len() != Self::LEN {
            return Err(VerifyError::format(format!(
                "hash must be {} bytes, got {}",
                Self::LEN,
                bytes.len()
            )));
        }
        let mut out = [0u8; 32];
        for (dst, src) in out.iter_mut().zip(bytes.iter().rev()) {
            *dst = *src;
        }
        Ok(Self(out))
    }

    /// Bytes in wire order
    pub fn to_wire(&self) -> [u8; 32] {
        let mut out = self.0;
        out.reverse();
        out
    }

    /// Bytes in display order
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Parse a 64-digit display-order hex string
    pub fn from_hex(s: &str) -> VerifyResult<Self> {
        let s = s.strip_prefix("0x").unwrap_or(s);
        if s.len() != Self::LEN * 2 {
            return Err(VerifyError::format(format!(
                "hash hex must be {} characters, got {}",
                Self::LEN * 2,
                s.len()
            )));
        }
        let mut out = [0u8; 32];
        hex::decode_to_slice(s, &mut out)
            .map_err(|e| VerifyError::format(format!("invalid hash hex: {}", e)))?;
        Ok(Self(out))
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    pub fn is_zero(&self) -> bool {
        self.0.iter().all(|b| *b == 0)
    }

    /// Display bytes read as a big-endian integer
    pub fn to_biguint(&self) -> BigUint {
        BigUint::from_bytes_be(&self.0)
    }
}

impl fmt::Display for Hash256 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

impl FromStr for Hash256 {
    type Err = VerifyError;

    fn from_str(s: &str) -> VerifyResult<Self> {
        Self::from_hex(s)
    }
}

impl Serialize for Hash256 {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for Hash256 {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Hash256::from_hex(&s).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    #[test]
    fn test_int_to_hex_little_endian() {
        assert_eq!(int_to_hex(1, 4).unwrap(), "01000000");
        assert_eq!(int_to_hex(0x1d00ffff, 4).unwrap(), "ffff001d");
        assert_eq!(int_to_hex(0, 0).unwrap(), "");
    }

    #[test]
    fn test_int_to_hex_twos_complement() {
        assert_eq!(int_to_hex(-1, 1).unwrap(), "ff");
        assert_eq!(int_to_hex(-128, 1).unwrap(), "80");
        assert_eq!(int_to_hex(-2, 4).unwrap(), "feffffff");
        assert_eq!(int_to_hex(-1, 20).unwrap(), "ff".repeat(20));
    }

    #[test]
    fn test_int_to_hex_range_edges() {
        assert!(int_to_hex(255, 1).is_ok());
        assert_matches!(
            int_to_hex(256, 1),
            Err(VerifyError::Range { length: 1, .. })
        );
        assert_matches!(int_to_hex(-129, 1), Err(VerifyError::Range { .. }));
        assert!(int_to_hex(u64::MAX as i128, 8).is_ok());
        assert_matches!(
            int_to_hex(u64::MAX as i128 + 1, 8),
            Err(VerifyError::Range { .. })
        );
    }

    #[test]
    fn test_rev_hex() {
        assert_eq!(rev_hex("0102ff").unwrap(), "ff0201");
        assert_eq!(rev_hex("").unwrap(), "");
        assert_matches!(rev_hex("zz"), Err(VerifyError::Format { .. }));
    }

    #[test]
    fn test_hash_encode_reverses() {
        assert_eq!(hash_encode(&[0x01, 0x02, 0x03]), "030201");
    }

    #[test]
    fn test_hash256_wire_and_display() {
        let mut wire = [0u8; 32];
        wire[0] = 0xab;
        let hash = Hash256::from_wire(&wire).unwrap();
        assert_eq!(hash.as_bytes()[31], 0xab);
        assert!(hash.to_hex().ends_with("ab"));
        assert_eq!(hash.to_wire(), wire);
        assert_eq!(Hash256::from_hex(&hash.to_hex()).unwrap(), hash);
    }

    #[test]
    fn test_hash256_rejects_bad_input() {
        assert!(Hash256::from_wire(&[0u8; 31]).is_err());
        assert!(Hash256::from_hex("00").is_err());
        assert!(Hash256::from_hex(&"zz".repeat(32)).is_err());
    }

    #[test]
    fn test_hash256_zero() {
        assert!(Hash256::zero().is_zero());
        assert_eq!(Hash256::zero().to_hex(), "0".repeat(64));
        assert_eq!(Hash256::zero().to_biguint(), BigUint::from(0u32));
    }

    #[test]
    fn test_hash256_serde() {
        let hash = Hash256::from_display([0x11; 32]);
        let json = serde_json::to_string(&hash).unwrap();
        assert_eq!(json, format!("\"{}\"", "11".repeat(32)));
        let back: Hash256 = serde_json::from_str(&json).unwrap();
        assert_eq!(back, hash);
    }
}
