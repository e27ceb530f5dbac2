//! Difficulty targets and their compact encoding
//!
//! A target is a 256-bit threshold: a header's proof-of-work value must not
//! exceed it. Headers carry targets in the 32-bit compact `bits` form, which
//! loses precision, so [`bits_to_target`] and [`target_to_bits`] are not exact
//! inverses. Both reproduce the consensus arithmetic bit for bit.

use crate::error::{VerifyError, VerifyResult};
use num_bigint::BigUint;
use num_traits::{One, Zero};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Mantissa mask of a compact encoding
const MANTISSA_MASK: u32 = 0x00ff_ffff;

/// Sign bit of a compact encoding
const SIGN_BIT: u32 = 0x0080_0000;

/// 256-bit difficulty threshold
#[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Target(BigUint);

impl Target {
    pub fn new(value: BigUint) -> Self {
        Self(value)
    }

    /// Zero target, returned on testnet where difficulty is not checked
    pub fn zero() -> Self {
        Self(BigUint::zero())
    }

    /// Parse big-endian hex, with or without a `0x` prefix
    pub fn from_hex(s: &str) -> VerifyResult<Self> {
        let s = s.strip_prefix("0x").unwrap_or(s);
        if s.is_empty() {
            return Err(VerifyError::format("empty target hex"));
        }
        BigUint::parse_bytes(s.as_bytes(), 16)
            .map(Self)
            .ok_or_else(|| VerifyError::format(format!("invalid target hex: {}", s)))
    }

    /// 64-digit big-endian hex
    pub fn to_hex(&self) -> String {
        format!("{:064x}", self.0)
    }

    pub fn as_biguint(&self) -> &BigUint {
        &self.0
    }

    pub fn into_biguint(self) -> BigUint {
        self.0
    }

    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }

    /// Strict compact decoding (`SetCompact`)
    ///
    /// Unlike [`bits_to_target`], rejects encodings with the sign bit set and
    /// encodings whose value would not fit in 256 bits.
    pub fn from_compact_strict(bits: u32) -> VerifyResult<Self> {
        let exponent = bits >> 24;
        let mantissa = bits & 0x007f_ffff;
        let value = if exponent <= 3 {
            BigUint::from(mantissa >> (8 * (3 - exponent)))
        } else {
            BigUint::from(mantissa) << (8 * (exponent as usize - 3))
        };

        if value.is_zero() {
            return Ok(Self(value));
        }
        if bits & SIGN_BIT != 0 {
            return Err(VerifyError::invalid_compact(bits, "target cannot be negative"));
        }
        if exponent > 34
            || (exponent > 33 && mantissa > 0xff)
            || (exponent > 32 && mantissa > 0xffff)
        {
            return Err(VerifyError::invalid_compact(bits, "target has overflown"));
        }
        Ok(Self(value))
    }
}

impl From<BigUint> for Target {
    fn from(value: BigUint) -> Self {
        Self(value)
    }
}

impl FromStr for Target {
    type Err = VerifyError;

    fn from_str(s: &str) -> VerifyResult<Self> {
        Self::from_hex(s)
    }
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

impl Serialize for Target {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for Target {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Target::from_hex(&s).map_err(serde::de::Error::custom)
    }
}

/// Lenient compact decoding used by the retarget average
///
/// A mantissa below `0x8000` is scaled up by one byte before the exponent is
/// applied. Exponents below 3 shift right.
pub fn bits_to_target(bits: u32) -> Target {
    let exponent = bits >> 24;
    let mut mantissa = bits & MANTISSA_MASK;
    if mantissa < 0x8000 {
        mantissa *= 256;
    }
    let mantissa = BigUint::from(mantissa);
    let value = if exponent >= 3 {
        mantissa << (8 * (exponent as usize - 3))
    } else {
        mantissa >> (8 * (3 - exponent as usize))
    };
    Target(value)
}

/// Compact encoding of a target
///
/// Renders the target as 32 big-endian bytes, strips leading zero bytes down
/// to a three-byte minimum and keeps the top three bytes as mantissa. A
/// mantissa with its top bit set is shifted down one byte and the exponent
/// bumped.
pub fn target_to_bits(target: &Target) -> u32 {
    let raw = target.0.to_bytes_be();
    let mut bytes = vec![0u8; 32usize.saturating_sub(raw.len())];
    bytes.extend_from_slice(&raw);

    let mut start = 0;
    while bytes.len() - start > 3 && bytes[start] == 0 {
        start += 1;
    }
    let significant = &bytes[start..];

    let mut size = significant.len() as u32;
    let mut mantissa = u32::from_be_bytes([0, significant[0], significant[1], significant[2]]);
    if mantissa >= SIGN_BIT {
        size += 1;
        mantissa >>= 8;
    }
    size << 24 | mantissa
}

/// Expected number of hashes needed to meet `target`
pub fn chainwork(target: &Target) -> BigUint {
    let space = BigUint::one() << 256;
    let t = &target.0;
    if t >= &space {
        return BigUint::one();
    }
    (space - t - BigUint::one()) / (t + BigUint::one()) + BigUint::one()
}
