//! Header identity hashing and proof-of-work checks
//!
//! The three epoch hash functions are not implemented here. They are supplied
//! through [`PowHasher`] so the verifier can be driven by a native binding in
//! production and by a cheap stand-in under test.

use crate::core::{
    target_to_bits, CheckpointTable, ConsensusParameters, Epoch, Hash256, Header, HeaderWindow,
    Target, HASHED_PREFIX_LEN,
};
use crate::error::{VerifyError, VerifyResult};
use sha2::{Digest, Sha256};

use super::difficulty::resolve_target;

/// Epoch hash capabilities
///
/// `x16r` and `x16rv2` receive the first 80 serialized bytes and return a
/// wire-order digest. `kawpow_light_verify` receives the display-order header
/// hash and mix hash plus the 64-bit nonce and returns the final hash in
/// display order.
pub trait PowHasher: Send + Sync {
    fn x16r(&self, header: &[u8]) -> [u8; 32];

    fn x16rv2(&self, header: &[u8]) -> [u8; 32];

    fn kawpow_light_verify(&self, header_hash: &[u8; 32], mix_hash: &[u8; 32], nonce: u64)
        -> [u8; 32];
}

/// Double SHA-256
pub fn sha256d(data: &[u8]) -> [u8; 32] {
    let first = Sha256::digest(data);
    Sha256::digest(first).into()
}

/// Identity hash of a header, in display order
///
/// `None` yields the zero hash, the parent of the first block.
pub fn identity_hash(
    header: Option<&Header>,
    params: &ConsensusParameters,
    hasher: &dyn PowHasher,
) -> VerifyResult<Hash256> {
    let Some(header) = header else {
        return Ok(Hash256::zero());
    };

    let serialized = header.serialize(params)?;
    let prefix = &serialized[..HASHED_PREFIX_LEN];

    match header.epoch {
        Epoch::X16r => Hash256::from_wire(&hasher.x16r(prefix)),
        Epoch::X16rv2 => Hash256::from_wire(&hasher.x16rv2(prefix)),
        Epoch::KawPow => {
            let mut header_hash = sha256d(prefix);
            header_hash.reverse();
            let mix_hash = header
                .mix_hash()
                .ok_or_else(|| VerifyError::format("extended header is missing mix hash"))?;
            let out = hasher.kawpow_light_verify(&header_hash, mix_hash.as_bytes(), header.nonce);
            Ok(Hash256::from_display(out))
        }
    }
}

/// Check one header against its predecessor and expected target
///
/// Checks, in order: the identity hash against `expected` (when given), the
/// predecessor link, and outside testnet the compact bits and the work. The
/// proof-of-work value is the identity hash read as a big-endian integer.
/// Returns the identity hash.
pub fn verify_header(
    header: &Header,
    params: &ConsensusParameters,
    hasher: &dyn PowHasher,
    prev_hash: &Hash256,
    target: &Target,
    expected: Option<&Hash256>,
) -> VerifyResult<Hash256> {
    let hash = identity_hash(Some(header), params, hasher)?;
    let height = header.block_height;

    if let Some(expected) = expected {
        if *expected != hash {
            return Err(VerifyError::HashMismatch {
                height,
                expected: expected.to_hex(),
                actual: hash.to_hex(),
            });
        }
    }

    if *prev_hash != header.prev_block_hash {
        return Err(VerifyError::LinkageMismatch {
            height,
            expected: prev_hash.to_hex(),
            actual: header.prev_block_hash.to_hex(),
        });
    }

    if params.is_testnet {
        return Ok(hash);
    }

    let bits = target_to_bits(target);
    if bits != header.bits {
        return Err(VerifyError::BitsMismatch {
            height,
            expected: bits,
            actual: header.bits,
        });
    }

    if &hash.to_biguint() > target.as_biguint() {
        return Err(VerifyError::InsufficientWork {
            height,
            pow_hash: hash.to_hex(),
            target: target.to_hex(),
        });
    }

    Ok(hash)
}

/// Whether `header` extends the header below it in `window`
///
/// Single-header counterpart of chunk verification: any lookup or consensus
/// failure yields `false`. At height 0 a configured `genesis_hash` must match
/// the header's identity hash; without one the header is checked like any
/// other, linked to the zero hash.
pub fn can_connect(
    header: &Header,
    params: &ConsensusParameters,
    hasher: &dyn PowHasher,
    checkpoints: &CheckpointTable,
    window: &HeaderWindow,
) -> bool {
    if let (0, Some(genesis)) = (header.block_height, &params.genesis_hash) {
        return matches!(identity_hash(Some(header), params, hasher), Ok(hash) if hash == *genesis);
    }

    let prev_hash = match header.block_height.checked_sub(1) {
        Some(prev_height) => match window.get(prev_height) {
            Some(prev) => match identity_hash(Some(prev), params, hasher) {
                Ok(hash) => hash,
                Err(_) => return false,
            },
            None => return false,
        },
        None => Hash256::zero(),
    };

    let target = match resolve_target(header.block_height, params, checkpoints, window) {
        Ok(target) => target,
        Err(_) => return false,
    };

    verify_header(header, params, hasher, &prev_hash, &target, None).is_ok()
}
