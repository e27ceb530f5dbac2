//! Epoch-aware header codec
//!
//! Wire layout, all integers little-endian, hashes in wire order:
//!
//! ```text
//! legacy   : version(4) prev(32) merkle(32) time(4) bits(4) nonce(4)            = 80
//! extended : version(4) prev(32) merkle(32) time(4) bits(4) height(4) nonce(8) mix(32) = 120
//! ```
//!
//! The layout is selected by the header's own timestamp. Legacy headers are
//! zero-padded to the extended size when serialized.

use super::encoding::Hash256;
use super::params::{ConsensusParameters, Epoch};
use crate::error::{VerifyError, VerifyResult};
use byteorder::{LittleEndian, ReadBytesExt};
use serde::{Deserialize, Serialize};
use std::io::{Cursor, Read};

/// Bytes covered by the legacy hash and by the KawPoW header hash
pub const HASHED_PREFIX_LEN: usize = 80;

/// Fields only present in extended headers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct KawpowFields {
    /// Height as committed inside the header
    pub height: u32,
    pub mix_hash: Hash256,
}

/// Decoded block header
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Header {
    pub version: u32,
    pub prev_block_hash: Hash256,
    pub merkle_root: Hash256,
    pub timestamp: u32,
    pub bits: u32,
    /// Four wire bytes in legacy epochs, eight in KawPoW
    pub nonce: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kawpow: Option<KawpowFields>,
    pub epoch: Epoch,
    /// Chain position, supplied by the caller and never encoded
    pub block_height: u64,
}

impl Header {
    /// Decode one header record
    pub fn deserialize(
        bytes: &[u8],
        height: u64,
        params: &ConsensusParameters,
    ) -> VerifyResult<Self> {
        if bytes.is_empty() {
            return Err(VerifyError::format("no header data"));
        }
        if bytes.len() != params.pre_extended_header_size
            && bytes.len() != params.post_extended_header_size
        {
            return Err(VerifyError::format(format!(
                "invalid header length: {}",
                bytes.len()
            )));
        }

        let mut cursor = Cursor::new(bytes);
        let version = cursor.read_u32::<LittleEndian>().map_err(truncated)?;
        let prev_block_hash = read_hash(&mut cursor)?;
        let merkle_root = read_hash(&mut cursor)?;
        let timestamp = cursor.read_u32::<LittleEndian>().map_err(truncated)?;
        let bits = cursor.read_u32::<LittleEndian>().map_err(truncated)?;

        let epoch = Epoch::for_timestamp(timestamp, params);
        let (nonce, kawpow) = if epoch.is_extended() {
            let committed_height = cursor.read_u32::<LittleEndian>().map_err(truncated)?;
            let nonce = cursor.read_u64::<LittleEndian>().map_err(truncated)?;
            let mix_hash = read_hash(&mut cursor)?;
            (
                nonce,
                Some(KawpowFields {
                    height: committed_height,
                    mix_hash,
                }),
            )
        } else {
            let nonce = cursor.read_u32::<LittleEndian>().map_err(truncated)?;
            (u64::from(nonce), None)
        };

        Ok(Self {
            version,
            prev_block_hash,
            merkle_root,
            timestamp,
            bits,
            nonce,
            kawpow,
            epoch,
            block_height: height,
        })
    }

    /// Decode a hex-encoded header record
    pub fn from_hex(s: &str, height: u64, params: &ConsensusParameters) -> VerifyResult<Self> {
        let bytes =
            hex::decode(s.trim()).map_err(|e| VerifyError::format(format!("invalid hex: {}", e)))?;
        Self::deserialize(&bytes, height, params)
    }

    /// Encode to wire bytes
    ///
    /// Legacy headers are right-padded with zeros to the extended size.
    pub fn serialize(&self, params: &ConsensusParameters) -> VerifyResult<Vec<u8>> {
        self.check_layout(params)?;

        let mut out = Vec::with_capacity(params.post_extended_header_size);
        out.extend_from_slice(&self.version.to_le_bytes());
        out.extend_from_slice(&self.prev_block_hash.to_wire());
        out.extend_from_slice(&self.merkle_root.to_wire());
        out.extend_from_slice(&self.timestamp.to_le_bytes());
        out.extend_from_slice(&self.bits.to_le_bytes());

        match &self.kawpow {
            Some(fields) => {
                out.extend_from_slice(&fields.height.to_le_bytes());
                out.extend_from_slice(&self.nonce.to_le_bytes());
                out.extend_from_slice(&fields.mix_hash.to_wire());
            }
            None => {
                let nonce = u32::try_from(self.nonce).map_err(|_| VerifyError::Range {
                    value: self.nonce.to_string(),
                    length: 4,
                })?;
                out.extend_from_slice(&nonce.to_le_bytes());
                out.resize(params.post_extended_header_size, 0);
            }
        }
        Ok(out)
    }

    pub fn serialize_hex(&self, params: &ConsensusParameters) -> VerifyResult<String> {
        self.serialize(params).map(hex::encode)
    }

    /// Check the extended fields agree with the timestamp-selected epoch
    pub fn check_layout(&self, params: &ConsensusParameters) -> VerifyResult<()> {
        let epoch = Epoch::for_timestamp(self.timestamp, params);
        if epoch != self.epoch {
            return Err(VerifyError::format(format!(
                "header tagged {} but timestamp {} selects {}",
                self.epoch, self.timestamp, epoch
            )));
        }
        match (epoch.is_extended(), self.kawpow.is_some()) {
            (true, false) => Err(VerifyError::format(
                "extended header is missing height and mix hash",
            )),
            (false, true) => Err(VerifyError::format(
                "legacy header carries extended fields",
            )),
            _ => Ok(()),
        }
    }

    pub fn mix_hash(&self) -> Option<&Hash256> {
        self.kawpow.as_ref().map(|k| &k.mix_hash)
    }
}

fn read_hash(cursor: &mut Cursor<&[u8]>) -> VerifyResult<Hash256> {
    let mut buf = [0u8; 32];
    cursor.read_exact(&mut buf).map_err(truncated)?;
    Hash256::from_wire(&buf)
}

fn truncated(_: std::io::Error) -> VerifyError {
    VerifyError::format("header record too short for its layout")
}
