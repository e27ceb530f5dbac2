//! Shared fixtures for integration tests

#![allow(dead_code)]

use ravencoin_header_verifier::core::{
    target_to_bits, CheckpointTable, ConsensusParameters, Epoch, Hash256, Header, HeaderWindow,
    KawpowFields,
};
use ravencoin_header_verifier::verify::{identity_hash, resolve_target, PowHasher};
use sha2::{Digest, Sha256};

/// Deterministic stand-in for the epoch hash functions
///
/// Outputs start with six zero bytes in display order, so every header meets
/// any target from the parameter presets.
pub struct StubHasher;

fn tagged(tag: &[u8], data: &[u8]) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(tag);
    hasher.update(data);
    hasher.finalize().into()
}

impl PowHasher for StubHasher {
    fn x16r(&self, header: &[u8]) -> [u8; 32] {
        let mut out = tagged(b"x16r", header);
        out[26..].fill(0);
        out
    }

    fn x16rv2(&self, header: &[u8]) -> [u8; 32] {
        let mut out = tagged(b"x16rv2", header);
        out[26..].fill(0);
        out
    }

    fn kawpow_light_verify(
        &self,
        header_hash: &[u8; 32],
        mix_hash: &[u8; 32],
        nonce: u64,
    ) -> [u8; 32] {
        let mut input = Vec::with_capacity(72);
        input.extend_from_slice(header_hash);
        input.extend_from_slice(mix_hash);
        input.extend_from_slice(&nonce.to_le_bytes());
        let mut out = tagged(b"kawpow", &input);
        out[..6].fill(0);
        out
    }
}

/// Always returns the highest digest, failing any work check
pub struct HighHasher;

impl PowHasher for HighHasher {
    fn x16r(&self, _: &[u8]) -> [u8; 32] {
        [0xff; 32]
    }

    fn x16rv2(&self, _: &[u8]) -> [u8; 32] {
        [0xff; 32]
    }

    fn kawpow_light_verify(&self, _: &[u8; 32], _: &[u8; 32], _: u64) -> [u8; 32] {
        [0xff; 32]
    }
}

pub fn make_header(
    params: &ConsensusParameters,
    height: u64,
    prev: Hash256,
    timestamp: u32,
    bits: u32,
) -> Header {
    let epoch = Epoch::for_timestamp(timestamp, params);
    Header {
        version: 0x2000_0000,
        prev_block_hash: prev,
        merkle_root: Hash256::from_display([(height % 251) as u8; 32]),
        timestamp,
        bits,
        nonce: height,
        kawpow: epoch.is_extended().then(|| KawpowFields {
            height: height as u32,
            mix_hash: Hash256::from_display([(height % 241) as u8; 32]),
        }),
        epoch,
        block_height: height,
    }
}

/// Encode headers in the record sizes a chunk carries at their heights
pub fn encode_chunk(params: &ConsensusParameters, headers: &[Header]) -> Vec<u8> {
    let mut raw = Vec::new();
    for header in headers {
        let bytes = header.serialize(params).unwrap();
        raw.extend_from_slice(&bytes[..params.record_size_at(header.block_height)]);
    }
    raw
}

/// Builds a linked chain whose headers carry the bits the verifier expects
pub struct ChainBuilder {
    pub params: ConsensusParameters,
    pub checkpoints: CheckpointTable,
    pub window: HeaderWindow,
    next_height: u64,
    next_timestamp: u32,
    spacing: u32,
    prev_hash: Hash256,
}

impl ChainBuilder {
    pub fn new(params: ConsensusParameters, first_height: u64, first_timestamp: u32) -> Self {
        Self {
            params,
            checkpoints: CheckpointTable::new(),
            window: HeaderWindow::new(),
            next_height: first_height,
            next_timestamp: first_timestamp,
            spacing: 60,
            prev_hash: Hash256::zero(),
        }
    }

    pub fn with_checkpoints(mut self, checkpoints: CheckpointTable) -> Self {
        self.checkpoints = checkpoints;
        self
    }

    pub fn next_height(&self) -> u64 {
        self.next_height
    }

    /// Append headers with fixed bits, without consulting the retarget
    pub fn seed(&mut self, count: u64, bits: u32) {
        for _ in 0..count {
            self.push(bits);
        }
    }

    /// Append headers carrying the expected bits and return them
    pub fn extend(&mut self, count: u64) -> Vec<Header> {
        (0..count)
            .map(|_| {
                let target = resolve_target(
                    self.next_height,
                    &self.params,
                    &self.checkpoints,
                    &self.window,
                )
                .unwrap();
                self.push(target_to_bits(&target))
            })
            .collect()
    }

    fn push(&mut self, bits: u32) -> Header {
        let header = make_header(
            &self.params,
            self.next_height,
            self.prev_hash,
            self.next_timestamp,
            bits,
        );
        self.prev_hash = identity_hash(Some(&header), &self.params, &StubHasher).unwrap();
        self.window.insert(header.clone());
        self.next_height += 1;
        self.next_timestamp += self.spacing;
        header
    }
}

/// Compact form of the easiest target
pub fn max_bits(params: &ConsensusParameters) -> u32 {
    target_to_bits(&params.max_target)
}
