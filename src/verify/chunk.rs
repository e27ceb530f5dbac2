//! Chunk verification state machine
//!
//! A chunk is a run of consecutive raw header records starting at a known
//! height. The verifier walks it record by record:
//!
//! ```text
//! AwaitPrevHash --> Streaming { height, offset, prev_hash } --> Done
//!        \                    |  (one record per step)
//!         `-------------------+-------------------------------> Failed
//! ```
//!
//! Every decoded header is added to the caller's window before its target is
//! resolved. A failure stops the walk and leaves the window as it was at that
//! point.

use super::difficulty::resolve_target_with_window;
use super::pow::{identity_hash, verify_header, PowHasher};
use crate::core::params::{POST_EXTENDED_HEADER_SIZE, PRE_EXTENDED_HEADER_SIZE};
use crate::core::{CheckpointTable, ConsensusParameters, Hash256, Header, HeaderWindow};
use crate::error::{VerifyError, VerifyResult};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::{debug, info, info_span, warn};

/// Outcome of a successfully verified chunk
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChunkSummary {
    pub start_height: u64,
    pub header_count: u64,
    /// Identity hash of the last header in the chunk
    pub tip_hash: Hash256,
}

/// Progress of a [`ChunkVerifier`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChunkState {
    /// Predecessor hash not yet established
    AwaitPrevHash,
    /// Next record starts at `offset` and sits at `height`
    Streaming {
        height: u64,
        offset: usize,
        prev_hash: Hash256,
    },
    Done(ChunkSummary),
    Failed(VerifyError),
}

impl ChunkState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, ChunkState::Done(_) | ChunkState::Failed(_))
    }
}

/// Step-wise verifier for one chunk
pub struct ChunkVerifier<'a> {
    params: &'a ConsensusParameters,
    hasher: &'a dyn PowHasher,
    checkpoints: &'a CheckpointTable,
    window: &'a mut HeaderWindow,
    window_size: u64,
    start_height: u64,
    raw: &'a [u8],
    known_hashes: BTreeMap<u64, Hash256>,
    last_record_len: usize,
    state: ChunkState,
}

impl<'a> ChunkVerifier<'a> {
    pub fn new(
        params: &'a ConsensusParameters,
        hasher: &'a dyn PowHasher,
        checkpoints: &'a CheckpointTable,
        window: &'a mut HeaderWindow,
        start_height: u64,
        raw: &'a [u8],
    ) -> Self {
        Self {
            params,
            hasher,
            checkpoints,
            window,
            window_size: params.dgw_window_size,
            start_height,
            raw,
            known_hashes: BTreeMap::new(),
            last_record_len: 0,
            state: ChunkState::AwaitPrevHash,
        }
    }

    /// Override the retarget window size
    pub fn with_window_size(mut self, window_size: u64) -> Self {
        self.window_size = window_size;
        self
    }

    pub fn state(&self) -> &ChunkState {
        &self.state
    }

    /// Advance by one transition
    pub fn step(&mut self) -> &ChunkState {
        let state = std::mem::replace(&mut self.state, ChunkState::AwaitPrevHash);
        self.state = match state {
            ChunkState::AwaitPrevHash => self.establish_prev_hash(),
            ChunkState::Streaming {
                height,
                offset,
                prev_hash,
            } => self.consume_record(height, offset, prev_hash),
            terminal => terminal,
        };
        &self.state
    }

    /// Step until done or failed
    pub fn run(mut self) -> VerifyResult<ChunkSummary> {
        loop {
            match self.step() {
                ChunkState::Done(summary) => return Ok(summary.clone()),
                ChunkState::Failed(err) => return Err(err.clone()),
                _ => {}
            }
        }
    }

    fn establish_prev_hash(&mut self) -> ChunkState {
        if let Err(err) = check_parameters(self.params, self.window_size) {
            return ChunkState::Failed(err);
        }

        let mut known = BTreeMap::new();
        for (height, header) in self.window.iter() {
            match identity_hash(Some(header), self.params, self.hasher) {
                Ok(hash) => {
                    known.insert(*height, hash);
                }
                Err(err) => return ChunkState::Failed(err),
            }
        }
        self.known_hashes = known;

        let prev_hash = match self.start_height.checked_sub(1) {
            Some(prev_height) => match self.known_hashes.get(&prev_height) {
                Some(hash) => *hash,
                None => {
                    return ChunkState::Failed(VerifyError::MissingPredecessor {
                        height: prev_height,
                    })
                }
            },
            None => Hash256::zero(),
        };

        ChunkState::Streaming {
            height: self.start_height,
            offset: 0,
            prev_hash,
        }
    }

    fn consume_record(&mut self, height: u64, offset: usize, prev_hash: Hash256) -> ChunkState {
        if offset >= self.raw.len() {
            return self.finish(height, prev_hash);
        }

        let size = self.params.record_size_at(height);
        let raw = self.raw;
        let end = offset.saturating_add(size).min(raw.len());
        let record = &raw[offset..end];
        self.last_record_len = record.len();

        match self.verify_record(record, height, &prev_hash) {
            Ok(hash) => ChunkState::Streaming {
                height: height + 1,
                offset: offset + size,
                prev_hash: hash,
            },
            Err(err) => ChunkState::Failed(err),
        }
    }

    fn verify_record(
        &mut self,
        record: &[u8],
        height: u64,
        prev_hash: &Hash256,
    ) -> VerifyResult<Hash256> {
        let header = Header::deserialize(record, height, self.params)?;
        self.window.insert(header.clone());

        let target = resolve_target_with_window(
            height,
            self.params,
            self.window_size,
            self.checkpoints,
            &*self.window,
        )?;
        let expected = self.known_hashes.get(&height);
        let hash = verify_header(&header, self.params, self.hasher, prev_hash, &target, expected)?;

        debug!(height, epoch = %header.epoch, hash = %hash, "header verified");
        Ok(hash)
    }

    fn finish(&self, height: u64, tip_hash: Hash256) -> ChunkState {
        let valid_len = self.last_record_len == self.params.pre_extended_header_size
            || self.last_record_len == self.params.post_extended_header_size;
        if !valid_len {
            return ChunkState::Failed(VerifyError::format(format!(
                "invalid header length: {}",
                self.last_record_len
            )));
        }
        ChunkState::Done(ChunkSummary {
            start_height: self.start_height,
            header_count: height - self.start_height,
            tip_hash,
        })
    }
}

/// Reject parameter sets the walk cannot run with
fn check_parameters(params: &ConsensusParameters, window_size: u64) -> VerifyResult<()> {
    if window_size == 0 {
        return Err(VerifyError::invalid_parameters("retarget window size is zero"));
    }
    if params.pre_extended_header_size < PRE_EXTENDED_HEADER_SIZE
        || params.post_extended_header_size < POST_EXTENDED_HEADER_SIZE
        || params.pre_extended_header_size >= params.post_extended_header_size
    {
        return Err(VerifyError::invalid_parameters(format!(
            "record sizes {}/{} are inconsistent",
            params.pre_extended_header_size, params.post_extended_header_size
        )));
    }
    Ok(())
}

/// Verify a chunk of raw headers starting at `start_height`
///
/// `window` must hold the header at `start_height - 1` and, for heights past
/// DGW activation, the `dgw_window_size` headers the retarget reads. Verified
/// headers are added to it.
pub fn verify_chunk(
    params: &ConsensusParameters,
    hasher: &dyn PowHasher,
    window: &mut HeaderWindow,
    dgw_window_size: u64,
    start_height: u64,
    raw: &[u8],
    checkpoints: &CheckpointTable,
) -> VerifyResult<ChunkSummary> {
    let span = info_span!("verify_chunk", start_height, bytes = raw.len());
    let _guard = span.enter();

    let result = ChunkVerifier::new(params, hasher, checkpoints, window, start_height, raw)
        .with_window_size(dgw_window_size)
        .run();

    match &result {
        Ok(summary) => info!(
            headers = summary.header_count,
            tip = %summary.tip_hash,
            "chunk verified"
        ),
        Err(err) => warn!(kind = %err.kind(), error = %err, "chunk rejected"),
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{target_to_bits, Epoch, KawpowFields, Target};
    use assert_matches::assert_matches;
    use sha2::{Digest, Sha256};

    struct ZeroPrefixHasher;

    impl PowHasher for ZeroPrefixHasher {
        fn x16r(&self, header: &[u8]) -> [u8; 32] {
            let mut out: [u8; 32] = Sha256::digest(header).into();
            out[24..].fill(0);
            out
        }

        fn x16rv2(&self, header: &[u8]) -> [u8; 32] {
            self.x16r(header)
        }

        fn kawpow_light_verify(
            &self,
            header_hash: &[u8; 32],
            _: &[u8; 32],
            nonce: u64,
        ) -> [u8; 32] {
            let mut hasher = Sha256::new();
            hasher.update(header_hash);
            hasher.update(nonce.to_le_bytes());
            let mut out: [u8; 32] = hasher.finalize().into();
            out[..8].fill(0);
            out
        }
    }

    fn kawpow_header(height: u64, prev: Hash256, timestamp: u32, target: &Target) -> Header {
        Header {
            version: 0x3000_0000,
            prev_block_hash: prev,
            merkle_root: Hash256::from_display([height as u8; 32]),
            timestamp,
            bits: target_to_bits(target),
            nonce: height,
            kawpow: Some(KawpowFields {
                height: height as u32,
                mix_hash: Hash256::from_display([0xaa; 32]),
            }),
            epoch: Epoch::KawPow,
            block_height: height,
        }
    }

    /// Parent just below the reset window plus `count` encoded children
    fn reset_chunk(count: u64) -> (ConsensusParameters, HeaderWindow, Vec<u8>) {
        let params = ConsensusParameters::mainnet();
        let limit = params.kawpow_difficulty_limit.clone();
        let start = super::super::difficulty::KAWPOW_RESET_START;
        let ts = params.kawpow_activation_timestamp;

        let parent = kawpow_header(start - 1, Hash256::zero(), ts, &limit);
        let mut prev = identity_hash(Some(&parent), &params, &ZeroPrefixHasher).unwrap();
        let window: HeaderWindow = std::iter::once(parent).collect();

        let mut raw = Vec::new();
        for i in 0..count {
            let header = kawpow_header(start + i, prev, ts + 60 * (i as u32 + 1), &limit);
            prev = identity_hash(Some(&header), &params, &ZeroPrefixHasher).unwrap();
            raw.extend(header.serialize(&params).unwrap());
        }
        (params, window, raw)
    }

    fn verify(
        params: &ConsensusParameters,
        window: &mut HeaderWindow,
        start: u64,
        raw: &[u8],
    ) -> VerifyResult<ChunkSummary> {
        let checkpoints = CheckpointTable::new();
        verify_chunk(params, &ZeroPrefixHasher, window, 180, start, raw, &checkpoints)
    }

    #[test]
    fn test_state_transitions() {
        let (params, mut window, raw) = reset_chunk(2);
        let checkpoints = CheckpointTable::new();
        let start = super::super::difficulty::KAWPOW_RESET_START;
        let mut verifier =
            ChunkVerifier::new(&params, &ZeroPrefixHasher, &checkpoints, &mut window, start, &raw);

        assert_eq!(verifier.state(), &ChunkState::AwaitPrevHash);
        assert_matches!(verifier.step(), ChunkState::Streaming { offset: 0, .. });
        assert_matches!(verifier.step(), ChunkState::Streaming { offset: 120, .. });
        assert_matches!(verifier.step(), ChunkState::Streaming { offset: 240, .. });
        assert_matches!(verifier.step(), ChunkState::Done(ChunkSummary { header_count: 2, .. }));
        // terminal states are sticky
        assert_matches!(verifier.step(), ChunkState::Done(_));
    }

    #[test]
    fn test_verify_chunk_grows_window() {
        let (params, mut window, raw) = reset_chunk(3);
        let start = super::super::difficulty::KAWPOW_RESET_START;
        let summary = verify(&params, &mut window, start, &raw).unwrap();
        assert_eq!(summary.header_count, 3);
        assert_eq!(window.len(), 4);
        let tip = identity_hash(window.get(start + 2), &params, &ZeroPrefixHasher).unwrap();
        assert_eq!(summary.tip_hash, tip);
    }

    #[test]
    fn test_empty_chunk_is_format_error() {
        let (params, mut window, _) = reset_chunk(0);
        let start = super::super::difficulty::KAWPOW_RESET_START;
        assert_matches!(
            verify(&params, &mut window, start, &[]),
            Err(VerifyError::Format { .. })
        );
    }

    #[test]
    fn test_truncated_last_record() {
        let (params, mut window, raw) = reset_chunk(2);
        let start = super::super::difficulty::KAWPOW_RESET_START;
        let truncated = &raw[..raw.len() - 10];
        assert_matches!(
            verify(&params, &mut window, start, truncated),
            Err(VerifyError::Format { .. })
        );
        // the first header was verified and kept
        assert!(window.contains(start));
    }

    #[test]
    fn test_missing_predecessor() {
        let (params, _, raw) = reset_chunk(1);
        let start = super::super::difficulty::KAWPOW_RESET_START;
        let mut empty = HeaderWindow::new();
        assert_matches!(
            verify(&params, &mut empty, start, &raw),
            Err(VerifyError::MissingPredecessor { height }) if height == start - 1
        );
        assert!(empty.is_empty());
    }

    #[test]
    fn test_overlap_uses_known_hash() {
        let (params, mut window, raw) = reset_chunk(2);
        let start = super::super::difficulty::KAWPOW_RESET_START;
        verify(&params, &mut window, start, &raw).unwrap();

        // re-verifying the same bytes matches the hashes already in the window
        assert!(verify(&params, &mut window, start, &raw).is_ok());

        // a different header at a known height is a hash mismatch
        let mut replacement = window.get(start).cloned().unwrap();
        replacement.nonce += 1;
        let bytes = replacement.serialize(&params).unwrap();
        assert_matches!(
            verify(&params, &mut window, start, &bytes),
            Err(VerifyError::HashMismatch { .. })
        );
    }

    #[test]
    fn test_unusable_parameters_fail_before_streaming() {
        let (params, mut window, raw) = reset_chunk(1);
        let start = super::super::difficulty::KAWPOW_RESET_START;
        let checkpoints = CheckpointTable::new();

        let err =
            verify_chunk(&params, &ZeroPrefixHasher, &mut window, 0, start, &raw, &checkpoints)
                .unwrap_err();
        assert_matches!(err, VerifyError::InvalidParameters { .. });
        assert_eq!(err.kind(), crate::ErrorKind::Parameters);
        assert_eq!(window.len(), 1);

        let mut zero_sizes = params.clone();
        zero_sizes.pre_extended_header_size = 0;
        zero_sizes.post_extended_header_size = 0;
        assert_matches!(
            verify(&zero_sizes, &mut window, start, &raw),
            Err(VerifyError::InvalidParameters { .. })
        );
        assert_eq!(window.len(), 1);
    }
}
