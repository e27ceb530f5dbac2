//! Expected-target resolution
//!
//! The expected target for a height comes from one of four sources, checked
//! in order: testnet (zero), the checkpoint table before DGW activation, the
//! fixed limit during the KawPoW difficulty reset, and otherwise the Dark
//! Gravity Wave v3 retarget over the preceding headers.

use crate::core::{bits_to_target, CheckpointTable, ConsensusParameters, HeaderWindow, Target};
use crate::error::{VerifyError, VerifyResult};
use num_bigint::BigUint;

/// First height of the KawPoW difficulty reset
pub const KAWPOW_RESET_START: u64 = 1_219_736;

/// Heights covered by the KawPoW difficulty reset
pub const KAWPOW_RESET_LEN: u64 = 180;

/// Target spacing in seconds
const TARGET_SPACING: i64 = 60;

/// Expected target at `height`, averaging over `params.dgw_window_size` blocks
pub fn resolve_target(
    height: u64,
    params: &ConsensusParameters,
    checkpoints: &CheckpointTable,
    window: &HeaderWindow,
) -> VerifyResult<Target> {
    resolve_target_with_window(height, params, params.dgw_window_size, checkpoints, window)
}

/// Expected target at `height` with an explicit retarget window size
pub fn resolve_target_with_window(
    height: u64,
    params: &ConsensusParameters,
    window_size: u64,
    checkpoints: &CheckpointTable,
    window: &HeaderWindow,
) -> VerifyResult<Target> {
    if params.is_testnet {
        return Ok(Target::zero());
    }

    if height < params.dgw_activation_height {
        return checkpoints
            .for_height(height)
            .map(|cp| cp.target.clone())
            .ok_or(VerifyError::MissingCheckpoint {
                height,
                chunk_index: height / crate::core::CHECKPOINT_INTERVAL,
            });
    }

    if in_kawpow_reset(height) {
        return Ok(params.kawpow_difficulty_limit.clone());
    }

    dark_gravity_wave(height, window_size, &params.max_target, window)
}

/// Whether `height` falls in the KawPoW difficulty reset
pub fn in_kawpow_reset(height: u64) -> bool {
    (KAWPOW_RESET_START..KAWPOW_RESET_START + KAWPOW_RESET_LEN).contains(&height)
}

/// Dark Gravity Wave v3 over the `window_size` headers preceding `height`
///
/// Walks backwards from `height - 1`, keeping a running average of the
/// decoded targets and summing the (signed) gaps between consecutive
/// timestamps. The summed timespan is clamped to a third and three times the
/// expected timespan before scaling the average.
pub fn dark_gravity_wave(
    height: u64,
    window_size: u64,
    max_target: &Target,
    window: &HeaderWindow,
) -> VerifyResult<Target> {
    if window_size == 0 {
        return Err(VerifyError::invalid_parameters("retarget window size is zero"));
    }

    let mut average = BigUint::default();
    let mut actual_timespan: i64 = 0;
    let mut last_timestamp: Option<i64> = None;

    for count in 1..=window_size {
        let reading_height = height
            .checked_sub(count)
            .ok_or(VerifyError::MissingHeader { height: 0 })?;
        let reading = window.get(reading_height).ok_or(VerifyError::MissingHeader {
            height: reading_height,
        })?;

        let block_target = bits_to_target(reading.bits).into_biguint();
        average = if count == 1 {
            block_target
        } else {
            (average * count + block_target) / (count + 1)
        };

        let timestamp = i64::from(reading.timestamp);
        if let Some(last) = last_timestamp {
            actual_timespan += last - timestamp;
        }
        last_timestamp = Some(timestamp);
    }

    let target_timespan = window_size as i64 * TARGET_SPACING;
    let actual_timespan = actual_timespan
        .max(target_timespan / 3)
        .min(target_timespan * 3);

    let retargeted = average * actual_timespan.unsigned_abs() / target_timespan.unsigned_abs();
    let bounded = retargeted.min(max_target.as_biguint().clone());
    Ok(Target::new(bounded))
}
