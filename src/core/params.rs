//! Network consensus parameters and hashing epochs

use super::encoding::Hash256;
use super::target::Target;
use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Legacy header size in bytes
pub const PRE_EXTENDED_HEADER_SIZE: usize = 80;

/// Extended (KawPoW) header size in bytes
pub const POST_EXTENDED_HEADER_SIZE: usize = 120;

/// Blocks averaged by the Dark Gravity Wave retarget
pub const DGW_WINDOW_SIZE: u64 = 180;

const MAX_TARGET_HEX: &str = "00000fffffffffffffffffffffffffffffffffffffffffffffffffffffffffff";
const KAWPOW_LIMIT_HEX: &str = "0000000000ffffffffffffffffffffffffffffffffffffffffffffffffffffff";
const MAINNET_GENESIS: &str = "0000006b444bc2f2ffe627be9d9e7e7a0730000870ef6eb6da46c8eae389df90";
const TESTNET_GENESIS: &str = "000000ecfc5e6324a079542221d00e10362bdc894d56500c414060eea8a3ad5a";

/// Immutable parameter set for one network
///
/// Passed explicitly into every verification entry point.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConsensusParameters {
    /// Skip bits and work checks, use a zero target
    #[serde(default)]
    pub is_testnet: bool,

    /// First height delivered in the extended record size
    pub kawpow_activation_height: u64,

    /// Heights below this take their target from the checkpoint table
    pub dgw_activation_height: u64,

    /// Headers at or after this timestamp use the KawPoW layout and hash
    pub kawpow_activation_timestamp: u32,

    /// Headers at or after this timestamp (and before KawPoW) use X16Rv2
    pub x16rv2_activation_timestamp: u32,

    #[serde(default = "default_pre_size")]
    pub pre_extended_header_size: usize,

    #[serde(default = "default_post_size")]
    pub post_extended_header_size: usize,

    #[serde(default = "default_window_size")]
    pub dgw_window_size: u64,

    /// Fixed target during the KawPoW difficulty reset
    #[serde(default = "default_kawpow_limit")]
    pub kawpow_difficulty_limit: Target,

    /// Easiest permitted target
    #[serde(default = "default_max_target")]
    pub max_target: Target,

    /// Identity hash of the block at height 0, when known
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub genesis_hash: Option<Hash256>,
}

impl ConsensusParameters {
    /// Main network
    pub fn mainnet() -> Self {
        Self {
            is_testnet: false,
            kawpow_activation_height: 1_219_736,
            dgw_activation_height: 338_778,
            kawpow_activation_timestamp: 1_588_788_000,
            x16rv2_activation_timestamp: 1_569_945_600,
            pre_extended_header_size: PRE_EXTENDED_HEADER_SIZE,
            post_extended_header_size: POST_EXTENDED_HEADER_SIZE,
            dgw_window_size: DGW_WINDOW_SIZE,
            kawpow_difficulty_limit: default_kawpow_limit(),
            max_target: default_max_target(),
            genesis_hash: Hash256::from_hex(MAINNET_GENESIS).ok(),
        }
    }

    /// Test network
    pub fn testnet() -> Self {
        Self {
            is_testnet: true,
            kawpow_activation_height: 231_544,
            dgw_activation_height: 1,
            kawpow_activation_timestamp: 1_585_159_200,
            x16rv2_activation_timestamp: 1_567_533_600,
            genesis_hash: Hash256::from_hex(TESTNET_GENESIS).ok(),
            ..Self::mainnet()
        }
    }

    /// Record size for a header delivered at `height`
    pub fn record_size_at(&self, height: u64) -> usize {
        if height < self.kawpow_activation_height {
            self.pre_extended_header_size
        } else {
            self.post_extended_header_size
        }
    }

    /// Check the parameter set is internally consistent
    pub fn validate(&self) -> Result<()> {
        if self.dgw_window_size == 0 {
            return Err(Error::config("DGW window size must be greater than 0"));
        }
        if self.pre_extended_header_size < PRE_EXTENDED_HEADER_SIZE {
            return Err(Error::config(format!(
                "Legacy header size must be at least {} bytes",
                PRE_EXTENDED_HEADER_SIZE
            )));
        }
        if self.post_extended_header_size < POST_EXTENDED_HEADER_SIZE {
            return Err(Error::config(format!(
                "Extended header size must be at least {} bytes",
                POST_EXTENDED_HEADER_SIZE
            )));
        }
        if self.pre_extended_header_size >= self.post_extended_header_size {
            return Err(Error::config(
                "Legacy header size must be smaller than extended header size",
            ));
        }
        if self.max_target.is_zero() {
            return Err(Error::config("Max target must be non-zero"));
        }
        if self.kawpow_difficulty_limit > self.max_target {
            return Err(Error::config("KawPoW difficulty limit exceeds max target"));
        }
        if self.x16rv2_activation_timestamp > self.kawpow_activation_timestamp {
            return Err(Error::config(
                "X16Rv2 activation must not be later than KawPoW activation",
            ));
        }
        Ok(())
    }
}

impl Default for ConsensusParameters {
    fn default() -> Self {
        Self::mainnet()
    }
}

/// Hashing epoch of a header, decided by its timestamp
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Epoch {
    X16r,
    X16rv2,
    KawPow,
}

impl Epoch {
    pub fn for_timestamp(timestamp: u32, params: &ConsensusParameters) -> Self {
        if timestamp >= params.kawpow_activation_timestamp {
            Epoch::KawPow
        } else if timestamp >= params.x16rv2_activation_timestamp {
            Epoch::X16rv2
        } else {
            Epoch::X16r
        }
    }

    /// Whether headers of this epoch use the extended layout
    pub fn is_extended(&self) -> bool {
        matches!(self, Epoch::KawPow)
    }
}

impl fmt::Display for Epoch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Epoch::X16r => write!(f, "x16r"),
            Epoch::X16rv2 => write!(f, "x16rv2"),
            Epoch::KawPow => write!(f, "kawpow"),
        }
    }
}

fn default_pre_size() -> usize { PRE_EXTENDED_HEADER_SIZE }
fn default_post_size() -> usize { POST_EXTENDED_HEADER_SIZE }
fn default_window_size() -> u64 { DGW_WINDOW_SIZE }
fn default_max_target() -> Target { hex_target(MAX_TARGET_HEX) }
fn default_kawpow_limit() -> Target { hex_target(KAWPOW_LIMIT_HEX) }

fn hex_target(s: &str) -> Target {
    Target::from_hex(s).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_presets_are_valid() {
        assert!(ConsensusParameters::mainnet().validate().is_ok());
        assert!(ConsensusParameters::testnet().validate().is_ok());
    }

    #[test]
    fn test_preset_targets() {
        let params = ConsensusParameters::mainnet();
        assert_eq!(params.max_target.to_hex(), MAX_TARGET_HEX);
        assert_eq!(params.kawpow_difficulty_limit.to_hex(), KAWPOW_LIMIT_HEX);
        assert!(!params.is_testnet);
        assert!(ConsensusParameters::testnet().is_testnet);
        assert_eq!(
            params.genesis_hash.map(|h| h.to_hex()).as_deref(),
            Some(MAINNET_GENESIS)
        );
        assert_eq!(
            ConsensusParameters::testnet().genesis_hash.map(|h| h.to_hex()).as_deref(),
            Some(TESTNET_GENESIS)
        );
    }

    #[test]
    fn test_epoch_boundaries() {
        let params = ConsensusParameters::mainnet();
        let v2 = params.x16rv2_activation_timestamp;
        let kp = params.kawpow_activation_timestamp;
        assert_eq!(Epoch::for_timestamp(v2 - 1, &params), Epoch::X16r);
        assert_eq!(Epoch::for_timestamp(v2, &params), Epoch::X16rv2);
        assert_eq!(Epoch::for_timestamp(kp - 1, &params), Epoch::X16rv2);
        assert_eq!(Epoch::for_timestamp(kp, &params), Epoch::KawPow);
        assert!(Epoch::KawPow.is_extended());
        assert!(!Epoch::X16rv2.is_extended());
    }

    #[test]
    fn test_record_size_at() {
        let params = ConsensusParameters::mainnet();
        assert_eq!(params.record_size_at(1_219_735), 80);
        assert_eq!(params.record_size_at(1_219_736), 120);
    }

    #[test]
    fn test_validate_rejects_inconsistent_sets() {
        let mut params = ConsensusParameters::mainnet();
        params.dgw_window_size = 0;
        assert!(params.validate().is_err());

        let mut params = ConsensusParameters::mainnet();
        params.post_extended_header_size = 80;
        assert!(params.validate().is_err());

        let mut params = ConsensusParameters::mainnet();
        params.kawpow_difficulty_limit = Target::from_hex(&"f".repeat(64)).unwrap();
        assert!(params.validate().is_err());

        let mut params = ConsensusParameters::mainnet();
        params.x16rv2_activation_timestamp = params.kawpow_activation_timestamp + 1;
        assert!(params.validate().is_err());
    }

    #[test]
    fn test_deserialize_with_defaults() {
        let yaml = r#"
kawpow_activation_height: 100
dgw_activation_height: 10
kawpow_activation_timestamp: 2000
x16rv2_activation_timestamp: 1000
"#;
        let params: ConsensusParameters = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(params.pre_extended_header_size, 80);
        assert_eq!(params.dgw_window_size, 180);
        assert_eq!(params.max_target, ConsensusParameters::mainnet().max_target);
        assert!(params.genesis_hash.is_none());
        assert!(params.validate().is_ok());
    }
}
