//! Configuration management for the header verifier
//!
//! Supports configuration via command line arguments, environment variables,
//! and configuration files (YAML/JSON). A file may carry a complete
//! `consensus` parameter set, which replaces the network preset.

use crate::core::{CheckpointTable, ConsensusParameters};
use crate::{Error, Result};
use clap::{Parser, Subcommand, ValueEnum};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};

/// Built-in parameter presets
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Network {
    Mainnet,
    Testnet,
}

impl Network {
    pub fn parameters(&self) -> ConsensusParameters {
        match self {
            Network::Mainnet => ConsensusParameters::mainnet(),
            Network::Testnet => ConsensusParameters::testnet(),
        }
    }
}

impl fmt::Display for Network {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Network::Mainnet => write!(f, "mainnet"),
            Network::Testnet => write!(f, "testnet"),
        }
    }
}

/// Log levels
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    /// Directive for `EnvFilter`
    pub fn as_filter(&self) -> &'static str {
        match self {
            LogLevel::Error => "error",
            LogLevel::Warn => "warn",
            LogLevel::Info => "info",
            LogLevel::Debug => "debug",
            LogLevel::Trace => "trace",
        }
    }
}

/// Log output formats
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    Plain,
    Json,
    Pretty,
}

/// Offline header and target tools
#[derive(Debug, Clone, Subcommand)]
pub enum Command {
    /// Decode a hex header record and print it as JSON
    Decode {
        /// Header record as hex (80 or 120 bytes)
        hex: String,
        /// Height the header sits at
        #[arg(long, default_value = "0")]
        height: u64,
    },
    /// Expand compact bits into a target
    Bits {
        /// Compact value, hex (0x1d00ffff) or decimal
        bits: String,
    },
    /// Compress a target into compact bits
    TargetBits {
        /// Target as big-endian hex
        target: String,
    },
    /// Compute the expected target at a height from a file of headers
    ResolveTarget {
        /// Height to resolve
        height: u64,
        /// File with one hex header record per line, consecutive heights
        #[arg(long, value_name = "FILE")]
        headers: Option<PathBuf>,
        /// Height of the first record in the headers file
        #[arg(long, default_value = "0")]
        first_height: u64,
    },
}

/// Complete configuration for the verifier
#[derive(Debug, Clone, Parser, Serialize, Deserialize)]
#[command(
    name = "header-verifier",
    version = env!("CARGO_PKG_VERSION"),
    about = "Epoch-aware block header verification tools",
    long_about = "Decode headers, convert compact targets and resolve expected difficulty targets for X16R, X16Rv2 and KawPoW headers"
)]
pub struct Config {
    /// Print the parsed configuration and exit
    #[arg(long)]
    #[serde(skip)]
    pub print_config: bool,

    /// Configuration file path (YAML or JSON)
    #[arg(long, value_name = "FILE", env = "HEADER_VERIFIER_CONFIG")]
    #[serde(skip)]
    pub config_file: Option<PathBuf>,

    /// Network parameter preset
    #[arg(short = 'n', long, default_value = "mainnet", env = "HEADER_VERIFIER_NETWORK")]
    #[serde(default = "default_network")]
    pub network: Network,

    /// Checkpoint table (JSON array of hash/target entries)
    #[arg(long, value_name = "FILE", env = "HEADER_VERIFIER_CHECKPOINTS")]
    #[serde(default)]
    pub checkpoints: Option<PathBuf>,

    /// Log level
    #[arg(short = 'l', long, default_value = "info")]
    #[serde(default = "default_log_level")]
    pub log_level: LogLevel,

    /// Log output format
    #[arg(long, default_value = "plain")]
    #[serde(default = "default_log_format")]
    pub log_format: LogFormat,

    /// Explicit consensus parameters, only settable from a file
    #[arg(skip)]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub consensus: Option<ConsensusParameters>,

    #[command(subcommand)]
    #[serde(skip)]
    pub command: Option<Command>,
}

impl Config {
    /// Parse arguments, merge the config file if given, and validate
    pub fn load() -> Result<Self> {
        let mut config = Self::parse();

        if let Some(config_file) = &config.config_file {
            let file_config = Self::load_from_file(config_file)?;
            config = config.merge_with_file(file_config);
        }

        config.validate()?;
        Ok(config)
    }

    /// Load configuration from file
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;

        if path.extension().and_then(|s| s.to_str()) == Some("json") {
            serde_json::from_str(&content).map_err(Error::from)
        } else {
            // Default to YAML
            serde_yaml::from_str(&content).map_err(Error::from)
        }
    }

    /// Merge CLI config with file config (CLI takes precedence)
    fn merge_with_file(mut self, file_config: Self) -> Self {
        if self.checkpoints.is_none() {
            self.checkpoints = file_config.checkpoints;
        }
        if self.consensus.is_none() {
            self.consensus = file_config.consensus;
        }
        // Other fields always carry a CLI value (possibly the default)
        self
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        self.consensus_parameters().validate()?;

        if let Some(path) = &self.checkpoints {
            if !path.is_file() {
                return Err(Error::config(format!(
                    "Checkpoint file not found: {}",
                    path.display()
                )));
            }
        }

        Ok(())
    }

    /// Effective consensus parameters
    pub fn consensus_parameters(&self) -> ConsensusParameters {
        self.consensus
            .clone()
            .unwrap_or_else(|| self.network.parameters())
    }

    /// Checkpoint table, empty when no file is configured
    pub fn checkpoint_table(&self) -> Result<CheckpointTable> {
        match &self.checkpoints {
            Some(path) => CheckpointTable::load_json(path),
            None => Ok(CheckpointTable::new()),
        }
    }
}

// Default value functions for serde
fn default_network() -> Network { Network::Mainnet }
fn default_log_level() -> LogLevel { LogLevel::Info }
fn default_log_format() -> LogFormat { LogFormat::Plain }
