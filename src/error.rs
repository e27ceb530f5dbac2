//! Error handling for header verification
//!
//! Consensus failures are reported through [`VerifyError`], a closed set of
//! structured values that can cross the worker boundary unchanged. Everything
//! around verification (configuration, I/O, channels) is covered by [`Error`].

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Result type alias for crate operations
pub type Result<T> = std::result::Result<T, Error>;

/// Result type alias for consensus checks
pub type VerifyResult<T> = std::result::Result<T, VerifyError>;

/// Coarse classification of a verification failure
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    Format,
    Range,
    Lookup,
    MissingPredecessor,
    HashMismatch,
    LinkageMismatch,
    BitsMismatch,
    InsufficientWork,
    InvalidCompact,
    Parameters,
}

impl ErrorKind {
    /// Stable string code for logs and reports
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::Format => "format",
            ErrorKind::Range => "range",
            ErrorKind::Lookup => "lookup",
            ErrorKind::MissingPredecessor => "missing_predecessor",
            ErrorKind::HashMismatch => "hash_mismatch",
            ErrorKind::LinkageMismatch => "linkage_mismatch",
            ErrorKind::BitsMismatch => "bits_mismatch",
            ErrorKind::InsufficientWork => "insufficient_work",
            ErrorKind::InvalidCompact => "invalid_compact",
            ErrorKind::Parameters => "parameters",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A header or chunk failed a consensus check
///
/// Hashes and targets are carried as display-order hex so the value can be
/// logged or serialized without further context.
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum VerifyError {
    /// Raw bytes do not form a header record
    #[error("Malformed header: {reason}")]
    Format { reason: String },

    /// Integer does not fit the requested fixed width
    #[error("Cannot convert {value} to hex ({length} bytes)")]
    Range { value: String, length: usize },

    /// No checkpoint covers the requested height
    #[error("No checkpoint for height {height} (chunk {chunk_index})")]
    MissingCheckpoint { height: u64, chunk_index: u64 },

    /// Retarget window is missing a required header
    #[error("Header window has no entry for height {height}")]
    MissingHeader { height: u64 },

    /// Chunk predecessor is not in the window
    #[error("No previous hash (wanted height {height})")]
    MissingPredecessor { height: u64 },

    #[error("Hash mismatch at height {height}: expected {expected}, got {actual}")]
    HashMismatch {
        height: u64,
        expected: String,
        actual: String,
    },

    #[error("Previous hash mismatch at height {height}: expected {expected}, got {actual}")]
    LinkageMismatch {
        height: u64,
        expected: String,
        actual: String,
    },

    #[error("Bits mismatch at height {height}: expected {expected:#010x}, got {actual:#010x}")]
    BitsMismatch {
        height: u64,
        expected: u32,
        actual: u32,
    },

    #[error("Insufficient proof of work at height {height}: {pow_hash} above target {target}")]
    InsufficientWork {
        height: u64,
        pow_hash: String,
        target: String,
    },

    /// Compact encoding rejected by the strict decoder
    #[error("Invalid compact target {bits:#010x}: {reason}")]
    InvalidCompact { bits: u32, reason: String },

    /// Parameters a job was submitted with cannot drive verification
    #[error("Invalid verification parameters: {reason}")]
    InvalidParameters { reason: String },
}

impl VerifyError {
    /// Create a format error
    pub fn format(reason: impl Into<String>) -> Self {
        Self::Format {
            reason: reason.into(),
        }
    }

    /// Create a compact-encoding error
    pub fn invalid_compact(bits: u32, reason: impl Into<String>) -> Self {
        Self::InvalidCompact {
            bits,
            reason: reason.into(),
        }
    }

    /// Create a parameter error
    pub fn invalid_parameters(reason: impl Into<String>) -> Self {
        Self::InvalidParameters {
            reason: reason.into(),
        }
    }

    /// Classify the failure
    pub fn kind(&self) -> ErrorKind {
        match self {
            VerifyError::Format { .. } => ErrorKind::Format,
            VerifyError::Range { .. } => ErrorKind::Range,
            VerifyError::MissingCheckpoint { .. } | VerifyError::MissingHeader { .. } => {
                ErrorKind::Lookup
            }
            VerifyError::MissingPredecessor { .. } => ErrorKind::MissingPredecessor,
            VerifyError::HashMismatch { .. } => ErrorKind::HashMismatch,
            VerifyError::LinkageMismatch { .. } => ErrorKind::LinkageMismatch,
            VerifyError::BitsMismatch { .. } => ErrorKind::BitsMismatch,
            VerifyError::InsufficientWork { .. } => ErrorKind::InsufficientWork,
            VerifyError::InvalidCompact { .. } => ErrorKind::InvalidCompact,
            VerifyError::InvalidParameters { .. } => ErrorKind::Parameters,
        }
    }

    /// Height the failure refers to, when there is one
    pub fn height(&self) -> Option<u64> {
        match self {
            VerifyError::MissingCheckpoint { height, .. }
            | VerifyError::MissingHeader { height }
            | VerifyError::MissingPredecessor { height }
            | VerifyError::HashMismatch { height, .. }
            | VerifyError::LinkageMismatch { height, .. }
            | VerifyError::BitsMismatch { height, .. }
            | VerifyError::InsufficientWork { height, .. } => Some(*height),
            _ => None,
        }
    }
}

/// Main error type for the verifier
#[derive(Error, Debug)]
pub enum Error {
    /// Consensus verification failures
    #[error(transparent)]
    Verify(#[from] VerifyError),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// YAML configuration parsing errors
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration errors
    #[error("Configuration error: {message}")]
    Config { message: String },

    /// Job channel closed before the job could be queued
    #[error("Failed to submit job: {message}")]
    ChannelSend { message: String },

    /// Result channel closed while waiting
    #[error("Failed to receive result: {message}")]
    ChannelRecv { message: String },

    /// Worker thread errors
    #[error("Worker error: {message}")]
    Worker { message: String },
}

impl Error {
    /// Create a configuration error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Create a channel send error
    pub fn channel_send(message: impl Into<String>) -> Self {
        Self::ChannelSend {
            message: message.into(),
        }
    }

    /// Create a channel receive error
    pub fn channel_recv(message: impl Into<String>) -> Self {
        Self::ChannelRecv {
            message: message.into(),
        }
    }

    /// Create a worker error
    pub fn worker(message: impl Into<String>) -> Self {
        Self::Worker {
            message: message.into(),
        }
    }

    /// Get error category for logging
    pub fn category(&self) -> &'static str {
        match self {
            Error::Verify(e) => e.kind().as_str(),
            Error::Json(_) => "json",
            Error::Yaml(_) => "yaml",
            Error::Io(_) => "io",
            Error::Config { .. } => "config",
            Error::ChannelSend { .. } => "channel_send",
            Error::ChannelRecv { .. } => "channel_recv",
            Error::Worker { .. } => "worker",
        }
    }
}
