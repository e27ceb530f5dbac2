//! Ravencoin Header Verifier
//!
//! Validates block headers of a proof-of-work chain across its three hashing
//! epochs:
//! - X16R legacy headers (80 bytes)
//! - X16Rv2 legacy headers (80 bytes)
//! - KawPoW extended headers (120 bytes, with height and mix hash)
//!
//! Covers the header codec, expected-target resolution (checkpoints, the
//! KawPoW difficulty reset and Dark Gravity Wave v3), per-header and per-chunk
//! verification, and a background worker for chunk verification. The epoch
//! hash functions are supplied by the caller through [`PowHasher`].

pub mod config;
pub mod core;
pub mod error;
pub mod utils;
pub mod verify;
pub mod worker;

pub use config::Config;
pub use error::{Error, ErrorKind, Result, VerifyError, VerifyResult};
pub use verify::PowHasher;
pub use worker::{ChunkJob, ChunkReport, ChunkResult, VerificationWorker, WorkerMessage};

/// Application information
pub const APP_NAME: &str = "header-verifier";
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");
pub const APP_DESCRIPTION: &str = env!("CARGO_PKG_DESCRIPTION");
