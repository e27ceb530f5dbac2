//! Header and chunk verification

pub mod chunk;
pub mod difficulty;
pub mod pow;

pub use chunk::{verify_chunk, ChunkState, ChunkSummary, ChunkVerifier};
pub use difficulty::{
    dark_gravity_wave, in_kawpow_reset, resolve_target, resolve_target_with_window,
    KAWPOW_RESET_LEN, KAWPOW_RESET_START,
};
pub use pow::{can_connect, identity_hash, sha256d, verify_header, PowHasher};
