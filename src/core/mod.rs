//! Core consensus types
//!
//! Header codec, digest and target types, network parameters and the
//! containers the verifier reads from.

pub mod encoding;
pub mod header;
pub mod params;
pub mod target;
pub mod window;

pub use encoding::{hash_encode, int_to_hex, rev_hex, Hash256};
pub use header::{Header, KawpowFields, HASHED_PREFIX_LEN};
pub use params::{ConsensusParameters, Epoch, DGW_WINDOW_SIZE};
pub use target::{bits_to_target, chainwork, target_to_bits, Target};
pub use window::{Checkpoint, CheckpointTable, HeaderWindow, CHECKPOINT_INTERVAL};
