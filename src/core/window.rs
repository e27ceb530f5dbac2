//! Recent-header window and checkpoint table

use super::encoding::Hash256;
use super::header::Header;
use super::target::Target;
use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

/// Headers per checkpoint chunk
pub const CHECKPOINT_INTERVAL: u64 = 2016;

/// Caller-owned map of recent headers by height
///
/// Seeded with at least the retarget window preceding a chunk and grown as
/// the chunk is verified.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct HeaderWindow {
    headers: BTreeMap<u64, Header>,
}

impl HeaderWindow {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, height: u64) -> Option<&Header> {
        self.headers.get(&height)
    }

    pub fn contains(&self, height: u64) -> bool {
        self.headers.contains_key(&height)
    }

    /// Insert under the header's own height, replacing any previous entry
    pub fn insert(&mut self, header: Header) -> Option<Header> {
        self.headers.insert(header.block_height, header)
    }

    pub fn len(&self) -> usize {
        self.headers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.headers.is_empty()
    }

    /// Highest height present
    pub fn tip_height(&self) -> Option<u64> {
        self.headers.keys().next_back().copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&u64, &Header)> {
        self.headers.iter()
    }

    /// Drop everything below `height`
    pub fn prune_below(&mut self, height: u64) {
        self.headers = self.headers.split_off(&height);
    }
}

impl FromIterator<Header> for HeaderWindow {
    fn from_iter<I: IntoIterator<Item = Header>>(iter: I) -> Self {
        let mut window = Self::new();
        for header in iter {
            window.insert(header);
        }
        window
    }
}

/// Trusted hash and target for one checkpoint chunk
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Checkpoint {
    pub hash: Hash256,
    pub target: Target,
}

/// Checkpoints keyed by chunk index (`height / 2016`)
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CheckpointTable {
    entries: BTreeMap<u64, Checkpoint>,
}

impl CheckpointTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from an ordered list, the position being the chunk index
    pub fn from_list(list: Vec<Checkpoint>) -> Self {
        Self {
            entries: (0u64..).zip(list).collect(),
        }
    }

    pub fn insert(&mut self, chunk_index: u64, checkpoint: Checkpoint) {
        self.entries.insert(chunk_index, checkpoint);
    }

    pub fn get(&self, chunk_index: u64) -> Option<&Checkpoint> {
        self.entries.get(&chunk_index)
    }

    /// Checkpoint covering `height`
    pub fn for_height(&self, height: u64) -> Option<&Checkpoint> {
        self.get(height / CHECKPOINT_INTERVAL)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Load a JSON array of `{ "hash": .., "target": .. }` entries
    pub fn load_json(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_json(&content)
    }

    pub fn from_json(content: &str) -> Result<Self> {
        let list: Vec<Checkpoint> = serde_json::from_str(content)?;
        if list.is_empty() {
            return Err(Error::config("checkpoint file contains no entries"));
        }
        Ok(Self::from_list(list))
    }
}
