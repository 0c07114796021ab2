pub mod info;
pub mod items;
pub mod stores;

use blockstream_hashes::{Hash, Hasher, HasherBase, Sha384Hasher};
use borsh::{BorshDeserialize, BorshSerialize};
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};

pub use info::BlockStreamInfo;
pub use items::{BlockItem, BlockItemKind, TreeKind};

/// Consensus time with nanosecond precision
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, BorshSerialize, BorshDeserialize)]
pub struct Timestamp {
    pub seconds: i64,
    pub nanos: u32,
}

impl Timestamp {
    pub const fn new(seconds: i64, nanos: u32) -> Self {
        Self { seconds, nanos }
    }
}

impl Display for Timestamp {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}.{:09}", self.seconds, self.nanos)
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, BorshSerialize, BorshDeserialize)]
pub struct SemanticVersion {
    pub major: u32,
    pub minor: u32,
    pub patch: u32,
}

impl Display for SemanticVersion {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)
    }
}

/// A consensus round as handed over by the consensus layer
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Round {
    pub number: u64,
    pub consensus_timestamp: Timestamp,
}

impl Round {
    pub fn new(number: u64, consensus_timestamp: Timestamp) -> Self {
        Self { number, consensus_timestamp }
    }
}

/// The outcome of a completed round
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClosedBlock {
    pub number: u64,
    pub previous_block_hash: Hash,
    pub input_root: Hash,
    pub output_root: Hash,
    pub block_hash: Hash,
    pub timestamp: Timestamp,
}

/// `SHA384(previous_block_hash || input_root || output_root)`
pub fn block_hash(previous_block_hash: &Hash, input_root: &Hash, output_root: &Hash) -> Hash {
    let mut hasher = Sha384Hasher::new();
    hasher.update(previous_block_hash).update(input_root).update(output_root);
    hasher.finalize()
}

#[cfg(test)]
mod tests {
    use super::*;
    use blockstream_hashes::ZERO_HASH;

    #[test]
    fn test_block_hash() {
        let input_root = Hash::sha384_of(b"in");
        let output_root = Hash::sha384_of(b"out");
        let mut concat = ZERO_HASH.as_slice().to_vec();
        concat.extend_from_slice(input_root.as_slice());
        concat.extend_from_slice(output_root.as_slice());
        assert_eq!(block_hash(&ZERO_HASH, &input_root, &output_root), Hash::sha384_of(&concat));
        assert_ne!(block_hash(&ZERO_HASH, &output_root, &input_root), block_hash(&ZERO_HASH, &input_root, &output_root));
    }

    #[test]
    fn test_display() {
        assert_eq!(Timestamp::new(1_700_000_000, 42).to_string(), "1700000000.000000042");
        assert_eq!(SemanticVersion { major: 0, minor: 56, patch: 1 }.to_string(), "0.56.1");
    }
}
