use crate::{MAX_LEAVES, MerkleError, MerkleResult, StreamingTreeHasher, calc_merkle_root, leaf_hash};
use blockstream_core::task::Task;
use blockstream_hashes::Hash;
use bytes::Bytes;

/// Sequential tree hasher keeping every leaf hash in memory
#[derive(Default)]
pub struct NaiveStreamingTreeHasher {
    leaf_hashes: Vec<Hash>,
    finalized: bool,
}

impl NaiveStreamingTreeHasher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_leaf_hash(&mut self, hash: Hash) -> MerkleResult<()> {
        if self.finalized {
            return Err(MerkleError::LeafAfterFinalization);
        }
        if self.leaf_hashes.len() as u64 == MAX_LEAVES {
            return Err(MerkleError::CapacityExceeded(MAX_LEAVES));
        }
        self.leaf_hashes.push(hash);
        Ok(())
    }

    /// Finalizes the tree and computes its root on the calling thread
    pub fn finalize(&mut self) -> MerkleResult<Hash> {
        if self.finalized {
            return Err(MerkleError::AlreadyFinalized);
        }
        self.finalized = true;
        Ok(calc_merkle_root(self.leaf_hashes.iter().copied()))
    }
}

impl StreamingTreeHasher for NaiveStreamingTreeHasher {
    fn add_leaf(&mut self, leaf: Bytes) -> MerkleResult<()> {
        self.add_leaf_hash(leaf_hash(&leaf))
    }

    fn root_hash(&mut self) -> MerkleResult<Task<Hash, MerkleError>> {
        Ok(Task::ok(self.finalize()?))
    }

    fn num_leaves(&self) -> u64 {
        self.leaf_hashes.len() as u64
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{EMPTY_HASHES, merkle_hash};

    #[test]
    fn test_naive_hasher() {
        assert_eq!(NaiveStreamingTreeHasher::new().finalize(), Ok(EMPTY_HASHES[0]));

        let mut hasher = NaiveStreamingTreeHasher::new();

        for leaf in [&b"A"[..], b"B", b"C"] {
            hasher.add_leaf(Bytes::copy_from_slice(leaf)).unwrap();
        }
        assert_eq!(hasher.num_leaves(), 3);
        let expected = merkle_hash(merkle_hash(leaf_hash(b"A"), leaf_hash(b"B")), merkle_hash(leaf_hash(b"C"), EMPTY_HASHES[0]));
        assert_eq!(hasher.finalize(), Ok(expected));
        assert_eq!(hasher.finalize(), Err(MerkleError::AlreadyFinalized));
        assert_eq!(hasher.add_leaf(Bytes::from_static(b"D")), Err(MerkleError::LeafAfterFinalization));
    }
}
