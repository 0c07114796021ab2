//! Binary Merkle trees over SHA-384.
//!
//! Leaves are hashed with [`leaf_hash`] and inner nodes with [`merkle_hash`]. A level holding an odd number of
//! hashes pairs its last hash with the root of an empty subtree of the same depth, [`EMPTY_HASHES`], which
//! makes every tree equivalent to the complete tree padded with empty leaves.

mod concurrent;
mod error;
mod naive;

use blockstream_core::task::Task;
use blockstream_hashes::{Hash, Hasher, HasherBase, Sha384Hasher, ZERO_HASH};
use bytes::Bytes;
use once_cell::sync::Lazy;

pub use concurrent::ConcurrentStreamingTreeHasher;
pub use error::{MerkleError, MerkleResult};
pub use naive::NaiveStreamingTreeHasher;

/// Number of precomputed empty subtree hashes, covering depths `0..MAX_DEPTH`
pub const MAX_DEPTH: usize = 24;
/// Largest number of leaves a single tree accepts
pub const MAX_LEAVES: u64 = 1 << (MAX_DEPTH - 1);

pub const DEFAULT_LEAF_CHUNK_SIZE: usize = 16;
pub const DEFAULT_COMBINATION_CHUNK_SIZE: usize = 32;

/// `EMPTY_HASHES[0] = SHA384("")` and `EMPTY_HASHES[d] = SHA384(EMPTY_HASHES[d - 1] || EMPTY_HASHES[d - 1])`
pub static EMPTY_HASHES: Lazy<[Hash; MAX_DEPTH]> = Lazy::new(|| {
    let mut hashes = [ZERO_HASH; MAX_DEPTH];
    hashes[0] = leaf_hash(b"");
    for depth in 1..MAX_DEPTH {
        hashes[depth] = merkle_hash(hashes[depth - 1], hashes[depth - 1]);
    }
    hashes
});

/// An incremental Merkle root accumulator fed by a single producer.
///
/// Leaves must be added in order. The root is requested exactly once, after which the hasher rejects
/// any further call.
pub trait StreamingTreeHasher: Send {
    fn add_leaf(&mut self, leaf: Bytes) -> MerkleResult<()>;

    /// Finalizes the tree. The returned task resolves to the root of all leaves added so far.
    fn root_hash(&mut self) -> MerkleResult<Task<Hash, MerkleError>>;

    fn num_leaves(&self) -> u64;
}

#[inline]
pub fn leaf_hash(leaf: impl AsRef<[u8]>) -> Hash {
    Sha384Hasher::hash(leaf)
}

#[inline]
pub fn merkle_hash(left: Hash, right: Hash) -> Hash {
    let mut hasher = Sha384Hasher::new();
    hasher.update(left).update(right);
    hasher.finalize()
}

/// The depth of the root for a tree of `num_leaves` leaves, where leaf hashes sit at depth 0
#[inline]
pub fn max_depth(num_leaves: u64) -> usize {
    num_leaves.max(1).next_power_of_two().trailing_zeros() as usize
}

/// Pairs `hashes` left to right into the next level, padding an odd tail with the empty subtree hash of `depth`
pub(crate) fn combine_level(hashes: &[Hash], depth: usize) -> Vec<Hash> {
    hashes.chunks(2).map(|pair| merkle_hash(pair[0], pair.get(1).copied().unwrap_or(EMPTY_HASHES[depth]))).collect()
}

/// Computes the root over already hashed leaves sequentially
pub fn calc_merkle_root(hashes: impl ExactSizeIterator<Item = Hash>) -> Hash {
    let mut level = match hashes.len() {
        0 => return EMPTY_HASHES[0],
        _ => hashes.collect::<Vec<_>>(),
    };
    let mut depth = 0;
    while level.len() > 1 {
        level = combine_level(&level, depth);
        depth += 1;
    }
    level[0]
}
