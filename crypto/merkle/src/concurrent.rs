use crate::{
    DEFAULT_COMBINATION_CHUNK_SIZE, DEFAULT_LEAF_CHUNK_SIZE, EMPTY_HASHES, MAX_LEAVES, MerkleError, MerkleResult, StreamingTreeHasher,
    combine_level, leaf_hash, max_depth,
};
use blockstream_core::{
    task::{Task, TaskChain, TaskExecutor},
    trace,
};
use blockstream_hashes::Hash;
use bytes::Bytes;
use std::mem;

/// Streaming tree hasher spreading leaf hashing and level combination over the executor pool.
///
/// Leaves are buffered and hashed in chunks of `leaf_chunk_size`, each chunk being an independent computation.
/// The resulting hashes are fed in order to a chain of hash combiners, one per tree depth, each combining
/// `combination_chunk_size` hashes at a time into the next depth. Every combiner is owned by its own task
/// chain, so hashes reach a level in the order their chunks were submitted regardless of which computation
/// finished first.
pub struct ConcurrentStreamingTreeHasher {
    executor: TaskExecutor,
    leaf_chunk_size: usize,
    num_leaves: u64,
    finalized: bool,
    pending_leaves: Vec<Bytes>,
    // Taken on finalization
    leaves: Option<TaskChain<HashCombiner, MerkleError>>,
}

impl ConcurrentStreamingTreeHasher {
    pub fn new(executor: TaskExecutor) -> Self {
        Self::build(executor, DEFAULT_LEAF_CHUNK_SIZE, DEFAULT_COMBINATION_CHUNK_SIZE)
    }

    pub fn with_chunk_sizes(executor: TaskExecutor, leaf_chunk_size: usize, combination_chunk_size: usize) -> MerkleResult<Self> {
        if leaf_chunk_size == 0 {
            return Err(MerkleError::InvalidLeafChunkSize);
        }
        // Odd chunks would split sibling pairs across combinations
        if combination_chunk_size < 2 || combination_chunk_size % 2 != 0 {
            return Err(MerkleError::InvalidCombinationChunkSize(combination_chunk_size));
        }
        Ok(Self::build(executor, leaf_chunk_size, combination_chunk_size))
    }

    fn build(executor: TaskExecutor, leaf_chunk_size: usize, combination_chunk_size: usize) -> Self {
        let leaves = executor.chain(HashCombiner::new(executor.clone(), 0, combination_chunk_size));
        Self {
            executor,
            leaf_chunk_size,
            num_leaves: 0,
            finalized: false,
            pending_leaves: Vec::with_capacity(leaf_chunk_size),
            leaves: Some(leaves),
        }
    }

    fn schedule_pending_leaves(&mut self) -> MerkleResult<()> {
        let leaves = mem::replace(&mut self.pending_leaves, Vec::with_capacity(self.leaf_chunk_size));
        let hashed = self.executor.compute(move || leaves.iter().map(leaf_hash).collect::<Vec<_>>());
        let chain = self.leaves.as_mut().ok_or(MerkleError::AlreadyFinalized)?;
        chain.then(move |mut combiner| async move {
            combiner.add_hashes(hashed.await?);
            Ok::<_, MerkleError>(combiner)
        });
        Ok(())
    }
}

impl StreamingTreeHasher for ConcurrentStreamingTreeHasher {
    fn add_leaf(&mut self, leaf: Bytes) -> MerkleResult<()> {
        if self.finalized {
            return Err(MerkleError::LeafAfterFinalization);
        }
        if self.num_leaves == MAX_LEAVES {
            return Err(MerkleError::CapacityExceeded(MAX_LEAVES));
        }
        self.num_leaves += 1;
        self.pending_leaves.push(leaf);
        if self.pending_leaves.len() == self.leaf_chunk_size {
            self.schedule_pending_leaves()?;
        }
        Ok(())
    }

    fn root_hash(&mut self) -> MerkleResult<Task<Hash, MerkleError>> {
        if self.finalized {
            return Err(MerkleError::AlreadyFinalized);
        }
        if self.num_leaves == 0 {
            self.finalized = true;
            self.leaves = None;
            return Ok(Task::ok(EMPTY_HASHES[0]));
        }
        if !self.pending_leaves.is_empty() {
            self.schedule_pending_leaves()?;
        }
        self.finalized = true;
        let leaves = self.leaves.take().ok_or(MerkleError::AlreadyFinalized)?;
        let max_depth = max_depth(self.num_leaves);
        trace!("Finalizing a tree of {} leaves and depth {}", self.num_leaves, max_depth);
        Ok(self.executor.spawn(async move { HashCombiner::root(leaves, max_depth).await }))
    }

    fn num_leaves(&self) -> u64 {
        self.num_leaves
    }
}

/// Accumulates the hashes of one tree depth and forwards their pairwise combinations to the next depth
struct HashCombiner {
    executor: TaskExecutor,
    depth: usize,
    chunk_size: usize,
    pending: Vec<Hash>,
    // Created on the first combination
    parent: Option<Box<TaskChain<HashCombiner, MerkleError>>>,
}

impl HashCombiner {
    fn new(executor: TaskExecutor, depth: usize, chunk_size: usize) -> Self {
        Self { executor, depth, chunk_size, pending: Vec::with_capacity(chunk_size), parent: None }
    }

    fn add_hashes(&mut self, hashes: Vec<Hash>) {
        for hash in hashes {
            self.pending.push(hash);
            if self.pending.len() == self.chunk_size {
                self.schedule_pending();
            }
        }
    }

    /// Combines the pending hashes on the pool and appends the result to the parent level.
    /// An odd count only happens when the level is being finalized.
    fn schedule_pending(&mut self) {
        let hashes = mem::replace(&mut self.pending, Vec::with_capacity(self.chunk_size));
        let depth = self.depth;
        let combined = self.executor.compute(move || combine_level(&hashes, depth));
        if self.parent.is_none() {
            self.parent = Some(Box::new(self.executor.chain(HashCombiner::new(self.executor.clone(), depth + 1, self.chunk_size))));
        }
        if let Some(parent) = self.parent.as_mut() {
            parent.then(move |mut combiner| async move {
                combiner.add_hashes(combined.await?);
                Ok::<_, MerkleError>(combiner)
            });
        }
    }

    /// Drains the levels bottom up and resolves to the single hash reaching `max_depth`
    async fn root(leaves: TaskChain<HashCombiner, MerkleError>, max_depth: usize) -> MerkleResult<Hash> {
        let mut level = leaves.into_task().await?;
        while level.depth < max_depth {
            if !level.pending.is_empty() {
                level.schedule_pending();
            }
            let parent = level.parent.take().ok_or(MerkleError::MissingLevel(level.depth + 1))?;
            level = parent.into_task().await?;
        }
        level.pending.first().copied().ok_or(MerkleError::MissingLevel(max_depth))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{NaiveStreamingTreeHasher, calc_merkle_root, merkle_hash};
    use blockstream_core::task::TaskRuntime;
    use rand::{Rng, SeedableRng, rngs::StdRng};

    fn root_of(executor: &TaskExecutor, hasher: &mut dyn StreamingTreeHasher, leaves: &[Bytes]) -> Hash {
        for leaf in leaves {
            hasher.add_leaf(leaf.clone()).unwrap();
        }
        let root = hasher.root_hash().unwrap();
        executor.block_on(root).unwrap()
    }

    fn leaves(count: usize) -> Vec<Bytes> {
        (0..count).map(|i| Bytes::from(format!("leaf-{i}"))).collect()
    }

    #[test]
    fn test_small_trees() {
        let runtime = TaskRuntime::new(2, 2).unwrap();
        let executor = runtime.executor();
        let [a, b, c] = [leaf_hash(b"A"), leaf_hash(b"B"), leaf_hash(b"C")];
        let abc = [Bytes::from_static(b"A"), Bytes::from_static(b"B"), Bytes::from_static(b"C")];

        let mut hasher = ConcurrentStreamingTreeHasher::new(executor.clone());
        assert_eq!(root_of(&executor, &mut hasher, &[]), EMPTY_HASHES[0]);

        let mut hasher = ConcurrentStreamingTreeHasher::new(executor.clone());
        assert_eq!(root_of(&executor, &mut hasher, &abc[..1]), a);

        let mut hasher = ConcurrentStreamingTreeHasher::new(executor.clone());
        assert_eq!(root_of(&executor, &mut hasher, &abc[..2]), merkle_hash(a, b));

        let mut hasher = ConcurrentStreamingTreeHasher::new(executor.clone());
        assert_eq!(root_of(&executor, &mut hasher, &abc), merkle_hash(merkle_hash(a, b), merkle_hash(c, EMPTY_HASHES[0])));
    }

    #[test]
    fn test_chunk_size_independence() {
        let runtime = TaskRuntime::new(2, 4).unwrap();
        let executor = runtime.executor();
        for count in (0..=70).chain([127, 128, 129, 511, 1000, 1025]) {
            let leaves = leaves(count);
            let expected = calc_merkle_root(leaves.iter().map(leaf_hash).collect::<Vec<_>>().into_iter());
            for (leaf_chunk, combination_chunk) in [(1, 2), (3, 4), (5, 6), (16, 32), (64, 2)] {
                let mut hasher =
                    ConcurrentStreamingTreeHasher::with_chunk_sizes(executor.clone(), leaf_chunk, combination_chunk).unwrap();
                assert_eq!(
                    root_of(&executor, &mut hasher, &leaves),
                    expected,
                    "{count} leaves with chunk sizes ({leaf_chunk}, {combination_chunk})"
                );
            }
        }
    }

    #[test]
    fn test_matches_naive_hasher() {
        let runtime = TaskRuntime::new(2, 4).unwrap();
        let executor = runtime.executor();
        let mut rng = StdRng::seed_from_u64(42);
        for _ in 0..8 {
            let leaves = (0..rng.gen_range(1..3000))
                .map(|_| {
                    let len = rng.gen_range(0..200);
                    Bytes::from((0..len).map(|_| rng.r#gen::<u8>()).collect::<Vec<_>>())
                })
                .collect::<Vec<_>>();
            let mut concurrent = ConcurrentStreamingTreeHasher::new(executor.clone());
            let mut naive = NaiveStreamingTreeHasher::new();
            assert_eq!(root_of(&executor, &mut concurrent, &leaves), root_of(&executor, &mut naive, &leaves));
            assert_eq!(concurrent.num_leaves(), leaves.len() as u64);
        }
    }

    #[test]
    fn test_finalize_once() {
        let runtime = TaskRuntime::new(1, 1).unwrap();
        let executor = runtime.executor();
        let mut hasher = ConcurrentStreamingTreeHasher::new(executor.clone());
        hasher.add_leaf(Bytes::from_static(b"A")).unwrap();
        let root = hasher.root_hash().unwrap();
        assert_eq!(hasher.add_leaf(Bytes::from_static(b"B")), Err(MerkleError::LeafAfterFinalization));
        assert!(matches!(hasher.root_hash(), Err(MerkleError::AlreadyFinalized)));
        // The rejected calls leave the requested root untouched
        assert_eq!(executor.block_on(root), Ok(leaf_hash(b"A")));

        let mut empty = ConcurrentStreamingTreeHasher::new(executor.clone());
        assert!(empty.root_hash().is_ok());
        assert!(matches!(empty.root_hash(), Err(MerkleError::AlreadyFinalized)));
    }

    #[test]
    fn test_capacity_exceeded() {
        let runtime = TaskRuntime::new(1, 1).unwrap();
        let executor = runtime.executor();
        let mut hasher = ConcurrentStreamingTreeHasher::new(executor.clone());
        // Skip straight to the last free slot instead of hashing millions of leaves
        hasher.num_leaves = MAX_LEAVES - 1;
        assert_eq!(hasher.add_leaf(Bytes::from_static(b"last")), Ok(()));
        assert_eq!(hasher.num_leaves(), MAX_LEAVES);
        assert_eq!(hasher.add_leaf(Bytes::from_static(b"overflow")), Err(MerkleError::CapacityExceeded(MAX_LEAVES)));
        assert_eq!(hasher.num_leaves(), MAX_LEAVES);
        assert_eq!(hasher.pending_leaves.len(), 1);
    }

    #[test]
    fn test_invalid_chunk_sizes() {
        let runtime = TaskRuntime::new(1, 1).unwrap();
        let executor = runtime.executor();
        for (leaf_chunk, combination_chunk) in [(0, 32), (16, 0), (16, 1), (16, 31)] {
            assert!(ConcurrentStreamingTreeHasher::with_chunk_sizes(executor.clone(), leaf_chunk, combination_chunk).is_err());
        }
    }
}
