use crate::{
    errors::{BlockStreamError, BlockStreamResult},
    manager::counters::ProcessingCounters,
    model::{BlockItemKind, TreeKind},
    processes::running_hashes::RunningHashChain,
    writer::BlockItemWriter,
};
use blockstream_core::task::{Task, TaskExecutor};
use blockstream_hashes::Hash;
use blockstream_merkle::{ConcurrentStreamingTreeHasher, MerkleError, StreamingTreeHasher};
use bytes::Bytes;
use std::sync::{Arc, atomic::Ordering};

/// An item serialized once and shared by the trees, the running hash chain and the writer
pub(crate) type SerializedItem = (BlockItemKind, Bytes);

/// The input and output trees of the open block
pub(crate) struct BlockTrees {
    input: Box<dyn StreamingTreeHasher>,
    output: Box<dyn StreamingTreeHasher>,
}

impl BlockTrees {
    pub fn new(executor: &TaskExecutor, leaf_chunk_size: usize, combination_chunk_size: usize) -> BlockStreamResult<Self> {
        let hasher = || ConcurrentStreamingTreeHasher::with_chunk_sizes(executor.clone(), leaf_chunk_size, combination_chunk_size);
        Ok(Self { input: Box::new(hasher()?), output: Box::new(hasher()?) })
    }

    pub fn num_leaves(&self) -> (u64, u64) {
        (self.input.num_leaves(), self.output.num_leaves())
    }

    /// Finalizes both trees, resolving to the input and output roots
    pub fn into_roots(mut self) -> BlockStreamResult<(Task<Hash, MerkleError>, Task<Hash, MerkleError>)> {
        Ok((self.input.root_hash()?, self.output.root_hash()?))
    }
}

/// Everything the item pipeline mutates. Owned by the write chain of the block stream manager, each link
/// taking it over from the previous one.
pub(crate) struct BlockSink<W> {
    writer: W,
    trees: Option<BlockTrees>,
    running: RunningHashChain,
    counters: Arc<ProcessingCounters>,
}

impl<W: BlockItemWriter> BlockSink<W> {
    pub fn new(writer: W, running: RunningHashChain, counters: Arc<ProcessingCounters>) -> Self {
        Self { writer, trees: None, running, counters }
    }

    pub fn open_block(&mut self, number: u64, trees: BlockTrees, running: RunningHashChain) -> BlockStreamResult<()> {
        self.writer.open_block(number)?;
        self.trees = Some(trees);
        self.running = running;
        Ok(())
    }

    /// Feeds the trees and the running hash chain. Only schedules work, the hashing itself runs on the pool.
    pub fn route(&mut self, items: &[SerializedItem]) -> BlockStreamResult<()> {
        let trees = self.trees.as_mut().ok_or(BlockStreamError::RoundNotStarted)?;
        for (kind, bytes) in items {
            match kind.tree() {
                Some(TreeKind::Input) => {
                    trees.input.add_leaf(bytes.clone())?;
                    self.counters.input_leaves.fetch_add(1, Ordering::Relaxed);
                }
                Some(TreeKind::Output) => {
                    trees.output.add_leaf(bytes.clone())?;
                    self.counters.output_leaves.fetch_add(1, Ordering::Relaxed);
                }
                None => {}
            }
            if *kind == BlockItemKind::TransactionResult {
                self.running.fold(bytes.clone());
            }
        }
        Ok(())
    }

    /// Hands the items to the writer. Blocking, meant for the compute pool.
    pub fn write_items(&mut self, items: &[SerializedItem]) -> BlockStreamResult<()> {
        for (_, bytes) in items {
            self.writer.write_item(bytes)?;
        }
        self.counters.items_written.fetch_add(items.len() as u64, Ordering::Relaxed);
        Ok(())
    }

    pub fn take_trees(&mut self) -> Option<BlockTrees> {
        self.trees.take()
    }

    pub fn running(&mut self) -> &mut RunningHashChain {
        &mut self.running
    }

    pub fn close_block(&mut self) -> BlockStreamResult<()> {
        self.trees = None;
        Ok(self.writer.close_block()?)
    }
}
