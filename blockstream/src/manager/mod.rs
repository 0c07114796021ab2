//! Per round block production.
//!
//! The [`BlockStreamManager`] is driven by a single caller, the round processing thread, through
//! `start_round`, any number of `write_item` calls and `end_round`. Items are buffered and handed off in
//! chunks to a single write chain owning the block sink: every link serializes a chunk on the compute pool,
//! feeds the tree hashers and the running hash chain, and then writes the chunk. Since each link takes the
//! sink over from the previous one, items reach the trees and the writer in submission order with no locking.
//! The caller only blocks at round boundaries.

pub mod counters;
mod sink;

use crate::{
    config::Config,
    errors::{BlockStreamError, BlockStreamResult},
    model::{
        BlockItem, BlockStreamInfo, ClosedBlock, Round, Timestamp, block_hash,
        items::{BlockHeader, HashAlgorithm},
        stores::{BlockStreamInfoStoreReader, DbBlockStreamInfoStore},
    },
    processes::{
        running_hashes::{RunningHashChain, RunningHashWindow},
        trailing_hashes::TrailingBlockHashes,
    },
    writer::BlockItemWriter,
};
use blockstream_core::{
    debug, error, info,
    task::{TaskChain, TaskExecutor},
    trace, warn,
};
use blockstream_database::prelude::{DB, StoreResultExtensions};
use blockstream_hashes::{Hash, ZERO_HASH};
use bytes::Bytes;
use rocksdb::WriteBatch;
use std::{
    mem,
    sync::{Arc, atomic::Ordering},
};

use counters::{ProcessingCounters, ProcessingCountersSnapshot};
use sink::{BlockSink, BlockTrees, SerializedItem};

#[derive(Clone, Debug)]
struct OpenBlock {
    number: u64,
    previous_block_hash: Hash,
    timestamp: Timestamp,
}

enum RoundState {
    Idle,
    Open(OpenBlock),
}

/// The block stream state decoded from the last persisted info, or the genesis state when none exists
struct PersistedState {
    next_block_number: u64,
    previous_block_hash: Hash,
    window: RunningHashWindow,
    trailing: TrailingBlockHashes,
}

impl PersistedState {
    fn load(store: &DbBlockStreamInfoStore, trailing_capacity: usize) -> BlockStreamResult<Self> {
        Ok(match store.get().optional()? {
            Some(info) => Self {
                next_block_number: info.last_block_number + 1,
                previous_block_hash: info.last_block_hash,
                window: RunningHashWindow::from_bytes(&info.running_hashes)?,
                trailing: TrailingBlockHashes::from_bytes(&info.trailing_block_hashes, trailing_capacity)?,
            },
            None => Self {
                next_block_number: 0,
                previous_block_hash: ZERO_HASH,
                window: RunningHashWindow::new(),
                trailing: TrailingBlockHashes::new(trailing_capacity),
            },
        })
    }
}

pub struct BlockStreamManager<W: BlockItemWriter> {
    config: Arc<Config>,
    executor: TaskExecutor,
    store: DbBlockStreamInfoStore,

    state: RoundState,
    pending_items: Vec<BlockItem>,
    write_chain: TaskChain<BlockSink<W>, BlockStreamError>,

    trailing: TrailingBlockHashes,
    // The number of the open block, or of the next one while idle
    current_block_number: u64,

    counters: Arc<ProcessingCounters>,
}

impl<W: BlockItemWriter> BlockStreamManager<W> {
    pub fn new(config: Arc<Config>, executor: TaskExecutor, db: Arc<DB>, writer: W) -> BlockStreamResult<Self> {
        let store = DbBlockStreamInfoStore::new(db);
        let PersistedState { next_block_number: current_block_number, window, trailing, .. } =
            PersistedState::load(&store, config.trailing_block_hashes)?;
        info!("Block stream on {} resumes at block {}", config.network_name, current_block_number);
        let counters = Arc::new(ProcessingCounters::default());
        let running = RunningHashChain::new(&executor, window);
        let write_chain = executor.chain(BlockSink::new(writer, running, counters.clone()));
        Ok(Self {
            pending_items: Vec::with_capacity(config.item_chunk_size),
            config,
            executor,
            store,
            state: RoundState::Idle,
            write_chain,
            trailing,
            current_block_number,
            counters,
        })
    }

    /// Opens the block of `round`, numbered right after the last persisted block, and returns its number
    pub fn start_round(&mut self, round: &Round) -> BlockStreamResult<u64> {
        if let RoundState::Open(open) = &self.state {
            return Err(BlockStreamError::RoundInProgress(open.number));
        }
        let PersistedState { next_block_number: number, previous_block_hash, window, trailing } =
            PersistedState::load(&self.store, self.config.trailing_block_hashes)?;

        let trees = BlockTrees::new(&self.executor, self.config.leaf_chunk_size, self.config.combination_chunk_size)?;
        let running = RunningHashChain::new(&self.executor, window);
        // Idle means the chain was drained, so this join does not wait
        self.write_chain.join()?.open_block(number, trees, running)?;

        self.trailing = trailing;
        self.current_block_number = number;
        self.state = RoundState::Open(OpenBlock { number, previous_block_hash, timestamp: round.consensus_timestamp });
        self.pending_items.push(BlockItem::Header(BlockHeader {
            number,
            previous_block_hash,
            hash_algorithm: HashAlgorithm::Sha384,
            software_version: self.config.software_version,
            protocol_version: self.config.protocol_version,
            block_timestamp: round.consensus_timestamp,
        }));
        debug!("Started block {} of round {} at {}", number, round.number, round.consensus_timestamp);
        Ok(number)
    }

    /// Buffers `item` into the open block. Full chunks are handed off without blocking.
    pub fn write_item(&mut self, item: BlockItem) -> BlockStreamResult<()> {
        if let RoundState::Idle = self.state {
            return Err(BlockStreamError::RoundNotStarted);
        }
        self.counters.items_submitted.fetch_add(1, Ordering::Relaxed);
        self.pending_items.push(item);
        if self.pending_items.len() >= self.config.item_chunk_size {
            self.schedule_pending_items();
        }
        Ok(())
    }

    /// Drains the item pipeline, closes the block with a final state changes item and persists the updated
    /// block stream info. Any failure of the pipeline surfaces here and aborts the round.
    pub fn end_round(&mut self) -> BlockStreamResult<ClosedBlock> {
        let open = match &self.state {
            RoundState::Open(open) => open.clone(),
            RoundState::Idle => return Err(BlockStreamError::RoundNotStarted),
        };
        self.end_open_block(&open).inspect_err(|err| {
            error!("Block {} aborted: {}", open.number, err);
        })
    }

    fn end_open_block(&mut self, open: &OpenBlock) -> BlockStreamResult<ClosedBlock> {
        self.schedule_pending_items();
        let running_hashes = self.write_chain.join()?.running().join()?.latest_hashes();

        // The block hash depends on the output root, so the captured info holds the previous block hash
        let captured = BlockStreamInfo {
            last_block_number: open.number,
            last_block_hash: open.previous_block_hash,
            block_timestamp: open.timestamp,
            running_hashes,
            trailing_block_hashes: self.trailing.to_bytes(),
        };
        self.pending_items.push(captured.to_state_changes(open.timestamp)?);
        self.schedule_pending_items();

        let sink = self.write_chain.join()?;
        let trees = sink.take_trees().ok_or(BlockStreamError::RoundNotStarted)?;
        let (input_leaves, output_leaves) = trees.num_leaves();
        let (input_root, output_root) = trees.into_roots()?;
        let (input_root, output_root) =
            self.executor.block_on(async move { Ok::<_, BlockStreamError>((input_root.await?, output_root.await?)) })?;
        let running_hashes = sink.running().join()?.latest_hashes();

        let hash = block_hash(&open.previous_block_hash, &input_root, &output_root);
        let info = BlockStreamInfo {
            last_block_number: open.number,
            last_block_hash: hash,
            block_timestamp: open.timestamp,
            running_hashes,
            trailing_block_hashes: self.trailing.hashes_after_latest(hash),
        };
        let mut batch = WriteBatch::default();
        self.store.set_batch(&mut batch, &info)?;
        self.store.commit(batch)?;
        sink.close_block()?;

        self.trailing.push(hash);
        self.current_block_number = open.number + 1;
        self.state = RoundState::Idle;
        self.counters.blocks_closed.fetch_add(1, Ordering::Relaxed);
        info!("Closed block {} with {} input and {} output leaves, hash {}", open.number, input_leaves, output_leaves, hash);

        Ok(ClosedBlock {
            number: open.number,
            previous_block_hash: open.previous_block_hash,
            input_root,
            output_root,
            block_hash: hash,
            timestamp: open.timestamp,
        })
    }

    /// Drains the pipeline and closes the open block in the writer without persisting anything. The next round
    /// rebuilds the same block number from the persisted info.
    pub fn close_stream(&mut self) -> BlockStreamResult<()> {
        let RoundState::Open(open) = mem::replace(&mut self.state, RoundState::Idle) else {
            trace!("Closing the block stream with no open block");
            return Ok(());
        };
        self.schedule_pending_items();
        let sink = self.write_chain.join()?;
        sink.close_block()?;
        warn!("Block {} was force closed without being persisted", open.number);
        Ok(())
    }

    /// `h[n - 3]` of the running hash chain over the transaction results submitted so far, if at least 4 were
    /// ever folded. Drains the buffered items first so the result does not depend on chunking.
    pub fn prng_seed(&mut self) -> BlockStreamResult<Option<Hash>> {
        self.schedule_pending_items();
        Ok(self.write_chain.join()?.running().join()?.n_minus_3())
    }

    /// The number of the open block
    pub fn block_no(&self) -> Option<u64> {
        match &self.state {
            RoundState::Open(open) => Some(open.number),
            RoundState::Idle => None,
        }
    }

    /// The consensus timestamp of the open block
    pub fn block_timestamp(&self) -> Option<Timestamp> {
        match &self.state {
            RoundState::Open(open) => Some(open.timestamp),
            RoundState::Idle => None,
        }
    }

    /// The hash of a recent block preceding the current one, within the trailing window
    pub fn block_hash_by_block_number(&self, number: u64) -> Option<Hash> {
        self.trailing.hash_of_block(self.current_block_number, number)
    }

    pub fn counters(&self) -> ProcessingCountersSnapshot {
        self.counters.snapshot()
    }

    fn schedule_pending_items(&mut self) {
        if self.pending_items.is_empty() {
            return;
        }
        let items = mem::replace(&mut self.pending_items, Vec::with_capacity(self.config.item_chunk_size));
        let serialized = self.executor.compute(move || {
            items
                .iter()
                .map(|item| -> BlockStreamResult<SerializedItem> { Ok((item.kind(), Bytes::from(item.to_bytes()?))) })
                .collect::<BlockStreamResult<Vec<_>>>()
        });
        let executor = self.executor.clone();
        self.write_chain.then(move |mut sink| async move {
            let items = serialized.await??;
            sink.route(&items)?;
            let sink = executor
                .compute(move || -> BlockStreamResult<BlockSink<W>> {
                    sink.write_items(&items)?;
                    Ok(sink)
                })
                .await??;
            Ok::<_, BlockStreamError>(sink)
        });
    }
}
