use blockstream::{
    config::{ConfigBuilder, params::DEVNET_PARAMS},
    errors::{BlockStreamError, BlockStreamResult},
    manager::BlockStreamManager,
    model::{
        BlockItem, ClosedBlock, Round, Timestamp,
        items::{EventHeader, Transaction, TransactionOutput, TransactionResult},
    },
    reader::BlockStreamReader,
    writer::FileBlockItemWriter,
};
use blockstream_core::{error, info, log::init_logger, panic::configure_panic, time::Stopwatch};
use blockstream_database::{
    create_temp_db,
    prelude::{ConnBuilder, DB},
    utils::DbLifetime,
};
use blockstream_hashes::Hash;
use clap::Parser;
use itertools::Itertools;
use rand::{Rng, SeedableRng, rngs::StdRng};
use std::{
    path::{Path, PathBuf},
    process,
    sync::Arc,
    time::Instant,
};

/// Block stream production simulator
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Number of simulated rounds
    #[arg(short, long, default_value_t = 100)]
    rounds: u64,

    /// Transactions per round
    #[arg(short, long, default_value_t = 200)]
    tpr: u64,

    /// Outputs per transaction
    #[arg(short, long, default_value_t = 1)]
    outputs: u64,

    /// Directory receiving the block files. A temp directory is used when missing
    #[arg(long)]
    blocks_dir: Option<String>,

    /// Directory of the block stream state DB. A temp DB is used when missing
    #[arg(long)]
    db_dir: Option<String>,

    /// Gzip the block files
    #[arg(short, long, default_value_t = false)]
    compress: bool,

    /// Async runtime threads, 0 for a default depending on the logical cores
    #[arg(long, default_value_t = 0)]
    async_threads: usize,

    /// Compute pool threads, 0 for one per logical core
    #[arg(long, default_value_t = 0)]
    compute_threads: usize,

    /// Seed of the synthetic item generator
    #[arg(long, default_value_t = 0)]
    seed: u64,

    /// Logging filters, e.g. `info,blockstream=debug`
    #[arg(short, long = "loglevel", default_value = "info")]
    log_level: String,
}

fn main() {
    let args = Args::parse();
    if let Err(err) = init_logger(None, &args.log_level) {
        eprintln!("Failed initializing the logger: {err}");
        process::exit(1);
    }
    configure_panic();
    if let Err(err) = simulate(args) {
        error!("Simulation failed: {}", err);
        process::exit(1);
    }
}

fn simulate(args: Args) -> BlockStreamResult<()> {
    let config = Arc::new(
        ConfigBuilder::new(DEVNET_PARAMS)
            .apply_args(|config| {
                config.perf.async_threads = args.async_threads;
                config.perf.compute_threads = args.compute_threads;
                config.perf.compress_blocks = args.compress;
            })
            .build(),
    );
    let runtime = config.build_runtime()?;
    let (_lifetime, db) = open_db(args.db_dir.as_deref())?;
    let (blocks_dir, _blocks_tempdir) = match &args.blocks_dir {
        Some(dir) => (PathBuf::from(dir), None),
        None => {
            let tempdir = tempfile::Builder::new().prefix("blockstream-simpa").tempdir()?;
            (tempdir.path().to_owned(), Some(tempdir))
        }
    };
    info!(
        "Simulating {} rounds of {} transactions with {} outputs each on {}, writing blocks to {}",
        args.rounds,
        args.tpr,
        args.outputs,
        config.network_name,
        blocks_dir.display()
    );

    let start = Instant::now();
    let closed = {
        let writer = FileBlockItemWriter::new(&blocks_dir, config.perf.compress_blocks)?;
        let mut manager = BlockStreamManager::new(config.clone(), runtime.executor(), db.clone(), writer)?;
        let mut generator = ItemGenerator::new(args.seed);
        let mut closed = Vec::with_capacity(args.rounds as usize);
        for number in 0..args.rounds {
            let round = Round::new(number, generator.timestamp(number));
            manager.start_round(&round)?;
            for item in generator.round_items(args.tpr, args.outputs) {
                manager.write_item(item)?;
            }
            closed.push(manager.end_round()?);
        }
        let counters = manager.counters();
        let elapsed = start.elapsed();
        info!(
            "Produced {} blocks of {} items in {:?} ({:.0} items/s), {} input and {} output leaves",
            counters.blocks_closed,
            counters.items_written,
            elapsed,
            counters.items_written as f64 / elapsed.as_secs_f64().max(f64::EPSILON),
            counters.input_leaves,
            counters.output_leaves
        );
        manager.close_stream()?;
        closed
    };

    validate(&blocks_dir, &closed)
}

fn open_db(db_dir: Option<&str>) -> BlockStreamResult<(DbLifetime, Arc<DB>)> {
    let conn_builder = ConnBuilder::default().with_files_limit(128).with_parallelism(2usize);
    match db_dir {
        Some(dir) => {
            let db = conn_builder.with_db_path(PathBuf::from(dir)).build()?;
            Ok((DbLifetime::without_destroy(Arc::downgrade(&db)), db))
        }
        None => Ok(create_temp_db!(conn_builder)?),
    }
}

/// Re-reads the produced block files and checks them against what the manager reported
fn validate(blocks_dir: &Path, closed: &[ClosedBlock]) -> BlockStreamResult<()> {
    let _sw = Stopwatch::<5000>::with_threshold("validate");
    let verified = BlockStreamReader::new(blocks_dir).verify_all()?;
    let reported = closed.iter().map(|block| (block.number, block.block_hash)).collect_vec();
    // Blocks of earlier runs over a persistent DB precede the reported ones
    let tail = verified.iter().rev().take(reported.len()).rev().map(|block| (block.number(), block.block_hash)).collect_vec();
    if let Some(((number, _), _)) = tail.iter().zip(&reported).find(|(verified, reported)| verified != reported) {
        return Err(BlockStreamError::Verification { number: *number, reason: "differs from the produced block".to_string() });
    }
    if tail.len() != reported.len() {
        return Err(BlockStreamError::Verification {
            number: reported.first().map_or(0, |(number, _)| *number),
            reason: format!("found {} of {} produced blocks", tail.len(), reported.len()),
        });
    }
    let last_hash = verified.last().map_or(Hash::default(), |block| block.block_hash);
    info!("Validated {} blocks, last block hash {}", verified.len(), last_hash);
    Ok(())
}

struct ItemGenerator {
    rng: StdRng,
    next_transaction: u64,
}

impl ItemGenerator {
    fn new(seed: u64) -> Self {
        Self { rng: StdRng::seed_from_u64(seed), next_transaction: 0 }
    }

    fn timestamp(&mut self, round: u64) -> Timestamp {
        Timestamp::new(1_700_000_000 + round as i64, self.rng.gen_range(0..1_000_000_000))
    }

    fn payload(&mut self) -> Vec<u8> {
        let len = self.rng.gen_range(32..256);
        (0..len).map(|_| self.rng.r#gen()).collect()
    }

    fn round_items(&mut self, transactions: u64, outputs: u64) -> Vec<BlockItem> {
        let mut items = Vec::with_capacity((transactions * (2 + outputs) + 1) as usize);
        items.push(BlockItem::EventHeader(EventHeader {
            creator_id: self.rng.gen_range(0..4),
            created_at: Timestamp::new(1_700_000_000, 0),
            parents: (0..2).map(|_| Hash::sha384_of(self.rng.r#gen::<[u8; 32]>())).collect(),
        }));
        for _ in 0..transactions {
            let transaction = Transaction { payload: self.payload() };
            // Roughly one in a hundred transactions is node generated
            if self.rng.gen_ratio(1, 100) {
                items.push(BlockItem::SystemTransaction(transaction));
            } else {
                items.push(BlockItem::Transaction(transaction));
            }
            items.push(BlockItem::TransactionResult(TransactionResult {
                status: 22,
                consensus_timestamp: Timestamp::new(1_700_000_000, (self.next_transaction % 1_000_000_000) as u32),
                fee_charged: self.rng.gen_range(1..100_000),
            }));
            for _ in 0..outputs {
                items.push(BlockItem::TransactionOutput(TransactionOutput { payload: self.payload() }));
            }
            self.next_transaction += 1;
        }
        items
    }
}
