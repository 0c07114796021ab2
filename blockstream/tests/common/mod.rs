#![allow(dead_code)]

use blockstream::{
    config::{Config, ConfigBuilder, params::DEVNET_PARAMS},
    manager::BlockStreamManager,
    model::{
        BlockItem, Round, Timestamp,
        items::{EventHeader, Transaction, TransactionOutput, TransactionResult},
    },
    writer::BlockItemWriter,
};
use blockstream_core::task::TaskRuntime;
use blockstream_database::{
    create_temp_db,
    prelude::{ConnBuilder, DB},
    utils::DbLifetime,
};
use std::sync::Arc;

/// Owns the runtime and the temp DB backing the managers of a test. Managers must be dropped first.
pub struct TestContext {
    pub config: Arc<Config>,
    pub runtime: TaskRuntime,
    pub db: Arc<DB>,
    _lifetime: DbLifetime,
}

impl TestContext {
    pub fn new(config: Config) -> Self {
        let runtime = TaskRuntime::new(2, 4).unwrap();
        let (lifetime, db) = create_temp_db!(ConnBuilder::default().with_files_limit(10)).unwrap();
        Self { config: Arc::new(config), runtime, db, _lifetime: lifetime }
    }

    pub fn devnet() -> Self {
        Self::new(ConfigBuilder::new(DEVNET_PARAMS).build())
    }

    pub fn manager<W: BlockItemWriter>(&self, writer: W) -> BlockStreamManager<W> {
        BlockStreamManager::new(self.config.clone(), self.runtime.executor(), self.db.clone(), writer).unwrap()
    }
}

pub fn round(number: u64) -> Round {
    Round::new(number, Timestamp::new(1_700_000_000 + number as i64, 500))
}

pub fn event(creator_id: u64) -> BlockItem {
    BlockItem::EventHeader(EventHeader { creator_id, created_at: Timestamp::new(1_700_000_000, 0), parents: vec![] })
}

pub fn transaction(i: u64) -> BlockItem {
    BlockItem::Transaction(Transaction { payload: format!("transfer #{i}").into_bytes() })
}

pub fn result(i: u64) -> BlockItem {
    BlockItem::TransactionResult(TransactionResult {
        status: 22,
        consensus_timestamp: Timestamp::new(1_700_000_000, i as u32),
        fee_charged: i,
    })
}

pub fn output(i: u64) -> BlockItem {
    BlockItem::TransactionOutput(TransactionOutput { payload: i.to_le_bytes().to_vec() })
}

/// Submits `transactions` transactions, each with its result and `outputs` outputs, under a single event
pub fn write_round_items<W: BlockItemWriter>(manager: &mut BlockStreamManager<W>, first: u64, transactions: u64, outputs: u64) {
    manager.write_item(event(first)).unwrap();
    for i in first..first + transactions {
        manager.write_item(transaction(i)).unwrap();
        manager.write_item(result(i)).unwrap();
        for j in 0..outputs {
            manager.write_item(output(i * 1000 + j)).unwrap();
        }
    }
}
