use crate::model::BlockStreamInfo;
use blockstream_database::prelude::{BatchDbWriter, CachedDbItem, DB, DirectDbWriter, StoreResult};
use blockstream_database::registry::DatabaseStorePrefixes;
use rocksdb::WriteBatch;
use std::sync::Arc;

/// Reader API for `BlockStreamInfoStore`.
pub trait BlockStreamInfoStoreReader {
    fn get(&self) -> StoreResult<BlockStreamInfo>;
}

pub trait BlockStreamInfoStore: BlockStreamInfoStoreReader {
    fn set(&mut self, info: &BlockStreamInfo) -> StoreResult<()>;
}

/// A DB + cache implementation of `BlockStreamInfoStore` trait
#[derive(Clone)]
pub struct DbBlockStreamInfoStore {
    db: Arc<DB>,
    access: CachedDbItem<BlockStreamInfo>,
}

impl DbBlockStreamInfoStore {
    pub fn new(db: Arc<DB>) -> Self {
        Self { db: Arc::clone(&db), access: CachedDbItem::new(db, DatabaseStorePrefixes::BlockStreamInfo.into()) }
    }

    pub fn clone_with_new_cache(&self) -> Self {
        Self::new(Arc::clone(&self.db))
    }

    pub fn set_batch(&mut self, batch: &mut WriteBatch, info: &BlockStreamInfo) -> StoreResult<()> {
        self.access.write(BatchDbWriter::new(batch), info)
    }

    /// Atomically commits a batch prepared with `set_batch`
    pub fn commit(&self, batch: WriteBatch) -> StoreResult<()> {
        Ok(self.db.write(batch)?)
    }
}

impl BlockStreamInfoStoreReader for DbBlockStreamInfoStore {
    fn get(&self) -> StoreResult<BlockStreamInfo> {
        self.access.read()
    }
}

impl BlockStreamInfoStore for DbBlockStreamInfoStore {
    fn set(&mut self, info: &BlockStreamInfo) -> StoreResult<()> {
        self.access.write(DirectDbWriter::new(&self.db), info)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Timestamp;
    use blockstream_database::{create_temp_db, prelude::ConnBuilder, prelude::StoreResultExtensions};
    use blockstream_hashes::Hash;

    #[test]
    fn test_block_stream_info_store() {
        let (_lifetime, db) = create_temp_db!(ConnBuilder::default().with_files_limit(10)).unwrap();
        let mut store = DbBlockStreamInfoStore::new(db.clone());
        assert_eq!(store.get().optional().unwrap(), None);

        let mut info = BlockStreamInfo::genesis();
        info.last_block_hash = Hash::sha384_of(b"block 0");
        info.block_timestamp = Timestamp::new(10, 1);
        let mut batch = WriteBatch::default();
        store.set_batch(&mut batch, &info).unwrap();
        store.commit(batch).unwrap();

        // A fresh cache reads through to the DB
        assert_eq!(store.clone_with_new_cache().get().unwrap(), info);

        info.last_block_number = 1;
        store.set(&info).unwrap();
        assert_eq!(DbBlockStreamInfoStore::new(db).get().unwrap().last_block_number, 1);
    }
}
