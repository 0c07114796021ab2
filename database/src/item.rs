use crate::{
    db::DB,
    errors::{StoreError, StoreResult},
    prelude::{DbKey, DbWriter},
};
use parking_lot::RwLock;
use serde::{Serialize, de::DeserializeOwned};
use std::sync::Arc;

/// A single DB value with a read-through cache.
///
/// Clones share the cache, so writes through one clone are visible to all of them.
#[derive(Clone)]
pub struct CachedDbItem<T> {
    db: Arc<DB>,
    key: Vec<u8>,
    cached_item: Arc<RwLock<Option<T>>>,
}

impl<T> CachedDbItem<T> {
    pub fn new(db: Arc<DB>, key: Vec<u8>) -> Self {
        Self { db, key, cached_item: Arc::new(RwLock::new(None)) }
    }

    fn load(&self) -> StoreResult<T>
    where
        T: DeserializeOwned,
    {
        match self.db.get_pinned(&self.key)? {
            Some(slice) => Ok(bincode::deserialize(&slice)?),
            None => Err(StoreError::KeyNotFound(DbKey::prefix_only(&self.key))),
        }
    }

    pub fn read(&self) -> StoreResult<T>
    where
        T: Clone + DeserializeOwned,
    {
        if let Some(item) = self.cached_item.read().clone() {
            return Ok(item);
        }
        let item = self.load()?;
        *self.cached_item.write() = Some(item.clone());
        Ok(item)
    }

    pub fn write(&mut self, mut writer: impl DbWriter, item: &T) -> StoreResult<()>
    where
        T: Clone + Serialize,
    {
        let bin_data = bincode::serialize(item)?;
        writer.put(&self.key, bin_data)?;
        *self.cached_item.write() = Some(item.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{create_temp_db, prelude::ConnBuilder, prelude::DirectDbWriter, registry::DatabaseStorePrefixes};
    use serde::Deserialize;

    #[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
    struct Counter {
        value: u64,
        label: String,
    }

    #[test]
    fn test_cached_item() {
        let (_lifetime, db) = create_temp_db!(ConnBuilder::default().with_files_limit(10)).unwrap();
        let mut item = CachedDbItem::<Counter>::new(db.clone(), DatabaseStorePrefixes::BlockStreamInfo.into());
        assert!(matches!(item.read(), Err(StoreError::KeyNotFound(_))));

        item.write(DirectDbWriter::new(&db), &Counter { value: 1, label: "a".into() }).unwrap();
        assert_eq!(item.read().unwrap(), Counter { value: 1, label: "a".into() });

        // A fresh handle reads through to the DB
        let other = CachedDbItem::<Counter>::new(db.clone(), DatabaseStorePrefixes::BlockStreamInfo.into());
        item.write(DirectDbWriter::new(&db), &Counter { value: 2, label: "b".into() }).unwrap();
        assert_eq!(other.read().unwrap(), Counter { value: 2, label: "b".into() });

        // Clones share the cache
        let mut clone = item.clone();
        clone.write(DirectDbWriter::new(&db), &Counter { value: 3, label: "c".into() }).unwrap();
        assert_eq!(item.read().unwrap(), Counter { value: 3, label: "c".into() });
    }
}
