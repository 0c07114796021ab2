use crate::prelude::DbKey;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("key {0} not found in store")]
    KeyNotFound(DbKey),

    #[error("data inconsistency: {0}")]
    DataInconsistency(String),

    #[error("rocksdb error {0}")]
    DbError(#[from] rocksdb::Error),

    #[error("bincode error {0}")]
    DeserializationError(#[from] Box<bincode::ErrorKind>),

    #[error("io error {0}")]
    IoError(#[from] std::io::Error),
}

pub type StoreResult<T> = std::result::Result<T, StoreError>;

pub trait StoreResultExtensions<T> {
    /// Converts a "key not found" error into `Ok(None)`; any other error is kept
    fn optional(self) -> StoreResult<Option<T>>;
}

impl<T> StoreResultExtensions<T> for StoreResult<T> {
    fn optional(self) -> StoreResult<Option<T>> {
        match self {
            Ok(value) => Ok(Some(value)),
            Err(StoreError::KeyNotFound(_)) => Ok(None),
            Err(err) => Err(err),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_optional() {
        assert_eq!(StoreResult::Ok(7).optional().unwrap(), Some(7));
        assert_eq!(StoreResult::<u32>::Err(StoreError::KeyNotFound(DbKey::prefix_only(&[1]))).optional().unwrap(), None);
        assert!(StoreResult::<u32>::Err(StoreError::DataInconsistency("bad".into())).optional().is_err());
    }
}
