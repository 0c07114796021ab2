use blockstream_core::task::TaskError;
use thiserror::Error;

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum MerkleError {
    #[error("cannot add a leaf after the root hash was requested")]
    LeafAfterFinalization,

    #[error("the root hash was already requested")]
    AlreadyFinalized,

    #[error("tree capacity of {0} leaves exceeded")]
    CapacityExceeded(u64),

    #[error("leaf chunk size must be positive")]
    InvalidLeafChunkSize,

    #[error("combination chunk size must be even and at least 2, got {0}")]
    InvalidCombinationChunkSize(usize),

    #[error("tree level {0} received no hashes")]
    MissingLevel(usize),

    #[error(transparent)]
    Task(#[from] TaskError),
}

pub type MerkleResult<T> = std::result::Result<T, MerkleError>;
