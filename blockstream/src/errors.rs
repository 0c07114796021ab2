use blockstream_core::task::TaskError;
use blockstream_database::prelude::StoreError;
use blockstream_hashes::HASH_SIZE;
use blockstream_merkle::MerkleError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum BlockStreamError {
    #[error("no round is in progress")]
    RoundNotStarted,

    #[error("round of block {0} is still in progress")]
    RoundInProgress(u64),

    #[error("corrupt block stream info: running hashes blob of {0} bytes is not a multiple of {HASH_SIZE} of at most 4 hashes")]
    CorruptRunningHashes(usize),

    #[error("corrupt block stream info: trailing block hashes blob of {0} bytes is not a multiple of {HASH_SIZE}")]
    CorruptTrailingHashes(usize),

    #[error("block item serialization error: {0}")]
    Serialization(String),

    #[error("block {number} failed verification: {reason}")]
    Verification { number: u64, reason: String },

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Merkle(#[from] MerkleError),

    #[error(transparent)]
    Task(#[from] TaskError),
}

pub type BlockStreamResult<T> = std::result::Result<T, BlockStreamError>;
