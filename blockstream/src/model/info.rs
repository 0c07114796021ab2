use crate::{
    config::constants::BLOCK_STREAM_INFO_STATE_NAME,
    errors::{BlockStreamError, BlockStreamResult},
    model::{
        Timestamp,
        items::{BlockItem, StateChange, StateChanges, StateChangesCause},
    },
};
use blockstream_hashes::{Hash, ZERO_HASH};
use borsh::{BorshDeserialize, BorshSerialize};
use serde::{Deserialize, Serialize};

/// Block stream metadata persisted across rounds. Rewritten once per round as the block closes.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, BorshSerialize, BorshDeserialize)]
pub struct BlockStreamInfo {
    pub last_block_number: u64,
    pub last_block_hash: Hash,
    pub block_timestamp: Timestamp,
    /// Up to 4 chained running hashes, oldest first
    pub running_hashes: Vec<u8>,
    /// Hashes of the most recent blocks, oldest first
    pub trailing_block_hashes: Vec<u8>,
}

impl BlockStreamInfo {
    pub fn genesis() -> Self {
        Self {
            last_block_number: 0,
            last_block_hash: ZERO_HASH,
            block_timestamp: Timestamp::default(),
            running_hashes: Vec::new(),
            trailing_block_hashes: Vec::new(),
        }
    }

    /// Wraps the info into the state changes item closing a block
    pub fn to_state_changes(&self, consensus_timestamp: Timestamp) -> BlockStreamResult<BlockItem> {
        let value = borsh::to_vec(self).map_err(|err| BlockStreamError::Serialization(err.to_string()))?;
        Ok(BlockItem::StateChanges(StateChanges {
            consensus_timestamp,
            cause: StateChangesCause::EndOfBlock,
            changes: vec![StateChange { state_name: BLOCK_STREAM_INFO_STATE_NAME.to_string(), value }],
        }))
    }

    /// Extracts the info captured by a block closing state changes item, if `changes` is one
    pub fn from_state_changes(changes: &StateChanges) -> BlockStreamResult<Option<Self>> {
        if changes.cause != StateChangesCause::EndOfBlock {
            return Ok(None);
        }
        match changes.changes.iter().find(|change| change.state_name == BLOCK_STREAM_INFO_STATE_NAME) {
            Some(change) => {
                borsh::from_slice(&change.value).map(Some).map_err(|err| BlockStreamError::Serialization(err.to_string()))
            }
            None => Ok(None),
        }
    }
}
