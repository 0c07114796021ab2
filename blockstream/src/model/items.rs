use crate::{
    errors::{BlockStreamError, BlockStreamResult},
    model::{SemanticVersion, Timestamp},
};
use blockstream_hashes::Hash;
use borsh::{BorshDeserialize, BorshSerialize};
use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, BorshSerialize, BorshDeserialize)]
#[borsh(use_discriminant = true)]
#[repr(u8)]
pub enum HashAlgorithm {
    Sha384 = 1,
}

/// Opens every block
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, BorshSerialize, BorshDeserialize)]
pub struct BlockHeader {
    pub number: u64,
    pub previous_block_hash: Hash,
    pub hash_algorithm: HashAlgorithm,
    pub software_version: SemanticVersion,
    pub protocol_version: SemanticVersion,
    pub block_timestamp: Timestamp,
}

/// Marks the start of a consensus event within the round
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, BorshSerialize, BorshDeserialize)]
pub struct EventHeader {
    pub creator_id: u64,
    pub created_at: Timestamp,
    pub parents: Vec<Hash>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, BorshSerialize, BorshDeserialize)]
pub struct Transaction {
    pub payload: Vec<u8>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, BorshSerialize, BorshDeserialize)]
pub struct TransactionResult {
    pub status: u32,
    pub consensus_timestamp: Timestamp,
    pub fee_charged: u64,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, BorshSerialize, BorshDeserialize)]
pub struct TransactionOutput {
    pub payload: Vec<u8>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, BorshSerialize, BorshDeserialize)]
#[borsh(use_discriminant = true)]
#[repr(u8)]
pub enum StateChangesCause {
    Transaction = 1,
    EndOfBlock = 2,
}

/// New value of a singleton state
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, BorshSerialize, BorshDeserialize)]
pub struct StateChange {
    pub state_name: String,
    pub value: Vec<u8>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, BorshSerialize, BorshDeserialize)]
pub struct StateChanges {
    pub consensus_timestamp: Timestamp,
    pub cause: StateChangesCause,
    pub changes: Vec<StateChange>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, BorshSerialize, BorshDeserialize)]
pub enum BlockItem {
    Header(BlockHeader),
    EventHeader(EventHeader),
    Transaction(Transaction),
    SystemTransaction(Transaction),
    TransactionResult(TransactionResult),
    TransactionOutput(TransactionOutput),
    StateChanges(StateChanges),
    /// A round scoped item opaque to the block stream, typed by `tag`
    Other { tag: u32, bytes: Vec<u8> },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum BlockItemKind {
    Header,
    EventHeader,
    Transaction,
    SystemTransaction,
    TransactionResult,
    TransactionOutput,
    StateChanges,
    Other,
}

/// The Merkle tree an item is a leaf of
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TreeKind {
    Input,
    Output,
}

impl BlockItemKind {
    pub fn tree(self) -> Option<TreeKind> {
        match self {
            BlockItemKind::EventHeader | BlockItemKind::Transaction | BlockItemKind::SystemTransaction => Some(TreeKind::Input),
            BlockItemKind::TransactionResult | BlockItemKind::TransactionOutput | BlockItemKind::StateChanges => {
                Some(TreeKind::Output)
            }
            BlockItemKind::Header | BlockItemKind::Other => None,
        }
    }
}

impl BlockItem {
    pub fn kind(&self) -> BlockItemKind {
        match self {
            BlockItem::Header(_) => BlockItemKind::Header,
            BlockItem::EventHeader(_) => BlockItemKind::EventHeader,
            BlockItem::Transaction(_) => BlockItemKind::Transaction,
            BlockItem::SystemTransaction(_) => BlockItemKind::SystemTransaction,
            BlockItem::TransactionResult(_) => BlockItemKind::TransactionResult,
            BlockItem::TransactionOutput(_) => BlockItemKind::TransactionOutput,
            BlockItem::StateChanges(_) => BlockItemKind::StateChanges,
            BlockItem::Other { .. } => BlockItemKind::Other,
        }
    }

    /// The canonical encoding of the item. These exact bytes are written, hashed into the trees and folded
    /// into the running hash chain
    pub fn to_bytes(&self) -> BlockStreamResult<Vec<u8>> {
        borsh::to_vec(self).map_err(|err| BlockStreamError::Serialization(err.to_string()))
    }

    pub fn from_bytes(bytes: &[u8]) -> BlockStreamResult<Self> {
        borsh::from_slice(bytes).map_err(|err| BlockStreamError::Serialization(err.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tree_classification() {
        let transaction = Transaction { payload: vec![1, 2, 3] };
        let cases = [
            (
                BlockItem::EventHeader(EventHeader { creator_id: 3, created_at: Timestamp::default(), parents: vec![] }),
                Some(TreeKind::Input),
            ),
            (BlockItem::Transaction(transaction.clone()), Some(TreeKind::Input)),
            (BlockItem::SystemTransaction(transaction), Some(TreeKind::Input)),
            (
                BlockItem::TransactionResult(TransactionResult {
                    status: 22,
                    consensus_timestamp: Timestamp::default(),
                    fee_charged: 5,
                }),
                Some(TreeKind::Output),
            ),
            (BlockItem::TransactionOutput(TransactionOutput { payload: vec![] }), Some(TreeKind::Output)),
            (
                BlockItem::StateChanges(StateChanges {
                    consensus_timestamp: Timestamp::default(),
                    cause: StateChangesCause::EndOfBlock,
                    changes: vec![],
                }),
                Some(TreeKind::Output),
            ),
            (BlockItem::Other { tag: 9, bytes: vec![0xff] }, None),
        ];
        for (item, tree) in cases {
            assert_eq!(item.kind().tree(), tree, "{:?}", item.kind());
            let bytes = item.to_bytes().unwrap();
            assert_eq!(BlockItem::from_bytes(&bytes).unwrap(), item);
        }
    }

    #[test]
    fn test_encoding_is_tagged() {
        // The first byte is the variant index, so equal payloads of different kinds hash differently
        let payload = vec![7u8; 4];
        let transaction = BlockItem::Transaction(Transaction { payload: payload.clone() });
        let system = BlockItem::SystemTransaction(Transaction { payload: payload.clone() });
        let output = BlockItem::TransactionOutput(TransactionOutput { payload });
        assert_eq!(transaction.to_bytes().unwrap()[0], 2);
        assert_eq!(system.to_bytes().unwrap()[0], 3);
        assert_eq!(transaction.to_bytes().unwrap()[1..], output.to_bytes().unwrap()[1..]);
        assert!(BlockItem::from_bytes(&[42]).is_err());
    }
}
