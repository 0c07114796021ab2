use crate::model::SemanticVersion;
use blockstream_merkle::{DEFAULT_COMBINATION_CHUNK_SIZE, DEFAULT_LEAF_CHUNK_SIZE};

/// Block stream parameters
#[derive(Clone, Debug)]
pub struct Params {
    pub network_name: &'static str,

    /// Number of trailing block hashes kept for historical lookups
    pub trailing_block_hashes: usize,

    /// Number of block items buffered before being handed off for serialization, hashing and writing
    pub item_chunk_size: usize,

    /// Number of leaves hashed by a single task of the tree hashers
    pub leaf_chunk_size: usize,

    /// Number of hashes combined by a single task of the tree hashers. Must be even
    pub combination_chunk_size: usize,

    pub software_version: SemanticVersion,
    pub protocol_version: SemanticVersion,
}

const SOFTWARE_VERSION: SemanticVersion = SemanticVersion { major: 0, minor: 3, patch: 0 };

pub const MAINNET_PARAMS: Params = Params {
    network_name: "blockstream-mainnet",
    trailing_block_hashes: 256,
    item_chunk_size: 8,
    leaf_chunk_size: DEFAULT_LEAF_CHUNK_SIZE,
    combination_chunk_size: DEFAULT_COMBINATION_CHUNK_SIZE,
    software_version: SOFTWARE_VERSION,
    protocol_version: SemanticVersion { major: 0, minor: 56, patch: 0 },
};

pub const DEVNET_PARAMS: Params = Params {
    network_name: "blockstream-devnet",
    trailing_block_hashes: 16,
    item_chunk_size: 8,
    leaf_chunk_size: DEFAULT_LEAF_CHUNK_SIZE,
    combination_chunk_size: DEFAULT_COMBINATION_CHUNK_SIZE,
    software_version: SOFTWARE_VERSION,
    protocol_version: SemanticVersion { major: 0, minor: 56, patch: 0 },
};
