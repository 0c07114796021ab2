//! Production of a verifiable block stream out of consensus rounds.
//!
//! Every round becomes one block: a header, the round items, and a closing state changes item capturing the
//! updated [`model::BlockStreamInfo`]. Items feed an input and an output Merkle tree and transaction results
//! are folded into a running hash chain. The block hash `SHA384(previous || input root || output root)` chains
//! blocks together.

pub mod config;
pub mod errors;
pub mod manager;
pub mod model;
pub mod processes;
pub mod reader;
pub mod writer;
