pub mod block_stream_info;

pub use block_stream_info::{BlockStreamInfoStore, BlockStreamInfoStoreReader, DbBlockStreamInfoStore};
