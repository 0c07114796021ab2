use rocksdb::{DBWithThreadMode, MultiThreaded};

pub use conn_builder::ConnBuilder;

mod conn_builder;

/// The DB type used for block stream stores
pub type DB = DBWithThreadMode<MultiThreaded>;

