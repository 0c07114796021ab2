mod db;
mod errors;
mod item;
mod key;
mod writer;

pub mod registry;
pub mod utils;

pub mod prelude {
    use crate::{db, errors};

    pub use super::item::CachedDbItem;
    pub use super::key::DbKey;
    pub use super::writer::{BatchDbWriter, DbWriter, DirectDbWriter};
    pub use db::{ConnBuilder, DB};
    pub use errors::{StoreError, StoreResult, StoreResultExtensions};
}
