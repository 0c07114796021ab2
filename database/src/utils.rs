use crate::prelude::{ConnBuilder, DB, StoreResult};
use log::warn;
use std::{
    sync::{Arc, Weak},
    thread,
    time::Duration,
};
use tempfile::TempDir;

#[derive(Default)]
pub struct DbLifetime {
    weak_db_ref: Weak<DB>,
    optional_tempdir: Option<TempDir>,
}

impl DbLifetime {
    pub fn new(tempdir: TempDir, weak_db_ref: Weak<DB>) -> Self {
        Self { optional_tempdir: Some(tempdir), weak_db_ref }
    }

    /// Tracks the DB without destroying it on drop
    pub fn without_destroy(weak_db_ref: Weak<DB>) -> Self {
        Self { optional_tempdir: None, weak_db_ref }
    }
}

impl Drop for DbLifetime {
    fn drop(&mut self) {
        for _ in 0..16 {
            if self.weak_db_ref.strong_count() > 0 {
                // Another thread may still be releasing its reference
                thread::sleep(Duration::from_millis(8));
            } else {
                break;
            }
        }
        if self.weak_db_ref.strong_count() > 0 {
            warn!("DB lifetime dropped while the DB is still referenced");
            return;
        }
        if let Some(dir) = self.optional_tempdir.take() {
            let options = rocksdb::Options::default();
            if let Err(err) = DB::destroy(&options, dir.path()) {
                warn!("Failed destroying temp DB at {}: {}", dir.path().display(), err);
            }
        }
    }
}

pub fn get_blockstream_tempdir() -> StoreResult<TempDir> {
    Ok(tempfile::Builder::new().prefix("blockstream-rust").tempdir()?)
}

/// Opens a DB in a fresh temp directory. The returned lifetime destroys the DB once dropped.
pub fn create_temp_db_with<P>(conn_builder: ConnBuilder<P>) -> StoreResult<(DbLifetime, Arc<DB>)> {
    let db_tempdir = get_blockstream_tempdir()?;
    let db_path = db_tempdir.path().to_owned();
    let db = conn_builder.with_db_path(db_path).build()?;
    Ok((DbLifetime::new(db_tempdir, Arc::downgrade(&db)), db))
}

/// Creates a DB within a temp directory under `<OS SPECIFIC TEMP DIR>/blockstream-rust`.
/// Callers must keep the returned `DbLifetime` guard for as long as they wish the DB to exist.
#[macro_export]
macro_rules! create_temp_db {
    ($conn_builder: expr) => {{ $crate::utils::create_temp_db_with($conn_builder) }};
}
