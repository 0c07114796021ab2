use crate::{db::DB, errors::StoreResult};
use rocksdb::{BlockBasedOptions, DBCompressionType};
use std::{path::PathBuf, sync::Arc};

const KB: usize = 1024;
const MB: usize = 1024 * KB;

#[derive(Debug)]
pub struct Unspecified;

/// Builds a RocksDB connection. The database path must be provided before building.
#[derive(Debug)]
pub struct ConnBuilder<Path> {
    db_path: Path,
    create_if_missing: bool,
    parallelism: usize,
    files_limit: i32,
    mem_budget: usize,
}

impl Default for ConnBuilder<Unspecified> {
    fn default() -> Self {
        ConnBuilder { db_path: Unspecified, create_if_missing: true, parallelism: 1, files_limit: 64, mem_budget: 16 * MB }
    }
}

impl<Path> ConnBuilder<Path> {
    pub fn with_db_path(self, db_path: PathBuf) -> ConnBuilder<PathBuf> {
        ConnBuilder {
            db_path,
            create_if_missing: self.create_if_missing,
            parallelism: self.parallelism,
            files_limit: self.files_limit,
            mem_budget: self.mem_budget,
        }
    }

    pub fn with_create_if_missing(self, create_if_missing: bool) -> Self {
        ConnBuilder { create_if_missing, ..self }
    }

    pub fn with_parallelism(self, parallelism: impl Into<usize>) -> Self {
        ConnBuilder { parallelism: parallelism.into(), ..self }
    }

    pub fn with_files_limit(self, files_limit: impl Into<i32>) -> Self {
        ConnBuilder { files_limit: files_limit.into(), ..self }
    }

    pub fn with_mem_budget(self, mem_budget: impl Into<usize>) -> Self {
        ConnBuilder { mem_budget: mem_budget.into(), ..self }
    }

    fn options(&self) -> rocksdb::Options {
        let mut opts = rocksdb::Options::default();
        if self.parallelism > 1 {
            opts.increase_parallelism(self.parallelism as i32);
        }
        // Sized for a keyspace of a few small singletons
        opts.set_write_buffer_size(self.mem_budget.max(MB));
        opts.set_max_write_buffer_number(2);
        opts.set_keep_log_file_num(1);
        opts.set_bytes_per_sync(MB as u64);
        opts.set_compression_type(DBCompressionType::None);

        let mut b_opts = BlockBasedOptions::default();
        b_opts.set_block_size(16 * KB);
        opts.set_block_based_table_factory(&b_opts);

        opts.set_max_open_files(self.files_limit);
        opts.create_if_missing(self.create_if_missing);
        opts
    }
}

impl ConnBuilder<PathBuf> {
    pub fn build(self) -> StoreResult<Arc<DB>> {
        let opts = self.options();
        Ok(Arc::new(DB::open(&opts, &self.db_path)?))
    }
}
