pub mod perf {
    //!
    //! Performance related constants
    //!

    /// Performance params
    #[derive(Clone, Debug)]
    pub struct PerfParams {
        /// Number of threads driving the asynchronous task chains.
        /// Zero means a quarter of the logical cores, with a minimum of two
        pub async_threads: usize,

        /// Number of threads of the compute pool hashing and serializing items.
        /// Zero means one per logical core
        pub compute_threads: usize,

        /// Gzip the block files produced by the file writer
        pub compress_blocks: bool,
    }

    pub const PERF_PARAMS: PerfParams = PerfParams { async_threads: 0, compute_threads: 0, compress_blocks: false };
}

/// Name of the singleton state captured by the final state changes item of every block
pub const BLOCK_STREAM_INFO_STATE_NAME: &str = "BlockStreamService.BLOCK_STREAM_INFO";
