pub mod constants;
pub mod params;

use blockstream_core::task::{TaskResult, TaskRuntime};
use std::ops::Deref;

use {
    constants::perf::{PERF_PARAMS, PerfParams},
    params::Params,
};

/// Block stream configuration bundled up under a single struct. Use `Config::new` for directly building from
/// a `Params` instance, or `ConfigBuilder` for anything more involved. NOTE: this struct can be implicitly
/// de-refed into `Params`
#[derive(Clone, Debug)]
pub struct Config {
    /// Block stream params
    pub params: Params,
    /// Performance params
    pub perf: PerfParams,
}

impl Config {
    pub fn new(params: Params) -> Self {
        Self { params, perf: PERF_PARAMS }
    }

    pub fn to_builder(&self) -> ConfigBuilder {
        ConfigBuilder { config: self.clone() }
    }

    /// Builds the task runtime sized by the performance params
    pub fn build_runtime(&self) -> TaskResult<TaskRuntime> {
        TaskRuntime::new(self.perf.async_threads, self.perf.compute_threads)
    }
}

impl AsRef<Params> for Config {
    fn as_ref(&self) -> &Params {
        &self.params
    }
}

impl Deref for Config {
    type Target = Params;

    fn deref(&self) -> &Self::Target {
        &self.params
    }
}

pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    pub fn new(params: Params) -> Self {
        Self { config: Config::new(params) }
    }

    pub fn set_perf_params(mut self, perf: PerfParams) -> Self {
        self.config.perf = perf;
        self
    }

    pub fn edit_params<F>(mut self, edit_func: F) -> Self
    where
        F: Fn(&mut Params),
    {
        edit_func(&mut self.config.params);
        self
    }

    pub fn apply_args<F>(mut self, edit_func: F) -> Self
    where
        F: Fn(&mut Config),
    {
        edit_func(&mut self.config);
        self
    }

    pub fn compress_blocks(mut self) -> Self {
        self.config.perf.compress_blocks = true;
        self
    }

    pub fn build(self) -> Config {
        self.config
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::params::{DEVNET_PARAMS, MAINNET_PARAMS};

    #[test]
    fn test_config_builder() {
        let config = ConfigBuilder::new(DEVNET_PARAMS)
            .edit_params(|p| p.trailing_block_hashes = 4)
            .apply_args(|c| c.perf.compute_threads = 3)
            .compress_blocks()
            .build();
        assert_eq!(config.trailing_block_hashes, 4);
        assert_eq!(config.perf.compute_threads, 3);
        assert!(config.perf.compress_blocks);

        let rebuilt = config.to_builder().set_perf_params(PERF_PARAMS).build();
        assert_eq!(rebuilt.trailing_block_hashes, 4);
        assert!(!rebuilt.perf.compress_blocks);

        assert_eq!(rebuilt.network_name, "blockstream-devnet");

        assert_eq!(Config::new(MAINNET_PARAMS).trailing_block_hashes, 256);
    }
}
