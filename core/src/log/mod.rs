//! Logger and logging macros
//!
//! For the macros to properly compile, the calling crate must add a dependency to
//! crate log (ie. `log.workspace = true`).

use ::log::LevelFilter;
use log4rs::{Config, config::Root};

mod appender;
mod consts;
mod logger;

use appender::AppenderSpec;
pub use consts::{DEFAULT_LOGGER_ENV, ERR_LOG_FILE_NAME, LOG_FILE_NAME};
pub use logger::LogError;

const CONSOLE_APPENDER: &str = "stdout";
const LOG_FILE_APPENDER: &str = "log_file";
const ERR_LOG_FILE_APPENDER: &str = "err_log_file";

/// Installs the global logger.
///
/// Logs always go to the console. When `log_dir` is provided, two size-rolled files are added: one receiving
/// every line passing the filters and one receiving only warnings and errors.
///
/// `filters` follows the `RUST_LOG` syntax (`info,blockstream=debug`) and is applied on top of the
/// environment variable [`DEFAULT_LOGGER_ENV`], so explicit arguments win.
pub fn init_logger(log_dir: Option<&str>, filters: &str) -> Result<(), LogError> {
    let loggers = logger::Builder::new()
        .root_level(LevelFilter::Info)
        .appenders(log_dir.map_or(vec![CONSOLE_APPENDER], |_| vec![CONSOLE_APPENDER, LOG_FILE_APPENDER, ERR_LOG_FILE_APPENDER]))
        .parse_env(DEFAULT_LOGGER_ENV)
        .parse_expression(filters)
        .build();

    let mut specs = vec![AppenderSpec::console(CONSOLE_APPENDER, None)];
    if let Some(dir) = log_dir {
        specs.push(AppenderSpec::roller(LOG_FILE_APPENDER, None, dir, LOG_FILE_NAME)?);
        specs.push(AppenderSpec::roller(ERR_LOG_FILE_APPENDER, Some(LevelFilter::Warn), dir, ERR_LOG_FILE_NAME)?);
    }

    let root_appenders = specs.iter().map(|spec| spec.name).collect::<Vec<_>>();
    let config = Config::builder()
        .appenders(specs.into_iter().map(AppenderSpec::into_appender))
        .loggers(loggers.items())
        .build(Root::builder().appenders(root_appenders).build(loggers.root_level()))
        .map_err(|err| LogError::ConfigError(err.to_string()))?;
    log4rs::init_config(config).map_err(|err| LogError::ConfigError(err.to_string()))?;
    Ok(())
}

#[macro_export]
macro_rules! trace {
    ($($t:tt)*) => (
        log::trace!($($t)*);
    )
}

#[macro_export]
macro_rules! debug {
    ($($t:tt)*) => (
        log::debug!($($t)*);
    )
}

#[macro_export]
macro_rules! info {
    ($($t:tt)*) => (
        log::info!($($t)*);
    )
}

#[macro_export]
macro_rules! warn {
    ($($t:tt)*) => (
        log::warn!($($t)*);
    )
}

#[macro_export]
macro_rules! error {
    ($($t:tt)*) => (
        log::error!($($t)*);
    )
}
