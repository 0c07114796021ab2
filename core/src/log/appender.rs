use super::{
    consts::{
        LOG_ARCHIVE_SUFFIX, LOG_FILE_BASE_ROLLS, LOG_FILE_MAX_ROLLS, LOG_FILE_MAX_SIZE, LOG_LINE_PATTERN, LOG_LINE_PATTERN_COLORED,
    },
    logger::LogError,
};
use log::LevelFilter;
use log4rs::{
    append::{
        Append,
        console::ConsoleAppender,
        rolling_file::{
            RollingFileAppender,
            policy::compound::{CompoundPolicy, roll::fixed_window::FixedWindowRoller, trigger::size::SizeTrigger},
        },
    },
    config::Appender,
    encode::pattern::PatternEncoder,
    filter::{Filter, threshold::ThresholdFilter},
};
use std::path::PathBuf;

pub(super) struct AppenderSpec {
    pub name: &'static str,
    level: Option<LevelFilter>,
    append: Box<dyn Append>,
}

impl AppenderSpec {
    pub fn console(name: &'static str, level: Option<LevelFilter>) -> Self {
        let append = ConsoleAppender::builder().encoder(Box::new(PatternEncoder::new(LOG_LINE_PATTERN_COLORED))).build();
        Self { name, level, append: Box::new(append) }
    }

    pub fn roller(name: &'static str, level: Option<LevelFilter>, log_dir: &str, file_name: &str) -> Result<Self, LogError> {
        let file_path = PathBuf::from(log_dir).join(file_name);
        let roller_pattern = PathBuf::from(log_dir).join(format!("{}{}", file_name, LOG_ARCHIVE_SUFFIX));
        let roller_pattern = roller_pattern.to_str().ok_or_else(|| LogError::InvalidPath(roller_pattern.display().to_string()))?;

        let roller = FixedWindowRoller::builder()
            .base(LOG_FILE_BASE_ROLLS)
            .build(roller_pattern, LOG_FILE_MAX_ROLLS)
            .map_err(|err| LogError::ConfigError(err.to_string()))?;
        let policy = CompoundPolicy::new(Box::new(SizeTrigger::new(LOG_FILE_MAX_SIZE)), Box::new(roller));
        let append = RollingFileAppender::builder()
            .encoder(Box::new(PatternEncoder::new(LOG_LINE_PATTERN)))
            .build(file_path, Box::new(policy))
            .map_err(|err| LogError::ConfigError(err.to_string()))?;

        Ok(Self { name, level, append: Box::new(append) })
    }

    pub fn into_appender(self) -> Appender {
        Appender::builder()
            .filters(self.level.map(|x| Box::new(ThresholdFilter::new(x)) as Box<dyn Filter>))
            .build(self.name, self.append)
    }
}
