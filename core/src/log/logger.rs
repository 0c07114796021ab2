use log::LevelFilter;
use log4rs::config::Logger;
use std::{collections::HashMap, env, mem};
use thiserror::Error;

#[derive(Clone, Debug, Error)]
pub enum LogError {
    #[error("logger spec parsing error: {0}")]
    ParseLoggerSpecError(String),

    #[error("log path is not valid UTF-8: {0}")]
    InvalidPath(String),

    #[error("logger configuration error: {0}")]
    ConfigError(String),
}

#[derive(Clone, Debug, PartialEq)]
pub(super) struct LoggerSpec {
    pub name: String,
    pub level: LevelFilter,
    pub appenders: Vec<&'static str>,
}

impl LoggerSpec {
    fn logger(&self) -> Logger {
        // Module loggers are routed by the root appenders, so they must not append twice
        Logger::builder().additive(false).appenders(self.appenders.iter().map(|x| x.to_string())).build(self.name.clone(), self.level)
    }
}

pub(super) struct Loggers {
    loggers: Vec<LoggerSpec>,
    root_level: LevelFilter,
}

impl Loggers {
    pub fn root_level(&self) -> LevelFilter {
        self.root_level
    }

    pub fn items(&self) -> impl IntoIterator<Item = Logger> + '_ {
        self.loggers.iter().map(|x| x.logger())
    }

    #[cfg(test)]
    fn get(&self, name: &str) -> Option<&LoggerSpec> {
        self.loggers.iter().find(|x| x.name == name)
    }
}

/// Accumulates `RUST_LOG`-style directives. Later directives override earlier ones for the same target.
pub(super) struct Builder {
    appenders: Vec<&'static str>,
    loggers: HashMap<String, LevelFilter>,
    root_level: Option<LevelFilter>,
}

impl Builder {
    pub fn new() -> Builder {
        Builder { appenders: vec![], loggers: HashMap::new(), root_level: None }
    }

    pub fn appenders(&mut self, appenders: Vec<&'static str>) -> &mut Self {
        self.appenders = appenders;
        self
    }

    pub fn root_level(&mut self, root_level: LevelFilter) -> &mut Self {
        self.root_level.replace(root_level);
        self
    }

    pub fn parse_env(&mut self, env: &str) -> &mut Self {
        self.parse_expression(&env::var(env).unwrap_or_default())
    }

    pub fn parse_expression(&mut self, expression: &str) -> &mut Self {
        for directive in expression.split(',').map(|x| x.trim()).filter(|x| !x.is_empty()) {
            match Self::parse_directive(directive) {
                Ok((Some(name), level)) => {
                    self.loggers.insert(name.to_string(), level);
                }
                Ok((None, level)) => {
                    self.root_level(level);
                }
                Err(err) => println!("Ignoring invalid logging spec '{}'", err),
            }
        }
        self
    }

    /// Parses `level`, `target` or `target=level`
    fn parse_directive(directive: &str) -> Result<(Option<&str>, LevelFilter), LogError> {
        let mut parts = directive.split('=');
        match (parts.next(), parts.next().map(|x| x.trim()), parts.next()) {
            (Some(target_or_level), None, None) => match target_or_level.parse() {
                Ok(level) => Ok((None, level)),
                Err(_) => Ok((Some(target_or_level), LevelFilter::max())),
            },
            (Some(target), Some(""), None) => Ok((Some(target), LevelFilter::max())),
            (Some(target), Some(level), None) => {
                level.parse().map(|level| (Some(target), level)).map_err(|_| LogError::ParseLoggerSpecError(level.to_string()))
            }
            _ => Err(LogError::ParseLoggerSpecError(directive.to_string())),
        }
    }

    pub fn build(&mut self) -> Loggers {
        let appenders = self.appenders.clone();
        let loggers = mem::take(&mut self.loggers)
            .into_iter()
            .map(|(name, level)| LoggerSpec { name, level, appenders: appenders.clone() })
            .collect::<Vec<_>>();
        Loggers { loggers, root_level: self.root_level.take().unwrap_or(LevelFilter::Error) }
    }
}
