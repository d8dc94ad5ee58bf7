//! Routing the `log` facade into a [`FileLogger`] through log4rs.

use crate::caller::SourcePos;
use crate::errors::LogError;
use crate::format::Severity;
use crate::logger::FileLogger;
use crate::message::Message;
use log::{LevelFilter, Record};
use log4rs::append::Append;
use log4rs::config::{Appender, Config, Logger, Root};
use std::sync::Arc;

/// Target of the logger's own diagnostics. Never routed back into the file.
pub const INTERNAL_TARGET: &str = "filelog::internal";

/// log4rs appender writing records through a shared [`FileLogger`].
///
/// `log::Level` maps to severities as Error → ERROR, Warn → WARNING,
/// Info → INFO, Debug/Trace → DEBUG.
#[derive(Debug, Clone)]
pub struct FileLoggerAppender {
    logger: Arc<FileLogger>,
}

impl FileLoggerAppender {
    pub fn new(logger: Arc<FileLogger>) -> Self {
        Self { logger }
    }

    #[must_use]
    pub fn logger(&self) -> &Arc<FileLogger> {
        &self.logger
    }
}

impl Append for FileLoggerAppender {
    fn append(&self, record: &Record) -> anyhow::Result<()> {
        // the logger's own diagnostics never go back into its file
        if record.target() == INTERNAL_TARGET {
            return Ok(());
        }
        let label = Severity::from(record.level()).label(None);
        let pos = match (record.file(), record.line()) {
            (Some(file), Some(line)) => Some(SourcePos { file, line }),
            _ => None,
        };
        match self.logger.emit(Message::from(record.args().to_string()), &label, pos) {
            Ok(_) => Ok(()),
            // muted/production loggers swallow records silently
            Err(e) if e.is_disabled() => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    fn flush(&self) {
        let _ = self.logger.flush();
    }
}

/// Build a log4rs config sending the root logger at `level` to `logger`.
///
/// # Errors
/// Returns [`LogError::Config`] if log4rs rejects the configuration.
pub fn config_for(logger: Arc<FileLogger>, level: LevelFilter) -> Result<Config, LogError> {
    Config::builder()
        .appender(Appender::builder().build("filelog", Box::new(FileLoggerAppender::new(logger))))
        .logger(Logger::builder().additive(false).build(INTERNAL_TARGET, LevelFilter::Off))
        .build(Root::builder().appender("filelog").build(level))
        .map_err(|e| LogError::Config(e.to_string()))
}

/// Install `logger` as the process-wide `log` backend.
///
/// # Errors
/// Returns [`LogError::Config`] if a global logger is already set.
pub fn init_with_logger(
    logger: Arc<FileLogger>,
    level: LevelFilter,
) -> Result<log4rs::Handle, LogError> {
    let config = config_for(logger, level)?;
    log4rs::init_config(config).map_err(|e| LogError::Config(e.to_string()))
}
