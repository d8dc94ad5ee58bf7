//! Synchronous diagnostic file logger for test runs.
//!
//! A [`FileLogger`] appends one formatted line per call to a single local
//! file. The file and its parent directories are created on first use.
//! Messages may be text, primitives, JSON-like collections or debug dumps
//! (see [`Message`]), and lines can carry the caller's file, line, function
//! and type.
//!
//! ```no_run
//! use filelog::{FileLogger, LoggerConfig};
//!
//! let logger = FileLogger::new(LoggerConfig {
//!     target: Some("logs/run.log".into()),
//!     line_format: "{timestamp} {label} {function} {message}".into(),
//!     ..Default::default()
//! })?;
//! logger.debug("START")?;
//! logger.info_with(vec![1, 2, 3].len(), line!())?;
//! logger.close()?;
//! # Ok::<(), filelog::LogError>(())
//! ```

pub mod appender;
pub mod caller;
pub mod config;
pub mod errors;
pub mod format;
pub mod fsutil;
pub mod logger;
pub mod message;

pub use crate::appender::{FileLoggerAppender, init_with_logger};
pub use crate::caller::CallerInfo;
pub use crate::config::LoggerConfig;
pub use crate::errors::{DisabledReason, LogError};
pub use crate::format::{LineFormat, Severity};
pub use crate::logger::FileLogger;
pub use crate::message::Message;
