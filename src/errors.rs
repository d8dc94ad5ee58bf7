use std::path::PathBuf;
use thiserror::Error;

/// Why a logging call was suppressed without touching the file.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DisabledReason {
    Muted,
    Production,
}

impl std::fmt::Display for DisabledReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DisabledReason::Muted => f.write_str("muted"),
            DisabledReason::Production => f.write_str("production mode"),
        }
    }
}

#[derive(Debug, Error)]
pub enum LogError {
    #[error("logging disabled: {0}")]
    Disabled(DisabledReason),

    #[error("failed to create directory {path}: {source}")]
    CreateDirectory {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("directory not writable: {0}")]
    DirectoryNotWritable(PathBuf),

    #[error("log file not writable: {0}")]
    FileNotWritable(PathBuf),

    #[error("failed to open log file {path}: {source}")]
    Open {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("write error: {0}")]
    Write(#[from] std::io::Error),

    #[error("invalid line format: {0}")]
    Format(String),

    #[error("config error: {0}")]
    Config(String),
}

impl LogError {
    /// True for the silent no-op cases (mute flag or production switch).
    #[must_use]
    pub fn is_disabled(&self) -> bool {
        matches!(self, LogError::Disabled(_))
    }
}
