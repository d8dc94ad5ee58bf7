//! Logger configuration: defaults, TOML files and environment overrides.

use crate::errors::LogError;
use crate::format::{self, DEFAULT_LINE_FORMAT, DEFAULT_TIME_FORMAT, LineFormat};
use serde::Deserialize;
use std::path::{Path, PathBuf};

pub const ENV_TARGET: &str = "FILELOG_TARGET";
pub const ENV_BASE_PATH: &str = "FILELOG_BASE_PATH";
pub const ENV_DOCUMENT_ROOT: &str = "DOCUMENT_ROOT";
pub const ENV_APPEND: &str = "FILELOG_APPEND";
pub const ENV_LOCKING: &str = "FILELOG_LOCKING";
pub const ENV_IDENT: &str = "FILELOG_IDENT";
pub const ENV_MUTED: &str = "FILELOG_MUTED";
pub const ENV_PRODUCTION: &str = "FILELOG_PRODUCTION";

/// Configuration for a [`crate::FileLogger`].
///
/// Every field is optional in TOML:
///
/// ```toml
/// target = "logs/run.log"
/// locking = true
/// file_mode = 0o600
/// line_format = "{timestamp} [{function}] {label} {message}"
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LoggerConfig {
    /// Destination file. Derived from `base_path`/`document_root` when unset.
    pub target: Option<PathBuf>,
    pub base_path: Option<PathBuf>,
    pub document_root: Option<PathBuf>,
    /// Append to an existing file (true) or truncate it on open.
    pub append: bool,
    /// Hold an exclusive advisory lock around each write.
    pub locking: bool,
    /// Mode for files the logger creates.
    pub file_mode: u32,
    /// Mode for directories the logger creates.
    pub dir_mode: u32,
    pub line_format: String,
    /// strftime pattern for `{timestamp}`.
    pub time_format: String,
    pub ident: Option<String>,
    pub muted: bool,
    /// Disable all output, same as building with the `production` feature.
    pub production: bool,
    /// Extra symbol prefixes treated as logging wrappers during caller
    /// resolution, e.g. `"myapp::log::"`.
    pub wrapper_prefixes: Vec<String>,
}

impl Default for LoggerConfig {
    fn default() -> Self {
        Self {
            target: None,
            base_path: None,
            document_root: None,
            append: true,
            locking: false,
            file_mode: 0o644,
            dir_mode: 0o755,
            line_format: DEFAULT_LINE_FORMAT.to_string(),
            time_format: DEFAULT_TIME_FORMAT.to_string(),
            ident: None,
            muted: false,
            production: false,
            wrapper_prefixes: Vec::new(),
        }
    }
}

fn parse_bool(s: &str) -> Option<bool> {
    match s.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

impl LoggerConfig {
    /// Parse a TOML document.
    ///
    /// # Errors
    /// Returns [`LogError::Config`] on malformed TOML or unknown keys.
    pub fn from_toml_str(s: &str) -> Result<Self, LogError> {
        toml::from_str(s).map_err(|e| LogError::Config(e.to_string()))
    }

    /// Load a TOML file.
    ///
    /// # Errors
    /// Returns [`LogError::Config`] if the file cannot be read or parsed.
    pub fn from_file(path: &Path) -> Result<Self, LogError> {
        let s = std::fs::read_to_string(path)
            .map_err(|e| LogError::Config(format!("{}: {e}", path.display())))?;
        Self::from_toml_str(&s)
    }

    /// Defaults with environment overrides applied.
    #[must_use]
    pub fn from_env() -> Self {
        Self::default().apply_env()
    }

    /// Override fields from the process environment.
    #[must_use]
    pub fn apply_env(self) -> Self {
        self.apply_env_from(|k| std::env::var(k).ok())
    }

    /// Override fields from an arbitrary variable source. Unparseable
    /// booleans are ignored.
    #[must_use]
    pub fn apply_env_from(mut self, get: impl Fn(&str) -> Option<String>) -> Self {
        if let Some(v) = get(ENV_TARGET).filter(|s| !s.is_empty()) {
            self.target = Some(PathBuf::from(v));
        }
        if let Some(v) = get(ENV_BASE_PATH).filter(|s| !s.is_empty()) {
            self.base_path = Some(PathBuf::from(v));
        }
        if let Some(v) = get(ENV_DOCUMENT_ROOT).filter(|s| !s.is_empty()) {
            self.document_root = Some(PathBuf::from(v));
        }
        if let Some(v) = get(ENV_IDENT) {
            self.ident = Some(v);
        }
        if let Some(b) = get(ENV_APPEND).as_deref().and_then(parse_bool) {
            self.append = b;
        }
        if let Some(b) = get(ENV_LOCKING).as_deref().and_then(parse_bool) {
            self.locking = b;
        }
        if let Some(b) = get(ENV_MUTED).as_deref().and_then(parse_bool) {
            self.muted = b;
        }
        if let Some(b) = get(ENV_PRODUCTION).as_deref().and_then(parse_bool) {
            self.production = b;
        }
        self
    }

    /// Check the template and time pattern, returning the parsed template.
    ///
    /// # Errors
    /// Returns [`LogError::Format`] if either is invalid.
    pub fn validate(&self) -> Result<LineFormat, LogError> {
        format::validate_time_format(&self.time_format)?;
        LineFormat::parse(&self.line_format)
    }

    /// Whether output is disabled by the build or by configuration.
    #[must_use]
    pub fn is_production(&self) -> bool {
        cfg!(feature = "production") || self.production
    }
}
