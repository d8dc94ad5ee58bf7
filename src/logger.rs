//! The file logger.
//!
//! A [`FileLogger`] owns one lazily opened file handle. Every entry point
//! normalizes its message, formats a line and appends it, returning the line
//! on success. Failures never panic: they come back as a [`LogError`] and the
//! line is dropped.

use crate::appender::INTERNAL_TARGET;
use crate::caller::{self, SourcePos, TraceSite};
use crate::config::LoggerConfig;
use crate::errors::{DisabledReason, LogError};
use crate::format::{self, LineFields, LineFormat, Severity};
use crate::fsutil;
use crate::message::Message;
use chrono::Local;
use parking_lot::Mutex;
use std::error::Error;
use std::fmt;
use std::fs::File;
use std::io::Write;
use std::panic::Location;
use std::path::{Path, PathBuf};

/// Terminator appended to every line.
pub const LINE_ENDING: &str = if cfg!(windows) { "\r\n" } else { "\n" };

/// First line written by [`FileLogger::trace`].
pub const TRACE_BANNER: &str = "===  TRACE  ===";

struct LoggerState {
    target: Option<PathBuf>,
    base_path: Option<PathBuf>,
    document_root: Option<PathBuf>,
    file: Option<File>,
    open_path: Option<PathBuf>,
    // None until the first open attempt
    opened: Option<bool>,
    append: bool,
    locking: bool,
    file_mode: u32,
    dir_mode: u32,
    line_format: LineFormat,
    time_format: String,
    ident: Option<String>,
    muted: bool,
    production: bool,
    wrappers: Vec<String>,
    // diagnostics queued under the lock, reported after it is released
    notes: Vec<(log::Level, String)>,
}

impl LoggerState {
    fn from_config(config: LoggerConfig, line_format: LineFormat) -> Self {
        Self {
            production: config.is_production(),
            target: config.target,
            base_path: config.base_path,
            document_root: config.document_root,
            file: None,
            open_path: None,
            opened: None,
            append: config.append,
            locking: config.locking,
            file_mode: config.file_mode,
            dir_mode: config.dir_mode,
            line_format,
            time_format: config.time_format,
            ident: config.ident,
            muted: config.muted,
            wrappers: config.wrapper_prefixes,
            notes: Vec::new(),
        }
    }

    fn note(&mut self, level: log::Level, msg: String) {
        self.notes.push((level, msg));
    }

    fn ensure_open(&mut self) -> Result<(), LogError> {
        if self.file.is_some() {
            return Ok(());
        }
        if self.production {
            return Err(LogError::Disabled(DisabledReason::Production));
        }
        let path = match &self.target {
            Some(p) => p.clone(),
            None => {
                let p = fsutil::default_log_path(
                    self.base_path.as_deref(),
                    self.document_root.as_deref(),
                );
                self.target = Some(p.clone());
                p
            }
        };
        match self.open_at(&path) {
            Ok(()) => {
                self.opened = Some(true);
                Ok(())
            }
            Err(e) => {
                self.note(log::Level::Warn, format!("cannot open {}: {e}", path.display()));
                self.opened = Some(false);
                Err(e)
            }
        }
    }

    fn open_at(&mut self, path: &Path) -> Result<(), LogError> {
        let dir = fsutil::parent_dir(path);
        if !dir.is_dir() {
            for created in fsutil::make_dirs(dir, self.dir_mode)? {
                self.note(log::Level::Debug, format!("created log directory {}", created.display()));
            }
        }
        if !fsutil::is_writable(dir) {
            return Err(LogError::DirectoryNotWritable(dir.to_path_buf()));
        }
        if path.exists() && !fsutil::is_writable(path) {
            return Err(LogError::FileNotWritable(path.to_path_buf()));
        }
        let (file, created) = fsutil::open_log_file(path, self.append)
            .map_err(|source| LogError::Open { path: path.to_path_buf(), source })?;
        if created && let Err(e) = fsutil::apply_mode(path, self.file_mode) {
            self.note(log::Level::Warn, format!("cannot set mode on {}: {e}", path.display()));
        }
        self.note(log::Level::Debug, format!("opened {}", path.display()));
        self.file = Some(file);
        self.open_path = Some(path.to_path_buf());
        Ok(())
    }

    fn write_line(&mut self, line: &str) -> Result<(), LogError> {
        let locking = self.locking;
        let Some(file) = self.file.as_mut() else {
            return Err(LogError::Write(std::io::Error::other("log file is not open")));
        };
        let mut buf = String::with_capacity(line.len() + LINE_ENDING.len());
        buf.push_str(line);
        buf.push_str(LINE_ENDING);
        if locking {
            file.lock()?;
        }
        let written = file.write_all(buf.as_bytes());
        let unlocked = if locking { file.unlock() } else { Ok(()) };
        if let Err(e) = unlocked {
            self.note(log::Level::Warn, format!("unlock failed: {e}"));
        }
        written.map_err(LogError::Write)
    }

    fn close(&mut self) -> Result<(), LogError> {
        let result = match self.file.take() {
            Some(mut f) => f.flush().map_err(LogError::Write),
            None => Ok(()),
        };
        self.open_path = None;
        self.opened = None;
        result
    }
}

/// Synchronous file logger with lazy opening and caller context.
///
/// ```no_run
/// use filelog::FileLogger;
///
/// let logger = FileLogger::to_file("out.log");
/// logger.debug("START").ok();
/// logger.error(serde_json::json!({ "message": "disk full" })).ok();
/// ```
pub struct FileLogger {
    state: Mutex<LoggerState>,
}

impl Default for FileLogger {
    fn default() -> Self {
        let state = LoggerState::from_config(LoggerConfig::default(), LineFormat::default());
        Self { state: Mutex::new(state) }
    }
}

impl fmt::Debug for FileLogger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let st = self.state.lock();
        f.debug_struct("FileLogger")
            .field("target", &st.target)
            .field("opened", &st.opened)
            .field("muted", &st.muted)
            .finish_non_exhaustive()
    }
}

impl FileLogger {
    /// Build a logger from validated configuration. Does no I/O.
    ///
    /// # Errors
    /// Returns [`LogError::Format`] if the line template or time pattern is invalid.
    pub fn new(config: LoggerConfig) -> Result<Self, LogError> {
        let line_format = config.validate()?;
        Ok(Self { state: Mutex::new(LoggerState::from_config(config, line_format)) })
    }

    /// Default configuration writing to `path`.
    pub fn to_file(path: impl Into<PathBuf>) -> Self {
        let logger = Self::default();
        logger.set_target(path);
        logger
    }

    /// Configuration from the environment (see [`LoggerConfig::apply_env`]).
    ///
    /// # Errors
    /// Returns an error if the resulting configuration is invalid.
    pub fn from_env() -> Result<Self, LogError> {
        Self::new(LoggerConfig::from_env())
    }

    /// Set the destination. An already open handle keeps writing to the old
    /// file until [`FileLogger::close`].
    pub fn set_target(&self, path: impl Into<PathBuf>) {
        self.state.lock().target = Some(path.into());
    }

    #[must_use]
    pub fn target(&self) -> Option<PathBuf> {
        self.state.lock().target.clone()
    }

    /// Path of the currently open file, if any.
    #[must_use]
    pub fn open_path(&self) -> Option<PathBuf> {
        self.state.lock().open_path.clone()
    }

    pub fn mute(&self) {
        self.state.lock().muted = true;
    }

    pub fn unmute(&self) {
        self.state.lock().muted = false;
    }

    #[must_use]
    pub fn is_muted(&self) -> bool {
        self.state.lock().muted
    }

    pub fn set_ident(&self, ident: Option<String>) {
        self.state.lock().ident = ident;
    }

    /// Takes effect on the next open.
    pub fn set_append(&self, append: bool) {
        self.state.lock().append = append;
    }

    pub fn set_locking(&self, locking: bool) {
        self.state.lock().locking = locking;
    }

    /// # Errors
    /// Returns [`LogError::Format`] if the template is invalid; the old one is kept.
    pub fn set_line_format(&self, template: &str) -> Result<(), LogError> {
        let parsed = LineFormat::parse(template)?;
        self.state.lock().line_format = parsed;
        Ok(())
    }

    /// # Errors
    /// Returns [`LogError::Format`] if the pattern is invalid; the old one is kept.
    pub fn set_time_format(&self, pattern: &str) -> Result<(), LogError> {
        format::validate_time_format(pattern)?;
        self.state.lock().time_format = pattern.to_string();
        Ok(())
    }

    /// Open the target if it is not open yet, creating missing directories.
    ///
    /// # Errors
    /// `Disabled(Production)` in production mode, otherwise the open failure.
    pub fn ensure_open(&self) -> Result<(), LogError> {
        self.with_state(LoggerState::ensure_open)
    }

    #[must_use]
    pub fn is_open(&self) -> bool {
        self.state.lock().opened == Some(true)
    }

    /// Result of the last open attempt; `None` before the first one.
    #[must_use]
    pub fn opened(&self) -> Option<bool> {
        self.state.lock().opened
    }

    /// # Errors
    /// Returns the I/O error from flushing the handle.
    pub fn flush(&self) -> Result<(), LogError> {
        match self.state.lock().file.as_mut() {
            Some(f) => f.flush().map_err(LogError::Write),
            None => Ok(()),
        }
    }

    /// Flush and close the handle. The next logging call reopens the target.
    ///
    /// # Errors
    /// Returns the I/O error from the final flush; the handle is closed anyway.
    pub fn close(&self) -> Result<(), LogError> {
        self.state.lock().close()
    }

    /// Log `message` under an arbitrary label.
    ///
    /// # Errors
    /// `Disabled` when muted or in production mode, otherwise the open or
    /// write failure.
    #[track_caller]
    pub fn log<M: Into<Message>>(&self, message: M, label: &str) -> Result<String, LogError> {
        self.emit(message.into(), label, Some(Location::caller().into()))
    }

    /// Log at a severity with an optional label suffix.
    ///
    /// # Errors
    /// See [`FileLogger::log`].
    #[track_caller]
    pub fn log_at<M: Into<Message>>(
        &self,
        severity: Severity,
        suffix: Option<&str>,
        message: M,
    ) -> Result<String, LogError> {
        self.emit(message.into(), &severity.label(suffix), Some(Location::caller().into()))
    }

    /// # Errors
    /// See [`FileLogger::log`].
    #[track_caller]
    pub fn debug<M: Into<Message>>(&self, message: M) -> Result<String, LogError> {
        self.log_at(Severity::Debug, None, message)
    }

    /// `debug` with a label suffix, commonly the caller's line number.
    ///
    /// # Errors
    /// See [`FileLogger::log`].
    #[track_caller]
    pub fn debug_with<M: Into<Message>>(
        &self,
        message: M,
        suffix: impl fmt::Display,
    ) -> Result<String, LogError> {
        self.log_at(Severity::Debug, Some(&suffix.to_string()), message)
    }

    /// # Errors
    /// See [`FileLogger::log`].
    #[track_caller]
    pub fn info<M: Into<Message>>(&self, message: M) -> Result<String, LogError> {
        self.log_at(Severity::Info, None, message)
    }

    /// # Errors
    /// See [`FileLogger::log`].
    #[track_caller]
    pub fn info_with<M: Into<Message>>(
        &self,
        message: M,
        suffix: impl fmt::Display,
    ) -> Result<String, LogError> {
        self.log_at(Severity::Info, Some(&suffix.to_string()), message)
    }

    /// # Errors
    /// See [`FileLogger::log`].
    #[track_caller]
    pub fn warning<M: Into<Message>>(&self, message: M) -> Result<String, LogError> {
        self.log_at(Severity::Warning, None, message)
    }

    /// # Errors
    /// See [`FileLogger::log`].
    #[track_caller]
    pub fn warning_with<M: Into<Message>>(
        &self,
        message: M,
        suffix: impl fmt::Display,
    ) -> Result<String, LogError> {
        self.log_at(Severity::Warning, Some(&suffix.to_string()), message)
    }

    /// # Errors
    /// See [`FileLogger::log`].
    #[track_caller]
    pub fn error<M: Into<Message>>(&self, message: M) -> Result<String, LogError> {
        self.log_at(Severity::Error, None, message)
    }

    /// # Errors
    /// See [`FileLogger::log`].
    #[track_caller]
    pub fn error_with<M: Into<Message>>(
        &self,
        message: M,
        suffix: impl fmt::Display,
    ) -> Result<String, LogError> {
        self.log_at(Severity::Error, Some(&suffix.to_string()), message)
    }

    /// Log an error: the stack at the call site, a line break, then the
    /// error and its `source()` chain.
    ///
    /// # Errors
    /// See [`FileLogger::log`].
    #[track_caller]
    pub fn exception<E: Error + ?Sized>(&self, err: &E) -> Result<String, LogError> {
        self.exception_inner(err, None, Location::caller())
    }

    /// # Errors
    /// See [`FileLogger::log`].
    #[track_caller]
    pub fn exception_with<E: Error + ?Sized>(
        &self,
        err: &E,
        suffix: impl fmt::Display,
    ) -> Result<String, LogError> {
        self.exception_inner(err, Some(&suffix.to_string()), Location::caller())
    }

    /// Log the function that called `trace`, its own caller, and the
    /// position of that call, as two debug lines: [`TRACE_BANNER`] and the
    /// description. Returns the description line.
    ///
    /// # Errors
    /// See [`FileLogger::log`].
    #[track_caller]
    pub fn trace(&self) -> Result<String, LogError> {
        let location = Location::caller();
        let wrappers = {
            let st = self.state.lock();
            if st.muted {
                return Err(LogError::Disabled(DisabledReason::Muted));
            }
            st.wrappers.clone()
        };
        let frames = caller::capture_frames();
        let site = TraceSite::from_frames(&frames, Some(location.into()), &wrappers);
        let label = Severity::Debug.label(None);
        self.emit(TRACE_BANNER.into(), &label, Some(location.into()))?;
        self.emit(site.describe().into(), &label, Some(location.into()))
    }

    /// Log the current stack under the `EXCEPTION:` label.
    ///
    /// # Errors
    /// See [`FileLogger::log`].
    #[track_caller]
    pub fn trace_with_backtrace(&self) -> Result<String, LogError> {
        let location = Location::caller();
        if self.is_muted() {
            return Err(LogError::Disabled(DisabledReason::Muted));
        }
        let bt = backtrace::Backtrace::new();
        let message = format!("{bt:?}{LINE_ENDING}captured for tracing");
        self.emit(message.into(), &Severity::Exception.label(None), Some(location.into()))
    }

    fn exception_inner<E: Error + ?Sized>(
        &self,
        err: &E,
        suffix: Option<&str>,
        location: &'static Location<'static>,
    ) -> Result<String, LogError> {
        if self.is_muted() {
            return Err(LogError::Disabled(DisabledReason::Muted));
        }
        let bt = backtrace::Backtrace::new();
        let message = format!("{bt:?}{LINE_ENDING}{}", error_chain(err));
        self.emit(message.into(), &Severity::Exception.label(suffix), Some(location.into()))
    }

    /// Shared path for every entry point; `pos` is the outermost call site.
    pub(crate) fn emit(
        &self,
        message: Message,
        label: &str,
        pos: Option<SourcePos<'_>>,
    ) -> Result<String, LogError> {
        self.with_state(|st| {
            if st.muted {
                return Err(LogError::Disabled(DisabledReason::Muted));
            }
            st.ensure_open()?;
            let body = message.normalize();
            let caller_info = if st.line_format.needs_caller() {
                Some(caller::resolve(pos, &st.wrappers))
            } else {
                None
            };
            let timestamp = format::format_timestamp(&Local::now(), &st.time_format);
            let line = st.line_format.render(&LineFields {
                timestamp: &timestamp,
                ident: st.ident.as_deref().unwrap_or_default(),
                label,
                message: &body,
                caller: caller_info.as_ref(),
            });
            st.write_line(&line)?;
            Ok(line)
        })
    }

    /// Run `f` on the locked state. Diagnostics it queued go to the `log`
    /// facade only after the lock is dropped, so an appender that routes
    /// them back into this logger cannot deadlock.
    fn with_state<R>(&self, f: impl FnOnce(&mut LoggerState) -> R) -> R {
        let (out, notes) = {
            let mut st = self.state.lock();
            let out = f(&mut st);
            (out, std::mem::take(&mut st.notes))
        };
        for (level, msg) in notes {
            log::log!(target: INTERNAL_TARGET, level, "{msg}");
        }
        out
    }
}

impl Drop for FileLogger {
    fn drop(&mut self) {
        let _ = self.state.get_mut().close();
    }
}

/// An error's display form followed by its `source()` chain.
fn error_chain<E: Error + ?Sized>(err: &E) -> String {
    let mut out = err.to_string();
    let mut source = err.source();
    while let Some(s) = source {
        out.push_str(LINE_ENDING);
        out.push_str("caused by: ");
        out.push_str(&s.to_string());
        source = s.source();
    }
    out
}
