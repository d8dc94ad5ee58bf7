//! Severity labels and the line template.

use crate::caller::CallerInfo;
use crate::errors::LogError;
use chrono::format::{Item, StrftimeItems};
use chrono::{DateTime, TimeZone};
use std::fmt::{self, Write as _};

/// Default line template: timestamp, identity tag, severity label, message.
pub const DEFAULT_LINE_FORMAT: &str = "{timestamp} {ident} {label} {message}";

/// Default timestamp pattern, e.g. `Nov 03 18:52:18`.
pub const DEFAULT_TIME_FORMAT: &str = "%b %d %H:%M:%S";

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Severity {
    Debug,
    Info,
    Warning,
    Error,
    Exception,
}

impl Severity {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Debug => "DEBUG",
            Severity::Info => "INFO",
            Severity::Warning => "WARNING",
            Severity::Error => "ERROR",
            Severity::Exception => "EXCEPTION",
        }
    }

    /// `"DEBUG:"`, or `"DEBUG: <suffix>"` when a non-empty suffix is given.
    #[must_use]
    pub fn label(&self, suffix: Option<&str>) -> String {
        match suffix {
            Some(s) if !s.is_empty() => format!("{}: {s}", self.as_str()),
            _ => format!("{}:", self.as_str()),
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<log::Level> for Severity {
    fn from(level: log::Level) -> Self {
        match level {
            log::Level::Error => Severity::Error,
            log::Level::Warn => Severity::Warning,
            log::Level::Info => Severity::Info,
            log::Level::Debug | log::Level::Trace => Severity::Debug,
        }
    }
}

/// A named placeholder in the line template.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Slot {
    Timestamp,
    Ident,
    Label,
    Message,
    File,
    Line,
    Function,
    Class,
}

impl Slot {
    fn parse(name: &str) -> Option<Slot> {
        Some(match name {
            "timestamp" => Slot::Timestamp,
            "ident" => Slot::Ident,
            "label" => Slot::Label,
            "message" => Slot::Message,
            "file" => Slot::File,
            "line" => Slot::Line,
            "function" => Slot::Function,
            "class" => Slot::Class,
            _ => return None,
        })
    }

    fn is_caller(&self) -> bool {
        matches!(self, Slot::File | Slot::Line | Slot::Function | Slot::Class)
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
enum Segment {
    Literal(String),
    Slot(Slot),
}

/// Values substituted into a [`LineFormat`].
#[derive(Debug, Default)]
pub struct LineFields<'a> {
    pub timestamp: &'a str,
    pub ident: &'a str,
    pub label: &'a str,
    pub message: &'a str,
    pub caller: Option<&'a CallerInfo>,
}

/// Parsed line template. Slots are written `{name}`; `{{` and `}}` are
/// literal braces.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LineFormat {
    source: String,
    segments: Vec<Segment>,
}

impl LineFormat {
    /// Parse a template.
    ///
    /// # Errors
    /// Returns [`LogError::Format`] on unknown slot names or unbalanced braces.
    pub fn parse(template: &str) -> Result<Self, LogError> {
        let mut segments = Vec::new();
        let mut literal = String::new();
        let mut chars = template.chars().peekable();
        while let Some(c) = chars.next() {
            match c {
                '{' if chars.peek() == Some(&'{') => {
                    chars.next();
                    literal.push('{');
                }
                '{' => {
                    let mut name = String::new();
                    loop {
                        match chars.next() {
                            Some('}') => break,
                            Some(ch) => name.push(ch),
                            None => {
                                return Err(LogError::Format(format!(
                                    "unclosed slot '{{{name}' in {template:?}"
                                )));
                            }
                        }
                    }
                    let slot = Slot::parse(name.trim()).ok_or_else(|| {
                        LogError::Format(format!("unknown slot '{{{name}}}' in {template:?}"))
                    })?;
                    if !literal.is_empty() {
                        segments.push(Segment::Literal(std::mem::take(&mut literal)));
                    }
                    segments.push(Segment::Slot(slot));
                }
                '}' if chars.peek() == Some(&'}') => {
                    chars.next();
                    literal.push('}');
                }
                '}' => {
                    return Err(LogError::Format(format!("stray '}}' in {template:?}")));
                }
                other => literal.push(other),
            }
        }
        if !literal.is_empty() {
            segments.push(Segment::Literal(literal));
        }
        Ok(Self { source: template.to_string(), segments })
    }

    /// Whether rendering needs caller file/line/function/class. When false
    /// the stack is never inspected.
    #[must_use]
    pub fn needs_caller(&self) -> bool {
        self.segments.iter().any(|s| matches!(s, Segment::Slot(slot) if slot.is_caller()))
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.source
    }

    #[must_use]
    pub fn render(&self, fields: &LineFields<'_>) -> String {
        let mut out = String::new();
        for seg in &self.segments {
            match seg {
                Segment::Literal(s) => out.push_str(s),
                Segment::Slot(slot) => match slot {
                    Slot::Timestamp => out.push_str(fields.timestamp),
                    Slot::Ident => out.push_str(fields.ident),
                    Slot::Label => out.push_str(fields.label),
                    Slot::Message => out.push_str(fields.message),
                    Slot::File => {
                        if let Some(c) = fields.caller {
                            out.push_str(&c.file);
                        }
                    }
                    Slot::Line => {
                        if let Some(line) = fields.caller.and_then(|c| c.line) {
                            let _ = write!(out, "{line}");
                        }
                    }
                    Slot::Function => {
                        if let Some(c) = fields.caller {
                            out.push_str(&c.function);
                        }
                    }
                    Slot::Class => {
                        if let Some(c) = fields.caller {
                            out.push_str(&c.class);
                        }
                    }
                },
            }
        }
        out
    }
}

impl Default for LineFormat {
    fn default() -> Self {
        Self::parse(DEFAULT_LINE_FORMAT).unwrap_or_else(|_| Self {
            source: DEFAULT_LINE_FORMAT.to_string(),
            segments: Vec::new(),
        })
    }
}

impl std::str::FromStr for LineFormat {
    type Err = LogError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

/// Check a strftime pattern up front so rendering never hits a bad specifier.
///
/// # Errors
/// Returns [`LogError::Format`] if chrono cannot parse the pattern.
pub fn validate_time_format(pattern: &str) -> Result<(), LogError> {
    if StrftimeItems::new(pattern).any(|item| matches!(item, Item::Error)) {
        return Err(LogError::Format(format!("invalid time format {pattern:?}")));
    }
    Ok(())
}

/// Render a timestamp, falling back to RFC 3339 if the pattern is invalid.
pub fn format_timestamp<Tz>(now: &DateTime<Tz>, pattern: &str) -> String
where
    Tz: TimeZone,
    Tz::Offset: fmt::Display,
{
    let mut out = String::new();
    if write!(out, "{}", now.format(pattern)).is_err() {
        return now.to_rfc3339();
    }
    out
}
