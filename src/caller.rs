//! Caller resolution.
//!
//! File and line come from `#[track_caller]` on the public entry points.
//! Function and class come from a captured backtrace: the walk skips the
//! frames that belong to the logger itself (and any configured wrapper
//! prefixes) and reports the first frame after them.

use std::panic::Location;
use std::path::PathBuf;

/// Placeholder when no enclosing function can be resolved.
pub const NO_FUNCTION: &str = "(none)";

/// Symbol prefixes of the logger's own entry points and of the capture
/// machinery. Frames matching these are never reported as the caller.
const INTERNAL_PREFIXES: &[&str] = &[
    "backtrace::",
    "filelog::caller::capture_frames",
    "filelog::caller::resolve",
    "filelog::logger::FileLogger::",
    "<filelog::logger::FileLogger as ",
    "<filelog::appender::FileLoggerAppender as ",
    "filelog::appender::FileLoggerAppender::",
    "log::",
    "log4rs::",
    "<log4rs::",
];

/// Frames from the runtime itself; skipped while looking for user code.
const RUNTIME_PREFIXES: &[&str] = &[
    "std::",
    "core::",
    "alloc::",
    "<std::",
    "<core::",
    "<alloc::",
    "__rust",
    "rust_begin_unwind",
];

/// A source position known without walking the stack: a tracked
/// [`Location`] or the file/line carried by a `log` record.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SourcePos<'a> {
    pub file: &'a str,
    pub line: u32,
}

impl<'a> From<&'a Location<'a>> for SourcePos<'a> {
    fn from(loc: &'a Location<'a>) -> Self {
        Self { file: loc.file(), line: loc.line() }
    }
}

/// Where a logging call came from.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CallerInfo {
    pub file: String,
    pub line: Option<u32>,
    pub function: String,
    pub class: String,
}

/// One resolved stack frame, innermost first.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct FrameInfo {
    pub symbol: String,
    pub file: Option<PathBuf>,
    pub line: Option<u32>,
}

impl FrameInfo {
    pub fn new(symbol: impl Into<String>) -> Self {
        Self { symbol: symbol.into(), file: None, line: None }
    }

    #[must_use]
    pub fn at(mut self, file: impl Into<PathBuf>, line: u32) -> Self {
        self.file = Some(file.into());
        self.line = Some(line);
        self
    }
}

/// Capture and symbolize the current stack. Inlined frames are flattened so
/// each symbol becomes its own entry.
#[must_use]
pub fn capture_frames() -> Vec<FrameInfo> {
    let bt = backtrace::Backtrace::new();
    let mut out = Vec::new();
    for frame in bt.frames() {
        for sym in frame.symbols() {
            let Some(name) = sym.name() else { continue };
            out.push(FrameInfo {
                symbol: format!("{name:#}"),
                file: sym.filename().map(PathBuf::from),
                line: sym.lineno(),
            });
        }
    }
    out
}

fn matches_any(symbol: &str, prefixes: &[&str]) -> bool {
    prefixes.iter().any(|p| symbol.starts_with(p))
}

fn is_wrapper(symbol: &str, wrappers: &[String]) -> bool {
    wrappers.iter().any(|w| !w.is_empty() && symbol.starts_with(w.as_str()))
}

fn is_runtime(symbol: &str) -> bool {
    matches_any(symbol, RUNTIME_PREFIXES)
}

/// Index of the first user frame after the logger's own frames, and whether
/// a configured wrapper frame was skipped on the way.
fn caller_index(frames: &[FrameInfo], wrappers: &[String]) -> Option<(usize, bool)> {
    let internal = |s: &str| matches_any(s, INTERNAL_PREFIXES) || is_wrapper(s, wrappers);
    let first = frames.iter().position(|f| internal(&f.symbol))?;
    let mut last = first;
    let mut skipped_wrapper = is_wrapper(&frames[first].symbol, wrappers);
    for (i, f) in frames.iter().enumerate().skip(first + 1) {
        if internal(&f.symbol) {
            last = i;
            skipped_wrapper |= is_wrapper(&f.symbol, wrappers);
        } else if !is_runtime(&f.symbol) {
            break;
        }
    }
    next_user_frame(frames, last + 1).map(|i| (i, skipped_wrapper))
}

fn next_user_frame(frames: &[FrameInfo], from: usize) -> Option<usize> {
    frames.iter().enumerate().skip(from).find(|(_, f)| !is_runtime(&f.symbol)).map(|(i, _)| i)
}

/// Split a demangled path on `::` outside angle brackets.
fn split_path(symbol: &str) -> Vec<&str> {
    let bytes = symbol.as_bytes();
    let mut parts = Vec::new();
    let mut depth = 0i32;
    let mut start = 0;
    let mut i = 0;
    while i < bytes.len() {
        match bytes[i] {
            b'<' => depth += 1,
            b'>' => depth -= 1,
            b':' if depth == 0 && bytes.get(i + 1) == Some(&b':') => {
                parts.push(&symbol[start..i]);
                i += 2;
                start = i;
                continue;
            }
            _ => {}
        }
        i += 1;
    }
    parts.push(&symbol[start..]);
    parts
}

fn strip_generics(segment: &str) -> &str {
    segment.split('<').next().unwrap_or(segment)
}

/// Turn a demangled symbol into `(function, class)`. The class is the type a
/// method belongs to (`Type::method`, `<Type as Trait>::method`); free
/// functions get an empty class.
#[must_use]
pub fn split_symbol(symbol: &str) -> (String, String) {
    let mut parts = split_path(symbol);
    while parts.len() > 1 && parts.last().is_some_and(|p| p.starts_with('{')) {
        parts.pop();
    }
    let Some(function) = parts.pop() else {
        return (String::new(), String::new());
    };
    let class = match parts.last() {
        Some(q) if q.starts_with('<') => {
            let inner = q.trim_start_matches('<').trim_end_matches('>');
            let ty = inner.split(" as ").next().unwrap_or(inner);
            let ty_parts = split_path(ty);
            ty_parts.last().map(|s| strip_generics(s).to_string()).unwrap_or_default()
        }
        Some(q) => {
            let seg = strip_generics(q);
            if seg.chars().next().is_some_and(|c| c.is_ascii_uppercase()) {
                seg.to_string()
            } else {
                String::new()
            }
        }
        None => String::new(),
    };
    (strip_generics(function).to_string(), class)
}

/// Resolve the caller of a logging entry point from already captured frames.
pub fn resolve_from(
    frames: &[FrameInfo],
    pos: Option<SourcePos<'_>>,
    wrappers: &[String],
) -> CallerInfo {
    let mut info = CallerInfo::default();
    if let Some(p) = pos {
        info.file = p.file.to_string();
        info.line = Some(p.line);
    }
    if let Some((idx, skipped_wrapper)) = caller_index(frames, wrappers) {
        let frame = &frames[idx];
        let (function, class) = split_symbol(&frame.symbol);
        info.function = function;
        info.class = class;
        // the tracked location points inside the wrapper; the frame knows better
        if (skipped_wrapper || pos.is_none())
            && let Some(file) = &frame.file
        {
            info.file = file.display().to_string();
            info.line = frame.line;
        }
    }
    if info.function.is_empty() {
        info.function = NO_FUNCTION.to_string();
    }
    info
}

/// Capture the stack and resolve the caller.
#[must_use]
pub fn resolve(pos: Option<SourcePos<'_>>, wrappers: &[String]) -> CallerInfo {
    let frames = capture_frames();
    resolve_from(&frames, pos, wrappers)
}

/// Who called the function that asked for a trace, and where.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TraceSite {
    pub method: String,
    pub class: String,
    pub caller: String,
    pub caller_class: String,
    pub file: String,
    pub line: String,
}

impl TraceSite {
    /// Build from frames. `method` is the function that invoked the trace,
    /// `caller` the function that invoked `method`; file and line are the
    /// position in `caller` where `method` was called. With fewer frames the
    /// fields stay empty, and the file/line fall back to `pos`.
    pub fn from_frames(
        frames: &[FrameInfo],
        pos: Option<SourcePos<'_>>,
        wrappers: &[String],
    ) -> Self {
        let mut site = TraceSite::default();
        let method_idx = caller_index(frames, wrappers).map(|(i, _)| i);
        if let Some(i) = method_idx {
            let (method, class) = split_symbol(&frames[i].symbol);
            site.method = method;
            site.class = class;
            if let Some(j) = next_user_frame(frames, i + 1) {
                let (caller, caller_class) = split_symbol(&frames[j].symbol);
                site.caller = caller;
                site.caller_class = caller_class;
                if let Some(file) = &frames[j].file {
                    site.file = file.display().to_string();
                }
                if let Some(line) = frames[j].line {
                    site.line = line.to_string();
                }
            }
        }
        if site.file.is_empty()
            && let Some(p) = pos
        {
            site.file = p.file.to_string();
            site.line = p.line.to_string();
        }
        site
    }

    /// `Class::method CALLER Class::caller AT LINE <line> FILE <file>`.
    #[must_use]
    pub fn describe(&self) -> String {
        let qualify = |class: &str, name: &str| {
            if class.is_empty() { name.to_string() } else { format!("{class}::{name}") }
        };
        let mut out = format!(
            "{} CALLER {}",
            qualify(&self.class, &self.method),
            qualify(&self.caller_class, &self.caller)
        );
        if !self.line.is_empty() {
            out.push_str(" AT LINE ");
            out.push_str(&self.line);
        }
        if !self.file.is_empty() {
            out.push_str(" FILE ");
            out.push_str(&self.file);
        }
        out
    }
}
