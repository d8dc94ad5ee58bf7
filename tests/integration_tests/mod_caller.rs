use filelog::caller::{FrameInfo, TraceSite};
use filelog::{FileLogger, LoggerConfig};
use tempfile::tempdir;

struct Checkout {
    logger: FileLogger,
}

impl Checkout {
    fn submit(&self) -> String {
        self.logger.info("submitting").unwrap()
    }

    fn traced(&self) -> String {
        self.logger.trace().unwrap()
    }
}

fn logger_with(format: &str, dir: &std::path::Path) -> FileLogger {
    FileLogger::new(LoggerConfig {
        target: Some(dir.join("caller.log")),
        line_format: format.to_string(),
        ..Default::default()
    })
    .unwrap()
}

#[test]
fn file_and_line_point_at_the_call_site() {
    let dir = tempdir().unwrap();
    let logger = logger_with("{file}:{line} {message}", dir.path());
    let expected_line = line!() + 1;
    let line = logger.debug("here").unwrap();
    assert_eq!(line, format!("{}:{expected_line} here", file!()));
}

#[test]
fn function_slot_names_the_calling_function() {
    let dir = tempdir().unwrap();
    let logger = logger_with("{function} {message}", dir.path());
    let line = logger.warning("who").unwrap();
    assert_eq!(line, "function_slot_names_the_calling_function who");
}

#[test]
fn class_slot_names_the_calling_type() {
    let dir = tempdir().unwrap();
    let checkout = Checkout { logger: logger_with("{class}::{function} {message}", dir.path()) };
    assert_eq!(checkout.submit(), "Checkout::submit submitting");
}

#[test]
fn trace_names_method_and_caller() {
    let dir = tempdir().unwrap();
    let checkout = Checkout { logger: logger_with("{message}", dir.path()) };
    let desc = checkout.traced();
    assert!(
        desc.starts_with("Checkout::traced CALLER trace_names_method_and_caller"),
        "{desc}"
    );
}

#[test]
fn trace_site_without_frames_is_empty() {
    let site = TraceSite::from_frames(&[], None, &[]);
    assert!(site.method.is_empty());
    assert!(site.caller.is_empty());
    assert!(site.file.is_empty());
    assert!(site.line.is_empty());
}

#[test]
fn trace_site_with_single_frame_keeps_caller_empty() {
    let frames = vec![
        FrameInfo::new("filelog::logger::FileLogger::trace"),
        FrameInfo::new("script::main").at("main.rs", 1),
    ];
    let site = TraceSite::from_frames(&frames, None, &[]);
    assert_eq!(site.method, "main");
    assert_eq!(site.caller, "");
    assert_eq!(site.describe(), "main CALLER ");
}
