use filelog::{DisabledReason, FileLogger, LogError, LoggerConfig};
use serde_json::json;
use std::fs;
use std::path::Path;
use tempfile::tempdir;

fn read_lines(path: &Path) -> Vec<String> {
    fs::read_to_string(path).unwrap().lines().map(str::to_string).collect()
}

/// Strip the `timestamp ident ` prefix, leaving `LABEL message`.
fn after_timestamp(line: &str) -> &str {
    let idx = line.find("DEBUG:")
        .or_else(|| line.find("INFO:"))
        .or_else(|| line.find("WARNING:"))
        .or_else(|| line.find("ERROR:"))
        .or_else(|| line.find("EXCEPTION:"))
        .unwrap();
    &line[idx..]
}

#[test]
fn debug_start_writes_single_line() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("out.log");
    let logger = FileLogger::to_file(&path);
    logger.debug("START").unwrap();
    let lines = read_lines(&path);
    assert_eq!(lines.len(), 1);
    // "<Mon DD HH:MM:SS> <ident> DEBUG: START" with an empty ident
    let (ts, rest) = lines[0].split_at(15);
    assert_eq!(ts.len(), 15);
    assert_eq!(rest, "  DEBUG: START");
}

#[test]
fn error_with_message_field_logs_the_field() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("err.log");
    let logger = FileLogger::to_file(&path);
    logger.error(json!({"message": "disk full"})).unwrap();
    assert_eq!(after_timestamp(&read_lines(&path)[0]), "ERROR: disk full");
}

#[test]
fn debug_sequence_is_pretty_printed() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("seq.log");
    let logger = FileLogger::to_file(&path);
    let line = logger.debug(json!(["a", "b"])).unwrap();
    assert!(line.ends_with("DEBUG: [\n  \"a\",\n  \"b\"\n]"), "{line}");
    let text = fs::read_to_string(&path).unwrap();
    assert!(text.ends_with("]\n"));
}

#[test]
fn muting_leaves_file_byte_identical() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("mute.log");
    let logger = FileLogger::to_file(&path);
    logger.info("before").unwrap();
    logger.flush().unwrap();
    let before = fs::read(&path).unwrap();

    logger.mute();
    for res in [
        logger.debug("hidden"),
        logger.info("hidden"),
        logger.warning("hidden"),
        logger.error("hidden"),
        logger.exception(&std::io::Error::other("hidden")),
        logger.trace(),
        logger.trace_with_backtrace(),
    ] {
        assert!(matches!(res, Err(LogError::Disabled(DisabledReason::Muted))));
    }
    logger.flush().unwrap();
    assert_eq!(fs::read(&path).unwrap(), before);
}

#[test]
fn ensure_open_twice_preserves_content() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("idem.log");
    let logger = FileLogger::to_file(&path);
    logger.set_append(false);
    logger.ensure_open().unwrap();
    logger.info("kept").unwrap();
    logger.ensure_open().unwrap();
    logger.info("also kept").unwrap();
    let lines = read_lines(&path);
    assert_eq!(lines.len(), 2);
    assert!(lines[0].ends_with("INFO: kept"));
}

#[test]
fn append_mode_accumulates_across_instances() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("runs.log");
    for run in 0..3 {
        let logger = FileLogger::to_file(&path);
        for i in 0..=run {
            logger.info(format!("run{run}-{i}")).unwrap();
        }
    }
    let lines = read_lines(&path);
    assert_eq!(lines.len(), 1 + 2 + 3);
    let bodies: Vec<&str> = lines.iter().map(|l| after_timestamp(l)).collect();
    assert_eq!(bodies[0], "INFO: run0-0");
    assert_eq!(bodies[1], "INFO: run1-0");
    assert_eq!(bodies[5], "INFO: run2-2");
}

#[test]
fn missing_directory_chain_is_created() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("a").join("b").join("c").join("deep.log");
    let logger = FileLogger::to_file(&path);
    logger.warning("made it").unwrap();
    assert!(path.is_file());
    assert_eq!(read_lines(&path).len(), 1);
}

#[cfg(unix)]
#[test]
fn created_file_and_dirs_get_configured_modes() {
    use std::os::unix::fs::PermissionsExt;
    let dir = tempdir().unwrap();
    let path = dir.path().join("sub").join("mode.log");
    let cfg = LoggerConfig {
        target: Some(path.clone()),
        file_mode: 0o600,
        dir_mode: 0o700,
        ..Default::default()
    };
    FileLogger::new(cfg).unwrap().info("x").unwrap();
    let file_mode = fs::metadata(&path).unwrap().permissions().mode() & 0o777;
    let dir_mode = fs::metadata(dir.path().join("sub")).unwrap().permissions().mode() & 0o777;
    assert_eq!(file_mode, 0o600);
    assert_eq!(dir_mode, 0o700);
}

#[cfg(unix)]
#[test]
fn existing_file_mode_is_left_alone() {
    use std::os::unix::fs::PermissionsExt;
    let dir = tempdir().unwrap();
    let path = dir.path().join("keep.log");
    fs::write(&path, "").unwrap();
    fs::set_permissions(&path, fs::Permissions::from_mode(0o664)).unwrap();
    let cfg = LoggerConfig { target: Some(path.clone()), file_mode: 0o600, ..Default::default() };
    FileLogger::new(cfg).unwrap().info("x").unwrap();
    assert_eq!(fs::metadata(&path).unwrap().permissions().mode() & 0o777, 0o664);
}

#[cfg(unix)]
#[test]
fn read_only_directory_fails_cleanly() {
    use std::os::unix::fs::PermissionsExt;
    let dir = tempdir().unwrap();
    let ro = dir.path().join("ro");
    fs::create_dir(&ro).unwrap();
    fs::set_permissions(&ro, fs::Permissions::from_mode(0o555)).unwrap();

    let logger = FileLogger::to_file(ro.join("nested").join("x.log"));
    let err = logger.info("dropped").unwrap_err();
    assert!(matches!(err, LogError::DirectoryNotWritable(_)), "{err}");
    assert_eq!(logger.opened(), Some(false));
    assert!(!ro.join("nested").exists());

    let flat = FileLogger::to_file(ro.join("x.log"));
    assert!(matches!(flat.info("dropped"), Err(LogError::DirectoryNotWritable(_))));

    fs::set_permissions(&ro, fs::Permissions::from_mode(0o755)).unwrap();
}

#[cfg(unix)]
#[test]
fn read_only_file_fails_cleanly() {
    use std::os::unix::fs::PermissionsExt;
    let dir = tempdir().unwrap();
    let path = dir.path().join("locked.log");
    fs::write(&path, "original\n").unwrap();
    fs::set_permissions(&path, fs::Permissions::from_mode(0o444)).unwrap();
    let logger = FileLogger::to_file(&path);
    assert!(matches!(logger.error("x"), Err(LogError::FileNotWritable(_))));
    assert_eq!(fs::read_to_string(&path).unwrap(), "original\n");
}

#[test]
fn default_target_uses_base_path() {
    let dir = tempdir().unwrap();
    let cfg = LoggerConfig {
        base_path: Some(dir.path().to_path_buf()),
        document_root: Some(dir.path().join("unused")),
        ..Default::default()
    };
    let logger = FileLogger::new(cfg).unwrap();
    assert_eq!(logger.target(), None);
    logger.info("default").unwrap();
    assert_eq!(logger.target(), Some(dir.path().join("app.log")));
    assert!(dir.path().join("app.log").is_file());
}

#[test]
fn default_target_falls_back_to_document_root() {
    let dir = tempdir().unwrap();
    let cfg = LoggerConfig { document_root: Some(dir.path().to_path_buf()), ..Default::default() };
    let logger = FileLogger::new(cfg).unwrap();
    logger.info("root").unwrap();
    assert!(dir.path().join("app.log").is_file());
}

#[test]
fn close_then_log_reopens() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("reopen.log");
    let logger = FileLogger::to_file(&path);
    logger.info("one").unwrap();
    logger.close().unwrap();
    assert!(!logger.is_open());
    logger.info("two").unwrap();
    assert_eq!(read_lines(&path).len(), 2);
}

#[test]
fn shared_logger_across_threads_keeps_lines_whole() {
    use std::sync::Arc;
    let dir = tempdir().unwrap();
    let path = dir.path().join("threads.log");
    let logger = Arc::new(FileLogger::to_file(&path));
    logger.set_locking(true);
    let handles: Vec<_> = (0..4)
        .map(|t| {
            let logger = Arc::clone(&logger);
            std::thread::spawn(move || {
                for i in 0..25 {
                    logger.info(format!("t{t} n{i}")).unwrap();
                }
            })
        })
        .collect();
    for h in handles {
        h.join().unwrap();
    }
    let lines = read_lines(&path);
    assert_eq!(lines.len(), 100);
    assert!(lines.iter().all(|l| after_timestamp(l).starts_with("INFO: t")));
}

#[test]
fn trace_with_backtrace_logs_exception_label() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("bt.log");
    let logger = FileLogger::to_file(&path);
    let line = logger.trace_with_backtrace().unwrap();
    assert!(line.contains("EXCEPTION:"));
    assert!(line.ends_with("captured for tracing"));
}
