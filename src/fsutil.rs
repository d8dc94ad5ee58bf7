use crate::errors::LogError;
use std::fs::{self, File, OpenOptions};
use std::io;
use std::path::{Path, PathBuf};

/// File name used when no explicit target is configured.
pub const DEFAULT_LOG_NAME: &str = "app.log";

/// Resolve the default log path: `<base>/app.log`, else `<document_root>/app.log`,
/// else `app.log` in the current directory.
#[must_use]
pub fn default_log_path(base_path: Option<&Path>, document_root: Option<&Path>) -> PathBuf {
    let dir = match (base_path, document_root) {
        (Some(b), _) if !b.as_os_str().is_empty() => b.to_path_buf(),
        (_, Some(r)) if !r.as_os_str().is_empty() => r.to_path_buf(),
        _ => std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")),
    };
    dir.join(DEFAULT_LOG_NAME)
}

/// Directory a log file lives in; `.` for bare file names.
#[must_use]
pub fn parent_dir(path: &Path) -> &Path {
    match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    }
}

/// Whether a path exists and its permission bits allow writing.
#[must_use]
pub fn is_writable(path: &Path) -> bool {
    fs::metadata(path).is_ok_and(|m| !m.permissions().readonly())
}

/// Apply POSIX permission bits. No-op on platforms without them.
///
/// # Errors
/// Returns an error if the permissions cannot be changed.
pub fn apply_mode(path: &Path, mode: u32) -> io::Result<()> {
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        fs::set_permissions(path, fs::Permissions::from_mode(mode))
    }
    #[cfg(not(unix))]
    {
        let _ = (path, mode);
        Ok(())
    }
}

/// Create `dir` and any missing ancestors, top-down, with `mode`.
///
/// Walks up to the nearest existing ancestor first; that ancestor must be
/// writable. If any step fails, directories created by this call are removed
/// again. Returns the directories that were created, outermost first.
///
/// # Errors
/// [`LogError::DirectoryNotWritable`] if the existing ancestor is read-only,
/// [`LogError::CreateDirectory`] if creating a level fails.
pub fn make_dirs(dir: &Path, mode: u32) -> Result<Vec<PathBuf>, LogError> {
    let mut missing = Vec::new();
    let mut cur = dir;
    while !cur.is_dir() {
        missing.push(cur.to_path_buf());
        match cur.parent() {
            Some(p) if !p.as_os_str().is_empty() => cur = p,
            _ => {
                cur = Path::new(".");
                break;
            }
        }
    }
    if missing.is_empty() {
        return Ok(missing);
    }
    if !is_writable(cur) {
        return Err(LogError::DirectoryNotWritable(cur.to_path_buf()));
    }

    let mut created: Vec<PathBuf> = Vec::with_capacity(missing.len());
    for path in missing.into_iter().rev() {
        if let Err(source) = create_one(&path, mode) {
            for done in created.iter().rev() {
                let _ = fs::remove_dir(done);
            }
            return Err(LogError::CreateDirectory { path, source });
        }
        created.push(path);
    }
    Ok(created)
}

fn create_one(path: &Path, mode: u32) -> io::Result<()> {
    let mut builder = fs::DirBuilder::new();
    #[cfg(unix)]
    {
        use std::os::unix::fs::DirBuilderExt;
        builder.mode(mode);
    }
    builder.create(path)?;
    // DirBuilder's mode is masked by the umask
    apply_mode(path, mode)
}

/// Open a log file for writing: appending, or truncating when `append` is
/// false. Returns the handle and whether the file was created by this call.
///
/// # Errors
/// Returns an error if the file cannot be opened.
pub fn open_log_file(path: &Path, append: bool) -> io::Result<(File, bool)> {
    let creating = !path.exists();
    let mut opts = OpenOptions::new();
    opts.create(true);
    if append {
        opts.append(true);
    } else {
        opts.write(true).truncate(true);
    }
    let file = opts.open(path)?;
    Ok((file, creating))
}
