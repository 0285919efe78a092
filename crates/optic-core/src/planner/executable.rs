//! Pre-launch check of the planner executable.

use std::path::Path;

/// Whether the planner can be launched by this process.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Availability {
    Available,
    Unavailable(String),
}

/// Verify that `path` exists, is a regular file, and is executable by the
/// current process.
pub fn check(path: &Path) -> Availability {
    let meta = match std::fs::metadata(path) {
        Ok(meta) => meta,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Availability::Unavailable(format!(
                "planner executable not found at {}",
                path.display()
            ));
        }
        Err(e) => {
            return Availability::Unavailable(format!(
                "cannot inspect planner executable at {}: {e}",
                path.display()
            ));
        }
    };

    if !meta.is_file() {
        return Availability::Unavailable(format!(
            "planner path {} is not a regular file",
            path.display()
        ));
    }

    if !is_executable(path) {
        return Availability::Unavailable(format!(
            "planner at {} is not executable",
            path.display()
        ));
    }

    Availability::Available
}

#[cfg(unix)]
fn is_executable(path: &Path) -> bool {
    use std::ffi::CString;
    use std::os::unix::ffi::OsStrExt;

    let Ok(c_path) = CString::new(path.as_os_str().as_bytes()) else {
        return false;
    };
    // SAFETY: c_path is a valid NUL-terminated string that outlives the call.
    unsafe { libc::access(c_path.as_ptr(), libc::X_OK) == 0 }
}

#[cfg(not(unix))]
fn is_executable(_path: &Path) -> bool {
    true
}
