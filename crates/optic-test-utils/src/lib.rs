//! Shared test utilities for optic tests.
//!
//! Provides stub planner executables: small `/bin/sh` scripts written into a
//! temporary directory and marked executable. Each stub receives the same
//! two positional arguments as the real planner (domain file, problem file).

use std::path::{Path, PathBuf};

use tempfile::TempDir;

/// A stub planner script together with the directory that owns it.
///
/// The directory (and the script) is removed when this value is dropped.
pub struct StubPlanner {
    _dir: TempDir,
    path: PathBuf,
}

impl StubPlanner {
    /// Write a stub planner whose body is the given shell snippet.
    ///
    /// `$1` is the domain file and `$2` the problem file.
    pub fn new(body: &str) -> Self {
        let dir = TempDir::new().expect("failed to create stub planner dir");
        let path = dir.path().join("planner");
        write_executable(&path, &format!("#!/bin/sh\n{body}\n"));
        Self { _dir: dir, path }
    }

    /// Prints both file paths, one per line, and exits 0.
    pub fn echo_paths() -> Self {
        Self::new("echo \"$1\"\necho \"$2\"")
    }

    /// Prints the contents of both files separated by a `---` line.
    pub fn cat_files() -> Self {
        Self::new("cat \"$1\"\necho\necho ---\ncat \"$2\"")
    }

    /// Writes a marker to stdout and stderr, then exits with `code`.
    pub fn exit_with(code: i32) -> Self {
        Self::new(&format!("echo out\necho err >&2\nexit {code}"))
    }

    /// Exits 2 when both files are empty, 0 otherwise.
    pub fn exit_2_on_empty() -> Self {
        Self::new("if [ -s \"$1\" ] || [ -s \"$2\" ]; then exit 0; fi\necho 'empty input' >&2\nexit 2")
    }

    /// Writes its own pid to `pid_file`, then sleeps far past any test timeout.
    pub fn sleeper(pid_file: &Path) -> Self {
        Self::new(&format!("echo $$ > '{}'\nexec sleep 30", pid_file.display()))
    }

    /// Path to the executable script.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// Write `contents` to `path` and set mode 0755.
pub fn write_executable(path: &Path, contents: &str) {
    std::fs::write(path, contents)
        .unwrap_or_else(|e| panic!("failed to write {}: {e}", path.display()));
    set_mode(path, 0o755);
}

/// Write `contents` to `path` without the executable bit (mode 0644).
pub fn write_non_executable(path: &Path, contents: &str) {
    std::fs::write(path, contents)
        .unwrap_or_else(|e| panic!("failed to write {}: {e}", path.display()));
    set_mode(path, 0o644);
}

#[cfg(unix)]
fn set_mode(path: &Path, mode: u32) {
    use std::os::unix::fs::PermissionsExt;
    std::fs::set_permissions(path, std::fs::Permissions::from_mode(mode))
        .unwrap_or_else(|e| panic!("failed to chmod {}: {e}", path.display()));
}

#[cfg(not(unix))]
fn set_mode(_path: &Path, _mode: u32) {}

/// Returns true if a process with `pid` exists and is not a zombie.
///
/// Orphans reparented to a non-reaping init linger as zombies, so `/proc`
/// is consulted where available.
#[cfg(unix)]
pub fn process_alive(pid: i32) -> bool {
    let proc_root = Path::new("/proc");
    if proc_root.is_dir() {
        let Ok(stat) = std::fs::read_to_string(proc_root.join(pid.to_string()).join("stat")) else {
            return false;
        };
        // Format: `pid (comm) state ...`; comm may itself contain ')'.
        let state = stat
            .rsplit_once(')')
            .and_then(|(_, rest)| rest.trim_start().chars().next());
        return !matches!(state, Some('Z') | Some('X') | None);
    }
    std::process::Command::new("kill")
        .args(["-0", &pid.to_string()])
        .stderr(std::process::Stdio::null())
        .status()
        .map(|s| s.success())
        .unwrap_or(false)
}
