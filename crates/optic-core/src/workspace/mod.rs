//! Per-request planner workspaces.
//!
//! Every request gets its own uniquely-named temporary directory holding
//! `domain.pddl` and `problem.pddl`. The directory is removed when the
//! [`Workspace`] is closed or dropped, whichever comes first; removal
//! failures are logged and never propagated.

use std::path::{Path, PathBuf};

use tempfile::TempDir;
use thiserror::Error;
use tracing::{debug, warn};

/// File name of the domain description inside a workspace.
pub const DOMAIN_FILE: &str = "domain.pddl";
/// File name of the problem description inside a workspace.
pub const PROBLEM_FILE: &str = "problem.pddl";

const DIR_PREFIX: &str = "optic-";

#[derive(Debug, Error)]
pub enum WorkspaceError {
    #[error("failed to create workspace directory under {root}: {source}")]
    Create {
        root: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Creates workspaces under a parent directory (the OS temp dir by default).
#[derive(Debug, Clone, Default)]
pub struct WorkspaceManager {
    root: Option<PathBuf>,
}

impl WorkspaceManager {
    /// Create a manager rooted at `root`, or at the OS temp dir when `None`.
    pub fn new(root: Option<PathBuf>) -> Self {
        Self { root }
    }

    /// The directory new workspaces are created in.
    pub fn root(&self) -> PathBuf {
        self.root.clone().unwrap_or_else(std::env::temp_dir)
    }

    /// Create a fresh workspace and write both files into it verbatim.
    ///
    /// If writing either file fails the partially-populated directory is
    /// removed before the error is returned.
    pub fn create(&self, domain: &str, problem: &str) -> Result<Workspace, WorkspaceError> {
        // Absolute, so the planner can be started with the workspace as its cwd.
        let root = std::path::absolute(self.root()).unwrap_or_else(|_| self.root());
        let dir = tempfile::Builder::new()
            .prefix(DIR_PREFIX)
            .tempdir_in(&root)
            .map_err(|source| WorkspaceError::Create { root, source })?;

        let workspace = Workspace { dir: Some(dir) };
        write_file(&workspace.domain_path(), domain)?;
        write_file(&workspace.problem_path(), problem)?;

        debug!(path = %workspace.path().display(), "workspace created");
        Ok(workspace)
    }
}

fn write_file(path: &Path, contents: &str) -> Result<(), WorkspaceError> {
    std::fs::write(path, contents).map_err(|source| WorkspaceError::Write {
        path: path.to_path_buf(),
        source,
    })
}

/// An exclusively-owned workspace directory.
#[derive(Debug)]
pub struct Workspace {
    // Always `Some` until `close` or `drop` takes it.
    dir: Option<TempDir>,
}

impl Workspace {
    /// The workspace directory.
    pub fn path(&self) -> &Path {
        match &self.dir {
            Some(dir) => dir.path(),
            None => Path::new(""),
        }
    }

    pub fn domain_path(&self) -> PathBuf {
        self.path().join(DOMAIN_FILE)
    }

    pub fn problem_path(&self) -> PathBuf {
        self.path().join(PROBLEM_FILE)
    }

    /// Remove the directory now.
    pub fn close(mut self) {
        self.remove();
    }

    fn remove(&mut self) {
        let Some(dir) = self.dir.take() else {
            return;
        };
        let path = dir.path().to_path_buf();
        match dir.close() {
            Ok(()) => debug!(path = %path.display(), "workspace removed"),
            Err(e) => warn!(path = %path.display(), error = %e, "failed to remove workspace"),
        }
    }
}

impl Drop for Workspace {
    fn drop(&mut self) {
        self.remove();
    }
}
