//! External planner invocation.
//!
//! [`PlannerInvoker`] checks that the configured executable is usable, runs
//! it as `<planner> <domain-file> <problem-file>` under a wall-clock
//! timeout, and reports what happened as an [`InvocationOutcome`].

pub mod executable;
pub mod runner;

use std::path::{Path, PathBuf};
use std::time::Duration;

use tracing::{debug, info, warn};

pub use executable::Availability;

/// Exit code reported when the planner never produced a real one.
pub const NO_EXIT_CODE: i32 = -1;

/// Planner settings, resolved once at startup.
#[derive(Debug, Clone)]
pub struct PlannerConfig {
    /// Path to the planner executable.
    pub executable: PathBuf,
    /// Wall-clock limit for a single invocation.
    pub timeout: Duration,
}

impl PlannerConfig {
    /// Where the planner is provisioned in the standard container image.
    pub const DEFAULT_EXECUTABLE: &str = "/app/optic";
    /// Default per-invocation timeout in seconds.
    pub const DEFAULT_TIMEOUT_SECS: u64 = 60;

    pub fn new(executable: impl Into<PathBuf>, timeout: Duration) -> Self {
        Self {
            executable: executable.into(),
            timeout: timeout.max(Duration::from_secs(1)),
        }
    }
}

impl Default for PlannerConfig {
    fn default() -> Self {
        Self::new(
            Self::DEFAULT_EXECUTABLE,
            Duration::from_secs(Self::DEFAULT_TIMEOUT_SECS),
        )
    }
}

/// What a single planner invocation produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InvocationOutcome {
    /// The planner ran to completion. A non-zero `exit_code` is still a
    /// completed run (e.g. "no plan found").
    Completed {
        stdout: String,
        stderr: String,
        exit_code: i32,
    },
    /// The executable is missing or not executable; nothing was launched.
    ToolUnavailable { reason: String },
    /// Launching or waiting on the process failed.
    ExecutionError { reason: String },
    /// The planner exceeded the timeout and was killed.
    TimedOut { timeout: Duration },
}

impl InvocationOutcome {
    pub fn is_completed(&self) -> bool {
        matches!(self, Self::Completed { .. })
    }

    /// The real exit code, or [`NO_EXIT_CODE`] for infrastructure failures.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Completed { exit_code, .. } => *exit_code,
            _ => NO_EXIT_CODE,
        }
    }
}

/// Runs the configured planner.
#[derive(Debug, Clone)]
pub struct PlannerInvoker {
    config: PlannerConfig,
}

impl PlannerInvoker {
    pub fn new(config: PlannerConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &PlannerConfig {
        &self.config
    }

    /// Check the planner executable without launching it.
    pub fn availability(&self) -> Availability {
        executable::check(&self.config.executable)
    }

    /// Run the planner once against the given files.
    ///
    /// Never returns an error: every failure is mapped to an outcome
    /// variant. No retries are attempted.
    pub async fn invoke(&self, domain: &Path, problem: &Path) -> InvocationOutcome {
        let exe = &self.config.executable;

        if let Availability::Unavailable(reason) = self.availability() {
            warn!(planner = %exe.display(), %reason, "planner unavailable");
            return InvocationOutcome::ToolUnavailable { reason };
        }
        debug!(planner = %exe.display(), "planner executable found");

        let outcome = runner::run_planner(exe, domain, problem, self.config.timeout).await;
        match &outcome {
            InvocationOutcome::Completed { exit_code, stdout, stderr } => info!(
                exit_code,
                stdout_bytes = stdout.len(),
                stderr_bytes = stderr.len(),
                "planner finished"
            ),
            InvocationOutcome::TimedOut { timeout } => {
                warn!(timeout_secs = timeout.as_secs(), "planner timed out")
            }
            InvocationOutcome::ExecutionError { reason } => {
                warn!(%reason, "planner execution failed")
            }
            InvocationOutcome::ToolUnavailable { .. } => {}
        }
        outcome
    }
}
