use std::path::Path;
use std::process::{ExitStatus, Stdio};
use std::time::Duration;

use tokio::io::AsyncReadExt;
use tokio::process::Command;
use tracing::debug;

use super::InvocationOutcome;

/// Spawn the planner with `domain` and `problem` as its two arguments and
/// wait for it, killing its whole process group once `timeout` elapses.
///
/// The child's working directory is the directory containing `domain`.
/// Both output streams are decoded as UTF-8, replacing invalid sequences.
pub async fn run_planner(
    executable: &Path,
    domain: &Path,
    problem: &Path,
    timeout: Duration,
) -> InvocationOutcome {
    let mut std_cmd = std::process::Command::new(executable);
    std_cmd
        .arg(domain)
        .arg(problem)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped());
    if let Some(dir) = domain.parent().filter(|d| !d.as_os_str().is_empty()) {
        std_cmd.current_dir(dir);
    }
    // Own process group, so a timeout can take down anything the planner forks.
    #[cfg(unix)]
    {
        use std::os::unix::process::CommandExt;
        std_cmd.process_group(0);
    }
    let mut cmd = Command::from(std_cmd);
    cmd.kill_on_drop(true);

    let mut child = match cmd.spawn() {
        Ok(child) => child,
        Err(e) => {
            return InvocationOutcome::ExecutionError {
                reason: format!("failed to launch planner {}: {e}", executable.display()),
            };
        }
    };
    let mut group = ProcessGroupGuard::new(child.id());
    debug!(pid = child.id(), "planner spawned");

    // Drain both pipes while waiting so a chatty planner cannot block on a
    // full pipe buffer.
    let mut stdout_pipe = child.stdout.take();
    let mut stderr_pipe = child.stderr.take();

    let read_stdout = async {
        let mut buf = Vec::new();
        if let Some(ref mut pipe) = stdout_pipe {
            pipe.read_to_end(&mut buf).await.ok();
        }
        String::from_utf8_lossy(&buf).into_owned()
    };

    let read_stderr = async {
        let mut buf = Vec::new();
        if let Some(ref mut pipe) = stderr_pipe {
            pipe.read_to_end(&mut buf).await.ok();
        }
        String::from_utf8_lossy(&buf).into_owned()
    };

    match tokio::time::timeout(timeout, async {
        tokio::join!(child.wait(), read_stdout, read_stderr)
    })
    .await
    {
        Ok((Ok(status), stdout, stderr)) => {
            group.disarm();
            InvocationOutcome::Completed {
                stdout,
                stderr,
                exit_code: exit_code(status),
            }
        }
        Ok((Err(e), _, _)) => {
            group.kill();
            InvocationOutcome::ExecutionError {
                reason: format!("failed to wait on planner {}: {e}", executable.display()),
            }
        }
        Err(_) => {
            group.kill();
            // Reap the direct child so it does not linger as a zombie.
            let _ = child.kill().await;
            InvocationOutcome::TimedOut { timeout }
        }
    }
}

/// The process's exit code, or the negated signal number when it was killed
/// by a signal.
fn exit_code(status: ExitStatus) -> i32 {
    if let Some(code) = status.code() {
        return code;
    }
    #[cfg(unix)]
    {
        use std::os::unix::process::ExitStatusExt;
        if let Some(signal) = status.signal() {
            return -signal;
        }
    }
    super::NO_EXIT_CODE
}

/// Kills the planner's process group on drop unless disarmed.
///
/// Covers the case where the request future is dropped mid-invocation:
/// `kill_on_drop` only reaches the direct child, not anything it forked.
struct ProcessGroupGuard {
    pgid: Option<u32>,
}

impl ProcessGroupGuard {
    fn new(pid: Option<u32>) -> Self {
        Self { pgid: pid }
    }

    fn disarm(&mut self) {
        self.pgid = None;
    }

    fn kill(&mut self) {
        let Some(pgid) = self.pgid.take() else {
            return;
        };
        #[cfg(unix)]
        {
            // SAFETY: pgid is the pid of a child we spawned as a group leader.
            let ret = unsafe { libc::killpg(pgid as libc::pid_t, libc::SIGKILL) };
            if ret != 0 {
                debug!(pgid, "killpg failed (group already gone?)");
            }
        }
        #[cfg(not(unix))]
        let _ = pgid;
    }
}

impl Drop for ProcessGroupGuard {
    fn drop(&mut self) {
        self.kill();
    }
}
