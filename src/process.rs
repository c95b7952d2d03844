//! Process-tree helpers shared by the static server and the browser helper.
//!
//! Children are spawned as process-group leaders (Unix) so that a signal
//! sent to the group also reaches anything they spawned themselves.

use std::time::Duration;
use tokio::process::{Child, Command};
use tokio::time::timeout;

/// How long a child gets to exit after the graceful signal.
pub const STOP_GRACE_PERIOD: Duration = Duration::from_secs(2);

/// Signal strength used by [`signal_tree`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Termination {
    Graceful,
    Forceful,
}

/// Builds a command that runs `line` through the platform shell.
pub fn shell_command(line: &str) -> Command {
    #[cfg(unix)]
    {
        let mut cmd = Command::new("sh");
        cmd.arg("-c").arg(line);
        cmd
    }
    #[cfg(windows)]
    {
        let mut cmd = Command::new("cmd");
        cmd.arg("/C").arg(line);
        cmd
    }
}

/// Makes the spawned child lead its own process group.
pub fn detach_group(cmd: &mut Command) -> &mut Command {
    #[cfg(unix)]
    cmd.process_group(0);
    cmd.kill_on_drop(true)
}

/// Signals the process tree rooted at `pid`. Failures (e.g. the group is
/// already gone) are ignored.
#[cfg(unix)]
pub fn signal_tree(pid: u32, termination: Termination) {
    let signal = match termination {
        Termination::Graceful => libc::SIGTERM,
        Termination::Forceful => libc::SIGKILL,
    };
    let Ok(pgid) = libc::pid_t::try_from(pid) else {
        return;
    };
    if pgid <= 0 {
        return;
    }
    // SAFETY: killpg has no memory-safety preconditions; pgid is a group we created.
    let rc = unsafe { libc::killpg(pgid, signal) };
    if rc != 0 {
        tracing::trace!(pid, ?termination, error = %std::io::Error::last_os_error(), "killpg failed");
    }
}

#[cfg(windows)]
pub fn signal_tree(pid: u32, termination: Termination) {
    let mut cmd = std::process::Command::new("taskkill");
    cmd.arg("/T").arg("/PID").arg(pid.to_string());
    if termination == Termination::Forceful {
        cmd.arg("/F");
    }
    let _ = cmd
        .stdout(std::process::Stdio::null())
        .stderr(std::process::Stdio::null())
        .status();
}

/// Terminates `child` and its process tree: graceful signal first, forceful
/// after `grace`. Never fails.
pub async fn terminate_tree(child: &mut Child, grace: Duration) {
    let Some(pid) = child.id() else {
        // Already reaped.
        return;
    };

    signal_tree(pid, Termination::Graceful);
    match timeout(grace, child.wait()).await {
        Ok(Ok(status)) => tracing::debug!(pid, %status, "process exited after graceful signal"),
        Ok(Err(err)) => tracing::debug!(pid, error = %err, "wait failed"),
        Err(_) => {
            tracing::debug!(pid, "grace period elapsed; killing process group");
            signal_tree(pid, Termination::Forceful);
            let _ = child.start_kill();
            let _ = child.wait().await;
        }
    }
    // The leader may exit before its descendants do.
    signal_tree(pid, Termination::Forceful);
}
