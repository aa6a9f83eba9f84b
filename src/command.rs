//! Invocation of external inspection tools (`ps`, `vmmap`).
//!
//! The contract for every helper subprocess is spawn -> drain -> kill ->
//! reap. Cleanup runs on every path: a pipe that errors mid-read still
//! triggers kill + wait before the error propagates, so a capture never
//! leaks a zombie or orphan.

use std::io::{self, Read};
use std::process::{Child, Command, ExitStatus, Stdio};

use tracing::warn;

/// Output captured from a helper subprocess.
pub(crate) struct HelperOutput {
    /// Pid of the spawned helper; callers exclude it from results.
    pub pid: u32,
    pub output: String,
    /// Exit status, when the reap succeeded.
    pub status: Option<ExitStatus>,
}

impl HelperOutput {
    pub fn success(&self) -> bool {
        self.status.map(|status| status.success()).unwrap_or(false)
    }
}

/// Runs `command`, draining its stdout to completion, then kills and reaps
/// it regardless of how much output was read.
pub(crate) fn drain(command: &mut Command) -> io::Result<HelperOutput> {
    command
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::null());

    let mut child = command.spawn()?;
    let pid = child.id();

    let mut output = String::new();
    let read_result = match child.stdout.take() {
        Some(mut stdout) => stdout.read_to_string(&mut output).map(|_| ()),
        None => Ok(()),
    };

    // A clean EOF means the helper closed stdout on its own; waiting
    // collects its real exit status. Killing first would turn a normal exit
    // into a SIGKILL status. Only a failed drain forces a kill.
    let status = if read_result.is_ok() {
        wait(&mut child)
    } else {
        reap(&mut child)
    };

    // The read error propagates only after cleanup.
    read_result?;

    Ok(HelperOutput {
        pid,
        output,
        status,
    })
}

/// Waits on a helper that finished writing. A wait failure is logged and
/// yields no status rather than masking the drained output.
fn wait(child: &mut Child) -> Option<ExitStatus> {
    match child.wait() {
        Ok(status) => Some(status),
        Err(error) => {
            warn!("failed to reap helper process {}: {}", child.id(), error);
            None
        }
    }
}

/// Kills and waits on a helper after a failed drain. Failures are logged as
/// warnings and never mask the primary result. `InvalidInput` from kill
/// means the child was already reaped.
fn reap(child: &mut Child) -> Option<ExitStatus> {
    if let Err(error) = child.kill() {
        if error.kind() != io::ErrorKind::InvalidInput {
            warn!("failed to kill helper process {}: {}", child.id(), error);
        }
    }

    wait(child)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_drain_captures_output_and_reaps() {
        let mut command = Command::new("echo");
        command.arg("hello");

        let helper = drain(&mut command).expect("echo should run");

        assert_eq!(helper.output.trim(), "hello");
        assert!(helper.pid > 0);
        assert!(helper.success());
    }

    #[test]
    fn test_drain_reports_clean_exit_status() {
        // A helper that exits normally must report its own status, not a
        // kill delivered during cleanup.
        let mut command = Command::new("sh");
        command.args(["-c", "echo done; exit 0"]);

        let helper = drain(&mut command).expect("sh should run");
        assert!(helper.success());
        assert_eq!(helper.status.map(|status| status.code()), Some(Some(0)));
    }

    #[test]
    fn test_drain_reports_nonzero_exit_status() {
        let mut command = Command::new("sh");
        command.args(["-c", "exit 3"]);

        let helper = drain(&mut command).expect("sh should run");
        assert!(!helper.success());
        assert_eq!(helper.status.map(|status| status.code()), Some(Some(3)));
    }

    #[test]
    fn test_drain_missing_binary_is_an_error() {
        let mut command = Command::new("definitely-not-a-real-binary-name");
        assert!(drain(&mut command).is_err());
    }
}
