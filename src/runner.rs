//! Subprocess execution for `command` actions.

use std::process::Stdio;
use std::time::Duration;

use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tokio::runtime::Runtime;

use crate::error::RunError;

/// Captured result of a finished command.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CommandOutput {
    /// Exit code, `None` when killed by a signal.
    pub status: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

impl CommandOutput {
    pub fn success(&self) -> bool {
        self.status == Some(0)
    }
}

/// Runs a command line and waits for it.
pub trait CommandRunner {
    fn run(
        &self,
        command: &str,
        stdin: Option<&str>,
        timeout: Option<Duration>,
    ) -> Result<CommandOutput, RunError>;
}

/// Runs commands through `<shell> -c`.
///
/// Owns a single-threaded tokio runtime so the blocking dispatch can still
/// wait on the child with a timeout.
pub struct ShellRunner {
    shell: String,
    runtime: Runtime,
}

impl ShellRunner {
    pub const DEFAULT_SHELL: &'static str = "sh";

    pub fn new(shell: impl Into<String>) -> std::io::Result<Self> {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()?;
        Ok(Self {
            shell: shell.into(),
            runtime,
        })
    }

    async fn run_async(
        &self,
        command: &str,
        stdin: Option<&str>,
        timeout: Option<Duration>,
    ) -> Result<CommandOutput, RunError> {
        let mut child = Command::new(&self.shell)
            .arg("-c")
            .arg(command)
            .stdin(if stdin.is_some() {
                Stdio::piped()
            } else {
                Stdio::null()
            })
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true) // a timed-out child is killed when dropped
            .spawn()
            .map_err(|e| RunError::Spawn(e.to_string()))?;

        // Feed stdin while waiting, so neither side can fill a pipe and stall
        let mut writer = match (stdin, child.stdin.take()) {
            (Some(data), Some(mut pipe)) => {
                let data = data.as_bytes().to_vec();
                Some(tokio::spawn(async move {
                    let written = pipe.write_all(&data).await;
                    drop(pipe); // EOF
                    written
                }))
            }
            _ => None,
        };

        let finished = async {
            let output = child
                .wait_with_output()
                .await
                .map_err(|e| RunError::Io(e.to_string()))?;
            if let Some(writer) = writer.as_mut() {
                match writer.await {
                    Ok(Ok(())) => {}
                    // The command exited without reading its input
                    Ok(Err(e)) if e.kind() == std::io::ErrorKind::BrokenPipe => {}
                    Ok(Err(e)) => return Err(RunError::Io(e.to_string())),
                    Err(e) => return Err(RunError::Io(e.to_string())),
                }
            }
            Ok::<_, RunError>(output)
        };

        let result = match timeout {
            Some(limit) => tokio::time::timeout(limit, finished)
                .await
                .unwrap_or(Err(RunError::Timeout(limit))),
            None => finished.await,
        };
        if let Some(writer) = writer {
            writer.abort();
        }
        let output = result?;

        Ok(CommandOutput {
            status: output.status.code(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        })
    }
}

impl CommandRunner for ShellRunner {
    fn run(
        &self,
        command: &str,
        stdin: Option<&str>,
        timeout: Option<Duration>,
    ) -> Result<CommandOutput, RunError> {
        tracing::debug!(shell = %self.shell, command, ?timeout, "running command");
        let output = self
            .runtime
            .block_on(self.run_async(command, stdin, timeout))?;
        tracing::debug!(status = ?output.status, "command finished");
        Ok(output)
    }
}

impl std::fmt::Debug for ShellRunner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ShellRunner")
            .field("shell", &self.shell)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
#[path = "runner_tests.rs"]
mod tests;
