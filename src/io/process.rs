//! Process management layer
//!
//! Spawns a language server with piped stdin/stdout and waits for it to
//! exit, completely separate from protocol concerns.

use std::io;
use std::path::Path;
use std::process::{ExitStatus, Stdio};
use std::time::Duration;
use tokio::process::{Child, ChildStdin, ChildStdout, Command};
use tracing::{info, warn};

/// Error types for process management
#[derive(Debug, thiserror::Error)]
pub enum ProcessError {
    #[error("Failed to start process '{command}': {source}")]
    StartFailed {
        command: String,
        #[source]
        source: io::Error,
    },

    #[error("Process {0} stream not available")]
    MissingStdio(&'static str),

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

/// A running language server
#[derive(Debug)]
pub struct ServerProcess {
    command: String,
    child: Child,
}

impl ServerProcess {
    /// Start `command` with piped stdin/stdout; stderr is inherited.
    ///
    /// Returns the process together with the stream to read server output
    /// from and the stream to write client messages to.
    pub fn spawn(
        command: &str,
        args: &[String],
        working_dir: Option<&Path>,
    ) -> Result<(Self, ChildStdout, ChildStdin), ProcessError> {
        let mut command_builder = Command::new(command);
        command_builder
            .args(args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .kill_on_drop(true);

        if let Some(dir) = working_dir {
            command_builder.current_dir(dir);
        }

        let mut child = command_builder
            .spawn()
            .map_err(|source| ProcessError::StartFailed {
                command: command.to_string(),
                source,
            })?;

        let stdout = child
            .stdout
            .take()
            .ok_or(ProcessError::MissingStdio("stdout"))?;
        let stdin = child
            .stdin
            .take()
            .ok_or(ProcessError::MissingStdio("stdin"))?;

        info!("Started language server '{}' (PID {:?})", command, child.id());

        Ok((
            Self {
                command: command.to_string(),
                child,
            },
            stdout,
            stdin,
        ))
    }

    pub fn pid(&self) -> Option<u32> {
        self.child.id()
    }

    /// Wait for the process to exit, killing it once `timeout` elapses
    pub async fn wait(mut self, timeout: Duration) -> Result<ExitStatus, ProcessError> {
        match tokio::time::timeout(timeout, self.child.wait()).await {
            Ok(status) => {
                let status = status?;
                info!("Language server '{}' exited: {}", self.command, status);
                Ok(status)
            }
            Err(_) => {
                warn!(
                    "Language server '{}' did not exit within {:?}, killing it",
                    self.command, timeout
                );
                self.child.kill().await?;
                Ok(self.child.wait().await?)
            }
        }
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};

    #[tokio::test]
    async fn test_spawn_pipes_stdio() {
        let (process, mut stdout, mut stdin) = ServerProcess::spawn("cat", &[], None).unwrap();
        assert!(process.pid().is_some());

        stdin.write_all(b"ping").await.unwrap();
        drop(stdin);

        let mut echoed = String::new();
        stdout.read_to_string(&mut echoed).await.unwrap();
        assert_eq!(echoed, "ping");

        let status = process.wait(Duration::from_secs(5)).await.unwrap();
        assert!(status.success());
    }

    #[tokio::test]
    async fn test_spawn_missing_binary() {
        let result = ServerProcess::spawn("definitely-not-a-language-server-binary", &[], None);
        match result {
            Err(ProcessError::StartFailed { command, .. }) => {
                assert_eq!(command, "definitely-not-a-language-server-binary")
            }
            other => panic!("Expected StartFailed error, got: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_wait_kills_after_timeout() {
        let (process, _stdout, _stdin) =
            ServerProcess::spawn("sleep", &["30".to_string()], None).unwrap();

        let status = process.wait(Duration::from_millis(50)).await.unwrap();
        assert!(!status.success());
    }
}
