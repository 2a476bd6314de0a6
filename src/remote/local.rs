// ABOUTME: Executor that runs commands through the local `sh`.
// ABOUTME: Acts as a single host that belongs to every role.

use std::path::Path;
use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use snafu::ResultExt;
use tokio::process::Command;

use super::error::{LocalSnafu, PushSnafu, RemoteError, UnknownHostSnafu};
use super::executor::{FileSync, RemoteExecutor};
use crate::ssh::CommandOutput;

/// Runs commands on this machine as if it were a single remote host.
#[derive(Debug, Clone)]
pub struct LocalExecutor {
    name: String,
    timeout: Duration,
}

impl Default for LocalExecutor {
    fn default() -> Self {
        Self::new("localhost")
    }
}

impl LocalExecutor {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            timeout: Duration::from_secs(300),
        }
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    fn check_host(&self, host: &str) -> Result<(), RemoteError> {
        if host == self.name {
            Ok(())
        } else {
            UnknownHostSnafu { host }.fail()
        }
    }
}

#[async_trait]
impl RemoteExecutor for LocalExecutor {
    fn hosts(&self, _role: &str) -> Result<Vec<String>, RemoteError> {
        Ok(vec![self.name.clone()])
    }

    fn all_hosts(&self) -> Vec<String> {
        vec![self.name.clone()]
    }

    async fn exec(&self, host: &str, command: &str) -> Result<CommandOutput, RemoteError> {
        self.check_host(host)?;
        tracing::debug!(host, "exec: {}", command);

        let child = Command::new("sh")
            .arg("-c")
            .arg(command)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .output();

        let output = match tokio::time::timeout(self.timeout, child).await {
            Ok(result) => result.context(LocalSnafu { host })?,
            Err(_) => {
                return Err(std::io::Error::new(
                    std::io::ErrorKind::TimedOut,
                    format!("command timed out after {:?}", self.timeout),
                ))
                .context(LocalSnafu { host });
            }
        };

        Ok(CommandOutput {
            // Killed by a signal: report the conventional shell status
            exit_code: output.status.code().map(|c| c as u32).unwrap_or(255),
            stdout: String::from_utf8_lossy(&output.stdout).to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).to_string(),
        })
    }
}

#[async_trait]
impl FileSync for LocalExecutor {
    async fn push(&self, host: &str, local: &Path, remote_path: &str) -> Result<(), RemoteError> {
        self.check_host(host)?;
        let path = local.display().to_string();

        let target = Path::new(remote_path);
        if let Some(parent) = target.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .context(PushSnafu { host, path: &path })?;
        }
        tokio::fs::copy(local, target)
            .await
            .context(PushSnafu { host, path: &path })?;
        Ok(())
    }
}
