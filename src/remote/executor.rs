// ABOUTME: Capability traits for running commands and pushing files on hosts.
// ABOUTME: Role membership comes from configuration, not a global registry.

use std::path::Path;

use async_trait::async_trait;

use super::error::{NonZeroExitSnafu, RemoteError};
use crate::ssh::CommandOutput;

/// Output of one command on one host.
#[derive(Debug, Clone)]
pub struct HostOutput {
    pub host: String,
    pub output: CommandOutput,
}

/// Runs shell commands on named hosts and on every host of a role.
///
/// Implementors only provide `hosts`, `all_hosts` and `exec`. The checked
/// variants treat a non-zero exit as [`RemoteError::NonZeroExit`].
#[async_trait]
pub trait RemoteExecutor: Send + Sync {
    /// Hosts assigned to `role`.
    fn hosts(&self, role: &str) -> Result<Vec<String>, RemoteError>;

    /// Every known host, in configuration order.
    fn all_hosts(&self) -> Vec<String>;

    /// Run `command` on `host` and return its output whatever the exit status.
    async fn exec(&self, host: &str, command: &str) -> Result<CommandOutput, RemoteError>;

    /// Run a command that only reads state.
    ///
    /// Dry-run executors forward queries instead of recording them.
    async fn query(&self, host: &str, command: &str) -> Result<CommandOutput, RemoteError> {
        self.run_on_host(host, command).await
    }

    /// Run `command` on `host`, failing on a non-zero exit.
    async fn run_on_host(&self, host: &str, command: &str) -> Result<CommandOutput, RemoteError> {
        let output = self.exec(host, command).await?;
        if !output.success() {
            return NonZeroExitSnafu {
                host,
                exit_code: output.exit_code,
                stderr: output.stderr.trim(),
            }
            .fail();
        }
        Ok(output)
    }

    /// Run `command` on every host concurrently.
    ///
    /// Waits for all hosts before reporting, so no command is abandoned
    /// mid-flight. Returns the first failure in host order.
    async fn run_on_hosts(
        &self,
        hosts: &[String],
        command: &str,
    ) -> Result<Vec<HostOutput>, RemoteError> {
        let runs = hosts.iter().map(|host| async move {
            let result = self.run_on_host(host, command).await;
            (host, result)
        });

        let mut outputs = Vec::with_capacity(hosts.len());
        let mut first_error = None;
        for (host, result) in futures::future::join_all(runs).await {
            match result {
                Ok(output) => outputs.push(HostOutput {
                    host: host.clone(),
                    output,
                }),
                Err(e) => {
                    tracing::warn!(host = %host, "command failed: {}", e);
                    first_error.get_or_insert(e);
                }
            }
        }

        match first_error {
            Some(e) => Err(e),
            None => Ok(outputs),
        }
    }

    /// Run `command` on every host of `role`.
    async fn run_on_role(&self, role: &str, command: &str) -> Result<Vec<HostOutput>, RemoteError> {
        let hosts = self.hosts(role)?;
        self.run_on_hosts(&hosts, command).await
    }
}

/// Copies a local file to a path on a host.
#[async_trait]
pub trait FileSync: Send + Sync {
    /// Push `local` to `remote_path` on `host`, creating parent directories.
    async fn push(&self, host: &str, local: &Path, remote_path: &str) -> Result<(), RemoteError>;
}
