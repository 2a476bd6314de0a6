// ABOUTME: Dry-run executor that records mutating commands instead of running them.
// ABOUTME: Read-only queries still reach the wrapped executor.

use std::path::Path;

use async_trait::async_trait;
use parking_lot::Mutex;
use serde::Serialize;

use super::error::RemoteError;
use super::executor::{FileSync, RemoteExecutor};
use crate::ssh::CommandOutput;

/// A command that would have been run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RecordedCommand {
    pub host: String,
    pub command: String,
}

/// Wraps an executor, forwarding queries and recording everything else.
pub struct RecordingExecutor<'a, E: ?Sized> {
    inner: &'a E,
    recorded: Mutex<Vec<RecordedCommand>>,
}

impl<'a, E: RemoteExecutor + ?Sized> RecordingExecutor<'a, E> {
    pub fn new(inner: &'a E) -> Self {
        Self {
            inner,
            recorded: Mutex::new(Vec::new()),
        }
    }

    /// Commands recorded so far, in dispatch order.
    pub fn commands(&self) -> Vec<RecordedCommand> {
        self.recorded.lock().clone()
    }

    pub fn is_empty(&self) -> bool {
        self.recorded.lock().is_empty()
    }

    fn record(&self, host: &str, command: String) {
        tracing::info!(host, "dry-run: {}", command);
        self.recorded.lock().push(RecordedCommand {
            host: host.to_string(),
            command,
        });
    }
}

#[async_trait]
impl<E: RemoteExecutor + ?Sized> RemoteExecutor for RecordingExecutor<'_, E> {
    fn hosts(&self, role: &str) -> Result<Vec<String>, RemoteError> {
        self.inner.hosts(role)
    }

    fn all_hosts(&self) -> Vec<String> {
        self.inner.all_hosts()
    }

    async fn exec(&self, host: &str, command: &str) -> Result<CommandOutput, RemoteError> {
        self.record(host, command.to_string());
        Ok(CommandOutput::default())
    }

    async fn query(&self, host: &str, command: &str) -> Result<CommandOutput, RemoteError> {
        self.inner.query(host, command).await
    }
}

#[async_trait]
impl<E: RemoteExecutor + ?Sized> FileSync for RecordingExecutor<'_, E> {
    async fn push(&self, host: &str, local: &Path, remote_path: &str) -> Result<(), RemoteError> {
        self.record(host, format!("push {} -> {}", local.display(), remote_path));
        Ok(())
    }
}
