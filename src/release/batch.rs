// ABOUTME: Ordered command batches where each step is required or best-effort.
// ABOUTME: A batch renders to one shell command so it is dispatched as a single invocation.

use std::fmt;

use crate::remote::{HostOutput, RemoteError, RemoteExecutor};

/// Whether a failing step aborts the rest of the batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepPolicy {
    /// A failure stops the batch and fails the invocation.
    Required,
    /// A failure is ignored and the batch continues.
    BestEffort,
}

/// One shell command inside a batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Step {
    pub command: String,
    pub policy: StepPolicy,
}

impl Step {
    fn render(&self) -> String {
        match self.policy {
            StepPolicy::Required if needs_group(&self.command) => {
                format!("{{ {}; }}", self.command)
            }
            StepPolicy::Required => self.command.clone(),
            StepPolicy::BestEffort => format!("{{ {} || true; }}", self.command),
        }
    }
}

/// Commands with their own `;` or `||` must be grouped so they cannot
/// swallow the failure of an earlier step.
fn needs_group(command: &str) -> bool {
    command.contains(';') || command.contains("||")
}

/// An ordered list of steps joined with `&&`.
///
/// Required steps short-circuit: once one fails nothing after it runs. Grouping
/// uses braces rather than subshells so `umask` carries over to later steps.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandBatch {
    steps: Vec<Step>,
}

impl CommandBatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn required(&mut self, command: impl Into<String>) -> &mut Self {
        self.steps.push(Step {
            command: command.into(),
            policy: StepPolicy::Required,
        });
        self
    }

    pub fn best_effort(&mut self, command: impl Into<String>) -> &mut Self {
        self.steps.push(Step {
            command: command.into(),
            policy: StepPolicy::BestEffort,
        });
        self
    }

    pub fn steps(&self) -> &[Step] {
        &self.steps
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Single shell command running every step in order.
    pub fn render(&self) -> String {
        self.steps
            .iter()
            .map(Step::render)
            .collect::<Vec<_>>()
            .join(" && ")
    }

    /// Whether any step's command contains `needle`.
    pub fn contains(&self, needle: &str) -> bool {
        self.steps.iter().any(|s| s.command.contains(needle))
    }
}

impl fmt::Display for CommandBatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.render())
    }
}

/// Run a batch on every host of `role`. Empty batches are not dispatched.
pub(crate) async fn dispatch<R: RemoteExecutor + ?Sized>(
    exec: &R,
    role: &str,
    batch: &CommandBatch,
) -> Result<Vec<HostOutput>, RemoteError> {
    if batch.is_empty() {
        return Ok(Vec::new());
    }
    tracing::debug!(role, steps = batch.len(), "dispatching batch");
    exec.run_on_role(role, &batch.render()).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn required_steps_short_circuit() {
        let mut batch = CommandBatch::new();
        batch.required("umask 02").required("mkdir -p /a");
        assert_eq!(batch.render(), "umask 02 && mkdir -p /a");
    }

    #[test]
    fn best_effort_steps_are_grouped_with_true() {
        let mut batch = CommandBatch::new();
        batch.required("rm -rf /a").best_effort("rm -f /a.partial");
        assert_eq!(batch.render(), "rm -rf /a && { rm -f /a.partial || true; }");
    }

    #[test]
    fn compound_required_steps_are_grouped() {
        let mut batch = CommandBatch::new();
        batch.required("false").required("a || b");
        assert_eq!(batch.render(), "false && { a || b; }");
    }

    #[tokio::test]
    async fn early_failure_stops_later_steps() {
        use crate::remote::LocalExecutor;

        let dir = tempfile::tempdir().unwrap();
        let marker = dir.path().join("after");
        let mut batch = CommandBatch::new();
        batch
            .required("false || false")
            .required(format!("touch {}", marker.display()));

        let result = dispatch(&LocalExecutor::default(), "app", &batch).await;

        assert!(result.is_err());
        assert!(!marker.exists());
    }

    #[tokio::test]
    async fn best_effort_failure_does_not_stop_batch() {
        use crate::remote::LocalExecutor;

        let dir = tempfile::tempdir().unwrap();
        let marker = dir.path().join("after");
        let mut batch = CommandBatch::new();
        batch
            .best_effort("false")
            .required(format!("touch {}", marker.display()));

        dispatch(&LocalExecutor::default(), "app", &batch)
            .await
            .unwrap();

        assert!(marker.exists());
    }
}
