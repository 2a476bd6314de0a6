// ABOUTME: Hooks system for release lifecycle events.
// ABOUTME: Discovers and executes local shell scripts around deploy and rollback.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::process::Command;

use crate::types::{AppName, ReleaseId};

/// Hook execution points in the release lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HookPoint {
    /// Before deployment starts. Failure aborts deployment.
    PreDeploy,
    /// After successful deployment. Failure logs warning.
    PostDeploy,
    /// On deployment failure. Failure logs warning.
    OnError,
    /// After a successful rollback. Failure logs warning.
    PostRollback,
}

impl HookPoint {
    /// Get the hook filename for this point.
    pub fn filename(&self) -> &'static str {
        match self {
            HookPoint::PreDeploy => "pre-deploy",
            HookPoint::PostDeploy => "post-deploy",
            HookPoint::OnError => "on-error",
            HookPoint::PostRollback => "post-rollback",
        }
    }

    /// Whether failure at this hook point should abort deployment.
    pub fn is_fatal(&self) -> bool {
        matches!(self, HookPoint::PreDeploy)
    }
}

/// Context passed to hooks via environment variables.
#[derive(Debug, Clone)]
pub struct HookContext {
    pub application: AppName,
    pub destination: Option<String>,
    pub deploy_to: String,
    pub hosts: Vec<String>,
    pub revision: Option<String>,
    /// Release created by the deploy, or restored by the rollback.
    pub release: Option<ReleaseId>,
    pub previous_release: Option<ReleaseId>,
    /// Error message, for `on-error`.
    pub error: Option<String>,
}

impl HookContext {
    pub fn new(application: AppName, deploy_to: impl Into<String>) -> Self {
        Self {
            application,
            destination: None,
            deploy_to: deploy_to.into(),
            hosts: Vec::new(),
            revision: None,
            release: None,
            previous_release: None,
            error: None,
        }
    }

    /// Convert context to environment variables.
    pub fn to_env(&self) -> HashMap<String, String> {
        let mut env = HashMap::new();
        env.insert(
            "SHIPYARD_APPLICATION".to_string(),
            self.application.to_string(),
        );
        env.insert("SHIPYARD_DEPLOY_TO".to_string(), self.deploy_to.clone());
        env.insert("SHIPYARD_HOSTS".to_string(), self.hosts.join(","));

        let optional = [
            ("SHIPYARD_DESTINATION", self.destination.clone()),
            ("SHIPYARD_REVISION", self.revision.clone()),
            ("SHIPYARD_RELEASE", self.release.as_ref().map(ToString::to_string)),
            (
                "SHIPYARD_PREVIOUS_RELEASE",
                self.previous_release.as_ref().map(ToString::to_string),
            ),
            ("SHIPYARD_ERROR", self.error.clone()),
        ];
        for (name, value) in optional {
            if let Some(value) = value {
                env.insert(name.to_string(), value);
            }
        }
        env
    }
}

/// Result of running a hook.
#[derive(Debug)]
pub struct HookResult {
    pub success: bool,
    pub exit_code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

/// Discovers and runs hooks from a project directory.
pub struct HookRunner {
    hooks_dir: PathBuf,
}

impl HookRunner {
    /// Create a new hook runner looking for hooks in the given project directory.
    pub fn new(project_dir: &Path) -> Self {
        Self {
            hooks_dir: project_dir.join(".shipyard").join("hooks"),
        }
    }

    /// Check if a hook exists for the given point.
    pub fn hook_exists(&self, point: HookPoint) -> bool {
        self.hook_path(point).is_file()
    }

    fn hook_path(&self, point: HookPoint) -> PathBuf {
        self.hooks_dir.join(point.filename())
    }

    /// Run a hook if it exists.
    ///
    /// Returns None if the hook doesn't exist, or Some(HookResult) if it was run.
    pub async fn run(&self, point: HookPoint, context: &HookContext) -> Option<HookResult> {
        let hook_path = self.hook_path(point);

        if !hook_path.is_file() {
            return None;
        }

        tracing::info!("running {} hook: {}", point.filename(), hook_path.display());

        let output = Command::new(&hook_path)
            .envs(context.to_env())
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .await;

        match output {
            Ok(output) => {
                let result = HookResult {
                    success: output.status.success(),
                    exit_code: output.status.code(),
                    stdout: String::from_utf8_lossy(&output.stdout).to_string(),
                    stderr: String::from_utf8_lossy(&output.stderr).to_string(),
                };

                if result.success {
                    tracing::info!("{} hook completed successfully", point.filename());
                } else {
                    tracing::warn!(
                        "{} hook failed with exit code {:?}",
                        point.filename(),
                        result.exit_code
                    );
                }

                Some(result)
            }
            Err(e) => {
                tracing::error!("failed to execute {} hook: {}", point.filename(), e);
                Some(HookResult {
                    success: false,
                    exit_code: None,
                    stdout: String::new(),
                    stderr: e.to_string(),
                })
            }
        }
    }
}
