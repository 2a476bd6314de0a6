// ABOUTME: Points current back at the previous release and deletes the newest one.
// ABOUTME: Every host is checked for a prior release before any host is changed.

use serde::Serialize;

use crate::remote::{RemoteExecutor, shell};
use crate::types::ReleaseId;

use super::batch::CommandBatch;
use super::error::ReleaseError;
use super::settings::ReleaseSettings;
use super::set::ReleaseSet;

/// What a rollback did on one host.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RollbackOutcome {
    pub host: String,
    /// Release `current` points to now.
    pub restored: ReleaseId,
    /// Release that was deleted.
    pub removed: ReleaseId,
}

/// Batch that relinks `current` to `restored` and deletes `removed`.
pub fn rollback_batch(
    settings: &ReleaseSettings,
    restored: &ReleaseId,
    removed: &ReleaseId,
) -> CommandBatch {
    let layout = &settings.layout;
    let current = shell::quote(&layout.current_path());
    let mut batch = CommandBatch::new();
    batch
        .required(format!("rm -f {}", current))
        .required(format!(
            "ln -s {} {}",
            shell::quote(&layout.release_path(restored)),
            current
        ))
        .required(format!(
            "rm -rf {}",
            shell::quote(&layout.release_path(removed))
        ))
        .best_effort(format!(
            "rm -f {}",
            shell::quote(&layout.partial_marker_path(removed))
        ));
    batch
}

/// Roll every host of the role back to its previous release, then run the
/// restart command on the role.
///
/// # Errors
///
/// Returns `ReleaseError::NoPriorRelease` without touching any host when a
/// host has fewer than two releases. A failure on one host stops the rollback
/// and is not compensated.
pub async fn rollback_to_previous<R: RemoteExecutor + ?Sized>(
    exec: &R,
    settings: &ReleaseSettings,
) -> Result<Vec<RollbackOutcome>, ReleaseError> {
    let hosts = exec.hosts(&settings.role).map_err(ReleaseError::Remote)?;

    let mut plans = Vec::with_capacity(hosts.len());
    for host in hosts {
        let set = ReleaseSet::list(exec, &host, &settings.layout)
            .await
            .map_err(ReleaseError::Remote)?;
        match (set.previous(), set.latest()) {
            (Some(previous), Some(latest)) => {
                let outcome = RollbackOutcome {
                    restored: previous.clone(),
                    removed: latest.clone(),
                    host,
                };
                plans.push(outcome);
            }
            _ => {
                return Err(ReleaseError::NoPriorRelease {
                    host,
                    found: set.len(),
                });
            }
        }
    }

    for plan in &plans {
        let batch = rollback_batch(settings, &plan.restored, &plan.removed);
        tracing::debug!(host = %plan.host, steps = batch.len(), "dispatching batch");
        exec.run_on_host(&plan.host, &batch.render())
            .await
            .map_err(ReleaseError::filesystem("roll back release"))?;
        tracing::info!(
            host = %plan.host,
            restored = %plan.restored,
            removed = %plan.removed,
            "rolled back"
        );
    }

    if let Some(restart) = &settings.restart {
        exec.run_on_role(&settings.role, restart)
            .await
            .map_err(ReleaseError::Remote)?;
        tracing::info!("restart command finished");
    }

    Ok(plans)
}
