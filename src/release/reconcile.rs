// ABOUTME: Removes releases left in progress by an interrupted update.
// ABOUTME: A marked release that is current or in the revision log is kept; only its marker goes.

use std::collections::BTreeSet;

use serde::Serialize;

use crate::remote::{RemoteExecutor, shell};
use crate::types::ReleaseId;

use super::error::ReleaseError;
use super::layout::Layout;
use super::settings::ReleaseSettings;
use super::set::{current_release, list_entries, partial_ids};

/// What reconcile did on one host.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReconcileReport {
    pub host: String,
    /// Partial releases deleted with their markers.
    pub removed: Vec<ReleaseId>,
    /// Committed releases whose stale marker was dropped.
    pub unmarked: Vec<ReleaseId>,
}

/// Release ids named by the revision log on `host`.
async fn logged_releases<R: RemoteExecutor + ?Sized>(
    exec: &R,
    host: &str,
    layout: &Layout,
) -> Result<BTreeSet<ReleaseId>, ReleaseError> {
    let log = shell::quote(&layout.revision_log_path());
    let output = exec
        .query(host, &format!("if [ -f {0} ]; then cut -d ' ' -f 4 {0}; fi", log))
        .await
        .map_err(ReleaseError::Remote)?;
    Ok(output
        .stdout
        .lines()
        .filter_map(|line| ReleaseId::parse(line.trim()).ok())
        .collect())
}

/// Delete partial releases on every host of the role.
///
/// A marked release that `current` points to, or that the revision log
/// records, was committed and only loses its marker.
pub async fn reconcile<R: RemoteExecutor + ?Sized>(
    exec: &R,
    settings: &ReleaseSettings,
) -> Result<Vec<ReconcileReport>, ReleaseError> {
    let layout = &settings.layout;
    let hosts = exec.hosts(&settings.role).map_err(ReleaseError::Remote)?;
    let mut reports = Vec::with_capacity(hosts.len());

    for host in hosts {
        let entries = list_entries(exec, &host, layout)
            .await
            .map_err(ReleaseError::Remote)?;
        let current = current_release(exec, &host, layout)
            .await
            .map_err(ReleaseError::Remote)?;

        let logged = logged_releases(exec, &host, layout).await?;

        let (live, orphans): (Vec<ReleaseId>, Vec<ReleaseId>) = partial_ids(&entries)
            .into_iter()
            .partition(|id| Some(id) == current.as_ref() || logged.contains(id));

        let mut paths = Vec::new();
        for id in &orphans {
            paths.push(layout.release_path(id));
            paths.push(layout.partial_marker_path(id));
        }
        for id in &live {
            paths.push(layout.partial_marker_path(id));
        }

        if paths.is_empty() {
            tracing::debug!(host = %host, "no partial releases");
        } else {
            exec.run_on_host(&host, &format!("rm -rf {}", shell::quote_all(&paths)))
                .await
                .map_err(ReleaseError::filesystem("remove partial releases"))?;
            tracing::info!(host = %host, removed = orphans.len(), "reconciled partial releases");
        }

        reports.push(ReconcileReport {
            host,
            removed: orphans,
            unmarked: live,
        });
    }
    Ok(reports)
}
