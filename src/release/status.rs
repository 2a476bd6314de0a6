// ABOUTME: Reports the releases on each host and which one is current.
// ABOUTME: Read-only: every command goes through query.

use serde::Serialize;

use crate::remote::{RemoteExecutor, shell};
use crate::types::ReleaseId;

use super::error::ReleaseError;
use super::finalize::RevisionLogEntry;
use super::set::{ReleaseSet, current_release, list_entries, partial_ids};
use super::settings::ReleaseSettings;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HostStatus {
    pub host: String,
    pub releases: Vec<ReleaseId>,
    pub current: Option<ReleaseId>,
    /// Releases still marked in progress.
    pub partial: Vec<ReleaseId>,
    /// Last line of the revision log.
    pub last_deploy: Option<RevisionLogEntry>,
}

pub async fn status<R: RemoteExecutor + ?Sized>(
    exec: &R,
    settings: &ReleaseSettings,
) -> Result<Vec<HostStatus>, ReleaseError> {
    let layout = &settings.layout;
    let log = shell::quote(&layout.revision_log_path());
    let hosts = exec.hosts(&settings.role).map_err(ReleaseError::Remote)?;
    let mut statuses = Vec::with_capacity(hosts.len());

    for host in hosts {
        let entries = list_entries(exec, &host, layout)
            .await
            .map_err(ReleaseError::Remote)?;
        let current = current_release(exec, &host, layout)
            .await
            .map_err(ReleaseError::Remote)?;
        let tail = exec
            .query(&host, &format!("if [ -f {0} ]; then tail -n 1 {0}; fi", log))
            .await
            .map_err(ReleaseError::Remote)?;

        statuses.push(HostStatus {
            releases: ReleaseSet::from_entries(&entries).ids().to_vec(),
            partial: partial_ids(&entries),
            last_deploy: RevisionLogEntry::parse(tail.stdout.trim()),
            current,
            host,
        });
    }
    Ok(statuses)
}
