// ABOUTME: The ordered set of releases on one host, read from the releases directory.
// ABOUTME: Only names that are valid release ids count; everything else is ignored.

use std::collections::BTreeMap;

use crate::remote::{RemoteError, RemoteExecutor, shell};
use crate::types::ReleaseId;

use super::layout::{Layout, PARTIAL_SUFFIX};

/// Releases on disk, oldest first.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReleaseSet {
    releases: Vec<ReleaseId>,
}

impl ReleaseSet {
    /// Build a set from directory entry names.
    pub fn from_entries<I, S>(entries: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut releases: Vec<ReleaseId> = entries
            .into_iter()
            .filter_map(|name| ReleaseId::parse(name.as_ref().trim()).ok())
            .collect();
        releases.sort();
        releases.dedup();
        Self { releases }
    }

    /// Read the release set of `host`. A missing releases directory is empty.
    pub async fn list<R: RemoteExecutor + ?Sized>(
        exec: &R,
        host: &str,
        layout: &Layout,
    ) -> Result<Self, RemoteError> {
        let entries = list_entries(exec, host, layout).await?;
        Ok(Self::from_entries(entries))
    }

    pub fn ids(&self) -> &[ReleaseId] {
        &self.releases
    }

    pub fn len(&self) -> usize {
        self.releases.len()
    }

    pub fn is_empty(&self) -> bool {
        self.releases.is_empty()
    }

    pub fn contains(&self, id: &ReleaseId) -> bool {
        self.releases.binary_search(id).is_ok()
    }

    /// Most recent release.
    pub fn latest(&self) -> Option<&ReleaseId> {
        self.releases.last()
    }

    /// Second most recent release.
    pub fn previous(&self) -> Option<&ReleaseId> {
        self.releases.iter().rev().nth(1)
    }
}

/// Raw entry names of the releases directory on `host`.
pub(crate) async fn list_entries<R: RemoteExecutor + ?Sized>(
    exec: &R,
    host: &str,
    layout: &Layout,
) -> Result<Vec<String>, RemoteError> {
    let releases = shell::quote(&layout.releases_path());
    let output = exec
        .query(
            host,
            &format!("if [ -d {0} ]; then ls -1 {0}; fi", releases),
        )
        .await?;
    Ok(output
        .stdout
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect())
}

/// Release ids that still carry an in-progress marker.
pub(crate) fn partial_ids(entries: &[String]) -> Vec<ReleaseId> {
    let mut ids: Vec<ReleaseId> = entries
        .iter()
        .filter_map(|name| name.strip_suffix(PARTIAL_SUFFIX))
        .filter_map(|stem| ReleaseId::parse(stem).ok())
        .collect();
    ids.sort();
    ids
}

/// Release `current` points to on `host`, if any.
///
/// A missing link, or one whose target is not a release id, yields `None`.
pub async fn current_release<R: RemoteExecutor + ?Sized>(
    exec: &R,
    host: &str,
    layout: &Layout,
) -> Result<Option<ReleaseId>, RemoteError> {
    let current = shell::quote(&layout.current_path());
    let output = exec
        .query(
            host,
            &format!("if [ -L {0} ]; then readlink {0}; fi", current),
        )
        .await?;
    let target = output.stdout.trim().trim_end_matches('/');
    let name = target.rsplit('/').next().unwrap_or(target);
    Ok(ReleaseId::parse(name).ok())
}

/// Release `current` points to on every host of `role`, keyed by host.
pub async fn current_releases<R: RemoteExecutor + ?Sized>(
    exec: &R,
    role: &str,
    layout: &Layout,
) -> Result<BTreeMap<String, Option<ReleaseId>>, RemoteError> {
    let mut targets = BTreeMap::new();
    for host in exec.hosts(role)? {
        let current = current_release(exec, &host, layout).await?;
        targets.insert(host, current);
    }
    Ok(targets)
}
