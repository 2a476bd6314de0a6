// ABOUTME: Retention: deletes the oldest releases beyond the keep count.
// ABOUTME: Plans per host and removes everything planned in one batched command.

use serde::Serialize;

use crate::remote::{RemoteExecutor, shell};
use crate::types::ReleaseId;

use super::error::ReleaseError;
use super::settings::ReleaseSettings;
use super::set::ReleaseSet;

/// Which releases survive and which are deleted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CleanupPlan {
    keep: Vec<ReleaseId>,
    remove: Vec<ReleaseId>,
}

impl CleanupPlan {
    /// Keep the newest `keep_count` releases and remove the rest.
    pub fn new(set: &ReleaseSet, keep_count: usize) -> Self {
        let ids = set.ids();
        let split = ids.len().saturating_sub(keep_count);
        Self {
            remove: ids[..split].to_vec(),
            keep: ids[split..].to_vec(),
        }
    }

    pub fn keep(&self) -> &[ReleaseId] {
        &self.keep
    }

    pub fn remove(&self) -> &[ReleaseId] {
        &self.remove
    }

    /// Nothing to delete.
    pub fn is_noop(&self) -> bool {
        self.remove.is_empty()
    }
}

/// What cleanup did on one host.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CleanupReport {
    pub host: String,
    pub removed: Vec<ReleaseId>,
    pub kept: usize,
}

fn removal_command(settings: &ReleaseSettings, remove: &[ReleaseId]) -> String {
    let layout = &settings.layout;
    let paths = remove.iter().flat_map(|id| {
        [layout.release_path(id), layout.partial_marker_path(id)]
    });
    format!("rm -rf {}", shell::quote_all(paths))
}

/// Remove releases beyond `keep_count` on every host of the role.
///
/// A host with no more than `keep_count` releases is left untouched.
pub async fn cleanup<R: RemoteExecutor + ?Sized>(
    exec: &R,
    settings: &ReleaseSettings,
    keep_count: usize,
) -> Result<Vec<CleanupReport>, ReleaseError> {
    let hosts = exec.hosts(&settings.role).map_err(ReleaseError::Remote)?;
    let mut reports = Vec::with_capacity(hosts.len());

    for host in hosts {
        let set = ReleaseSet::list(exec, &host, &settings.layout)
            .await
            .map_err(ReleaseError::Remote)?;
        let plan = CleanupPlan::new(&set, keep_count);

        if plan.is_noop() {
            tracing::info!(
                host = %host,
                releases = set.len(),
                keep = keep_count,
                "nothing to clean"
            );
        } else {
            exec.run_on_host(&host, &removal_command(settings, plan.remove()))
                .await
                .map_err(ReleaseError::filesystem("remove old releases"))?;
            tracing::info!(host = %host, removed = plan.remove().len(), "removed old releases");
        }

        reports.push(CleanupReport {
            host,
            removed: plan.remove,
            kept: plan.keep.len(),
        });
    }
    Ok(reports)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::release::Layout;
    use crate::scm::Git;
    use proptest::prelude::*;
    use std::sync::Arc;

    fn set_of(n: usize) -> ReleaseSet {
        ReleaseSet::from_entries((1..=n).map(|i| format!("202401{:02}000000", i)))
    }

    #[test]
    fn seven_releases_keep_five_removes_two_oldest() {
        let plan = CleanupPlan::new(&set_of(7), 5);
        let removed: Vec<_> = plan.remove().iter().map(|id| id.as_str()).collect();
        assert_eq!(removed, vec!["20240101000000", "20240102000000"]);
        assert_eq!(plan.keep().len(), 5);
    }

    #[test]
    fn within_retention_is_noop() {
        assert!(CleanupPlan::new(&set_of(5), 5).is_noop());
        assert!(CleanupPlan::new(&set_of(0), 5).is_noop());
    }

    #[test]
    fn keep_zero_removes_everything() {
        let plan = CleanupPlan::new(&set_of(3), 0);
        assert_eq!(plan.remove().len(), 3);
        assert!(plan.keep().is_empty());
    }

    #[test]
    fn removal_is_one_command() {
        let settings = ReleaseSettings::new(Layout::new("/srv/app"), Arc::new(Git::new("unused")));
        let plan = CleanupPlan::new(&set_of(2), 1);
        assert_eq!(
            removal_command(&settings, plan.remove()),
            "rm -rf /srv/app/releases/20240101000000 /srv/app/releases/20240101000000.partial"
        );
    }

    proptest! {
        #[test]
        fn plan_partitions_the_set(n in 0usize..30, keep in 0usize..10) {
            let set = set_of(n);
            let plan = CleanupPlan::new(&set, keep);

            prop_assert_eq!(plan.keep().len(), n.min(keep));
            prop_assert_eq!(plan.keep().len() + plan.remove().len(), n);
            if let (Some(newest_removed), Some(oldest_kept)) = (plan.remove().last(), plan.keep().first()) {
                prop_assert!(newest_removed < oldest_kept);
            }

            // Applying the plan and planning again finds nothing to do
            let remaining = ReleaseSet::from_entries(plan.keep().iter().map(|id| id.as_str()));
            prop_assert!(CleanupPlan::new(&remaining, keep).is_noop());
        }
    }
}
