// ABOUTME: Settings consumed by the release lifecycle operations.
// ABOUTME: Built from configuration; independent of how it was loaded.

use std::collections::BTreeMap;
use std::sync::Arc;

use crate::remote::{APP_ROLE, shell};
use crate::scm::Source;

use super::layout::Layout;

pub const DEFAULT_KEEP_RELEASES: usize = 5;
pub const DEFAULT_UMASK: &str = "02";

/// Everything the lifecycle needs to know about one deploy target.
#[derive(Debug, Clone)]
pub struct ReleaseSettings {
    pub layout: Layout,
    /// Role that receives release updates.
    pub role: String,
    pub umask: String,
    pub owner: Option<String>,
    pub group: Option<String>,
    /// Keep a working copy under `scm/` and export from it.
    pub track_scm: bool,
    pub source: Arc<dyn Source>,
    /// Shared directory name to path relative to the release root.
    pub shared_paths: BTreeMap<String, String>,
    /// Extra directories created inside each release.
    pub mkdirs: Vec<String>,
    pub keep_releases: usize,
    /// Command run on the role after a rollback.
    pub restart: Option<String>,
}

impl ReleaseSettings {
    pub fn new(layout: Layout, source: Arc<dyn Source>) -> Self {
        Self {
            layout,
            role: APP_ROLE.to_string(),
            umask: DEFAULT_UMASK.to_string(),
            owner: None,
            group: None,
            track_scm: true,
            source,
            shared_paths: BTreeMap::new(),
            mkdirs: Vec::new(),
            keep_releases: DEFAULT_KEEP_RELEASES,
            restart: None,
        }
    }

    pub(crate) fn umask_command(&self) -> String {
        format!("umask {}", self.umask)
    }

    /// Argument for `chown`, or `None` when neither owner nor group is set.
    fn ownership(&self) -> Option<String> {
        match (&self.owner, &self.group) {
            (Some(owner), Some(group)) => Some(format!("{}:{}", owner, group)),
            (Some(owner), None) => Some(owner.clone()),
            (None, Some(group)) => Some(format!(":{}", group)),
            (None, None) => None,
        }
    }

    /// `chown` command for `paths`, when ownership is configured.
    pub(crate) fn chown_command(&self, recursive: bool, paths: &[String]) -> Option<String> {
        let owner = self.ownership()?;
        if paths.is_empty() {
            return None;
        }
        let flag = if recursive { "-R " } else { "" };
        Some(format!(
            "chown {}{} {}",
            flag,
            shell::quote(&owner),
            shell::quote_all(paths)
        ))
    }
}
