// ABOUTME: Directory and symlink layout under the deploy root.
// ABOUTME: Paths are POSIX strings because they name locations on remote hosts.

use crate::types::ReleaseId;

pub const RELEASES_DIR: &str = "releases";
pub const SHARED_DIR: &str = "shared";
pub const SCM_DIR: &str = "scm";
pub const CURRENT_LINK: &str = "current";
pub const REVISION_LOG: &str = "revisions.log";
pub const LOCK_FILE: &str = "deploy.lock";

/// Suffix of the marker written next to a release while it is in progress.
///
/// Marker names never match the release id pattern, so listings ignore them.
pub const PARTIAL_SUFFIX: &str = ".partial";

/// Paths of one deploy target:
///
/// ```text
/// deploy_to/
///   releases/<14-digit-id>/
///   shared/<name>/
///   scm/repo/
///   current -> releases/<id>
///   revisions.log
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Layout {
    deploy_to: String,
}

impl Layout {
    pub fn new(deploy_to: impl Into<String>) -> Self {
        let deploy_to = deploy_to.into();
        let trimmed = deploy_to.trim_end_matches('/');
        let deploy_to = if trimmed.is_empty() {
            "/".to_string()
        } else {
            trimmed.to_string()
        };
        Self { deploy_to }
    }

    fn join(&self, name: &str) -> String {
        if self.deploy_to == "/" {
            format!("/{}", name)
        } else {
            format!("{}/{}", self.deploy_to, name)
        }
    }

    pub fn deploy_to(&self) -> &str {
        &self.deploy_to
    }

    pub fn releases_path(&self) -> String {
        self.join(RELEASES_DIR)
    }

    pub fn shared_path(&self) -> String {
        self.join(SHARED_DIR)
    }

    pub fn scm_path(&self) -> String {
        self.join(SCM_DIR)
    }

    pub fn current_path(&self) -> String {
        self.join(CURRENT_LINK)
    }

    pub fn revision_log_path(&self) -> String {
        self.join(REVISION_LOG)
    }

    pub fn lock_path(&self) -> String {
        self.join(LOCK_FILE)
    }

    pub fn release_path(&self, id: &ReleaseId) -> String {
        format!("{}/{}", self.releases_path(), id)
    }

    pub fn partial_marker_path(&self, id: &ReleaseId) -> String {
        format!("{}/{}{}", self.releases_path(), id, PARTIAL_SUFFIX)
    }

    /// Where the content of shared directory `name` lives.
    pub fn shared_target(&self, name: &str) -> String {
        format!("{}/{}", self.shared_path(), name)
    }

    /// Path of `relative` inside a release or the current link.
    pub fn within(base: &str, relative: &str) -> String {
        format!(
            "{}/{}",
            base.trim_end_matches('/'),
            relative.trim_start_matches("./").trim_start_matches('/')
        )
    }
}
