// ABOUTME: Source-control command builders for checkout and export.
// ABOUTME: Produces shell commands; nothing here touches a host directly.

mod directory;
mod git;

pub use directory::Directory;
pub use git::Git;

/// Name of the working copy directory inside the scm path.
pub const WORKING_COPY: &str = "repo";

/// Builds the commands that fetch a revision onto a host.
pub trait Source: Send + Sync + std::fmt::Debug {
    /// Command that brings the working copy under `scm_path` to `revision`.
    fn checkout(&self, revision: &str, scm_path: &str) -> String;

    /// Command that writes the tree of `revision` into `destination`.
    ///
    /// `scm_path` is set when a working copy was checked out first.
    fn export(&self, revision: &str, destination: &str, scm_path: Option<&str>) -> String;
}

pub(crate) fn working_copy(scm_path: &str) -> String {
    format!("{}/{}", scm_path.trim_end_matches('/'), WORKING_COPY)
}
