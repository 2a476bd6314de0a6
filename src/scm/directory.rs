// ABOUTME: Directory source: deploys a directory that already exists on the target host.
// ABOUTME: Useful for prebuilt artifacts; the revision is only recorded, never resolved.

use super::{Source, working_copy};
use crate::remote::shell::quote;

/// A directory on each target host used as the source tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Directory {
    path: String,
}

impl Directory {
    pub fn new(path: impl Into<String>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &str {
        &self.path
    }
}

impl Source for Directory {
    fn checkout(&self, _revision: &str, scm_path: &str) -> String {
        let repo = quote(&working_copy(scm_path));
        format!(
            "rm -rf {repo} && mkdir -p {repo} && cp -R {src}/. {repo}/",
            repo = repo,
            src = quote(&self.path)
        )
    }

    fn export(&self, _revision: &str, destination: &str, scm_path: Option<&str>) -> String {
        let from = match scm_path {
            Some(scm_path) => working_copy(scm_path),
            None => self.path.clone(),
        };
        format!(
            "mkdir -p {dest} && cp -R {src}/. {dest}/",
            dest = quote(destination),
            src = quote(&from)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn export_copies_from_source_without_working_copy() {
        let copy = Directory::new("/opt/build");
        assert_eq!(
            copy.export("r1", "/srv/a/releases/1", None),
            "mkdir -p /srv/a/releases/1 && cp -R /opt/build/. /srv/a/releases/1/"
        );
    }

    #[test]
    fn checkout_refreshes_working_copy() {
        let copy = Directory::new("/opt/build");
        assert_eq!(
            copy.checkout("r1", "/srv/a/scm"),
            "rm -rf /srv/a/scm/repo && mkdir -p /srv/a/scm/repo && cp -R /opt/build/. /srv/a/scm/repo/"
        );
    }
}
