// ABOUTME: Git source: clone/fetch into the scm working copy, export with git archive.
// ABOUTME: `HEAD` (any case) means the remote's default branch.

use super::{Source, working_copy};
use crate::remote::shell::quote;

/// A git repository reachable from the target hosts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Git {
    repository: String,
}

impl Git {
    pub fn new(repository: impl Into<String>) -> Self {
        Self {
            repository: repository.into(),
        }
    }

    pub fn repository(&self) -> &str {
        &self.repository
    }

    /// Revision as understood by the remote side.
    fn remote_revision(revision: &str) -> &str {
        if revision.eq_ignore_ascii_case("head") {
            "HEAD"
        } else {
            revision
        }
    }
}

impl Source for Git {
    fn checkout(&self, revision: &str, scm_path: &str) -> String {
        let repo = quote(&working_copy(scm_path));
        let revision = Self::remote_revision(revision);
        let target = if revision == "HEAD" {
            "origin/HEAD".to_string()
        } else {
            format!("origin/{}", revision)
        };

        // Prefer the fetched remote-tracking ref; fall back to tags and SHAs
        format!(
            "{{ [ -d {repo}/.git ] || git clone -q {url} {repo}; }} && \
             git -C {repo} fetch -q --tags origin && \
             git -C {repo} checkout -q -f --detach \"$(git -C {repo} rev-parse -q --verify {target}^{{commit}} || echo {revision})\"",
            repo = repo,
            url = quote(&self.repository),
            target = quote(&target),
            revision = quote(revision),
        )
    }

    fn export(&self, revision: &str, destination: &str, scm_path: Option<&str>) -> String {
        let archive = match scm_path {
            Some(scm_path) => format!(
                "git -C {} archive --format=tar HEAD",
                quote(&working_copy(scm_path))
            ),
            None => format!(
                "git archive --format=tar --remote={} {}",
                quote(&self.repository),
                quote(Self::remote_revision(revision))
            ),
        };
        format!(
            "mkdir -p {dest} && {archive} | tar -x -f - -C {dest}",
            dest = quote(destination),
            archive = archive
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn checkout_clones_when_missing_and_detaches() {
        let git = Git::new("git@example.com:org/app.git");
        let cmd = git.checkout("main", "/srv/app/scm");
        assert!(cmd.contains("[ -d /srv/app/scm/repo/.git ] || git clone -q git@example.com:org/app.git /srv/app/scm/repo"));
        assert!(cmd.contains("fetch -q --tags origin"));
        assert!(cmd.contains("origin/main^{commit}"));
    }

    #[test]
    fn head_is_case_insensitive() {
        let git = Git::new("repo.git");
        assert!(git.checkout("head", "/s").contains("origin/HEAD^{commit}"));
        assert!(git.export("head", "/d", None).ends_with("--remote=repo.git HEAD | tar -x -f - -C /d"));
    }

    #[test]
    fn export_uses_working_copy_when_tracked() {
        let git = Git::new("repo.git");
        let cmd = git.export("v1.0", "/srv/app/releases/20240101000000", Some("/srv/app/scm"));
        assert_eq!(
            cmd,
            "mkdir -p /srv/app/releases/20240101000000 && git -C /srv/app/scm/repo archive --format=tar HEAD | tar -x -f - -C /srv/app/releases/20240101000000"
        );
    }
}
