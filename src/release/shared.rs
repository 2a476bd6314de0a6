// ABOUTME: Links persistent shared directories into a release.
// ABOUTME: Content lives once under shared/<name>; each release gets a symlink.

use crate::remote::{RemoteExecutor, shell};

use super::batch::{self, CommandBatch};
use super::error::ReleaseError;
use super::layout::Layout;
use super::settings::ReleaseSettings;
use super::state::{Linked, Populated, Release};

/// One `mkdir -p` and `ln -s` pair per shared path.
pub fn shared_link_batch(settings: &ReleaseSettings, release_path: &str) -> CommandBatch {
    let mut batch = CommandBatch::new();
    for (name, relative) in &settings.shared_paths {
        let link = Layout::within(release_path, relative);
        let target = settings.layout.shared_target(name);
        batch
            .required(format!("mkdir -p {}", shell::quote(shell::parent(&link))))
            .required(format!(
                "ln -s {} {}",
                shell::quote(&target),
                shell::quote(&link)
            ));
    }
    batch
}

/// Link every configured shared path into `release_path`.
///
/// An empty mapping dispatches nothing.
pub async fn link_shared_paths<R: RemoteExecutor + ?Sized>(
    exec: &R,
    settings: &ReleaseSettings,
    release_path: &str,
) -> Result<(), ReleaseError> {
    let batch = shared_link_batch(settings, release_path);
    if batch.is_empty() {
        tracing::debug!("no shared paths to link");
        return Ok(());
    }
    batch::dispatch(exec, &settings.role, &batch)
        .await
        .map_err(ReleaseError::filesystem("link shared paths"))?;
    Ok(())
}

impl Release<Populated> {
    /// Link the shared paths into this release.
    #[must_use = "release state must be used"]
    pub async fn link_shared<R: RemoteExecutor + ?Sized>(
        self,
        exec: &R,
        settings: &ReleaseSettings,
    ) -> Result<Release<Linked>, ReleaseError> {
        link_shared_paths(exec, settings, &self.path).await?;
        Ok(self.transition())
    }
}
