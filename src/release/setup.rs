// ABOUTME: Prepares deploy targets: base directories and shared directories.
// ABOUTME: Safe to run repeatedly; existing directories are left as they are.

use crate::remote::{RemoteExecutor, shell};

use super::batch::{self, CommandBatch};
use super::directory::base_directories;
use super::error::ReleaseError;
use super::settings::ReleaseSettings;

pub fn setup_batch(settings: &ReleaseSettings) -> CommandBatch {
    let mut dirs = base_directories(settings);
    dirs.extend(
        settings
            .shared_paths
            .keys()
            .map(|name| settings.layout.shared_target(name)),
    );

    let mut batch = CommandBatch::new();
    batch
        .required(settings.umask_command())
        .required(format!("mkdir -p {}", shell::quote_all(&dirs)));
    if let Some(chown) = settings.chown_command(false, &dirs) {
        batch.required(chown);
    }
    batch
}

/// Create the deploy layout on every host of the role.
pub async fn setup<R: RemoteExecutor + ?Sized>(
    exec: &R,
    settings: &ReleaseSettings,
) -> Result<(), ReleaseError> {
    batch::dispatch(exec, &settings.role, &setup_batch(settings))
        .await
        .map_err(ReleaseError::filesystem("set up deploy directories"))?;
    tracing::info!(deploy_to = settings.layout.deploy_to(), "deploy directories ready");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::release::Layout;
    use crate::scm::Git;
    use std::sync::Arc;

    #[test]
    fn creates_shared_directories() {
        let mut settings =
            ReleaseSettings::new(Layout::new("/srv/app"), Arc::new(Git::new("unused")));
        settings.track_scm = false;
        settings
            .shared_paths
            .insert("log".to_string(), "log".to_string());
        settings.owner = Some("deploy".to_string());
        settings.group = Some("www".to_string());

        assert_eq!(
            setup_batch(&settings).render(),
            "umask 02 && \
             mkdir -p /srv/app /srv/app/releases /srv/app/shared /srv/app/shared/log && \
             chown deploy:www /srv/app /srv/app/releases /srv/app/shared /srv/app/shared/log"
        );
    }
}
