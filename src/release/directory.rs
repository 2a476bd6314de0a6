// ABOUTME: Creates the on-disk layout for a new release.
// ABOUTME: Refuses an id that is already on disk, then writes the marker before the directory.

use crate::remote::{RemoteExecutor, shell};
use crate::types::ReleaseId;

use super::batch::{self, CommandBatch};
use super::error::ReleaseError;
use super::settings::ReleaseSettings;
use super::state::{Created, Release};

/// Exit status of the directory batch when the release id is already taken.
pub const RELEASE_EXISTS_STATUS: u32 = 17;

/// Directories every deploy target needs before a release can be created.
pub(crate) fn base_directories(settings: &ReleaseSettings) -> Vec<String> {
    let layout = &settings.layout;
    let mut dirs = vec![
        layout.deploy_to().to_string(),
        layout.releases_path(),
        layout.shared_path(),
    ];
    if settings.track_scm {
        dirs.push(layout.scm_path());
    }
    dirs
}

/// Batch that creates the base layout, the marker and the release directory.
///
/// Exits with [`RELEASE_EXISTS_STATUS`] before touching anything inside
/// `releases/` when `releases/<id>` already exists. The release directory is
/// created without `-p` so a racing creator fails too.
pub fn directory_batch(settings: &ReleaseSettings, id: &ReleaseId) -> CommandBatch {
    let layout = &settings.layout;
    let release_path = layout.release_path(id);
    let marker = layout.partial_marker_path(id);
    let quoted_release = shell::quote(&release_path);

    let mut batch = CommandBatch::new();
    batch
        .required(settings.umask_command())
        .required(format!(
            "mkdir -p {}",
            shell::quote_all(base_directories(settings))
        ))
        .required(format!(
            "if [ -e {} ]; then exit {}; fi",
            quoted_release, RELEASE_EXISTS_STATUS
        ))
        .required(format!("touch {}", shell::quote(&marker)))
        .required(format!("mkdir {}", quoted_release));

    if let Some(chown) = settings.chown_command(false, &[release_path, marker]) {
        batch.required(chown);
    }
    batch
}

/// Create `releases/<id>` on every host of the role.
///
/// # Errors
///
/// Returns `ReleaseError::ReleaseExists` if a host already has a release with
/// this id, and `ReleaseError::Filesystem` if any host fails to create the paths.
pub async fn create_release_directory<R: RemoteExecutor + ?Sized>(
    exec: &R,
    settings: &ReleaseSettings,
    id: ReleaseId,
) -> Result<Release<Created>, ReleaseError> {
    let batch = directory_batch(settings, &id);
    batch::dispatch(exec, &settings.role, &batch)
        .await
        .map_err(|e| match (e.exit_code(), e.host()) {
            (Some(RELEASE_EXISTS_STATUS), Some(host)) => ReleaseError::ReleaseExists {
                host: host.to_string(),
                release: id.clone(),
            },
            _ => ReleaseError::filesystem("create release directory")(e),
        })?;

    tracing::info!(release = %id, "created release directory");
    Ok(Release::new(&settings.layout, id))
}
