// ABOUTME: Update-then-commit sequence for a new release.
// ABOUTME: Any failure deletes the in-progress release and re-raises the original error.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};

use crate::remote::{RemoteExecutor, shell};
use crate::types::ReleaseId;

use super::batch::{self, CommandBatch};
use super::directory::create_release_directory;
use super::error::ReleaseError;
use super::layout::Layout;
use super::set::current_releases;
use super::settings::ReleaseSettings;
use super::state::{Created, Live, Populated, Release};

/// Batch that fills a created release with the revision's tree.
///
/// Every step is required: a failed export must not be followed by a commit.
pub fn update_batch(settings: &ReleaseSettings, release_path: &str, revision: &str) -> CommandBatch {
    let layout = &settings.layout;
    let quoted_release = shell::quote(release_path);
    let mut batch = CommandBatch::new();

    batch.required(settings.umask_command());
    let scm_path = if settings.track_scm {
        let scm_path = layout.scm_path();
        batch.required(settings.source.checkout(revision, &scm_path));
        Some(scm_path)
    } else {
        None
    };
    batch
        .required(
            settings
                .source
                .export(revision, release_path, scm_path.as_deref()),
        )
        .required(format!("chmod -R g+w {}", quoted_release));

    let shared: Vec<String> = settings
        .shared_paths
        .values()
        .map(|relative| Layout::within(release_path, relative))
        .collect();
    if !shared.is_empty() {
        batch.required(format!("rm -rf {}", shell::quote_all(&shared)));
    }

    let extra: Vec<String> = settings
        .mkdirs
        .iter()
        .map(|relative| Layout::within(release_path, relative))
        .collect();
    if !extra.is_empty() {
        batch.required(format!("mkdir -p {}", shell::quote_all(&extra)));
    }

    if let Some(chown) = settings.chown_command(true, &[release_path.to_string()]) {
        batch.required(chown);
    }
    batch
}

impl Release<Created> {
    /// Export the revision into this release and fix permissions.
    #[must_use = "release state must be used"]
    pub async fn populate<R: RemoteExecutor + ?Sized>(
        self,
        exec: &R,
        settings: &ReleaseSettings,
        revision: &str,
    ) -> Result<Release<Populated>, ReleaseError> {
        let batch = update_batch(settings, &self.path, revision);
        batch::dispatch(exec, &settings.role, &batch)
            .await
            .map_err(ReleaseError::Remote)?;
        Ok(self.transition())
    }
}

/// Batch that removes an in-progress release from one host.
///
/// If that leaves `current` missing or dangling, it is pointed back at
/// `previous`, the release it named before the update, or removed when there
/// was none.
pub fn discard_batch(
    settings: &ReleaseSettings,
    id: &ReleaseId,
    previous: Option<&ReleaseId>,
) -> CommandBatch {
    let layout = &settings.layout;
    let current = shell::quote(&layout.current_path());
    let restore = match previous {
        Some(previous) => format!(
            "rm -f {current}; ln -s {target} {current}",
            current = current,
            target = shell::quote(&layout.release_path(previous))
        ),
        None => format!("rm -f {}", current),
    };

    let mut batch = CommandBatch::new();
    batch
        .required(format!(
            "rm -rf {} {}",
            shell::quote(&layout.release_path(id)),
            shell::quote(&layout.partial_marker_path(id))
        ))
        .best_effort(format!(
            "if [ ! -e {current} ]; then {restore}; fi",
            current = current,
            restore = restore
        ));
    batch
}

/// Remove the release `id` from every host of the role.
///
/// `previous` maps each host to the release `current` named before the
/// update. Every host is attempted; the first failure is returned.
pub async fn discard<R: RemoteExecutor + ?Sized>(
    exec: &R,
    settings: &ReleaseSettings,
    id: &ReleaseId,
    previous: &BTreeMap<String, Option<ReleaseId>>,
) -> Result<(), ReleaseError> {
    let hosts = exec.hosts(&settings.role).map_err(ReleaseError::Remote)?;
    let mut first_error = None;

    for host in hosts {
        let restore = previous.get(&host).and_then(Option::as_ref);
        let batch = discard_batch(settings, id, restore);
        tracing::debug!(host = %host, steps = batch.len(), "dispatching batch");
        if let Err(e) = exec.run_on_host(&host, &batch.render()).await {
            tracing::warn!(host = %host, release = %id, "discard failed: {}", e);
            first_error.get_or_insert(ReleaseError::filesystem("discard release")(e));
        }
    }

    match first_error {
        Some(e) => Err(e),
        None => {
            tracing::info!(release = %id, "discarded release");
            Ok(())
        }
    }
}

async fn commit<R: RemoteExecutor + ?Sized>(
    exec: &R,
    settings: &ReleaseSettings,
    id: ReleaseId,
    revision: &str,
    user: &str,
    at: DateTime<Utc>,
) -> Result<Release<Live>, ReleaseError> {
    create_release_directory(exec, settings, id)
        .await?
        .populate(exec, settings, revision)
        .await?
        .link_shared(exec, settings)
        .await?
        .finalize(exec, settings, revision, user, at)
        .await
}

/// Deploy `revision` as a new release and make it current.
///
/// `now` is the single clock sample for this update; it names the release and
/// stamps the revision log.
///
/// # Errors
///
/// Returns the first error of the chain. Before returning, the new release is
/// deleted again and `current` is restored to what it named before; a failure
/// of that cleanup is logged and does not replace the original error. When the
/// release id is already taken, `ReleaseError::ReleaseExists` is returned and
/// nothing is removed.
pub async fn update<R: RemoteExecutor + ?Sized>(
    exec: &R,
    settings: &ReleaseSettings,
    revision: &str,
    user: &str,
    now: DateTime<Utc>,
) -> Result<Release<Live>, ReleaseError> {
    let id = ReleaseId::from_timestamp(now);
    tracing::info!(release = %id, revision, "updating");

    let previous = current_releases(exec, &settings.role, &settings.layout)
        .await
        .map_err(ReleaseError::Remote)?;

    match commit(exec, settings, id.clone(), revision, user, now).await {
        Ok(release) => Ok(release),
        // The existing release belongs to an earlier update
        Err(e @ ReleaseError::ReleaseExists { .. }) => {
            tracing::warn!(release = %id, "{}", e);
            Err(e)
        }
        Err(e) => {
            tracing::warn!(release = %id, "update failed, removing release: {}", e);
            if let Err(cleanup) = discard(exec, settings, &id, &previous).await {
                tracing::error!(
                    release = %id,
                    "could not remove failed release, it may remain on disk: {}",
                    cleanup
                );
            }
            Err(e)
        }
    }
}
