// ABOUTME: Repoints the current link at a release and appends the revision log.
// ABOUTME: The log append is the last required step, so a logged line means a live release.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::remote::{RemoteExecutor, shell};
use crate::types::{ReleaseId, format_timestamp};

use super::batch::{self, CommandBatch};
use super::error::ReleaseError;
use super::settings::ReleaseSettings;
use super::state::{Linked, Live, Release};

/// One line of `revisions.log`: `<timestamp> <user> <revision> <release>`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RevisionLogEntry {
    pub timestamp: String,
    pub user: String,
    pub revision: String,
    pub release: ReleaseId,
}

impl RevisionLogEntry {
    /// Fields are space separated, so whitespace inside user or revision
    /// becomes `_`.
    pub fn new(at: DateTime<Utc>, user: &str, revision: &str, release: ReleaseId) -> Self {
        Self {
            timestamp: format_timestamp(at),
            user: sanitize(user),
            revision: sanitize(revision),
            release,
        }
    }

    /// Parse a log line. Returns `None` for lines that are not four fields
    /// ending in a release id.
    pub fn parse(line: &str) -> Option<Self> {
        let mut fields = line.split_whitespace();
        let timestamp = fields.next()?;
        let user = fields.next()?;
        let revision = fields.next()?;
        let release = ReleaseId::parse(fields.next()?).ok()?;
        if fields.next().is_some() {
            return None;
        }
        Some(Self {
            timestamp: timestamp.to_string(),
            user: user.to_string(),
            revision: revision.to_string(),
            release,
        })
    }
}

impl fmt::Display for RevisionLogEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} {} {}",
            self.timestamp, self.user, self.revision, self.release
        )
    }
}

fn sanitize(field: &str) -> String {
    let field: String = field
        .trim()
        .chars()
        .map(|c| if c.is_whitespace() { '_' } else { c })
        .collect();
    if field.is_empty() {
        "-".to_string()
    } else {
        field
    }
}

/// User recorded in the revision log.
pub fn acting_user() -> String {
    ["USER", "LOGNAME"]
        .iter()
        .filter_map(|var| std::env::var(var).ok())
        .find(|value| !value.trim().is_empty())
        .unwrap_or_else(|| "unknown".to_string())
}

/// Batch that repoints `current` and appends `entry` to the log.
pub fn finalize_batch(
    settings: &ReleaseSettings,
    release_path: &str,
    entry: &RevisionLogEntry,
) -> CommandBatch {
    let layout = &settings.layout;
    let current = layout.current_path();
    let log = layout.revision_log_path();

    let mut batch = CommandBatch::new();
    batch
        .required(format!("rm -f {}", shell::quote(&current)))
        .required(format!(
            "ln -s {} {}",
            shell::quote(release_path),
            shell::quote(&current)
        ));

    if let Some(chown) = settings.chown_command(false, std::slice::from_ref(&log)) {
        batch
            .required(format!("touch {}", shell::quote(&log)))
            .required(chown);
    }

    batch
        .required(format!(
            "printf '%s\\n' {} >> {}",
            shell::quote(&entry.to_string()),
            shell::quote(&log)
        ))
        .best_effort(format!(
            "rm -f {}",
            shell::quote(&layout.partial_marker_path(&entry.release))
        ));
    batch
}

/// Point `current` at the release and record it in the revision log.
///
/// # Errors
///
/// Returns `ReleaseError::Filesystem` if relinking or the log append fails.
#[must_use = "release state must be used"]
pub async fn finalize_current<R: RemoteExecutor + ?Sized>(
    exec: &R,
    settings: &ReleaseSettings,
    release: Release<Linked>,
    revision: &str,
    user: &str,
    at: DateTime<Utc>,
) -> Result<Release<Live>, ReleaseError> {
    let entry = RevisionLogEntry::new(at, user, revision, release.id.clone());
    let batch = finalize_batch(settings, &release.path, &entry);
    batch::dispatch(exec, &settings.role, &batch)
        .await
        .map_err(ReleaseError::filesystem("repoint current release"))?;

    tracing::info!(release = %release.id, revision, "release is live");
    Ok(release.transition())
}

impl Release<Linked> {
    /// Make this release the current one.
    #[must_use = "release state must be used"]
    pub async fn finalize<R: RemoteExecutor + ?Sized>(
        self,
        exec: &R,
        settings: &ReleaseSettings,
        revision: &str,
        user: &str,
        at: DateTime<Utc>,
    ) -> Result<Release<Live>, ReleaseError> {
        finalize_current(exec, settings, self, revision, user, at).await
    }
}
