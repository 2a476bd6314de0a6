// ABOUTME: Ad-hoc operations outside the release lifecycle: invoke and upload.
// ABOUTME: Upload targets the current release, so it needs a live deploy.

use std::path::{Path, PathBuf};

use walkdir::WalkDir;

use crate::remote::{FileSync, HostOutput, RemoteExecutor};

use super::error::ReleaseError;
use super::layout::Layout;
use super::settings::ReleaseSettings;

/// Run `command` on every host, or only on the hosts of `roles`.
///
/// # Errors
///
/// Returns `ReleaseError::NoCommand` for a blank command.
pub async fn invoke<R: RemoteExecutor + ?Sized>(
    exec: &R,
    roles: &[String],
    command: &str,
) -> Result<Vec<HostOutput>, ReleaseError> {
    let command = command.trim();
    if command.is_empty() {
        return Err(ReleaseError::NoCommand);
    }

    let hosts = if roles.is_empty() {
        exec.all_hosts()
    } else {
        let mut hosts: Vec<String> = Vec::new();
        for role in roles {
            for host in exec.hosts(role).map_err(ReleaseError::Remote)? {
                if !hosts.contains(&host) {
                    hosts.push(host);
                }
            }
        }
        hosts
    };

    tracing::info!(hosts = hosts.len(), "invoking: {}", command);
    exec.run_on_hosts(&hosts, command)
        .await
        .map_err(ReleaseError::Remote)
}

fn is_hidden(path: &Path) -> bool {
    path.file_name()
        .and_then(|name| name.to_str())
        .is_some_and(|name| name.starts_with('.') && name != "." && name != "..")
}

/// Expand `paths` into the files to upload.
///
/// Directories are walked recursively. Entries whose name starts with `.` are
/// skipped, and so is everything below them.
///
/// # Errors
///
/// Returns `ReleaseError::AbsoluteUpload` for an absolute path,
/// `ReleaseError::LocalFile` for an unreadable one and `ReleaseError::NoFiles`
/// when nothing is left.
pub fn collect_upload_files(paths: &[PathBuf]) -> Result<Vec<PathBuf>, ReleaseError> {
    let mut files = Vec::new();
    for path in paths {
        if path.is_absolute() {
            return Err(ReleaseError::AbsoluteUpload(path.clone()));
        }
        if is_hidden(path) {
            continue;
        }

        let walker = WalkDir::new(path)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|entry| entry.depth() == 0 || !is_hidden(entry.path()));
        for entry in walker {
            let entry = entry.map_err(|e| ReleaseError::LocalFile {
                path: path.clone(),
                reason: e.to_string(),
            })?;
            if entry.file_type().is_file() {
                files.push(entry.into_path());
            }
        }
    }

    if files.is_empty() {
        return Err(ReleaseError::NoFiles);
    }
    Ok(files)
}

/// Push local files into the current release on every host.
///
/// Returns the remote paths written on each host.
pub async fn upload<R: RemoteExecutor + FileSync + ?Sized>(
    exec: &R,
    settings: &ReleaseSettings,
    paths: &[PathBuf],
) -> Result<Vec<String>, ReleaseError> {
    let files = collect_upload_files(paths)?;
    let current = settings.layout.current_path();
    let targets: Vec<(PathBuf, String)> = files
        .into_iter()
        .map(|file| {
            let remote = Layout::within(&current, &file.to_string_lossy());
            (file, remote)
        })
        .collect();

    for host in exec.all_hosts() {
        for (file, remote) in &targets {
            exec.push(&host, file, remote)
                .await
                .map_err(ReleaseError::filesystem(format!("upload {}", file.display())))?;
            tracing::debug!(host = %host, "uploaded {}", remote);
        }
    }

    tracing::info!(files = targets.len(), "upload finished");
    Ok(targets.into_iter().map(|(_, remote)| remote).collect())
}
