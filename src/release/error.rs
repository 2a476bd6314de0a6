// ABOUTME: Error types for release lifecycle operations.
// ABOUTME: Classifies failures as precondition, remote execution, or filesystem errors.

use std::path::PathBuf;

use crate::remote::RemoteError;
use crate::types::ReleaseId;

/// Errors raised by release lifecycle operations.
#[derive(Debug, thiserror::Error)]
pub enum ReleaseError {
    /// Rollback needs at least two releases on every host.
    #[error("could not roll back on {host}: no prior release ({found} release(s) on disk)")]
    NoPriorRelease { host: String, found: usize },

    /// An update in the same second as an earlier one would reuse its id.
    #[error("release {release} already exists on {host}")]
    ReleaseExists { host: String, release: ReleaseId },

    /// Ad-hoc invocation without a command.
    #[error("no command given: specify the command to run on the remote hosts")]
    NoCommand,

    /// Upload without any eligible file.
    #[error("no files given: specify at least one file to upload")]
    NoFiles,

    /// Upload paths are joined onto the current release, so they must be relative.
    #[error("upload path must be relative: {0}")]
    AbsoluteUpload(PathBuf),

    /// A dispatched command batch failed.
    #[error("remote command failed: {0}")]
    Remote(#[source] RemoteError),

    /// A create, symlink or remove step failed.
    #[error("failed to {operation}: {source}")]
    Filesystem {
        operation: String,
        #[source]
        source: RemoteError,
    },

    /// A local file could not be read.
    #[error("failed to read {path}: {reason}")]
    LocalFile { path: PathBuf, reason: String },
}

/// Error category for programmatic handling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReleaseErrorKind {
    /// Operation invoked in an invalid state; nothing was changed.
    Precondition,
    /// A remote command batch exited non-zero or could not be run.
    RemoteExecution,
    /// Creating, linking or removing a path failed.
    Filesystem,
}

impl ReleaseError {
    /// Returns the error kind for programmatic handling.
    pub fn kind(&self) -> ReleaseErrorKind {
        match self {
            ReleaseError::NoPriorRelease { .. }
            | ReleaseError::ReleaseExists { .. }
            | ReleaseError::NoCommand
            | ReleaseError::NoFiles
            | ReleaseError::AbsoluteUpload(_) => ReleaseErrorKind::Precondition,
            ReleaseError::Remote(_) => ReleaseErrorKind::RemoteExecution,
            ReleaseError::Filesystem { .. } | ReleaseError::LocalFile { .. } => {
                ReleaseErrorKind::Filesystem
            }
        }
    }

    /// Map a remote failure during a filesystem step.
    pub(crate) fn filesystem(operation: impl Into<String>) -> impl FnOnce(RemoteError) -> Self {
        let operation = operation.into();
        move |source| ReleaseError::Filesystem { operation, source }
    }

    /// The underlying remote failure, if any.
    pub fn remote_source(&self) -> Option<&RemoteError> {
        match self {
            ReleaseError::Remote(source) | ReleaseError::Filesystem { source, .. } => Some(source),
            _ => None,
        }
    }
}
