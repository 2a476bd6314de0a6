// ABOUTME: Remote execution error types with SNAFU pattern.
// ABOUTME: Separates transport failures from commands that exited non-zero.

use snafu::Snafu;

/// Failure to run a command on a host.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum RemoteError {
    #[snafu(display("no hosts are assigned to role '{role}'"))]
    UnknownRole { role: String },

    #[snafu(display("unknown host: {host}"))]
    UnknownHost { host: String },

    #[snafu(display("{host}: {source}"))]
    Transport {
        host: String,
        source: crate::ssh::Error,
    },

    #[snafu(display("{host}: command exited with status {exit_code}: {stderr}"))]
    NonZeroExit {
        host: String,
        exit_code: u32,
        stderr: String,
    },

    #[snafu(display("{host}: failed to spawn local shell: {source}"))]
    Local {
        host: String,
        source: std::io::Error,
    },

    #[snafu(display("{host}: failed to push {path}: {source}"))]
    Push {
        host: String,
        path: String,
        source: std::io::Error,
    },
}

impl RemoteError {
    /// Host the failure happened on, when there is one.
    pub fn host(&self) -> Option<&str> {
        match self {
            RemoteError::UnknownRole { .. } => None,
            RemoteError::UnknownHost { host }
            | RemoteError::Transport { host, .. }
            | RemoteError::NonZeroExit { host, .. }
            | RemoteError::Local { host, .. }
            | RemoteError::Push { host, .. } => Some(host),
        }
    }

    /// Exit status of the failed command, if it ran to completion.
    pub fn exit_code(&self) -> Option<u32> {
        match self {
            RemoteError::NonZeroExit { exit_code, .. } => Some(*exit_code),
            _ => None,
        }
    }
}
