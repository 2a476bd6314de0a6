// ABOUTME: Failures raised while talking to a single host over SSH.
// ABOUTME: Separates connect, credential, host-key and per-command channel errors.

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("cannot reach {host}:{port}: {reason}")]
    Unreachable {
        host: String,
        port: u16,
        reason: String,
    },

    #[error("host key for {host}:{port} was rejected")]
    HostKeyRejected { host: String, port: u16 },

    #[error("{user}@{host} was not accepted by any offered key")]
    NotAuthorized { user: String, host: String },

    #[error("no usable credentials: {0}")]
    NoCredentials(String),

    #[error("cannot load key {path}: {reason}")]
    BadKey { path: PathBuf, reason: String },

    #[error("channel {stage} failed: {reason}")]
    Channel { stage: &'static str, reason: String },

    #[error("command did not finish within {0:?}")]
    Timeout(Duration),

    #[error("channel closed before reporting an exit status")]
    NoExitStatus,

    #[error("upload to {path} failed: {reason}")]
    UploadFailed { path: String, reason: String },

    #[error(transparent)]
    Protocol(#[from] russh::Error),
}

impl Error {
    pub(crate) fn channel(stage: &'static str) -> impl FnOnce(russh::Error) -> Self {
        move |e| Error::Channel {
            stage,
            reason: e.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
