// ABOUTME: Remote execution capability used by the release lifecycle.
// ABOUTME: Role-aware executors over SSH, the local shell, and a dry-run recorder.

mod error;
mod executor;
mod fleet;
mod local;
mod recording;
pub mod shell;

pub use error::{
    LocalSnafu, NonZeroExitSnafu, PushSnafu, RemoteError, TransportSnafu, UnknownHostSnafu,
    UnknownRoleSnafu,
};
pub use executor::{FileSync, HostOutput, RemoteExecutor};
pub use fleet::Fleet;
pub use local::LocalExecutor;
pub use recording::{RecordedCommand, RecordingExecutor};

pub use crate::ssh::CommandOutput;

/// Role that receives release updates when a server lists no roles.
pub const APP_ROLE: &str = "app";
