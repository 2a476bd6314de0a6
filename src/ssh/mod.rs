// ABOUTME: SSH transport to deploy hosts built on russh.
// ABOUTME: Exposes sessions that run shell commands with known_hosts checks and agent or key auth.

mod credential;
mod error;
mod host_key;
mod session;

pub use error::{Error, Result};
pub use host_key::HostKeyPolicy;
pub use session::{CommandOutput, Session, SessionConfig};
