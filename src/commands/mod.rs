// ABOUTME: Command module aggregator for the shipyard CLI.
// ABOUTME: Shared helpers for loading config, connecting and reporting warnings.

mod cleanup;
mod config;
mod deploy;
mod invoke;
mod reconcile;
mod rollback;
mod setup;
mod status;
mod upload;

pub use cleanup::cleanup;
pub use config::show_config;
pub use deploy::deploy;
pub use invoke::invoke;
pub use reconcile::reconcile;
pub use rollback::rollback;
pub use setup::setup;
pub use status::status;
pub use upload::upload;

use std::env;

use shipyard::config::Config;
use shipyard::diagnostics::{Diagnostics, Warning};
use shipyard::error::Result;
use shipyard::lock::LockOptions;
use shipyard::output::Output;
use shipyard::remote::{Fleet, RecordingExecutor, RemoteExecutor};

use crate::cli::Target;

/// Discover the config in the working directory and apply the destination.
pub fn load_config(target: &Target) -> Result<Config> {
    let cwd = env::current_dir()?;
    let config = Config::discover(&cwd)?;
    match &target.destination {
        Some(dest) => config.for_destination(dest),
        None => Ok(config),
    }
}

/// Open one SSH session per configured server.
async fn connect(config: &Config, output: &Output) -> Result<Fleet> {
    output.progress(&format!(
        "  → Connecting to {} server(s)...",
        config.servers.len()
    ));
    Ok(Fleet::connect(config.servers.iter(), config.command_timeout).await?)
}

/// Close every session. Failures are non-fatal.
async fn disconnect(fleet: Fleet, diag: &mut Diagnostics) {
    for (host, e) in fleet.disconnect().await {
        diag.warn(Warning::ssh_disconnect(format!(
            "SSH disconnect failed for {}: {}",
            host, e
        )));
    }
}

fn lock_options(config: &Config, force: bool) -> LockOptions {
    LockOptions {
        force,
        stale_after: config.lock_timeout,
    }
}

fn emit_warnings(output: &Output, diag: &Diagnostics) {
    for warning in diag.warnings() {
        output.warning(&warning.message);
    }
}

/// Print what a dry run would have executed.
fn print_recorded<E: RemoteExecutor + ?Sized>(recorder: &RecordingExecutor<'_, E>, output: &Output) {
    for command in recorder.commands() {
        output.record(&format!("[{}] {}", command.host, command.command), &command);
    }
}
