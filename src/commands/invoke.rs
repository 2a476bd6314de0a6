// ABOUTME: Invoke command implementation.
// ABOUTME: Runs one ad-hoc shell command on every server or on selected roles.

use serde::Serialize;
use shipyard::config::Config;
use shipyard::diagnostics::Diagnostics;
use shipyard::error::Result;
use shipyard::output::Output;
use shipyard::release::{ReleaseError, invoke as invoke_command};

use super::{connect, disconnect, emit_warnings};

#[derive(Serialize)]
struct InvokeRecord<'a> {
    host: &'a str,
    exit_code: u32,
    stdout: &'a str,
    stderr: &'a str,
}

pub async fn invoke(
    config: Config,
    roles: Vec<String>,
    command: Vec<String>,
    output: Output,
) -> Result<()> {
    let mut diag = Diagnostics::default();
    let command = command.join(" ");
    if command.trim().is_empty() {
        return Err(ReleaseError::NoCommand.into());
    }

    let fleet = connect(&config, &output).await?;
    let result = invoke_command(&fleet, &roles, &command).await;
    disconnect(fleet, &mut diag).await;
    emit_warnings(&output, &diag);

    for host in result? {
        let text = format!("[{}]\n{}", host.host, host.output.stdout.trim_end());
        output.record(
            &text,
            &InvokeRecord {
                host: &host.host,
                exit_code: host.output.exit_code,
                stdout: &host.output.stdout,
                stderr: &host.output.stderr,
            },
        );
    }
    Ok(())
}
