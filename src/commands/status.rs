// ABOUTME: Status command implementation.
// ABOUTME: Lists releases per server and marks the current one.

use std::fmt::Write;

use shipyard::config::Config;
use shipyard::diagnostics::Diagnostics;
use shipyard::error::Result;
use shipyard::output::Output;
use shipyard::release::{HostStatus, status as host_status};

use super::{connect, disconnect, emit_warnings};

pub async fn status(config: Config, output: Output) -> Result<()> {
    let mut diag = Diagnostics::default();
    let settings = config.release_settings();

    let fleet = connect(&config, &output).await?;
    let result = host_status(&fleet, &settings).await;
    disconnect(fleet, &mut diag).await;
    emit_warnings(&output, &diag);

    for host in result? {
        output.record(&describe(&host), &host);
    }
    Ok(())
}

fn describe(status: &HostStatus) -> String {
    let mut text = format!("{}:", status.host);
    if status.releases.is_empty() {
        text.push_str(" no releases");
    }
    for id in &status.releases {
        let marker = if status.current.as_ref() == Some(id) {
            "*"
        } else if status.partial.contains(id) {
            "!"
        } else {
            " "
        };
        let _ = write!(text, "\n  {} {}", marker, id);
    }
    if let Some(entry) = &status.last_deploy {
        let _ = write!(
            text,
            "\n  last deploy: {} by {} at {}",
            entry.revision, entry.user, entry.timestamp
        );
    }
    text
}
