// ABOUTME: Upload command implementation.
// ABOUTME: Pushes local files into the current release on every server.

use std::path::PathBuf;

use shipyard::config::Config;
use shipyard::diagnostics::Diagnostics;
use shipyard::error::Result;
use shipyard::output::Output;
use shipyard::release::{collect_upload_files, upload as upload_files};

use super::{connect, disconnect, emit_warnings};

pub async fn upload(config: Config, files: Vec<PathBuf>, mut output: Output) -> Result<()> {
    // Fail on bad paths before connecting
    collect_upload_files(&files)?;

    output.start_timer();
    let mut diag = Diagnostics::default();
    let settings = config.release_settings();

    let fleet = connect(&config, &output).await?;
    let result = upload_files(&fleet, &settings, &files).await;
    disconnect(fleet, &mut diag).await;
    emit_warnings(&output, &diag);

    for remote in result? {
        output.progress(&format!("  → {}", remote));
    }
    output.success("Upload complete!");
    Ok(())
}
