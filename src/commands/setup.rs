// ABOUTME: Setup command implementation.
// ABOUTME: Creates the deploy directory layout on every app server.

use shipyard::config::Config;
use shipyard::diagnostics::Diagnostics;
use shipyard::error::Result;
use shipyard::output::Output;
use shipyard::release::setup as setup_layout;

use super::{connect, disconnect, emit_warnings};

pub async fn setup(config: Config, mut output: Output) -> Result<()> {
    output.start_timer();
    let mut diag = Diagnostics::default();
    let settings = config.release_settings();

    output.progress(&format!(
        "Setting up {} in {}",
        config.application, config.deploy_to
    ));

    let fleet = connect(&config, &output).await?;
    let result = setup_layout(&fleet, &settings).await;
    disconnect(fleet, &mut diag).await;
    emit_warnings(&output, &diag);

    result?;
    output.success("Setup complete!");
    Ok(())
}
