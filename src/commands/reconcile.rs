// ABOUTME: Reconcile command implementation.
// ABOUTME: Removes partial releases left by interrupted deploys.

use shipyard::config::Config;
use shipyard::diagnostics::Diagnostics;
use shipyard::error::{Error, Result};
use shipyard::lock::with_lock;
use shipyard::output::Output;
use shipyard::release::reconcile as reconcile_releases;
use shipyard::remote::{APP_ROLE, RemoteExecutor};

use super::{connect, disconnect, emit_warnings, lock_options};

pub async fn reconcile(config: Config, force: bool, mut output: Output) -> Result<()> {
    output.start_timer();
    let mut diag = Diagnostics::default();
    let settings = config.release_settings();

    let fleet = connect(&config, &output).await?;
    let result = match fleet.hosts(APP_ROLE) {
        Ok(hosts) => {
            let (fleet, settings) = (&fleet, &settings);
            with_lock(
                fleet,
                &hosts,
                &settings.layout,
                &config.application,
                &lock_options(&config, force),
                &mut diag,
                || async move { Ok::<_, Error>(reconcile_releases(fleet, settings).await?) },
            )
            .await
        }
        Err(e) => Err(e.into()),
    };

    disconnect(fleet, &mut diag).await;
    emit_warnings(&output, &diag);

    for report in result? {
        let removed: Vec<String> = report.removed.iter().map(ToString::to_string).collect();
        let text = if removed.is_empty() {
            format!("{}: no partial releases", report.host)
        } else {
            format!("{}: removed {}", report.host, removed.join(", "))
        };
        output.record(&text, &report);
    }
    output.success("Reconcile complete!");
    Ok(())
}
