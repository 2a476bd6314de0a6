// ABOUTME: Cleanup command implementation.
// ABOUTME: Deletes releases beyond the retention count under the deploy lock.

use shipyard::config::Config;
use shipyard::diagnostics::Diagnostics;
use shipyard::error::{Error, Result};
use shipyard::lock::with_lock;
use shipyard::output::Output;
use shipyard::release::{CleanupReport, cleanup as clean_releases};
use shipyard::remote::{APP_ROLE, RecordingExecutor, RemoteExecutor};

use super::{connect, disconnect, emit_warnings, lock_options, print_recorded};
use crate::cli::Mutation;

pub async fn cleanup(
    config: Config,
    keep: Option<usize>,
    mutation: Mutation,
    mut output: Output,
) -> Result<()> {
    output.start_timer();
    let mut diag = Diagnostics::default();
    let settings = config.release_settings();
    let keep = keep.unwrap_or(settings.keep_releases);

    output.progress(&format!(
        "Cleaning up {}, keeping {} release(s)",
        config.application, keep
    ));

    let fleet = connect(&config, &output).await?;

    let result = if mutation.dry_run {
        let recorder = RecordingExecutor::new(&fleet);
        let result = clean_releases(&recorder, &settings, keep).await;
        print_recorded(&recorder, &output);
        result.map_err(Error::from)
    } else {
        match fleet.hosts(APP_ROLE) {
            Ok(hosts) => {
                let (fleet, settings) = (&fleet, &settings);
                with_lock(
                    fleet,
                    &hosts,
                    &settings.layout,
                    &config.application,
                    &lock_options(&config, mutation.force),
                    &mut diag,
                    || async move { Ok::<_, Error>(clean_releases(fleet, settings, keep).await?) },
                )
                .await
            }
            Err(e) => Err(e.into()),
        }
    };

    disconnect(fleet, &mut diag).await;
    emit_warnings(&output, &diag);

    for report in result? {
        output.record(&describe(&report), &report);
    }
    output.success("Cleanup complete!");
    Ok(())
}

fn describe(report: &CleanupReport) -> String {
    if report.removed.is_empty() {
        format!(
            "{}: nothing to clean ({} release(s) kept)",
            report.host, report.kept
        )
    } else {
        let removed: Vec<String> = report.removed.iter().map(ToString::to_string).collect();
        format!(
            "{}: removed {} ({} release(s) kept)",
            report.host,
            removed.join(", "),
            report.kept
        )
    }
}
