// ABOUTME: Rollback command implementation.
// ABOUTME: Points current at the previous release on every app server.

use std::env;

use shipyard::config::{Config, ServerConfig};
use shipyard::diagnostics::Diagnostics;
use shipyard::error::{Error, Result};
use shipyard::hooks::{HookContext, HookPoint, HookRunner};
use shipyard::lock::with_lock;
use shipyard::output::Output;
use shipyard::release::rollback_to_previous;
use shipyard::remote::{APP_ROLE, RecordingExecutor, RemoteExecutor};

use super::deploy::run_soft_hook;
use super::{connect, disconnect, emit_warnings, lock_options, print_recorded};
use crate::cli::Mutation;

/// Roll back to the previous release on all app servers.
pub async fn rollback(
    config: Config,
    destination: Option<String>,
    mutation: Mutation,
    mut output: Output,
) -> Result<()> {
    output.start_timer();
    let mut diag = Diagnostics::default();
    let settings = config.release_settings();

    output.progress(&format!(
        "Rolling back {} on {} server(s)",
        config.application,
        config.app_servers().count()
    ));

    let fleet = connect(&config, &output).await?;

    let result = if mutation.dry_run {
        let recorder = RecordingExecutor::new(&fleet);
        let result = rollback_to_previous(&recorder, &settings).await;
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
                    || async move { Ok::<_, Error>(rollback_to_previous(fleet, settings).await?) },
                )
                .await
            }
            Err(e) => Err(e.into()),
        }
    };

    disconnect(fleet, &mut diag).await;
    let outcomes = match result {
        Ok(outcomes) => outcomes,
        Err(e) => {
            emit_warnings(&output, &diag);
            return Err(e);
        }
    };

    for outcome in &outcomes {
        output.record(
            &format!(
                "{}: current -> {} (removed {})",
                outcome.host, outcome.restored, outcome.removed
            ),
            outcome,
        );
    }

    if !mutation.dry_run && let Some(first) = outcomes.first() {
        let mut context = HookContext::new(config.application.clone(), &config.deploy_to);
        context.destination = destination;
        context.hosts = config.app_servers().map(ServerConfig::name).collect();
        context.release = Some(first.restored.clone());
        context.previous_release = Some(first.removed.clone());
        let runner = HookRunner::new(&env::current_dir()?);
        run_soft_hook(&runner, HookPoint::PostRollback, &context, &mut diag).await;
    }

    emit_warnings(&output, &diag);
    output.success("Rollback complete!");
    Ok(())
}
