// ABOUTME: Deploy command implementation.
// ABOUTME: Runs hooks and the locked update of every app server.

use std::env;

use chrono::Utc;
use shipyard::config::{Config, ServerConfig};
use shipyard::diagnostics::{Diagnostics, Warning};
use shipyard::error::{Error, Result};
use shipyard::hooks::{HookContext, HookPoint, HookRunner};
use shipyard::lock::with_lock;
use shipyard::output::Output;
use shipyard::release::{acting_user, update};
use shipyard::remote::{APP_ROLE, RecordingExecutor, RemoteExecutor};

use super::{connect, disconnect, emit_warnings, lock_options, print_recorded};
use crate::cli::Mutation;

/// Deploy `revision` (or the configured one) to all app servers.
pub async fn deploy(
    config: Config,
    destination: Option<String>,
    revision: Option<String>,
    mutation: Mutation,
    mut output: Output,
) -> Result<()> {
    output.start_timer();
    let cwd = env::current_dir()?;
    let hook_runner = HookRunner::new(&cwd);
    let mut diag = Diagnostics::default();

    let revision = revision.unwrap_or_else(|| config.revision.clone());
    let settings = config.release_settings();
    let user = acting_user();

    let mut context = HookContext::new(config.application.clone(), &config.deploy_to);
    context.destination = destination;
    context.revision = Some(revision.clone());
    context.hosts = config.app_servers().map(ServerConfig::name).collect();

    output.progress(&format!(
        "Deploying {} ({}) to {} server(s)",
        config.application,
        revision,
        context.hosts.len()
    ));

    if !mutation.dry_run
        && let Some(result) = hook_runner.run(HookPoint::PreDeploy, &context).await
        && !result.success
    {
        if !result.stderr.is_empty() {
            output.warning(result.stderr.trim());
        }
        return Err(Error::Hook("pre-deploy hook failed".to_string()));
    }

    let fleet = connect(&config, &output).await?;

    let result = if mutation.dry_run {
        let recorder = RecordingExecutor::new(&fleet);
        let result = update(&recorder, &settings, &revision, &user, Utc::now()).await;
        print_recorded(&recorder, &output);
        result.map_err(Error::from)
    } else {
        match fleet.hosts(APP_ROLE) {
            Ok(hosts) => {
                output.progress("  → Acquiring deploy lock...");
                let (fleet, settings, revision, user, output) =
                    (&fleet, &settings, revision.as_str(), user.as_str(), &output);
                with_lock(
                    fleet,
                    &hosts,
                    &settings.layout,
                    &config.application,
                    &lock_options(&config, mutation.force),
                    &mut diag,
                    || async move {
                        output.progress("  → Creating release and linking current...");
                        Ok::<_, Error>(update(fleet, settings, revision, user, Utc::now()).await?)
                    },
                )
                .await
            }
            Err(e) => Err(e.into()),
        }
    };

    disconnect(fleet, &mut diag).await;

    match result {
        Ok(release) => {
            if !mutation.dry_run {
                context.release = Some(release.id().clone());
                run_soft_hook(&hook_runner, HookPoint::PostDeploy, &context, &mut diag).await;
            }
            emit_warnings(&output, &diag);
            output.success(&format!("Deployed release {}", release.id()));
            Ok(())
        }
        Err(e) => {
            if !mutation.dry_run {
                context.error = Some(e.to_string());
                run_soft_hook(&hook_runner, HookPoint::OnError, &context, &mut diag).await;
            }
            emit_warnings(&output, &diag);
            Err(e)
        }
    }
}

/// Run a hook whose failure is only a warning.
pub(super) async fn run_soft_hook(
    runner: &HookRunner,
    point: HookPoint,
    context: &HookContext,
    diag: &mut Diagnostics,
) {
    if let Some(result) = runner.run(point, context).await
        && !result.success
    {
        diag.warn(Warning::hook(format!(
            "{} hook failed with exit code {:?}",
            point.filename(),
            result.exit_code
        )));
    }
}
