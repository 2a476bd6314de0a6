// ABOUTME: Entry point for the shipyard CLI application.
// ABOUTME: Parses arguments and dispatches to appropriate command handlers.

mod cli;
mod commands;

use clap::Parser;
use cli::{Cli, Commands};
use shipyard::config;
use shipyard::error::Result;
use shipyard::output::{Output, OutputMode};
use std::env;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    // RUST_LOG wins over the verbose flag
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        if cli.verbose {
            EnvFilter::new("debug")
        } else {
            EnvFilter::new("warn")
        }
    });
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .init();

    let mode = if cli.json {
        OutputMode::Json
    } else if cli.quiet {
        OutputMode::Quiet
    } else {
        OutputMode::Normal
    };

    if let Err(e) = run(cli.command, mode).await {
        Output::new(mode).error(&e.to_string());
        std::process::exit(1);
    }
}

async fn run(command: Commands, mode: OutputMode) -> Result<()> {
    let output = Output::new(mode);
    match command {
        Commands::Init {
            application,
            repository,
            force,
        } => {
            let cwd = env::current_dir()?;
            config::init_config(&cwd, application.as_deref(), repository.as_deref(), force)?;
            output.success(&format!("Created {}", config::CONFIG_FILENAME));
            Ok(())
        }
        Commands::Setup { target } => {
            let config = commands::load_config(&target)?;
            commands::setup(config, output).await
        }
        Commands::Deploy {
            target,
            revision,
            mutation,
        } => {
            let config = commands::load_config(&target)?;
            commands::deploy(config, target.destination, revision, mutation, output).await
        }
        Commands::Rollback { target, mutation } => {
            let config = commands::load_config(&target)?;
            commands::rollback(config, target.destination, mutation, output).await
        }
        Commands::Cleanup {
            target,
            keep,
            mutation,
        } => {
            let config = commands::load_config(&target)?;
            commands::cleanup(config, keep, mutation, output).await
        }
        Commands::Reconcile { target, force } => {
            let config = commands::load_config(&target)?;
            commands::reconcile(config, force, output).await
        }
        Commands::Status { target } => {
            let config = commands::load_config(&target)?;
            commands::status(config, output).await
        }
        Commands::Invoke {
            target,
            roles,
            command,
        } => {
            let config = commands::load_config(&target)?;
            commands::invoke(config, roles, command, output).await
        }
        Commands::Upload { target, files } => {
            let config = commands::load_config(&target)?;
            commands::upload(config, files, output).await
        }
        Commands::Config { target } => {
            let config = commands::load_config(&target)?;
            commands::show_config(&config, &output)
        }
    }
}
