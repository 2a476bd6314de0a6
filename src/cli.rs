// ABOUTME: Command-line interface definition using clap derive macros.
// ABOUTME: Defines all subcommands and their arguments.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Parser)]
#[command(name = "shipyard")]
#[command(about = "Timestamped release deployments over SSH with instant rollback")]
#[command(version)]
pub struct Cli {
    /// Show debug logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Only print final results
    #[arg(short, long, global = true, conflicts_with = "json")]
    pub quiet: bool,

    /// Print results as JSON lines
    #[arg(long, global = true)]
    pub json: bool,

    #[command(subcommand)]
    pub command: Commands,
}

/// Which deploy target to act on.
#[derive(Args, Debug, Clone)]
pub struct Target {
    /// Target destination (defined in config)
    #[arg(short, long)]
    pub destination: Option<String>,
}

/// Flags for commands that change the release set.
#[derive(Args, Debug, Clone, Copy)]
pub struct Mutation {
    /// Break an existing deploy lock
    #[arg(long)]
    pub force: bool,

    /// Print the commands instead of running them
    #[arg(long)]
    pub dry_run: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Initialize a new shipyard.yml configuration file
    Init {
        /// Application name
        #[arg(short, long)]
        application: Option<String>,

        /// Repository URL (or source directory for scm: copy)
        #[arg(short, long)]
        repository: Option<String>,

        /// Overwrite an existing configuration file
        #[arg(short, long)]
        force: bool,
    },

    /// Create the deploy directories on every server
    Setup {
        #[command(flatten)]
        target: Target,
    },

    /// Deploy a revision as a new release and make it current
    Deploy {
        #[command(flatten)]
        target: Target,

        /// Revision to deploy (overrides config)
        #[arg(short, long)]
        revision: Option<String>,

        #[command(flatten)]
        mutation: Mutation,
    },

    /// Point current back at the previous release and delete the newest
    Rollback {
        #[command(flatten)]
        target: Target,

        #[command(flatten)]
        mutation: Mutation,
    },

    /// Delete releases beyond the retention count
    Cleanup {
        #[command(flatten)]
        target: Target,

        /// Number of releases to keep (overrides config)
        #[arg(short, long)]
        keep: Option<usize>,

        #[command(flatten)]
        mutation: Mutation,
    },

    /// Remove releases left behind by an interrupted deploy
    Reconcile {
        #[command(flatten)]
        target: Target,

        /// Break an existing deploy lock
        #[arg(long)]
        force: bool,
    },

    /// Show releases and the current release on every server
    Status {
        #[command(flatten)]
        target: Target,
    },

    /// Run a command on every server
    Invoke {
        #[command(flatten)]
        target: Target,

        /// Only run on servers with these roles
        #[arg(long, value_delimiter = ',')]
        roles: Vec<String>,

        /// Command to run
        #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
        command: Vec<String>,
    },

    /// Copy local files into the current release on every server
    Upload {
        #[command(flatten)]
        target: Target,

        /// Files or directories, relative to the project root
        files: Vec<PathBuf>,
    },

    /// Print the resolved configuration
    Config {
        #[command(flatten)]
        target: Target,
    },
}
