//! CLI command definitions and dispatch.

pub mod migrate;
pub mod name;
pub mod validate;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use ontree_common::config::{DeploymentMode, OntreeConfig};
use ontree_common::constants;

/// ontree: admission control for user-authored application bundles.
#[derive(Parser, Debug)]
#[command(name = "ontree", version, about, long_about = None)]
pub struct Cli {
    /// Subcommand to execute.
    #[command(subcommand)]
    pub command: Command,

    /// Deployment mode deciding which bind-mount paths are legal.
    #[arg(long, global = true, env = constants::ENV_RUN_MODE, default_value = "production")]
    pub mode: DeploymentMode,

    /// Directory holding one subdirectory per application.
    #[arg(long, global = true, env = constants::ENV_APPS_DIR, default_value = constants::DEFAULT_APPS_DIR)]
    pub apps_dir: PathBuf,

    /// Directory shared between applications.
    #[arg(long, global = true, env = constants::ENV_SHARED_DIR, default_value = constants::DEFAULT_SHARED_DIR)]
    pub shared_dir: PathBuf,

    /// Emit logs as JSON lines.
    #[arg(long, global = true)]
    pub json_logs: bool,
}

impl Cli {
    /// Builds the runtime configuration from global flags.
    #[must_use]
    pub fn config(&self) -> OntreeConfig {
        OntreeConfig {
            apps_dir: self.apps_dir.clone(),
            shared_dir: self.shared_dir.clone(),
            mode: self.mode,
            ..OntreeConfig::default()
        }
    }
}

/// Available CLI subcommands.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Check a docker-compose.yml against the sandbox policy.
    Validate(validate::ValidateArgs),
    /// Upgrade legacy single-container apps to the current layout.
    Migrate(migrate::MigrateArgs),
    /// Derive or parse names in the container naming scheme.
    Name(name::NameArgs),
}

/// Dispatches the parsed CLI command to its handler.
///
/// # Errors
///
/// Returns an error if the command execution fails.
pub fn execute(cli: Cli) -> anyhow::Result<()> {
    let config = cli.config();
    match cli.command {
        Command::Validate(args) => validate::execute(args, &config),
        Command::Migrate(args) => migrate::execute(args, config),
        Command::Name(args) => name::execute(args, &config),
    }
}
