//! `ontree migrate`: upgrade legacy single-container apps.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use anyhow::Context;
use clap::Args;
use ontree_common::config::OntreeConfig;
use ontree_runtime::client::DockerCli;
use ontree_runtime::migrate::{MigrateError, Migrator};

use crate::output;

/// Arguments for the `migrate` subcommand.
#[derive(Args, Debug)]
pub struct MigrateArgs {
    /// Applications to migrate. If empty, migrates all legacy apps.
    pub apps: Vec<String>,

    /// Only list the legacy containers that would be migrated.
    #[arg(long)]
    pub dry_run: bool,

    /// Give up on remaining applications after this many seconds.
    #[arg(long)]
    pub timeout: Option<u64>,

    /// Grace period in seconds before a running container is killed.
    #[arg(long)]
    pub stop_timeout: Option<u64>,
}

/// Executes the `migrate` command.
///
/// # Errors
///
/// Returns an error if the runtime is unavailable or any app failed.
pub fn execute(args: MigrateArgs, mut config: OntreeConfig) -> anyhow::Result<()> {
    if let Some(secs) = args.stop_timeout {
        config.stop_timeout_secs = secs;
    }
    let client = DockerCli::detect()?;
    tracing::info!(binary = %client.binary().display(), apps_dir = %config.apps_dir.display(), "starting migration");

    let cancel = Arc::new(AtomicBool::new(false));
    let handler_flag = Arc::clone(&cancel);
    ctrlc::set_handler(move || {
        handler_flag.store(true, Ordering::SeqCst);
    })
    .context("failed to install Ctrl-C handler")?;

    let mut migrator = Migrator::new(Box::new(client), config).with_cancel_flag(cancel);
    if let Some(secs) = args.timeout {
        migrator = migrator.with_deadline(Instant::now() + Duration::from_secs(secs));
    }

    if args.dry_run {
        let candidates = migrator.discover(&args.apps)?;
        print!("{}", output::format_candidates(&candidates));
        return Ok(());
    }

    match migrator.run(&args.apps) {
        Ok(report) => {
            print!("{}", output::format_report(&report));
            Ok(())
        }
        Err(MigrateError::Incomplete { report }) => {
            print!("{}", output::format_report(&report));
            anyhow::bail!("{} of {} application(s) failed to migrate", report.failed(), report.results.len())
        }
        Err(err) => Err(err.into()),
    }
}
