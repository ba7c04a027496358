//! `ontree validate`: check a bundle definition against the sandbox policy.

use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::Args;
use ontree_common::config::OntreeConfig;
use ontree_common::naming;
use ontree_common::types::AppId;
use ontree_compose::{ComposeError, Validator};

use crate::output;

/// Arguments for the `validate` subcommand.
#[derive(Args, Debug)]
pub struct ValidateArgs {
    /// Path to the docker-compose.yml file.
    #[arg(default_value = "docker-compose.yml")]
    pub file: PathBuf,

    /// Application the bundle is deployed for. Defaults to the name of the
    /// directory containing the file.
    #[arg(long)]
    pub app: Option<String>,
}

/// Executes the `validate` command.
///
/// # Errors
///
/// Returns an error if the file cannot be read or the bundle is rejected.
pub fn execute(args: ValidateArgs, config: &OntreeConfig) -> anyhow::Result<()> {
    let app = match &args.app {
        Some(name) => naming::derive_identifier(name),
        None => app_from_path(&args.file)?,
    };
    tracing::info!(path = %args.file.display(), app = %app, mode = %config.mode, "validating bundle");

    let raw = std::fs::read_to_string(&args.file)
        .with_context(|| format!("failed to read {}", args.file.display()))?;

    match Validator::from_config(app.clone(), config).validate(&raw) {
        Ok(()) => {
            println!("OK: {} is admissible for app '{app}' ({} mode)", args.file.display(), config.mode);
            Ok(())
        }
        Err(ComposeError::Violation(violation)) => {
            print!("{}", output::format_violation(&violation));
            anyhow::bail!(violation)
        }
        Err(err) => Err(err.into()),
    }
}

/// Derives the application identifier from the directory holding `file`.
fn app_from_path(file: &Path) -> anyhow::Result<AppId> {
    let absolute = std::path::absolute(file)
        .with_context(|| format!("failed to resolve {}", file.display()))?;
    let dir_name = absolute
        .parent()
        .and_then(Path::file_name)
        .map(|n| n.to_string_lossy().into_owned())
        .with_context(|| format!("cannot infer app from {}; pass --app", file.display()))?;
    Ok(naming::derive_identifier(&dir_name))
}
