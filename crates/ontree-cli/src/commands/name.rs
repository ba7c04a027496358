//! `ontree name`: derive or parse names in the container naming scheme.

use std::path::Path;

use anyhow::Context;
use clap::{Args, Subcommand};
use ontree_common::config::OntreeConfig;
use ontree_common::constants::{MIGRATED_INSTANCE, MIGRATED_SERVICE_NAME};
use ontree_common::naming;

/// Arguments for the `name` subcommand.
#[derive(Args, Debug)]
pub struct NameArgs {
    /// Naming operation.
    #[command(subcommand)]
    pub action: NameAction,
}

/// Naming operations.
#[derive(Subcommand, Debug)]
pub enum NameAction {
    /// Show the identifier, project and container names for a directory.
    Derive {
        /// Application directory name.
        directory: String,
        /// Service name inside the bundle.
        #[arg(long, default_value = MIGRATED_SERVICE_NAME)]
        service: String,
        /// Instance number.
        #[arg(long, default_value_t = MIGRATED_INSTANCE)]
        instance: u32,
    },
    /// Parse a container name into app, service and instance.
    Parse {
        /// Container name (a leading `/` is accepted).
        container: String,
    },
}

/// Executes the `name` command.
///
/// # Errors
///
/// Returns an error on a case collision or an unparsable container name.
pub fn execute(args: NameArgs, config: &OntreeConfig) -> anyhow::Result<()> {
    match args.action {
        NameAction::Derive {
            directory,
            service,
            instance,
        } => {
            let existing = existing_apps(&config.apps_dir)?;
            let app = naming::derive_unique(&directory, existing.iter().map(String::as_str))?;
            println!("identifier: {app}");
            println!("project:    {}", naming::project_name(&app));
            println!("container:  {}", naming::container_identity(&app, &service, instance));
            println!("pattern:    {}", naming::container_pattern(&app));
            Ok(())
        }
        NameAction::Parse { container } => {
            let managed = naming::is_managed(&container);
            let identity = naming::parse_container_identity(&container)?;
            println!("app:      {}", identity.app);
            println!("service:  {}", identity.service);
            println!("instance: {}", identity.instance);
            println!("managed:  {managed}");
            Ok(())
        }
    }
}

/// Directory names currently present under the applications root.
fn existing_apps(apps_dir: &Path) -> anyhow::Result<Vec<String>> {
    if !apps_dir.exists() {
        return Ok(Vec::new());
    }
    let mut names = Vec::new();
    for entry in std::fs::read_dir(apps_dir)
        .with_context(|| format!("failed to list {}", apps_dir.display()))?
    {
        let entry = entry?;
        if entry.file_type()?.is_dir() {
            names.push(entry.file_name().to_string_lossy().into_owned());
        }
    }
    Ok(names)
}
