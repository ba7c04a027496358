//! Naming scheme for applications, projects and containers.
//!
//! Every application gets a project name `ontree-<app>` and each of its
//! containers is named `ontree-<app>-<service>-<instance>`. The prefix is
//! the sole gate deciding whether the platform may touch a container.
//!
//! Service names are never generated with the separator, so parsing a
//! container identity back always recovers the triple that produced it.
//! Two directory names differing only by case map to the same identifier;
//! [`derive_unique`] lets the caller detect that at creation time.

use std::num::ParseIntError;

use thiserror::Error;

use crate::constants::{MIN_IDENTITY_PARTS, SEPARATOR, SYSTEM_PREFIX};
use crate::types::AppId;

/// Failure to map a name onto the naming scheme.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NameError {
    /// The name does not start with `ontree-`.
    #[error("container name \"{name}\" does not start with \"ontree-\"")]
    MissingPrefix {
        /// Offending name.
        name: String,
    },

    /// Fewer than three components follow the prefix.
    #[error("container name \"{name}\" has {found} component(s) after the prefix, expected at least 3")]
    TooFewComponents {
        /// Offending name.
        name: String,
        /// Number of components found.
        found: usize,
    },

    /// The trailing component is not an instance number.
    #[error("container name \"{name}\" has an invalid instance number: {source}")]
    InvalidInstance {
        /// Offending name.
        name: String,
        /// Integer parse failure.
        source: ParseIntError,
    },

    /// Another directory already maps to the same identifier.
    #[error("directory \"{directory}\" collides with existing directory \"{existing}\" (both map to \"{id}\")")]
    Collision {
        /// Directory being registered.
        directory: String,
        /// Existing directory with the same identifier.
        existing: String,
        /// Shared identifier.
        id: String,
    },
}

/// The triple recovered from a container identity.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ContainerIdentity {
    /// Application the container belongs to.
    pub app: AppId,
    /// Service token inside the bundle (`app`, `web`, `db`, ...).
    pub service: String,
    /// Scale index of the container.
    pub instance: u32,
}

/// Derives the application identifier from its directory name.
///
/// Only lowercases. Callers supply a clean directory basename.
#[must_use]
pub fn derive_identifier(directory_name: &str) -> AppId {
    AppId::from_lowercase(directory_name.to_lowercase())
}

/// Derives the identifier and rejects it if a different existing directory
/// already maps to it.
///
/// # Errors
///
/// Returns [`NameError::Collision`] on a case-only collision.
pub fn derive_unique<'a, I>(directory_name: &str, existing: I) -> Result<AppId, NameError>
where
    I: IntoIterator<Item = &'a str>,
{
    let id = derive_identifier(directory_name);
    for other in existing {
        if other != directory_name && derive_identifier(other) == id {
            return Err(NameError::Collision {
                directory: directory_name.to_owned(),
                existing: other.to_owned(),
                id: id.to_string(),
            });
        }
    }
    Ok(id)
}

/// Project name grouping all containers of one application.
#[must_use]
pub fn project_name(app: &AppId) -> String {
    format!("{SYSTEM_PREFIX}{SEPARATOR}{app}")
}

/// Full container identity for one service instance.
#[must_use]
pub fn container_identity(app: &AppId, service: &str, instance: u32) -> String {
    format!("{}{SEPARATOR}{service}{SEPARATOR}{instance}", project_name(app))
}

/// Glob-style pattern matching every container of one application.
#[must_use]
pub fn container_pattern(app: &AppId) -> String {
    format!("{}{SEPARATOR}*", project_name(app))
}

/// Parses a container name back into its `(app, service, instance)` triple.
///
/// A single leading `/` (as reported by some runtimes) is ignored. The
/// last component is the instance, the one before it the service, and all
/// remaining leading components are re-joined as the application id.
///
/// The re-joined application segment goes through [`derive_identifier`],
/// so a hand-made mixed-case name such as `ontree-Wiki-app-1` yields the
/// id `wiki`. Names built by [`container_identity`] are already lowercase
/// and round-trip unchanged. The service token keeps its case.
///
/// # Errors
///
/// Returns a [`NameError`] when the prefix is missing, fewer than three
/// components remain, or the instance is not an integer.
pub fn parse_container_identity(name: &str) -> Result<ContainerIdentity, NameError> {
    let rest = strip_prefix(name).ok_or_else(|| NameError::MissingPrefix {
        name: name.to_owned(),
    })?;

    let parts: Vec<&str> = rest.split(SEPARATOR).collect();
    if parts.len() < MIN_IDENTITY_PARTS {
        return Err(NameError::TooFewComponents {
            name: name.to_owned(),
            found: parts.len(),
        });
    }

    let (head, tail) = parts.split_at(parts.len() - 2);
    let instance = tail[1]
        .parse::<u32>()
        .map_err(|source| NameError::InvalidInstance {
            name: name.to_owned(),
            source,
        })?;

    Ok(ContainerIdentity {
        app: derive_identifier(&head.join(&SEPARATOR.to_string())),
        service: tail[0].to_owned(),
        instance,
    })
}

/// Whether the container belongs to the platform's namespace.
///
/// Containers outside the namespace must never be stopped, renamed or
/// removed by the platform.
#[must_use]
pub fn is_managed(name: &str) -> bool {
    strip_prefix(name).is_some()
}

/// Returns the application id of a legacy single-container name
/// (`ontree-<app>`, exactly one separator).
#[must_use]
pub fn legacy_app_id(name: &str) -> Option<AppId> {
    let rest = strip_prefix(name)?;
    if rest.is_empty() || rest.contains(SEPARATOR) {
        return None;
    }
    Some(derive_identifier(rest))
}

fn strip_prefix(name: &str) -> Option<&str> {
    let name = name.strip_prefix('/').unwrap_or(name);
    name.strip_prefix(SYSTEM_PREFIX)?.strip_prefix(SEPARATOR)
}
