//! Global configuration model for the ontree admission layer.

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::constants;
use crate::error::OntreeError;
use crate::types::AppId;

/// Deployment mode of the host. Changes which bind-mount sources are legal.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeploymentMode {
    /// Host-rooted absolute paths under the ontree directories.
    #[default]
    Production,
    /// Working-directory-relative paths (`./volumes`, ...).
    Demo,
}

impl fmt::Display for DeploymentMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Production => write!(f, "production"),
            Self::Demo => write!(f, "demo"),
        }
    }
}

impl FromStr for DeploymentMode {
    type Err = OntreeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "production" | "prod" => Ok(Self::Production),
            "demo" => Ok(Self::Demo),
            other => Err(OntreeError::Config {
                message: format!("unknown deployment mode \"{other}\" (expected production or demo)"),
            }),
        }
    }
}

/// Root configuration shared by the validator and the migration engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OntreeConfig {
    /// Directory holding one subdirectory per application.
    pub apps_dir: PathBuf,
    /// Directory shared between applications.
    pub shared_dir: PathBuf,
    /// Deployment mode used when policing bind mounts.
    pub mode: DeploymentMode,
    /// Grace period granted to a container on stop during migration.
    pub stop_timeout_secs: u64,
}

impl OntreeConfig {
    /// Directory owned by the given application.
    #[must_use]
    pub fn app_dir(&self, app: &AppId) -> PathBuf {
        self.apps_dir.join(app.as_str())
    }

    /// Path of the application's bundle definition.
    #[must_use]
    pub fn compose_path(&self, app: &AppId) -> PathBuf {
        self.app_dir(app).join(constants::COMPOSE_FILE_NAME)
    }

    /// Path of the application's secrets sidecar.
    #[must_use]
    pub fn secrets_path(&self, app: &AppId) -> PathBuf {
        self.app_dir(app).join(constants::SECRETS_FILE_NAME)
    }

    /// Stop grace period as a [`Duration`].
    #[must_use]
    pub const fn stop_timeout(&self) -> Duration {
        Duration::from_secs(self.stop_timeout_secs)
    }

    /// Returns a copy of this configuration rooted at another directory.
    ///
    /// Used by tests and by demo hosts that keep everything under one tree.
    #[must_use]
    pub fn rooted_at(root: &Path, mode: DeploymentMode) -> Self {
        Self {
            apps_dir: root.join("apps"),
            shared_dir: root.join("shared"),
            mode,
            stop_timeout_secs: constants::DEFAULT_STOP_TIMEOUT_SECS,
        }
    }
}

impl Default for OntreeConfig {
    fn default() -> Self {
        Self {
            apps_dir: PathBuf::from(constants::DEFAULT_APPS_DIR),
            shared_dir: PathBuf::from(constants::DEFAULT_SHARED_DIR),
            mode: DeploymentMode::default(),
            stop_timeout_secs: constants::DEFAULT_STOP_TIMEOUT_SECS,
        }
    }
}
