//! On-disk layout of a migrated application.
//!
//! ```text
//! <apps>/<app>/
//! ├── docker-compose.yml     bundle (0600)
//! ├── .env                   secrets sidecar (0600, optional)
//! └── mnt/<app>/app/         rewritten bind-mount target
//! ```

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use ontree_common::config::{DeploymentMode, OntreeConfig};
use ontree_common::constants::{MIGRATED_SERVICE_NAME, MNT_DIR};
use ontree_common::error::{OntreeError, Result};
use ontree_common::types::AppId;

/// Paths used while migrating one application.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppLayout {
    /// Application directory (also the legacy per-application path).
    pub app_dir: PathBuf,
    /// Host directory that replaces legacy bind mounts.
    pub mount_dir: PathBuf,
    /// Bundle definition file.
    pub compose_path: PathBuf,
    /// Secrets sidecar file.
    pub secrets_path: PathBuf,
    /// How the bundle refers to `mount_dir` in the configured mode.
    pub mount_reference: String,
}

impl AppLayout {
    /// Computes the layout of `app` under the configured roots.
    #[must_use]
    pub fn new(app: &AppId, config: &OntreeConfig) -> Self {
        let app_dir = config.app_dir(app);
        let relative_mount = Path::new(MNT_DIR)
            .join(app.as_str())
            .join(MIGRATED_SERVICE_NAME);
        let mount_dir = app_dir.join(&relative_mount);
        let mount_reference = match config.mode {
            DeploymentMode::Production => mount_dir.display().to_string(),
            DeploymentMode::Demo => format!("./{}", relative_mount.display()),
        };
        Self {
            compose_path: config.compose_path(app),
            secrets_path: config.secrets_path(app),
            app_dir,
            mount_dir,
            mount_reference,
        }
    }

    /// Whether a bundle has already been written for this application.
    #[must_use]
    pub fn is_migrated(&self) -> bool {
        self.compose_path.exists()
    }

    /// Whether a legacy bind-mount source belongs to the application and
    /// must be redirected to the mount directory.
    #[must_use]
    pub fn owns_legacy_source(&self, source: &str) -> bool {
        !source.starts_with('/') || Path::new(source).starts_with(&self.app_dir)
    }

    /// Creates the application and mount directories.
    ///
    /// # Errors
    ///
    /// Returns an error if a directory cannot be created.
    pub fn create_dirs(&self) -> Result<()> {
        tracing::info!(path = %self.mount_dir.display(), "creating application directories");
        fs::create_dir_all(&self.mount_dir).map_err(|e| OntreeError::io(&self.mount_dir, e))
    }
}

/// Writes `contents` to `path` atomically with owner-only permissions.
///
/// The data lands in a sibling temporary file first and is renamed into
/// place, so readers never observe a half-written file.
///
/// # Errors
///
/// Returns an error if the temporary file cannot be written or renamed.
pub fn write_restricted(path: &Path, contents: &str) -> Result<()> {
    let tmp = tmp_path(path);
    tracing::info!(path = %path.display(), bytes = contents.len(), "writing file");

    let mut options = fs::OpenOptions::new();
    let _ = options.write(true).create(true).truncate(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        let _ = options.mode(0o600);
    }

    let mut file = options.open(&tmp).map_err(|e| OntreeError::io(&tmp, e))?;
    file.write_all(contents.as_bytes())
        .and_then(|()| file.sync_all())
        .map_err(|e| OntreeError::io(&tmp, e))?;
    drop(file);

    fs::rename(&tmp, path).map_err(|e| {
        let _ = fs::remove_file(&tmp);
        OntreeError::io(path, e)
    })
}

fn tmp_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().unwrap_or_default().to_os_string();
    name.push(".tmp");
    path.with_file_name(name)
}

#[cfg(test)]
mod tests {
    use ontree_common::naming::derive_identifier;

    use super::*;

    #[test]
    fn production_layout_uses_absolute_mount_reference() {
        let config = OntreeConfig::default();
        let layout = AppLayout::new(&derive_identifier("wiki"), &config);
        assert_eq!(layout.app_dir, PathBuf::from("/opt/ontree/apps/wiki"));
        assert_eq!(layout.mount_dir, PathBuf::from("/opt/ontree/apps/wiki/mnt/wiki/app"));
        assert_eq!(layout.mount_reference, "/opt/ontree/apps/wiki/mnt/wiki/app");
        assert_eq!(layout.secrets_path, PathBuf::from("/opt/ontree/apps/wiki/.env"));
    }

    #[test]
    fn demo_layout_uses_relative_mount_reference() {
        let config = OntreeConfig {
            mode: DeploymentMode::Demo,
            ..OntreeConfig::default()
        };
        let layout = AppLayout::new(&derive_identifier("wiki"), &config);
        assert_eq!(layout.mount_reference, "./mnt/wiki/app");
    }

    #[test]
    fn legacy_sources_owned_by_app() {
        let layout = AppLayout::new(&derive_identifier("wiki"), &OntreeConfig::default());
        assert!(layout.owns_legacy_source("/opt/ontree/apps/wiki/data"));
        assert!(layout.owns_legacy_source("data"));
        assert!(!layout.owns_legacy_source("/opt/ontree/apps/wikis/data"));
        assert!(!layout.owns_legacy_source("/var/run/docker.sock"));
    }

    #[test]
    fn write_restricted_replaces_contents() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("docker-compose.yml");
        write_restricted(&path, "first").unwrap();
        write_restricted(&path, "second").unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), "second");
        assert!(!dir.path().join("docker-compose.yml.tmp").exists());

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let mode = fs::metadata(&path).unwrap().permissions().mode();
            assert_eq!(mode & 0o777, 0o600);
        }
    }
}
