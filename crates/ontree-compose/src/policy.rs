//! Sandbox policy: capability denylist and bind-mount scoping.
//!
//! Bind-mount sources are scoped to the owning application's directories.
//! In production they must be absolute host paths under
//! `<apps>/<app>/volumes`, `<apps>/<app>/mnt` or `<shared>`. In demo mode
//! they must be `./`-relative paths under `./volumes`, `./mnt` or
//! `./shared/ollama`. Paths are normalised lexically before the scope
//! test, so `..` cannot climb out of an allowed directory. Sources using
//! `$` substitution are refused.

use std::path::{Component, Path, PathBuf};

use ontree_common::config::{DeploymentMode, OntreeConfig};
use ontree_common::constants::{DEMO_SHARED_DIR, MNT_DIR, VOLUMES_DIR};
use ontree_common::types::AppId;

/// Capabilities that let a container reach beyond its sandbox.
pub const DENIED_CAPABILITIES: &[&str] = &[
    "SYS_ADMIN",
    "NET_ADMIN",
    "SYS_MODULE",
    "SYS_RAWIO",
    "SYS_PTRACE",
    "MAC_ADMIN",
    "SETFCAP",
    "ALL",
    "MAC_OVERRIDE",
    "DAC_READ_SEARCH",
    "SYS_BOOT",
    "BPF",
];

/// Normalises a capability name: trims, uppercases and strips `CAP_`.
#[must_use]
pub fn normalize_capability(raw: &str) -> String {
    let upper = raw.trim().to_ascii_uppercase();
    match upper.strip_prefix("CAP_") {
        Some(stripped) => stripped.to_owned(),
        None => upper,
    }
}

/// Whether the capability (in any spelling) is on the denylist.
#[must_use]
pub fn is_denied_capability(raw: &str) -> bool {
    let normalized = normalize_capability(raw);
    DENIED_CAPABILITIES.contains(&normalized.as_str())
}

/// Why a bind-mount source was refused.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PathViolation {
    /// Source uses `$` variable substitution.
    Interpolated,
    /// Relative source in production mode.
    NotAbsolute,
    /// Absolute source in demo mode.
    NotRelative,
    /// Source outside every allowed directory.
    OutsideScope,
}

/// Allowed bind-mount roots for one application.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MountScope {
    mode: DeploymentMode,
    roots: Vec<PathBuf>,
}

impl MountScope {
    /// Builds the scope for `app` from the configured host directories.
    #[must_use]
    pub fn new(app: &AppId, mode: DeploymentMode, apps_dir: &Path, shared_dir: &Path) -> Self {
        let mut roots = match mode {
            DeploymentMode::Production => {
                let app_dir = clean(&apps_dir.to_string_lossy()).unwrap_or_default().join(app.as_str());
                vec![
                    app_dir.join(VOLUMES_DIR),
                    app_dir.join(MNT_DIR),
                    clean(&shared_dir.to_string_lossy()).unwrap_or_default(),
                ]
            }
            DeploymentMode::Demo => vec![
                PathBuf::from(VOLUMES_DIR),
                PathBuf::from(MNT_DIR),
                PathBuf::from(DEMO_SHARED_DIR),
            ],
        };
        roots.retain(|root| !root.as_os_str().is_empty());
        Self { mode, roots }
    }

    /// Builds the scope from a workspace configuration.
    #[must_use]
    pub fn from_config(app: &AppId, config: &OntreeConfig) -> Self {
        Self::new(app, config.mode, &config.apps_dir, &config.shared_dir)
    }

    /// Deployment mode this scope applies.
    #[must_use]
    pub const fn mode(&self) -> DeploymentMode {
        self.mode
    }

    /// Human-readable list of allowed locations, for error details.
    #[must_use]
    pub fn describe(&self) -> String {
        let shown: Vec<String> = self
            .roots
            .iter()
            .map(|root| match self.mode {
                DeploymentMode::Production => format!("{}/", root.display()),
                DeploymentMode::Demo => format!("./{}", root.display()),
            })
            .collect();
        shown.join(", ")
    }

    /// Checks a bind-mount source against the scope.
    ///
    /// # Errors
    ///
    /// Returns the [`PathViolation`] describing why the source is refused.
    pub fn check(&self, source: &str) -> Result<(), PathViolation> {
        if source.contains('$') {
            return Err(PathViolation::Interpolated);
        }
        let source = trim_trailing_slash(source);
        let absolute = source.starts_with('/');
        match self.mode {
            DeploymentMode::Production if !absolute => return Err(PathViolation::NotAbsolute),
            DeploymentMode::Demo if absolute => return Err(PathViolation::NotRelative),
            DeploymentMode::Demo if !source.starts_with("./") => {
                return Err(PathViolation::OutsideScope);
            }
            _ => {}
        }

        let cleaned = clean(source).ok_or(PathViolation::OutsideScope)?;
        if self.roots.iter().any(|root| cleaned.starts_with(root)) {
            Ok(())
        } else {
            Err(PathViolation::OutsideScope)
        }
    }
}

fn trim_trailing_slash(path: &str) -> &str {
    match path.strip_suffix('/') {
        Some(trimmed) if !trimmed.is_empty() => trimmed,
        _ => path,
    }
}

/// Lexically normalises `path`, resolving `.` and `..`.
///
/// Absolute paths clamp at `/`. Returns `None` for a relative path that
/// climbs above its base.
fn clean(path: &str) -> Option<PathBuf> {
    let mut out = PathBuf::new();
    let mut depth = 0usize;
    for component in Path::new(path).components() {
        match component {
            Component::RootDir => out.push("/"),
            Component::CurDir | Component::Prefix(_) => {}
            Component::ParentDir => {
                if depth > 0 {
                    let _ = out.pop();
                    depth -= 1;
                } else if !out.has_root() {
                    return None;
                }
            }
            Component::Normal(part) => {
                out.push(part);
                depth += 1;
            }
        }
    }
    Some(out)
}

#[cfg(test)]
mod tests {
    use ontree_common::naming::derive_identifier;

    use super::*;

    fn production() -> MountScope {
        MountScope::new(
            &derive_identifier("wiki"),
            DeploymentMode::Production,
            Path::new("/opt/ontree/apps"),
            Path::new("/opt/ontree/shared"),
        )
    }

    fn demo() -> MountScope {
        MountScope::new(
            &derive_identifier("wiki"),
            DeploymentMode::Demo,
            Path::new("/opt/ontree/apps"),
            Path::new("/opt/ontree/shared"),
        )
    }

    #[test]
    fn capability_normalization() {
        assert_eq!(normalize_capability("cap_sys_admin"), "SYS_ADMIN");
        assert_eq!(normalize_capability(" Net_Admin "), "NET_ADMIN");
        assert!(is_denied_capability("CAP_SYS_ADMIN"));
        assert!(is_denied_capability("sys_ptrace"));
        assert!(is_denied_capability("all"));
        assert!(!is_denied_capability("CHOWN"));
        assert!(!is_denied_capability("NET_BIND_SERVICE"));
    }

    #[test]
    fn production_accepts_app_and_shared_dirs() {
        let scope = production();
        assert_eq!(scope.check("/opt/ontree/apps/wiki/volumes/data"), Ok(()));
        assert_eq!(scope.check("/opt/ontree/apps/wiki/mnt/"), Ok(()));
        assert_eq!(scope.check("/opt/ontree/apps/wiki/volumes"), Ok(()));
        assert_eq!(scope.check("/opt/ontree/shared/models"), Ok(()));
    }

    #[test]
    fn production_rejects_everything_else() {
        let scope = production();
        assert_eq!(scope.check("./data"), Err(PathViolation::NotAbsolute));
        assert_eq!(scope.check("data"), Err(PathViolation::NotAbsolute));
        assert_eq!(scope.check("/etc/passwd"), Err(PathViolation::OutsideScope));
        assert_eq!(
            scope.check("/opt/ontree/apps/blog/volumes/x"),
            Err(PathViolation::OutsideScope)
        );
        assert_eq!(
            scope.check("/opt/ontree/apps/wiki/docker-compose.yml"),
            Err(PathViolation::OutsideScope)
        );
        assert_eq!(
            scope.check("/opt/ontree/apps/wikiextra/volumes"),
            Err(PathViolation::OutsideScope)
        );
        assert_eq!(
            scope.check("/opt/ontree/apps/wiki/volumes/../../blog/volumes"),
            Err(PathViolation::OutsideScope)
        );
        assert_eq!(scope.check("/"), Err(PathViolation::OutsideScope));
    }

    #[test]
    fn demo_accepts_relative_dirs() {
        let scope = demo();
        assert_eq!(scope.check("./volumes/x"), Ok(()));
        assert_eq!(scope.check("./mnt"), Ok(()));
        assert_eq!(scope.check("./shared/ollama"), Ok(()));
        assert_eq!(scope.check("./shared/ollama/models/"), Ok(()));
    }

    #[test]
    fn demo_rejects_everything_else() {
        let scope = demo();
        assert_eq!(
            scope.check("/opt/ontree/apps/wiki/volumes/x"),
            Err(PathViolation::NotRelative)
        );
        assert_eq!(scope.check("./random/path"), Err(PathViolation::OutsideScope));
        assert_eq!(scope.check("./shared/other"), Err(PathViolation::OutsideScope));
        assert_eq!(scope.check("volumes/x"), Err(PathViolation::OutsideScope));
        assert_eq!(scope.check("./volumes/../../etc"), Err(PathViolation::OutsideScope));
        assert_eq!(scope.check("../volumes"), Err(PathViolation::OutsideScope));
    }

    #[test]
    fn substituted_sources_are_refused_in_both_modes() {
        let escape = "/opt/ontree/apps/wiki/volumes/${A:-..}/${A:-..}/${A:-..}/${A:-..}/${A:-..}/etc";
        assert_eq!(production().check(escape), Err(PathViolation::Interpolated));
        assert_eq!(
            production().check("/opt/ontree/apps/wiki/volumes/$DATA"),
            Err(PathViolation::Interpolated)
        );
        assert_eq!(demo().check("./volumes/${X}"), Err(PathViolation::Interpolated));
    }

    #[test]
    fn describe_lists_roots() {
        assert_eq!(
            production().describe(),
            "/opt/ontree/apps/wiki/volumes/, /opt/ontree/apps/wiki/mnt/, /opt/ontree/shared/"
        );
        assert_eq!(demo().describe(), "./volumes, ./mnt, ./shared/ollama");
    }
}
