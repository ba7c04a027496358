//! Security validation of bundle definitions.
//!
//! A [`Validator`] is built for one application and one deployment mode,
//! then decides accept or reject for any number of bundle texts. It holds
//! no mutable state and can be shared across threads.
//!
//! Validation is fail-fast: services are visited in lexicographic order
//! and the first violation is returned. A bundle with several problems
//! only ever reports the first one.

use std::path::Path;

use ontree_common::config::{DeploymentMode, OntreeConfig};
use ontree_common::constants::{DEFAULT_APPS_DIR, DEFAULT_SHARED_DIR};
use ontree_common::types::AppId;

use crate::error::{ComposeError, ValidationError};
use crate::model::{self, ComposeFile, Service, VolumeEntry};
use crate::policy::{self, MountScope, PathViolation};

const RULE_PRIVILEGED: &str = "privileged mode";
const RULE_BIND_MOUNT: &str = "bind mount";

/// How a volume attachment is backed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VolumeKind<'a> {
    /// No host-side source.
    Anonymous,
    /// Declared in the bundle's top-level `volumes:` map.
    Named(&'a str),
    /// Host filesystem path (or an undeclared name).
    Bind(&'a str),
}

/// Classifies a volume entry against the bundle's named-volume declarations.
///
/// A source shaped like a host path (leading `.` or `~`, any `/` or `$`)
/// or a long-form `type: bind` entry is a bind mount even when a volume of
/// that name is declared.
#[must_use]
pub fn classify<'a>(file: &ComposeFile, entry: &'a VolumeEntry) -> VolumeKind<'a> {
    match entry.source() {
        None => VolumeKind::Anonymous,
        Some(source) if entry.is_explicit_bind() || is_host_path(source) => {
            VolumeKind::Bind(source)
        }
        Some(source) if file.declares_volume(source) => VolumeKind::Named(source),
        Some(source) => VolumeKind::Bind(source),
    }
}

fn is_host_path(source: &str) -> bool {
    source.starts_with(['.', '~']) || source.contains(['/', '$'])
}

/// Sandbox policy engine for one application.
#[derive(Debug, Clone)]
pub struct Validator {
    app: AppId,
    scope: MountScope,
}

impl Validator {
    /// Creates a validator using the default host directories.
    #[must_use]
    pub fn new(app: AppId, mode: DeploymentMode) -> Self {
        let scope = MountScope::new(
            &app,
            mode,
            Path::new(DEFAULT_APPS_DIR),
            Path::new(DEFAULT_SHARED_DIR),
        );
        Self { app, scope }
    }

    /// Creates a validator from the workspace configuration.
    #[must_use]
    pub fn from_config(app: AppId, config: &OntreeConfig) -> Self {
        let scope = MountScope::from_config(&app, config);
        Self { app, scope }
    }

    /// Application this validator admits bundles for.
    #[must_use]
    pub const fn app(&self) -> &AppId {
        &self.app
    }

    /// Deployment mode the bind-mount policy applies.
    #[must_use]
    pub const fn mode(&self) -> DeploymentMode {
        self.scope.mode()
    }

    /// Parses and validates raw bundle text.
    ///
    /// # Errors
    ///
    /// Returns [`ComposeError::Parse`] for malformed YAML and
    /// [`ComposeError::Violation`] for the first policy violation found.
    pub fn validate(&self, raw: &str) -> Result<(), ComposeError> {
        let file = model::parse(raw)?;
        self.validate_file(&file)?;
        Ok(())
    }

    /// Validates an already-parsed bundle.
    ///
    /// # Errors
    ///
    /// Returns the first [`ValidationError`] in service order.
    pub fn validate_file(&self, file: &ComposeFile) -> Result<(), ValidationError> {
        tracing::debug!(
            app = %self.app,
            mode = %self.mode(),
            services = file.services.len(),
            "validating bundle"
        );

        for (name, service) in &file.services {
            if let Err(violation) = self.check_service(file, name, service) {
                tracing::warn!(
                    app = %self.app,
                    service = %violation.service,
                    rule = %violation.rule,
                    "bundle rejected"
                );
                return Err(violation);
            }
        }
        Ok(())
    }

    fn check_service(
        &self,
        file: &ComposeFile,
        name: &str,
        service: &Service,
    ) -> Result<(), ValidationError> {
        if service.is_privileged() {
            return Err(ValidationError::new(
                name,
                RULE_PRIVILEGED,
                "privileged containers are not allowed",
            ));
        }

        for cap in &service.cap_add {
            if policy::is_denied_capability(cap) {
                return Err(ValidationError::new(
                    name,
                    format!("capability '{cap}'"),
                    format!("adding capability {cap} is not allowed"),
                ));
            }
        }

        for entry in &service.volumes {
            if let VolumeKind::Bind(source) = classify(file, entry) {
                self.check_bind_source(name, source)?;
            }
        }
        Ok(())
    }

    fn check_bind_source(&self, service: &str, source: &str) -> Result<(), ValidationError> {
        let detail = match self.scope.check(source) {
            Ok(()) => return Ok(()),
            Err(PathViolation::Interpolated) => format!(
                "bind mount source '{source}' must not use variable substitution"
            ),
            Err(PathViolation::NotAbsolute) => format!(
                "bind mount source '{source}' must be an absolute path in production mode"
            ),
            Err(PathViolation::NotRelative) => {
                format!("bind mount source '{source}' must be a relative path in demo mode")
            }
            Err(PathViolation::OutsideScope) => format!(
                "bind mount source '{source}' is not allowed (allowed locations: {})",
                self.scope.describe()
            ),
        };
        Err(ValidationError::new(service, RULE_BIND_MOUNT, detail))
    }
}

#[cfg(test)]
mod tests {
    use ontree_common::naming::derive_identifier;

    use super::*;

    fn validator(mode: DeploymentMode) -> Validator {
        Validator::new(derive_identifier("wiki"), mode)
    }

    fn violation(result: Result<(), ComposeError>) -> ValidationError {
        match result {
            Err(ComposeError::Violation(v)) => v,
            other => panic!("expected a violation, got {other:?}"),
        }
    }

    #[test]
    fn malformed_yaml_is_a_parse_error() {
        let err = validator(DeploymentMode::Production)
            .validate("services: [unclosed")
            .unwrap_err();
        assert!(matches!(err, ComposeError::Parse { .. }));
        assert!(
            err.to_string().starts_with("failed to parse docker-compose.yml: "),
            "got: {err}"
        );
    }

    #[test]
    fn privileged_short_circuits_other_services() {
        let yaml = r"
services:
  aaa:
    image: nginx
    privileged: true
  bbb:
    image: nginx
    cap_add: [SYS_ADMIN]
";
        let v = violation(validator(DeploymentMode::Production).validate(yaml));
        assert_eq!(v.service, "aaa");
        assert_eq!(v.rule, "privileged mode");
    }

    #[test]
    fn services_are_visited_in_name_order() {
        let yaml = r"
services:
  zeta:
    image: nginx
    privileged: true
  alpha:
    image: nginx
    cap_add: [NET_ADMIN]
";
        let v = violation(validator(DeploymentMode::Production).validate(yaml));
        assert_eq!(v.service, "alpha");
        assert_eq!(v.rule, "capability 'NET_ADMIN'");
    }

    #[test]
    fn capability_rule_echoes_original_spelling() {
        let yaml = r"
services:
  app:
    image: busybox
    cap_add: [CHOWN, cap_sys_ptrace]
";
        let v = violation(validator(DeploymentMode::Production).validate(yaml));
        assert_eq!(v.rule, "capability 'cap_sys_ptrace'");
        assert!(v.detail.contains("cap_sys_ptrace"));
    }

    #[test]
    fn privileged_false_is_accepted() {
        let yaml = r"
services:
  app:
    image: busybox
    privileged: false
";
        assert!(validator(DeploymentMode::Production).validate(yaml).is_ok());
    }

    #[test]
    fn anonymous_volumes_are_ignored() {
        let yaml = r"
services:
  app:
    image: busybox
    volumes:
      - /var/cache/app
";
        assert!(validator(DeploymentMode::Production).validate(yaml).is_ok());
        assert!(validator(DeploymentMode::Demo).validate(yaml).is_ok());
    }

    #[test]
    fn classify_distinguishes_named_and_bind() {
        let file = model::parse(
            r"
services:
  app:
    volumes:
      - data:/data
      - ./volumes/x:/x
      - /tmp
volumes:
  data:
",
        )
        .unwrap();
        let volumes = &file.services["app"].volumes;
        assert_eq!(classify(&file, &volumes[0]), VolumeKind::Named("data"));
        assert_eq!(classify(&file, &volumes[1]), VolumeKind::Bind("./volumes/x"));
        assert_eq!(classify(&file, &volumes[2]), VolumeKind::Anonymous);
    }

    #[test]
    fn path_shaped_sources_are_binds_even_when_declared() {
        let file = model::parse(
            r#"
services:
  app:
    image: alpine
    volumes:
      - "..:/a"
      - ".:/b"
      - "~:/c"
      - "data:/d"
volumes:
  "..":
  ".":
  "~":
  data:
"#,
        )
        .unwrap();
        let volumes = &file.services["app"].volumes;
        assert_eq!(classify(&file, &volumes[0]), VolumeKind::Bind(".."));
        assert_eq!(classify(&file, &volumes[1]), VolumeKind::Bind("."));
        assert_eq!(classify(&file, &volumes[2]), VolumeKind::Bind("~"));
        assert_eq!(classify(&file, &volumes[3]), VolumeKind::Named("data"));
    }

    #[test]
    fn error_display_carries_triple() {
        let yaml = r"
services:
  web:
    image: nginx
    volumes:
      - /etc/passwd:/etc/passwd:ro
";
        let err = validator(DeploymentMode::Production).validate(yaml).unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("service 'web'"), "got: {msg}");
        assert!(msg.contains("bind mount"), "got: {msg}");
        assert!(msg.contains("'/etc/passwd' is not allowed"), "got: {msg}");
    }

    #[test]
    fn from_config_uses_configured_roots() {
        let config = OntreeConfig {
            apps_dir: "/srv/apps".into(),
            shared_dir: "/srv/shared".into(),
            ..OntreeConfig::default()
        };
        let v = Validator::from_config(derive_identifier("wiki"), &config);
        let ok = "services:\n  app:\n    volumes:\n      - /srv/apps/wiki/volumes/db:/db\n";
        let bad = "services:\n  app:\n    volumes:\n      - /opt/ontree/apps/wiki/volumes/db:/db\n";
        assert!(v.validate(ok).is_ok());
        assert!(v.validate(bad).is_err());
    }
}
