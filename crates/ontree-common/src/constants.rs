//! System-wide constants and default paths.
//!
//! The naming constants are a stable contract: any integration that
//! recognises ontree containers on a host relies on them.

/// Namespace token that prefixes every platform-managed project and container.
pub const SYSTEM_PREFIX: &str = "ontree";

/// Joining character between name components.
pub const SEPARATOR: char = '-';

/// Minimum number of components after the prefix in a container identity
/// (`<app>-<service>-<instance>`).
pub const MIN_IDENTITY_PARTS: usize = 3;

/// Root directory under which each application owns a subdirectory.
pub const DEFAULT_APPS_DIR: &str = "/opt/ontree/apps";

/// Directory shared between all applications on the host.
pub const DEFAULT_SHARED_DIR: &str = "/opt/ontree/shared";

/// Per-application directory holding persistent bind-mount data.
pub const VOLUMES_DIR: &str = "volumes";

/// Per-application directory for operator-provided mounts.
pub const MNT_DIR: &str = "mnt";

/// Shared subdirectory reachable from demo deployments.
pub const DEMO_SHARED_DIR: &str = "shared/ollama";

/// Bundle definition file name inside an application directory.
pub const COMPOSE_FILE_NAME: &str = "docker-compose.yml";

/// Secrets sidecar written next to a migrated bundle.
pub const SECRETS_FILE_NAME: &str = ".env";

/// Service name given to the single service of a migrated legacy app.
pub const MIGRATED_SERVICE_NAME: &str = "app";

/// Instance number given to the migrated container.
pub const MIGRATED_INSTANCE: u32 = 1;

/// Grace period (seconds) before a running container is killed on stop.
pub const DEFAULT_STOP_TIMEOUT_SECS: u64 = 10;

/// Environment variable selecting the deployment mode.
pub const ENV_RUN_MODE: &str = "ONTREE_RUN_MODE";

/// Environment variable overriding the applications root.
pub const ENV_APPS_DIR: &str = "ONTREE_APPS_DIR";

/// Environment variable overriding the shared directory.
pub const ENV_SHARED_DIR: &str = "ONTREE_SHARED_DIR";

/// Application name used in CLI output.
pub const APP_NAME: &str = "ontree";
