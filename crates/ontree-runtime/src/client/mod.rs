//! Container runtime abstraction.
//!
//! The admission layer never talks to a runtime API directly. It consumes
//! the narrow [`RuntimeClient`] capability, which the migration engine
//! uses to discover, inspect and rename legacy containers.

pub mod docker;

use std::time::Duration;

use ontree_common::error::Result;
use ontree_common::types::{ContainerId, ContainerState};

pub use docker::DockerCli;

/// Summary of a container as returned by a listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContainerSummary {
    /// Runtime identifier.
    pub id: ContainerId,
    /// Container name, possibly with a leading `/`.
    pub name: String,
    /// Image reference.
    pub image: String,
    /// Current lifecycle state.
    pub state: ContainerState,
}

/// How a mount is backed on the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MountKind {
    /// Host path.
    Bind,
    /// Runtime-managed named volume.
    Volume,
    /// tmpfs, npipe, ...
    Other,
}

/// One mount of an inspected container.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MountPoint {
    /// Backing kind.
    pub kind: MountKind,
    /// Host path (binds) or volume data path (volumes).
    pub source: String,
    /// Volume name, for named volumes.
    pub name: Option<String>,
    /// Path inside the container.
    pub destination: String,
    /// Whether the mount is read-only.
    pub read_only: bool,
}

/// One published port.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct PortBinding {
    /// Container port with protocol, e.g. `80/tcp`.
    pub container_port: String,
    /// Host interface, if bound to a specific address.
    pub host_ip: Option<String>,
    /// Host port.
    pub host_port: String,
}

/// Full runtime configuration of a legacy container.
///
/// Transient: fetched once per migration attempt and discarded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContainerDetails {
    /// Runtime identifier.
    pub id: ContainerId,
    /// Container name, possibly with a leading `/`.
    pub name: String,
    /// Image reference as configured.
    pub image: String,
    /// Environment as `KEY=VALUE` strings, in runtime order.
    pub env: Vec<String>,
    /// Bind mounts and volumes.
    pub mounts: Vec<MountPoint>,
    /// Published ports.
    pub ports: Vec<PortBinding>,
    /// Restart policy name, if any.
    pub restart_policy: Option<String>,
    /// Attached networks.
    pub networks: Vec<String>,
    /// Whether the container is running.
    pub running: bool,
}

/// Synchronous container runtime capability.
///
/// Implementors must be safe to share across threads. Each call blocks
/// until the runtime answers; callers bound the overall sweep themselves.
pub trait RuntimeClient: Send + Sync {
    /// Lists containers, including stopped ones when `all` is set.
    ///
    /// # Errors
    ///
    /// Returns an error if the runtime cannot be queried.
    fn list(&self, all: bool) -> Result<Vec<ContainerSummary>>;

    /// Returns the full configuration of one container.
    ///
    /// # Errors
    ///
    /// Returns an error if the container is unknown or cannot be inspected.
    fn inspect(&self, id: &ContainerId) -> Result<ContainerDetails>;

    /// Stops a container, killing it after `timeout`.
    ///
    /// # Errors
    ///
    /// Returns an error if the container cannot be stopped.
    fn stop(&self, id: &ContainerId, timeout: Duration) -> Result<()>;

    /// Starts a stopped container.
    ///
    /// # Errors
    ///
    /// Returns an error if the container cannot be started.
    fn start(&self, id: &ContainerId) -> Result<()>;

    /// Renames a container.
    ///
    /// # Errors
    ///
    /// Returns an error if the rename is refused.
    fn rename(&self, id: &ContainerId, new_name: &str) -> Result<()>;
}
