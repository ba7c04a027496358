//! [`RuntimeClient`] backed by the `docker` command-line client.
//!
//! Each operation runs one `docker` invocation and decodes its JSON output.
//! Nothing is cached between calls.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::process::{Command, Output, Stdio};
use std::time::Duration;

use ontree_common::error::{OntreeError, Result};
use ontree_common::types::{ContainerId, ContainerState};
use serde::Deserialize;

use super::{
    ContainerDetails, ContainerSummary, MountKind, MountPoint, PortBinding, RuntimeClient,
};

const DOCKER_BINARY: &str = "docker";

/// Runtime client that shells out to the `docker` binary.
#[derive(Debug, Clone)]
pub struct DockerCli {
    binary: PathBuf,
}

impl DockerCli {
    /// Locates `docker` on `PATH`.
    ///
    /// # Errors
    ///
    /// Returns [`OntreeError::NotFound`] if the binary is not installed.
    pub fn detect() -> Result<Self> {
        let binary = which::which(DOCKER_BINARY).map_err(|_| OntreeError::NotFound {
            kind: "docker binary",
            id: format!("{DOCKER_BINARY} (is Docker installed and on PATH?)"),
        })?;
        Ok(Self::with_binary(binary))
    }

    /// Uses an explicit binary path (e.g. `podman` with docker compatibility).
    #[must_use]
    pub fn with_binary(binary: impl Into<PathBuf>) -> Self {
        Self {
            binary: binary.into(),
        }
    }

    /// Path of the binary this client invokes.
    #[must_use]
    pub fn binary(&self) -> &Path {
        &self.binary
    }

    fn run(&self, operation: &'static str, args: &[&str]) -> Result<Output> {
        tracing::debug!(binary = %self.binary.display(), ?args, "invoking runtime");
        let output = Command::new(&self.binary)
            .args(args)
            .stdin(Stdio::null())
            .output()
            .map_err(|e| OntreeError::io(&self.binary, e))?;

        if output.status.success() {
            Ok(output)
        } else {
            Err(OntreeError::Runtime {
                operation,
                message: String::from_utf8_lossy(&output.stderr).trim().to_owned(),
            })
        }
    }
}

impl RuntimeClient for DockerCli {
    fn list(&self, all: bool) -> Result<Vec<ContainerSummary>> {
        let mut args = vec!["ps", "--no-trunc", "--format", "{{json .}}"];
        if all {
            args.push("--all");
        }
        let output = self.run("list", &args)?;
        parse_ps_lines(&String::from_utf8_lossy(&output.stdout))
    }

    fn inspect(&self, id: &ContainerId) -> Result<ContainerDetails> {
        let output = self.run("inspect", &["inspect", "--type", "container", id.as_str()])?;
        parse_inspect(&output.stdout)?
            .ok_or_else(|| OntreeError::NotFound {
                kind: "container",
                id: id.to_string(),
            })
    }

    fn stop(&self, id: &ContainerId, timeout: Duration) -> Result<()> {
        let secs = timeout.as_secs().to_string();
        let _ = self.run("stop", &["stop", "--time", secs.as_str(), id.as_str()])?;
        Ok(())
    }

    fn start(&self, id: &ContainerId) -> Result<()> {
        let _ = self.run("start", &["start", id.as_str()])?;
        Ok(())
    }

    fn rename(&self, id: &ContainerId, new_name: &str) -> Result<()> {
        let _ = self.run("rename", &["rename", id.as_str(), new_name])?;
        Ok(())
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct PsLine {
    #[serde(rename = "ID")]
    id: String,
    names: String,
    image: String,
    state: String,
}

fn parse_ps_lines(stdout: &str) -> Result<Vec<ContainerSummary>> {
    stdout
        .lines()
        .filter(|line| !line.trim().is_empty())
        .map(|line| -> Result<ContainerSummary> {
            let ps: PsLine = serde_json::from_str(line)?;
            // `docker ps` joins aliases with commas; the first is the name.
            let name = ps.names.split(',').next().unwrap_or_default().to_owned();
            Ok(ContainerSummary {
                id: ContainerId::new(ps.id),
                name,
                image: ps.image,
                state: ContainerState::from_runtime_status(&ps.state),
            })
        })
        .collect()
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct Inspect {
    id: String,
    name: String,
    config: InspectConfig,
    #[serde(default)]
    host_config: InspectHostConfig,
    #[serde(default)]
    mounts: Vec<InspectMount>,
    #[serde(default)]
    network_settings: InspectNetworkSettings,
    #[serde(default)]
    state: InspectState,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct InspectConfig {
    image: String,
    #[serde(default)]
    env: Option<Vec<String>>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct InspectHostConfig {
    #[serde(default)]
    port_bindings: Option<BTreeMap<String, Option<Vec<InspectPortBinding>>>>,
    #[serde(default)]
    restart_policy: Option<InspectRestartPolicy>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct InspectPortBinding {
    #[serde(default)]
    host_ip: String,
    #[serde(default)]
    host_port: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct InspectRestartPolicy {
    #[serde(default)]
    name: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct InspectMount {
    #[serde(rename = "Type", default)]
    kind: String,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    source: String,
    destination: String,
    #[serde(rename = "RW", default)]
    rw: bool,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct InspectNetworkSettings {
    #[serde(default)]
    networks: Option<BTreeMap<String, serde::de::IgnoredAny>>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct InspectState {
    #[serde(default)]
    running: bool,
}

fn parse_inspect(stdout: &[u8]) -> Result<Option<ContainerDetails>> {
    let mut entries: Vec<Inspect> = serde_json::from_slice(stdout)?;
    if entries.is_empty() {
        return Ok(None);
    }
    Ok(Some(into_details(entries.swap_remove(0))))
}

fn into_details(raw: Inspect) -> ContainerDetails {
    let mut ports: Vec<PortBinding> = raw
        .host_config
        .port_bindings
        .unwrap_or_default()
        .into_iter()
        .flat_map(|(container_port, bindings)| {
            bindings
                .unwrap_or_default()
                .into_iter()
                .filter(|b| !b.host_port.is_empty())
                .map(move |b| PortBinding {
                    container_port: container_port.clone(),
                    host_ip: Some(b.host_ip).filter(|ip| !ip.is_empty()),
                    host_port: b.host_port,
                })
        })
        .collect();
    ports.sort();

    let mounts = raw
        .mounts
        .into_iter()
        .map(|m| MountPoint {
            kind: match m.kind.as_str() {
                "bind" => MountKind::Bind,
                "volume" => MountKind::Volume,
                _ => MountKind::Other,
            },
            source: m.source,
            name: m.name.filter(|n| !n.is_empty()),
            destination: m.destination,
            read_only: !m.rw,
        })
        .collect();

    ContainerDetails {
        id: ContainerId::new(raw.id),
        name: raw.name,
        image: raw.config.image,
        env: raw.config.env.unwrap_or_default(),
        mounts,
        ports,
        restart_policy: raw
            .host_config
            .restart_policy
            .map(|p| p.name)
            .filter(|name| !name.is_empty()),
        networks: raw
            .network_settings
            .networks
            .map(|n| n.into_keys().collect())
            .unwrap_or_default(),
        running: raw.state.running,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const INSPECT: &str = r#"[{
        "Id": "4f2a9c",
        "Name": "/ontree-wiki",
        "State": {"Status": "running", "Running": true},
        "Config": {
            "Image": "requarks/wiki:2",
            "Env": ["PATH=/usr/bin", "DB_PASSWORD=hunter2"]
        },
        "HostConfig": {
            "PortBindings": {
                "3000/tcp": [{"HostIp": "", "HostPort": "8080"}],
                "53/udp": [{"HostIp": "127.0.0.1", "HostPort": "5353"}],
                "9000/tcp": null
            },
            "RestartPolicy": {"Name": "unless-stopped", "MaximumRetryCount": 0}
        },
        "Mounts": [
            {"Type": "bind", "Source": "/opt/ontree/apps/wiki/data", "Destination": "/wiki/data", "Mode": "", "RW": true},
            {"Type": "volume", "Name": "wiki_cache", "Source": "/var/lib/docker/volumes/wiki_cache/_data", "Destination": "/cache", "RW": false}
        ],
        "NetworkSettings": {"Networks": {"bridge": {}, "proxy": {"IPAddress": "172.18.0.2"}}}
    }]"#;

    #[test]
    fn inspect_output_maps_to_details() {
        let details = parse_inspect(INSPECT.as_bytes()).unwrap().unwrap();
        assert_eq!(details.id.as_str(), "4f2a9c");
        assert_eq!(details.name, "/ontree-wiki");
        assert_eq!(details.image, "requarks/wiki:2");
        assert_eq!(details.env.len(), 2);
        assert!(details.running);
        assert_eq!(details.restart_policy.as_deref(), Some("unless-stopped"));
        assert_eq!(details.networks, vec!["bridge".to_owned(), "proxy".to_owned()]);

        assert_eq!(details.ports.len(), 2);
        assert_eq!(details.ports[0].container_port, "3000/tcp");
        assert_eq!(details.ports[0].host_ip, None);
        assert_eq!(details.ports[1].host_ip.as_deref(), Some("127.0.0.1"));

        assert_eq!(details.mounts[0].kind, MountKind::Bind);
        assert!(!details.mounts[0].read_only);
        assert_eq!(details.mounts[1].kind, MountKind::Volume);
        assert_eq!(details.mounts[1].name.as_deref(), Some("wiki_cache"));
        assert!(details.mounts[1].read_only);
    }

    #[test]
    fn empty_inspect_array_is_none() {
        assert!(parse_inspect(b"[]").unwrap().is_none());
    }

    #[test]
    fn ps_lines_map_to_summaries() {
        let stdout = concat!(
            r#"{"ID":"aaa","Names":"ontree-wiki","Image":"wiki:2","State":"running","Status":"Up 2 hours"}"#,
            "\n",
            r#"{"ID":"bbb","Names":"nginx,alias","Image":"nginx","State":"exited","Status":"Exited (0)"}"#,
            "\n\n"
        );
        let summaries = parse_ps_lines(stdout).unwrap();
        assert_eq!(summaries.len(), 2);
        assert_eq!(summaries[0].name, "ontree-wiki");
        assert_eq!(summaries[0].state, ContainerState::Running);
        assert_eq!(summaries[1].name, "nginx");
        assert_eq!(summaries[1].state, ContainerState::Stopped);
    }

    #[test]
    fn missing_binary_reports_io_error() {
        let client = DockerCli::with_binary("/nonexistent/docker-binary");
        let err = client.list(true).unwrap_err();
        assert!(matches!(err, OntreeError::Io { .. }), "got: {err}");
    }
}
