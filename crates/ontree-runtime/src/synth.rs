//! Reconstruction of a bundle definition from a legacy container.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use ontree_common::constants::{MIGRATED_INSTANCE, MIGRATED_SERVICE_NAME};
use ontree_common::naming;
use ontree_common::types::AppId;
use ontree_compose::model::{
    ComposeFile, Environment, NetworkDecl, PortEntry, Provenance, Service, ServiceNetworks,
    VolumeDecl, VolumeEntry,
};

use crate::client::{ContainerDetails, MountKind, MountPoint, PortBinding};
use crate::layout::AppLayout;
use crate::secrets;

/// Networks every container joins implicitly.
pub const DEFAULT_NETWORKS: &[&str] = &["bridge", "host", "none"];

/// Builds the single-service bundle equivalent to a legacy container.
#[must_use]
pub fn synthesize(
    details: &ContainerDetails,
    app: &AppId,
    layout: &AppLayout,
    now: DateTime<Utc>,
) -> ComposeFile {
    let mut file = ComposeFile::default();

    let volumes = details
        .mounts
        .iter()
        .filter_map(|mount| volume_entry(mount, layout, &mut file.volumes))
        .collect();

    let networks: Vec<String> = details
        .networks
        .iter()
        .filter(|n| !DEFAULT_NETWORKS.contains(&n.as_str()))
        .cloned()
        .collect();
    for network in &networks {
        let _ = file.networks.insert(
            network.clone(),
            Some(NetworkDecl {
                external: Some(true),
                ..NetworkDecl::default()
            }),
        );
    }

    let environment: Vec<String> = details
        .env
        .iter()
        .filter(|entry| !secrets::is_system_variable(secrets::split_entry(entry).0))
        .cloned()
        .collect();

    let service = Service {
        image: Some(details.image.clone()),
        container_name: Some(naming::container_identity(
            app,
            MIGRATED_SERVICE_NAME,
            MIGRATED_INSTANCE,
        )),
        ports: details.ports.iter().map(port_entry).collect(),
        environment: (!environment.is_empty()).then_some(Environment::List(environment)),
        volumes,
        restart: details.restart_policy.clone(),
        networks: (!networks.is_empty()).then_some(ServiceNetworks::List(networks)),
        ..Service::default()
    };
    let _ = file.services.insert(MIGRATED_SERVICE_NAME.to_owned(), service);

    file.provenance = Some(Provenance {
        migrated_from: details.name.trim_start_matches('/').to_owned(),
        migration_date: now.to_rfc3339(),
    });
    file
}

fn volume_entry(
    mount: &MountPoint,
    layout: &AppLayout,
    declared: &mut BTreeMap<String, Option<VolumeDecl>>,
) -> Option<VolumeEntry> {
    let source = match mount.kind {
        MountKind::Bind if layout.owns_legacy_source(&mount.source) => {
            tracing::debug!(
                from = %mount.source,
                to = %layout.mount_reference,
                "redirecting bind mount"
            );
            layout.mount_reference.clone()
        }
        MountKind::Bind => mount.source.clone(),
        MountKind::Volume => {
            let name = mount.name.clone()?;
            let _ = declared.insert(
                name.clone(),
                Some(VolumeDecl {
                    external: Some(true),
                    ..VolumeDecl::default()
                }),
            );
            name
        }
        MountKind::Other => return None,
    };

    let mut spec = format!("{source}:{}", mount.destination);
    if mount.read_only {
        spec.push_str(":ro");
    }
    Some(VolumeEntry::Short(spec))
}

fn port_entry(binding: &PortBinding) -> PortEntry {
    let container = binding
        .container_port
        .strip_suffix("/tcp")
        .unwrap_or(&binding.container_port);
    let spec = match &binding.host_ip {
        Some(ip) if ip != "0.0.0.0" && ip != "::" => {
            format!("{ip}:{}:{container}", binding.host_port)
        }
        _ => format!("{}:{container}", binding.host_port),
    };
    PortEntry::Short(spec)
}
