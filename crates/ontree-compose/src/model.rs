//! Typed model of a bundle definition (`docker-compose.yml`).
//!
//! Only the keys the admission layer reads or writes are modelled. Any
//! other key in a user document is ignored on parse, so the validator
//! never rejects a bundle for using compose features it does not police.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// A parsed bundle definition.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ComposeFile {
    /// Services keyed by name. Iteration order is lexicographic.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub services: BTreeMap<String, Service>,

    /// Named volumes declared at the top level.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub volumes: BTreeMap<String, Option<VolumeDecl>>,

    /// Networks declared at the top level.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub networks: BTreeMap<String, Option<NetworkDecl>>,

    /// Non-functional provenance annotation written by the migration engine.
    #[serde(rename = "x-ontree", default, skip_serializing_if = "Option::is_none")]
    pub provenance: Option<Provenance>,
}

impl ComposeFile {
    /// Whether `name` is declared in the top-level `volumes:` map.
    #[must_use]
    pub fn declares_volume(&self, name: &str) -> bool {
        self.volumes.contains_key(name)
    }
}

/// One service of a bundle.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Service {
    /// Image reference.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,

    /// Explicit container name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub container_name: Option<String>,

    /// Privileged mode flag.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub privileged: Option<bool>,

    /// Linux capabilities added to the default set.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub cap_add: Vec<String>,

    /// Host port bindings.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub ports: Vec<PortEntry>,

    /// Environment variables.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub environment: Option<Environment>,

    /// Volume and bind-mount attachments.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub volumes: Vec<VolumeEntry>,

    /// Restart policy (`always`, `unless-stopped`, ...).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub restart: Option<String>,

    /// Network attachments.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub networks: Option<ServiceNetworks>,
}

impl Service {
    /// Whether the service asks for privileged mode.
    #[must_use]
    pub fn is_privileged(&self) -> bool {
        self.privileged.unwrap_or(false)
    }
}

/// A volume attachment in either compose syntax.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum VolumeEntry {
    /// `source:target[:mode]` or a bare target for an anonymous volume.
    Short(String),
    /// `{type, source, target, read_only}` mapping.
    Long(LongVolume),
}

/// Long-form volume attachment.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LongVolume {
    /// `bind`, `volume`, `tmpfs`, ...
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    /// Host path or volume name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    /// Path inside the container.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target: Option<String>,
    /// Mount read-only.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub read_only: Option<bool>,
}

impl VolumeEntry {
    /// Host-side source of the attachment, if any.
    ///
    /// A short entry with a single component (`/data`) is an anonymous
    /// volume and has no source.
    #[must_use]
    pub fn source(&self) -> Option<&str> {
        match self {
            Self::Short(spec) => {
                let mut parts = spec.splitn(2, ':');
                let first = parts.next()?;
                parts.next().map(|_| first).filter(|s| !s.is_empty())
            }
            Self::Long(long) => long.source.as_deref().filter(|s| !s.is_empty()),
        }
    }

    /// Whether a long-form entry declares `type: bind`.
    #[must_use]
    pub fn is_explicit_bind(&self) -> bool {
        matches!(self, Self::Long(long) if long.kind.as_deref() == Some("bind"))
    }
}

/// A port binding entry. Only carried through, never policed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PortEntry {
    /// `"8080:80"`, `"127.0.0.1:8080:80/udp"`.
    Short(String),
    /// Bare container port.
    Number(u32),
    /// Long-form mapping.
    Long(serde_yaml::Mapping),
}

/// Environment in list (`["K=V"]`) or map (`{K: V}`) form.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Environment {
    /// `KEY=VALUE` strings.
    List(Vec<String>),
    /// Key to optional scalar.
    Map(BTreeMap<String, Option<EnvValue>>),
}

/// A scalar value in map-form environment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum EnvValue {
    /// `true` / `false`.
    Bool(bool),
    /// Integer literal.
    Int(i64),
    /// Float literal.
    Float(f64),
    /// Any string.
    Str(String),
}

/// Service network attachments in list or map form.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ServiceNetworks {
    /// Network names.
    List(Vec<String>),
    /// Network name to per-service options.
    Map(BTreeMap<String, Option<serde_yaml::Value>>),
}

/// Top-level named volume declaration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VolumeDecl {
    /// Volume is created outside this bundle.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub external: Option<bool>,
    /// Volume driver.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub driver: Option<String>,
    /// Runtime name of the volume when it differs from the key.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

/// Top-level network declaration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetworkDecl {
    /// Network is created outside this bundle.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub external: Option<bool>,
    /// Network driver.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub driver: Option<String>,
}

/// Where a bundle came from when it was synthesized by migration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Provenance {
    /// Legacy container name the bundle was reconstructed from.
    pub migrated_from: String,
    /// RFC 3339 timestamp of the migration.
    pub migration_date: String,
}

/// Parses raw bundle text.
///
/// Merge keys (`<<: *anchor`) are expanded before the typed decode, so
/// settings pulled in from a shared `x-` block are seen by the policy.
///
/// # Errors
///
/// Returns the YAML error if the text is not a valid bundle document.
pub fn parse(raw: &str) -> Result<ComposeFile, serde_yaml::Error> {
    if raw.trim().is_empty() {
        return Ok(ComposeFile::default());
    }
    let mut value: serde_yaml::Value = serde_yaml::from_str(raw)?;
    // A document holding only comments is null, not an empty mapping.
    if value.is_null() {
        return Ok(ComposeFile::default());
    }
    value.apply_merge()?;
    serde_yaml::from_value(value)
}
