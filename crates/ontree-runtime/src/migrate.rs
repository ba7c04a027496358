//! Legacy-to-current migration sweep.
//!
//! Legacy applications ran as a single container named `ontree-<app>`.
//! The sweep reconstructs a bundle for each of them, writes it under the
//! application directory, and renames the container to
//! `ontree-<app>-app-1`.
//!
//! The sweep is sequential and at-least-once. An application that already
//! has a bundle file is skipped, so re-running is safe. A failed
//! application is recorded and the sweep moves on; nothing that already
//! succeeded is rolled back.

use std::collections::btree_map::Entry;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Instant;

use ontree_common::config::OntreeConfig;
use ontree_common::constants::{MIGRATED_INSTANCE, MIGRATED_SERVICE_NAME};
use ontree_common::error::OntreeError;
use ontree_common::naming;
use ontree_common::types::{AppId, ContainerId, ContainerState};
use ontree_compose::Validator;
use thiserror::Error;

use crate::client::RuntimeClient;
use crate::layout::{self, AppLayout};
use crate::{secrets, synth};

/// A legacy container selected for migration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LegacyCandidate {
    /// Application identifier parsed from the container name.
    pub app: AppId,
    /// Runtime identifier of the container.
    pub container_id: ContainerId,
    /// Current container name, without a leading `/`.
    pub container_name: String,
    /// Image the container runs.
    pub image: String,
    /// State at discovery time.
    pub state: ContainerState,
}

/// Containers found by one scan of the runtime.
struct Discovery {
    candidates: Vec<LegacyCandidate>,
    /// Later containers whose name folds to an identifier already taken.
    duplicates: Vec<LegacyCandidate>,
}

/// What happened to one application.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AppOutcome {
    /// Bundle written. Cutover problems are listed as warnings.
    Migrated {
        /// Path of the written bundle.
        bundle: PathBuf,
        /// Runtime calls that failed during cutover.
        warnings: Vec<String>,
    },
    /// Nothing done.
    Skipped {
        /// Why the application was skipped.
        reason: String,
    },
    /// Migration of this application failed.
    Failed {
        /// Why it failed.
        reason: String,
    },
}

/// Per-application entry of a [`MigrationReport`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppResult {
    /// Application identifier.
    pub app: AppId,
    /// Legacy container name.
    pub container: String,
    /// Outcome.
    pub outcome: AppOutcome,
}

/// Summary of a sweep.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MigrationReport {
    /// One entry per candidate, in application order.
    pub results: Vec<AppResult>,
}

impl MigrationReport {
    /// Number of migrated applications.
    #[must_use]
    pub fn migrated(&self) -> usize {
        self.count(|o| matches!(o, AppOutcome::Migrated { .. }))
    }

    /// Number of skipped applications.
    #[must_use]
    pub fn skipped(&self) -> usize {
        self.count(|o| matches!(o, AppOutcome::Skipped { .. }))
    }

    /// Number of failed applications.
    #[must_use]
    pub fn failed(&self) -> usize {
        self.count(|o| matches!(o, AppOutcome::Failed { .. }))
    }

    /// Whether any application failed.
    #[must_use]
    pub fn has_failures(&self) -> bool {
        self.failed() > 0
    }

    fn count(&self, pred: impl Fn(&AppOutcome) -> bool) -> usize {
        self.results.iter().filter(|r| pred(&r.outcome)).count()
    }
}

impl fmt::Display for MigrationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} migrated, {} skipped, {} failed",
            self.migrated(),
            self.skipped(),
            self.failed()
        )
    }
}

/// Why a sweep did not complete cleanly.
#[derive(Debug, Error)]
pub enum MigrateError {
    /// Containers could not be listed; nothing was attempted.
    #[error("failed to discover legacy containers: {0}")]
    Discover(#[source] OntreeError),

    /// The sweep ran but at least one application failed.
    #[error("migration incomplete: {report}{}", failure_list(.report))]
    Incomplete {
        /// Full per-application report.
        report: MigrationReport,
    },
}

fn failure_list(report: &MigrationReport) -> String {
    report
        .results
        .iter()
        .filter_map(|r| match &r.outcome {
            AppOutcome::Failed { reason } => Some(format!("; {}: {reason}", r.app)),
            _ => None,
        })
        .collect()
}

/// Drives the migration sweep against a runtime client.
pub struct Migrator {
    client: Box<dyn RuntimeClient>,
    config: OntreeConfig,
    cancel: Option<Arc<AtomicBool>>,
    deadline: Option<Instant>,
}

impl Migrator {
    /// Creates a migrator for the given runtime and configuration.
    #[must_use]
    pub fn new(client: Box<dyn RuntimeClient>, config: OntreeConfig) -> Self {
        Self {
            client,
            config,
            cancel: None,
            deadline: None,
        }
    }

    /// Stops the sweep between applications once `flag` is set.
    #[must_use]
    pub fn with_cancel_flag(mut self, flag: Arc<AtomicBool>) -> Self {
        self.cancel = Some(flag);
        self
    }

    /// Stops the sweep between applications once `deadline` has passed.
    #[must_use]
    pub fn with_deadline(mut self, deadline: Instant) -> Self {
        self.deadline = Some(deadline);
        self
    }

    /// Configuration in use.
    #[must_use]
    pub const fn config(&self) -> &OntreeConfig {
        &self.config
    }

    /// Finds legacy single-container applications.
    ///
    /// Only managed names with exactly one separator qualify. When
    /// `filter` is non-empty, only the listed applications are returned.
    ///
    /// # Errors
    ///
    /// Returns an error if the runtime cannot list containers.
    pub fn discover(&self, filter: &[String]) -> Result<Vec<LegacyCandidate>, OntreeError> {
        Ok(self.scan(filter)?.candidates)
    }

    fn scan(&self, filter: &[String]) -> Result<Discovery, OntreeError> {
        let wanted: BTreeSet<AppId> = filter
            .iter()
            .map(|f| naming::derive_identifier(f))
            .collect();

        let mut candidates: BTreeMap<AppId, LegacyCandidate> = BTreeMap::new();
        let mut duplicates = Vec::new();
        for summary in self.client.list(true)? {
            if !naming::is_managed(&summary.name) {
                continue;
            }
            let Some(app) = naming::legacy_app_id(&summary.name) else {
                continue;
            };
            if !wanted.is_empty() && !wanted.contains(&app) {
                tracing::debug!(app = %app, "not in filter, ignoring");
                continue;
            }
            let candidate = LegacyCandidate {
                app: app.clone(),
                container_id: summary.id,
                container_name: summary.name.trim_start_matches('/').to_owned(),
                image: summary.image,
                state: summary.state,
            };
            match candidates.entry(app) {
                Entry::Vacant(slot) => {
                    let _ = slot.insert(candidate);
                }
                Entry::Occupied(kept) => {
                    tracing::warn!(
                        app = %kept.key(),
                        kept = %kept.get().container_name,
                        ignored = %candidate.container_name,
                        "duplicate legacy identifier, container left untouched"
                    );
                    duplicates.push(candidate);
                }
            }
        }

        tracing::info!(
            found = candidates.len(),
            duplicates = duplicates.len(),
            "discovered legacy containers"
        );
        Ok(Discovery {
            candidates: candidates.into_values().collect(),
            duplicates,
        })
    }

    /// Runs the sweep.
    ///
    /// # Errors
    ///
    /// Returns [`MigrateError::Discover`] if listing fails and
    /// [`MigrateError::Incomplete`] (carrying the full report) if any
    /// application failed.
    pub fn run(&self, filter: &[String]) -> Result<MigrationReport, MigrateError> {
        let Discovery {
            candidates,
            duplicates,
        } = self.scan(filter).map_err(MigrateError::Discover)?;

        let mut report = MigrationReport::default();
        for candidate in candidates {
            let outcome = if let Some(reason) = self.interrupted() {
                AppOutcome::Skipped {
                    reason: reason.to_owned(),
                }
            } else {
                self.migrate_one(&candidate)
            };
            match &outcome {
                AppOutcome::Migrated { warnings, .. } => {
                    tracing::info!(app = %candidate.app, warnings = warnings.len(), "application migrated");
                }
                AppOutcome::Skipped { reason } => {
                    tracing::info!(app = %candidate.app, %reason, "application skipped");
                }
                AppOutcome::Failed { reason } => {
                    tracing::error!(app = %candidate.app, %reason, "application migration failed");
                }
            }
            report.results.push(AppResult {
                app: candidate.app,
                container: candidate.container_name,
                outcome,
            });
        }

        report
            .results
            .extend(duplicates.into_iter().map(|duplicate| AppResult {
                app: duplicate.app,
                container: duplicate.container_name,
                outcome: AppOutcome::Skipped {
                    reason: "duplicate identifier".into(),
                },
            }));

        tracing::info!(summary = %report, "migration sweep finished");
        if report.has_failures() {
            Err(MigrateError::Incomplete { report })
        } else {
            Ok(report)
        }
    }

    fn interrupted(&self) -> Option<&'static str> {
        if self.cancel.as_ref().is_some_and(|c| c.load(Ordering::SeqCst)) {
            return Some("sweep cancelled");
        }
        if self.deadline.is_some_and(|d| Instant::now() >= d) {
            return Some("sweep deadline exceeded");
        }
        None
    }

    fn migrate_one(&self, candidate: &LegacyCandidate) -> AppOutcome {
        let app = &candidate.app;
        let layout = AppLayout::new(app, &self.config);

        if layout.is_migrated() {
            tracing::info!(
                app = %app,
                path = %layout.compose_path.display(),
                "bundle already present, nothing to do"
            );
            return AppOutcome::Skipped {
                reason: "already migrated".into(),
            };
        }

        match self.write_bundle(candidate, &layout) {
            Ok(running) => AppOutcome::Migrated {
                bundle: layout.compose_path.clone(),
                warnings: self.cutover(candidate, running),
            },
            Err(reason) => AppOutcome::Failed { reason },
        }
    }

    /// Writes the sidecar and bundle. Returns whether the container was
    /// running at inspection time.
    fn write_bundle(&self, candidate: &LegacyCandidate, layout: &AppLayout) -> Result<bool, String> {
        let app = &candidate.app;
        layout.create_dirs().map_err(|e| e.to_string())?;

        let details = self
            .client
            .inspect(&candidate.container_id)
            .map_err(|e| e.to_string())?;

        let bundle = synth::synthesize(&details, app, layout, chrono::Utc::now());
        Validator::from_config(app.clone(), &self.config)
            .validate_file(&bundle)
            .map_err(|e| format!("synthesized bundle rejected: {e}"))?;
        let yaml = serde_yaml::to_string(&bundle)
            .map_err(|e| format!("failed to render bundle: {e}"))?;

        let secret_lines = secrets::secret_entries(&details.env);
        if !secret_lines.is_empty() {
            let names: Vec<&str> = secret_lines
                .iter()
                .map(|entry| secrets::split_entry(entry).0)
                .collect();
            tracing::warn!(
                app = %app,
                variables = ?names,
                "secret-looking variables are kept in the bundle environment and copied to the sidecar"
            );
            layout::write_restricted(&layout.secrets_path, &secrets::render_sidecar(&secret_lines))
                .map_err(|e| e.to_string())?;
        }
        layout::write_restricted(&layout.compose_path, &yaml).map_err(|e| e.to_string())?;

        Ok(details.running)
    }

    /// Stops, renames and restarts the container. Failures become warnings.
    fn cutover(&self, candidate: &LegacyCandidate, running: bool) -> Vec<String> {
        let id = &candidate.container_id;
        let new_name =
            naming::container_identity(&candidate.app, MIGRATED_SERVICE_NAME, MIGRATED_INSTANCE);
        let mut warnings = Vec::new();

        let mut stopped = false;
        if running {
            tracing::info!(container = %candidate.container_name, "stopping container");
            match self.client.stop(id, self.config.stop_timeout()) {
                Ok(()) => stopped = true,
                Err(e) => {
                    tracing::warn!(container = %candidate.container_name, error = %e, "stop failed");
                    warnings.push(format!("stop failed: {e}"));
                }
            }
        }

        tracing::info!(from = %candidate.container_name, to = %new_name, "renaming container");
        if let Err(e) = self.client.rename(id, &new_name) {
            tracing::warn!(
                container = %candidate.container_name,
                error = %e,
                "rename failed, container keeps its legacy name"
            );
            warnings.push(format!("rename to {new_name} failed: {e}"));
        }

        if stopped {
            tracing::info!(container = %new_name, "starting container");
            if let Err(e) = self.client.start(id) {
                tracing::warn!(container = %new_name, error = %e, "start failed");
                warnings.push(format!("start failed: {e}"));
            }
        }
        warnings
    }
}

impl fmt::Debug for Migrator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Migrator")
            .field("config", &self.config)
            .field("deadline", &self.deadline)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn report(outcomes: Vec<AppOutcome>) -> MigrationReport {
        MigrationReport {
            results: outcomes
                .into_iter()
                .enumerate()
                .map(|(i, outcome)| AppResult {
                    app: naming::derive_identifier(&format!("app{i}")),
                    container: format!("ontree-app{i}"),
                    outcome,
                })
                .collect(),
        }
    }

    #[test]
    fn report_counts_outcomes() {
        let r = report(vec![
            AppOutcome::Migrated {
                bundle: PathBuf::from("/x"),
                warnings: Vec::new(),
            },
            AppOutcome::Skipped {
                reason: "already migrated".into(),
            },
            AppOutcome::Failed {
                reason: "boom".into(),
            },
        ]);
        assert_eq!((r.migrated(), r.skipped(), r.failed()), (1, 1, 1));
        assert!(r.has_failures());
        assert_eq!(r.to_string(), "1 migrated, 1 skipped, 1 failed");
    }

    #[test]
    fn incomplete_error_lists_failures() {
        let err = MigrateError::Incomplete {
            report: report(vec![AppOutcome::Failed {
                reason: "inspect failed".into(),
            }]),
        };
        assert_eq!(
            err.to_string(),
            "migration incomplete: 0 migrated, 0 skipped, 1 failed; app0: inspect failed"
        );
    }
}
