//! Formatted output helpers for CLI commands.
//!
//! Column-aligned tables for migration sweeps and a multi-line rendering
//! of admission rejections.

use std::fmt::Write;

use ontree_compose::ValidationError;
use ontree_runtime::migrate::{AppOutcome, LegacyCandidate, MigrationReport};

/// Renders a rejected bundle as labelled lines.
#[must_use]
pub fn format_violation(violation: &ValidationError) -> String {
    let mut out = String::from("REJECTED\n");
    let _ = writeln!(out, "  service: {}", violation.service);
    let _ = writeln!(out, "  rule:    {}", violation.rule);
    let _ = writeln!(out, "  detail:  {}", violation.detail);
    out
}

/// Renders the legacy containers a sweep would touch.
#[must_use]
pub fn format_candidates(candidates: &[LegacyCandidate]) -> String {
    if candidates.is_empty() {
        return "No legacy containers found.\n".to_owned();
    }
    let mut out = String::new();
    let _ = writeln!(
        out,
        "{:<24} {:<32} {:<10} IMAGE",
        "APP", "CONTAINER", "STATE"
    );
    for candidate in candidates {
        let _ = writeln!(
            out,
            "{:<24} {:<32} {:<10} {}",
            candidate.app, candidate.container_name, candidate.state, candidate.image
        );
    }
    out
}

/// Renders a sweep report: one row per application, then a summary line.
#[must_use]
pub fn format_report(report: &MigrationReport) -> String {
    if report.results.is_empty() {
        return "No legacy containers found.\n".to_owned();
    }
    let mut out = String::new();
    let _ = writeln!(out, "{:<24} {:<32} {:<10} DETAIL", "APP", "CONTAINER", "RESULT");
    for result in &report.results {
        let (status, detail) = match &result.outcome {
            AppOutcome::Migrated { bundle, .. } => ("migrated", bundle.display().to_string()),
            AppOutcome::Skipped { reason } => ("skipped", reason.clone()),
            AppOutcome::Failed { reason } => ("failed", reason.clone()),
        };
        let _ = writeln!(
            out,
            "{:<24} {:<32} {:<10} {detail}",
            result.app, result.container, status
        );
        if let AppOutcome::Migrated { warnings, .. } = &result.outcome {
            for warning in warnings {
                let _ = writeln!(out, "  warning: {warning}");
            }
        }
    }
    let _ = writeln!(out, "\n{report}");
    out
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use ontree_common::naming::derive_identifier;
    use ontree_common::types::{ContainerId, ContainerState};
    use ontree_runtime::migrate::AppResult;

    use super::*;

    #[test]
    fn violation_lists_service_rule_and_detail() {
        let violation = ValidationError {
            service: "web".into(),
            rule: "privileged mode".into(),
            detail: "privileged containers are not allowed".into(),
        };
        let text = format_violation(&violation);
        assert!(text.starts_with("REJECTED\n"));
        assert!(text.contains("service: web"));
        assert!(text.contains("rule:    privileged mode"));
    }

    #[test]
    fn empty_candidates_show_message() {
        assert_eq!(format_candidates(&[]), "No legacy containers found.\n");
    }

    #[test]
    fn candidates_table_has_one_row_each() {
        let candidates = vec![LegacyCandidate {
            app: derive_identifier("wiki"),
            container_id: ContainerId::new("abc"),
            container_name: "ontree-wiki".into(),
            image: "requarks/wiki:2".into(),
            state: ContainerState::Running,
        }];
        let text = format_candidates(&candidates);
        assert_eq!(text.lines().count(), 2);
        assert!(text.contains("ontree-wiki"));
        assert!(text.contains("running"));
        assert!(text.lines().next().unwrap().ends_with("IMAGE"));
        assert!(text.lines().nth(1).unwrap().ends_with("requarks/wiki:2"));
    }

    #[test]
    fn report_shows_warnings_and_summary() {
        let report = MigrationReport {
            results: vec![
                AppResult {
                    app: derive_identifier("wiki"),
                    container: "ontree-wiki".into(),
                    outcome: AppOutcome::Migrated {
                        bundle: PathBuf::from("/opt/ontree/apps/wiki/docker-compose.yml"),
                        warnings: vec!["rename to ontree-wiki-app-1 failed: busy".into()],
                    },
                },
                AppResult {
                    app: derive_identifier("blog"),
                    container: "ontree-blog".into(),
                    outcome: AppOutcome::Skipped {
                        reason: "already migrated".into(),
                    },
                },
            ],
        };
        let text = format_report(&report);
        assert!(text.contains("migrated"));
        assert!(text.contains("  warning: rename to ontree-wiki-app-1 failed: busy"));
        assert!(text.contains("already migrated"));
        assert!(text.trim_end().ends_with("1 migrated, 1 skipped, 0 failed"));
    }
}
