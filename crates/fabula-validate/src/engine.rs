//! The validation battery.
//!
//! Runs a fixed sequence of structural checks over one snapshot and
//! returns findings as data — never as errors. Check order is fixed and
//! every check always runs; per-entity loops iterate ids in sorted order,
//! so two runs over the same snapshot produce identical issue lists.

use fabula_algo::{dead_end_set, incomplete_set, orphan_set, reachable_set};
use fabula_graph::GraphSnapshot;

use crate::model::{
    IssueCategory, Severity, ValidationIssue, ValidationReport, ValidationStats,
};

/// Run every structural check over `snapshot`.
pub fn validate(snapshot: &GraphSnapshot) -> ValidationReport {
    let mut issues: Vec<ValidationIssue> = Vec::new();

    let mut scene_ids: Vec<&str> = snapshot.scenes.keys().map(String::as_str).collect();
    scene_ids.sort_unstable();
    let mut choice_ids: Vec<&str> = snapshot.choices.keys().map(String::as_str).collect();
    choice_ids.sort_unstable();

    // 1. Entry scene presence and validity.
    match snapshot.entry_scene_id.as_deref() {
        None => issues.push(ValidationIssue {
            severity: Severity::Error,
            category: IssueCategory::Configuration,
            message: "no entry scene is set".to_string(),
            scene_id: None,
            choice_id: None,
        }),
        Some(entry) if !snapshot.scenes.contains_key(entry) => issues.push(ValidationIssue {
            severity: Severity::Error,
            category: IssueCategory::Configuration,
            message: format!("entry scene '{entry}' does not exist"),
            scene_id: Some(entry.to_string()),
            choice_id: None,
        }),
        Some(_) => {}
    }

    // 2. Orphans.
    let orphans = orphan_set(snapshot);
    for id in scene_ids.iter().filter(|id| orphans.contains(**id)) {
        issues.push(ValidationIssue {
            severity: Severity::Warning,
            category: IssueCategory::Orphan,
            message: format!("scene '{id}' has no incoming choice"),
            scene_id: Some(id.to_string()),
            choice_id: None,
        });
    }

    // 3. Dead ends.
    let dead_ends = dead_end_set(snapshot);
    for id in scene_ids.iter().filter(|id| dead_ends.contains(**id)) {
        issues.push(ValidationIssue {
            severity: Severity::Warning,
            category: IssueCategory::DeadEnd,
            message: format!("scene '{id}' has no outgoing choices"),
            scene_id: Some(id.to_string()),
            choice_id: None,
        });
    }

    // 4. Incomplete content.
    let incomplete = incomplete_set(snapshot);
    for id in scene_ids.iter().filter(|id| incomplete.contains(**id)) {
        issues.push(ValidationIssue {
            severity: Severity::Info,
            category: IssueCategory::IncompleteContent,
            message: format!("scene '{id}' has neither content nor description"),
            scene_id: Some(id.to_string()),
            choice_id: None,
        });
    }

    // 5. Choices with no target at all.
    for id in &choice_ids {
        let choice = &snapshot.choices[*id];
        if choice.target_scene_id.is_none() {
            issues.push(ValidationIssue {
                severity: Severity::Error,
                category: IssueCategory::InvalidRelationship,
                message: format!("choice '{id}' has no target scene"),
                scene_id: Some(choice.source_scene_id.clone()),
                choice_id: Some(id.to_string()),
            });
        }
    }

    // 6. Choices whose target scene does not exist.
    for id in &choice_ids {
        let choice = &snapshot.choices[*id];
        if let Some(target) = choice.target_scene_id.as_deref() {
            if !snapshot.scenes.contains_key(target) {
                issues.push(ValidationIssue {
                    severity: Severity::Error,
                    category: IssueCategory::InvalidRelationship,
                    message: format!("choice '{id}' targets missing scene '{target}'"),
                    scene_id: Some(choice.source_scene_id.clone()),
                    choice_id: Some(id.to_string()),
                });
            }
        }
    }

    // 7. Self-loops.
    for id in &choice_ids {
        let choice = &snapshot.choices[*id];
        if choice.is_self_reference() {
            issues.push(ValidationIssue {
                severity: Severity::Warning,
                category: IssueCategory::CircularReference,
                message: format!(
                    "choice '{id}' loops scene '{}' back to itself",
                    choice.source_scene_id
                ),
                scene_id: Some(choice.source_scene_id.clone()),
                choice_id: Some(id.to_string()),
            });
        }
    }

    // Stable sort: severity groups, discovery order preserved within each.
    issues.sort_by_key(|i| i.severity);

    let error_count = issues.iter().filter(|i| i.severity == Severity::Error).count();
    let warning_count = issues.iter().filter(|i| i.severity == Severity::Warning).count();
    let info_count = issues.len() - error_count - warning_count;

    let stats = ValidationStats {
        total_scenes: snapshot.scene_count(),
        total_choices: snapshot.choice_count(),
        error_count,
        warning_count,
        info_count,
        reachable_count: reachable_set(snapshot).len(),
        orphan_count: orphans.len(),
        dead_end_count: dead_ends.len(),
        incomplete_count: incomplete.len(),
    };

    let report = ValidationReport {
        is_valid: error_count == 0,
        issues,
        stats,
    };
    tracing::debug!(
        is_valid = report.is_valid,
        errors = error_count,
        warnings = warning_count,
        infos = info_count,
        "validated snapshot"
    );
    report
}

// ─────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────
