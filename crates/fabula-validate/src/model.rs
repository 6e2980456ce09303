use serde::{Deserialize, Serialize};

use fabula_graph::{ChoiceId, SceneId};

// ─────────────────────────────────────────────
// Severity / category
// ─────────────────────────────────────────────

/// Issue severity. The derived `Ord` (Error < Warning < Info) drives the
/// stable sort of the final issue list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// Must be fixed; blocks overall validity.
    Error,
    /// Should be fixed; never blocks validity.
    Warning,
    /// Informational only.
    Info,
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Severity::Error => write!(f, "error"),
            Severity::Warning => write!(f, "warning"),
            Severity::Info => write!(f, "info"),
        }
    }
}

/// What kind of structural problem an issue describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IssueCategory {
    /// Entry-point configuration problems.
    Configuration,
    /// Choices pointing at nothing or at missing scenes.
    InvalidRelationship,
    /// Non-entry scene with no incoming choice.
    Orphan,
    /// Scene with no outgoing choices.
    DeadEnd,
    /// Scene with neither content nor description.
    IncompleteContent,
    /// Choice whose target equals its source.
    CircularReference,
}

// ─────────────────────────────────────────────
// Issue / report
// ─────────────────────────────────────────────

/// One validation finding.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationIssue {
    pub severity: Severity,
    pub category: IssueCategory,
    /// Human-readable description for the editor.
    pub message: String,
    /// The scene this issue concerns, if any.
    pub scene_id: Option<SceneId>,
    /// The choice this issue concerns, if any.
    pub choice_id: Option<ChoiceId>,
}

/// Summary statistics accompanying the issue list.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationStats {
    pub total_scenes: usize,
    pub total_choices: usize,
    pub error_count: usize,
    pub warning_count: usize,
    pub info_count: usize,
    /// Scenes reachable from the entry (entry included).
    pub reachable_count: usize,
    pub orphan_count: usize,
    pub dead_end_count: usize,
    pub incomplete_count: usize,
}

/// Result of running the full validation battery over one snapshot.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationReport {
    /// `error_count == 0`. Warnings and infos never block validity.
    pub is_valid: bool,
    /// Stable-sorted by severity; discovery order within a severity.
    pub issues: Vec<ValidationIssue>,
    pub stats: ValidationStats,
}

impl ValidationReport {
    /// Issues of one severity, in report order.
    pub fn issues_with_severity(&self, severity: Severity) -> impl Iterator<Item = &ValidationIssue> {
        self.issues.iter().filter(move |i| i.severity == severity)
    }
}
