//! # fabula-validate
//!
//! Structural validation for narrative graph snapshots.
//!
//! Runs a fixed battery of checks (entry configuration, orphans, dead
//! ends, incomplete content, missing/dangling choice targets, self-loops)
//! and returns a severity-classified issue list plus summary statistics.
//! Findings are data, never exceptions: a broken graph validates to an
//! invalid report, not an error.

pub mod engine;
pub mod model;

pub use engine::validate;
pub use model::{
    IssueCategory, Severity, ValidationIssue, ValidationReport, ValidationStats,
};
