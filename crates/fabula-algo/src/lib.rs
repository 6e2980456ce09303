//! Graph analysis for narrative snapshots.
//!
//! Pure, synchronous, infallible functions over a [`fabula_graph::GraphSnapshot`]:
//!
//! - **Analysis**: reachability, per-scene depth (BFS from the entry scene),
//!   orphan / dead-end / incomplete-content sets, branching statistics
//! - **Ancestry**: shortest scene-to-root path via reverse BFS over an
//!   inverted adjacency built from choices
//!
//! All computations are O(V+E) and safe on cyclic graphs (visited-set
//! guards). Degenerate inputs (missing or dangling entry scene) degrade to
//! "nothing reachable" rather than failing.

pub mod analysis;
pub mod ancestry;

pub use analysis::{
    analyze, dead_end_set, depth_map, incomplete_set, orphan_set, reachable_set, BranchingStats,
    GraphAnalysis,
};
pub use ancestry::{resolve_ancestry, AncestryPath};
