//! # fabula-layout
//!
//! Hierarchical node layout for narrative graphs.
//!
//! - [`engine::compute_layout`] — left-to-right, depth-ranked positions
//!   with per-node sizing from estimated title width
//! - [`cache::LayoutCache`]     — bounded per-project memoization keyed by
//!   structural hashes, so cosmetic edits (titles, selection, collapse
//!   state) never trigger recomputation

pub mod cache;
pub mod engine;

pub use cache::{choice_signature, structural_hash, LayoutCache, DEFAULT_CACHE_CAPACITY};
pub use engine::{compute_layout, node_size, LayoutConfig, NodePosition, NodeSize};
