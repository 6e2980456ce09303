//! Depth-ranked hierarchical layout.
//!
//! Scenes are placed left-to-right by BFS depth; unreachable scenes sort
//! into one extra column past the deepest reachable rank. Within a rank,
//! nodes settle near the weighted barycenter of their parents, with the
//! first and last sibling of each parent pulled harder toward the parent's
//! line. The weighting is purely cosmetic (stable-looking trees), not a
//! correctness requirement.

use std::collections::HashMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use fabula_algo::GraphAnalysis;
use fabula_graph::{Choice, ChoiceId, Scene, SceneId};

// ─────────────────────────────────────────────
// Config
// ─────────────────────────────────────────────

/// Tunables for sizing and spacing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LayoutConfig {
    /// Horizontal gap between rank columns.
    pub column_gap: f32,
    /// Vertical gap between nodes in one column.
    pub row_gap: f32,
    /// Average glyph width used to estimate title width.
    pub avg_char_width: f32,
    /// Node width band — titles wrap inside it.
    pub min_node_width: f32,
    pub max_node_width: f32,
    /// Title lines before truncation; extra lines grow the node height.
    pub max_title_lines: usize,
    /// Base node height (one title line).
    pub base_node_height: f32,
    /// Height added per extra title line.
    pub line_height: f32,
    /// Pull weight for the first/last sibling of a parent.
    pub outer_sibling_weight: f32,
    /// Pull weight for middle siblings.
    pub inner_sibling_weight: f32,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            column_gap: 80.0,
            row_gap: 40.0,
            avg_char_width: 7.5,
            min_node_width: 140.0,
            max_node_width: 280.0,
            max_title_lines: 3,
            base_node_height: 48.0,
            line_height: 18.0,
            outer_sibling_weight: 2.0,
            inner_sibling_weight: 1.0,
        }
    }
}

// ─────────────────────────────────────────────
// Sizing
// ─────────────────────────────────────────────

/// Estimated width/height of one node.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NodeSize {
    pub width: f32,
    pub height: f32,
}

/// A positioned node. `x`/`y` are the top-left corner.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NodePosition {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

/// Estimate a node's size from its title.
///
/// Width is the estimated single-line text width clamped to the configured
/// band; the title then wraps into at most `max_title_lines` lines and the
/// height grows per extra line. This keeps dense graphs with long titles
/// from overlapping.
pub fn node_size(title: &str, config: &LayoutConfig) -> NodeSize {
    let text_width = title.chars().count() as f32 * config.avg_char_width;
    let width = text_width.clamp(config.min_node_width, config.max_node_width);

    let lines = if text_width <= width {
        1
    } else {
        ((text_width / width).ceil() as usize).min(config.max_title_lines)
    };
    let height = config.base_node_height + (lines.saturating_sub(1)) as f32 * config.line_height;

    NodeSize { width, height }
}

// ─────────────────────────────────────────────
// Layout
// ─────────────────────────────────────────────

/// Compute positions for every scene.
///
/// Deterministic: same scenes/choices/analysis and config always produce
/// the same positions. O(V log V + E).
pub fn compute_layout(
    scenes: &HashMap<SceneId, Arc<Scene>>,
    choices: &HashMap<ChoiceId, Arc<Choice>>,
    analysis: &GraphAnalysis,
    config: &LayoutConfig,
) -> HashMap<SceneId, NodePosition> {
    if scenes.is_empty() {
        return HashMap::new();
    }

    let sizes: HashMap<&str, NodeSize> = scenes
        .iter()
        .map(|(id, scene)| (id.as_str(), node_size(&scene.name, config)))
        .collect();

    // Rank by depth; unreachable scenes go to one extra column on the right.
    let max_depth = analysis.depth_map.values().copied().max().unwrap_or(0);
    let unreachable_rank = max_depth + 1;
    let rank_of = |id: &str| -> usize {
        analysis
            .depth_map
            .get(id)
            .copied()
            .unwrap_or(unreachable_rank)
    };

    let mut ranks: Vec<Vec<&str>> = vec![Vec::new(); unreachable_rank + 1];
    for id in scenes.keys() {
        ranks[rank_of(id)].push(id.as_str());
    }
    for rank in &mut ranks {
        rank.sort_unstable();
    }

    // Column x offsets: each column as wide as its widest node.
    let mut column_x: Vec<f32> = Vec::with_capacity(ranks.len());
    let mut x = 0.0f32;
    for rank in &ranks {
        column_x.push(x);
        let col_width = rank
            .iter()
            .map(|id| sizes[id].width)
            .fold(0.0f32, f32::max);
        x += col_width + config.column_gap;
    }

    // Sibling pull weights: choices of one source ordered by order_index;
    // the first and last sibling get the outer weight.
    let mut sibling_edges: HashMap<&str, Vec<(i32, &str, &str)>> = HashMap::new();
    for choice in choices.values() {
        if let Some(target) = choice.target_scene_id.as_deref() {
            if scenes.contains_key(choice.source_scene_id.as_str()) && scenes.contains_key(target) {
                sibling_edges
                    .entry(choice.source_scene_id.as_str())
                    .or_default()
                    .push((choice.order_index, choice.id.as_str(), target));
            }
        }
    }
    for siblings in sibling_edges.values_mut() {
        siblings.sort_by(|a, b| (a.0, a.1).cmp(&(b.0, b.1)));
    }

    // target → [(parent, pull weight)], strongest weight per parallel edge.
    let mut pull: HashMap<&str, HashMap<&str, f32>> = HashMap::new();
    for (source, siblings) in &sibling_edges {
        let n = siblings.len();
        for (i, (_, _, target)) in siblings.iter().enumerate() {
            let weight = if n >= 2 && (i == 0 || i == n - 1) {
                config.outer_sibling_weight
            } else {
                config.inner_sibling_weight
            };
            let slot = pull.entry(*target).or_default().entry(*source).or_insert(0.0);
            *slot = slot.max(weight);
        }
    }

    let mut positions: HashMap<SceneId, NodePosition> = HashMap::new();

    for (rank_idx, rank) in ranks.iter().enumerate() {
        // Desired y: weighted barycenter of already-placed parents.
        let mut desired: Vec<(f32, &str)> = rank
            .iter()
            .map(|id| {
                let mut weight_sum = 0.0f32;
                let mut weighted_y = 0.0f32;
                if let Some(parents) = pull.get(id) {
                    for (source, weight) in parents {
                        if let Some(parent) = positions.get(*source) {
                            weighted_y += (parent.y + parent.height / 2.0) * weight;
                            weight_sum += weight;
                        }
                    }
                }
                let y = if weight_sum > 0.0 {
                    weighted_y / weight_sum
                } else {
                    0.0
                };
                (y, *id)
            })
            .collect();
        desired.sort_by(|a, b| a.0.partial_cmp(&b.0).unwrap_or(std::cmp::Ordering::Equal).then(a.1.cmp(b.1)));

        // Stack top-down, resolving overlaps with the row gap.
        let mut y = 0.0f32;
        for (desired_y, id) in desired {
            let size = sizes[id];
            let top = desired_y - size.height / 2.0;
            let y_pos = top.max(y);
            positions.insert(
                id.to_string(),
                NodePosition {
                    x: column_x[rank_idx],
                    y: y_pos,
                    width: size.width,
                    height: size.height,
                },
            );
            y = y_pos + size.height + config.row_gap;
        }
    }

    positions
}

// ─────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────
