use std::collections::{HashMap, HashSet, VecDeque};

use serde::{Deserialize, Serialize};

use fabula_graph::{GraphSnapshot, SceneId};

// ─────────────────────────────────────────────
// Result types
// ─────────────────────────────────────────────

/// Outgoing-choice statistics across the graph.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BranchingStats {
    /// scene id → number of outgoing choices.
    pub per_scene: HashMap<SceneId, usize>,
    /// Maximum outgoing-choice count across all scenes.
    pub max: usize,
    /// Exact mean outgoing-choice count (callers round for display).
    pub mean: f64,
}

/// Everything the UI and validation derive from one snapshot.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GraphAnalysis {
    /// Scenes reachable from the entry scene (the entry itself included).
    pub reachable: HashSet<SceneId>,
    /// scene id → BFS depth from the entry. Absence = unreachable.
    pub depth_map: HashMap<SceneId, usize>,
    /// Non-entry scenes with no incoming choice.
    pub orphans: HashSet<SceneId>,
    /// Scenes with zero outgoing choices.
    pub dead_ends: HashSet<SceneId>,
    /// Scenes with neither body content nor description.
    pub incomplete: HashSet<SceneId>,
    /// Outgoing-choice statistics.
    pub branching: BranchingStats,
}

// ─────────────────────────────────────────────
// Depth / reachability
// ─────────────────────────────────────────────

/// BFS depth of every scene reachable from the entry scene.
///
/// Each scene gets the depth at which it is *first* dequeued; visited
/// scenes are never re-enqueued, so cycles and self-loops terminate.
/// Choices whose target is `None` or dangling are ignored. An entry id
/// that references no existing scene yields an empty map.
pub fn depth_map(snapshot: &GraphSnapshot) -> HashMap<SceneId, usize> {
    let entry = match valid_entry(snapshot) {
        Some(id) => id,
        None => return HashMap::new(),
    };

    let outgoing = outgoing_targets(snapshot);

    let mut depths: HashMap<SceneId, usize> = HashMap::new();
    let mut queue: VecDeque<(SceneId, usize)> = VecDeque::new();
    depths.insert(entry.clone(), 0);
    queue.push_back((entry, 0));

    while let Some((id, depth)) = queue.pop_front() {
        if let Some(targets) = outgoing.get(&id) {
            for target in targets {
                if !depths.contains_key(target) {
                    depths.insert(target.clone(), depth + 1);
                    queue.push_back((target.clone(), depth + 1));
                }
            }
        }
    }

    depths
}

/// Scenes reachable from the entry scene.
///
/// Independent of [`depth_map`] so validation stays correct even when depth
/// computation is skipped.
pub fn reachable_set(snapshot: &GraphSnapshot) -> HashSet<SceneId> {
    let entry = match valid_entry(snapshot) {
        Some(id) => id,
        None => return HashSet::new(),
    };

    let outgoing = outgoing_targets(snapshot);

    let mut visited: HashSet<SceneId> = HashSet::new();
    let mut queue: VecDeque<SceneId> = VecDeque::new();
    visited.insert(entry.clone());
    queue.push_back(entry);

    while let Some(id) = queue.pop_front() {
        if let Some(targets) = outgoing.get(&id) {
            for target in targets {
                if visited.insert(target.clone()) {
                    queue.push_back(target.clone());
                }
            }
        }
    }

    visited
}

// ─────────────────────────────────────────────
// Structural sets
// ─────────────────────────────────────────────

/// Non-entry scenes that no choice targets.
///
/// A pure incoming-edge check: a scene can be non-orphaned (something
/// points at it) yet still unreachable from the entry if that edge itself
/// hangs off dead code — the two categories are reported separately.
pub fn orphan_set(snapshot: &GraphSnapshot) -> HashSet<SceneId> {
    let mut targeted: HashSet<&str> = HashSet::new();
    for choice in snapshot.choices.values() {
        if let Some(target) = choice.target_scene_id.as_deref() {
            targeted.insert(target);
        }
    }

    snapshot
        .scenes
        .keys()
        .filter(|id| {
            snapshot.entry_scene_id.as_deref() != Some(id.as_str())
                && !targeted.contains(id.as_str())
        })
        .cloned()
        .collect()
}

/// Scenes with zero outgoing choices.
pub fn dead_end_set(snapshot: &GraphSnapshot) -> HashSet<SceneId> {
    let mut has_outgoing: HashSet<&str> = HashSet::new();
    for choice in snapshot.choices.values() {
        has_outgoing.insert(choice.source_scene_id.as_str());
    }

    snapshot
        .scenes
        .keys()
        .filter(|id| !has_outgoing.contains(id.as_str()))
        .cloned()
        .collect()
}

/// Scenes whose body content and description are both empty/absent.
pub fn incomplete_set(snapshot: &GraphSnapshot) -> HashSet<SceneId> {
    snapshot
        .scenes
        .values()
        .filter(|scene| scene.is_incomplete())
        .map(|scene| scene.id.clone())
        .collect()
}

fn branching_stats(snapshot: &GraphSnapshot) -> BranchingStats {
    let mut per_scene: HashMap<SceneId, usize> =
        snapshot.scenes.keys().map(|id| (id.clone(), 0)).collect();
    for choice in snapshot.choices.values() {
        if let Some(count) = per_scene.get_mut(&choice.source_scene_id) {
            *count += 1;
        }
    }

    let max = per_scene.values().copied().max().unwrap_or(0);
    let mean = if per_scene.is_empty() {
        0.0
    } else {
        per_scene.values().sum::<usize>() as f64 / per_scene.len() as f64
    };

    BranchingStats { per_scene, max, mean }
}

/// Run the full analysis battery over one snapshot.
pub fn analyze(snapshot: &GraphSnapshot) -> GraphAnalysis {
    let depth_map = depth_map(snapshot);
    let reachable = depth_map.keys().cloned().collect();
    GraphAnalysis {
        reachable,
        depth_map,
        orphans: orphan_set(snapshot),
        dead_ends: dead_end_set(snapshot),
        incomplete: incomplete_set(snapshot),
        branching: branching_stats(snapshot),
    }
}

// ─────────────────────────────────────────────
// Internal
// ─────────────────────────────────────────────

/// The entry scene id, if set and referencing an existing scene.
fn valid_entry(snapshot: &GraphSnapshot) -> Option<SceneId> {
    let id = snapshot.entry_scene_id.as_deref()?;
    snapshot.scenes.contains_key(id).then(|| id.to_string())
}

/// Forward adjacency: source → targets with a resolvable target scene.
fn outgoing_targets(snapshot: &GraphSnapshot) -> HashMap<SceneId, Vec<SceneId>> {
    let mut outgoing: HashMap<SceneId, Vec<SceneId>> = HashMap::new();
    for choice in snapshot.choices.values() {
        if let Some(target) = choice.target_scene_id.as_deref() {
            if snapshot.scenes.contains_key(target) {
                outgoing
                    .entry(choice.source_scene_id.clone())
                    .or_default()
                    .push(target.to_string());
            }
        }
    }
    outgoing
}

// ─────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────
