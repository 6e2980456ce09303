//! Reverse-path resolver for ancestry highlighting.
//!
//! Given a selected scene, finds the shortest entry-to-scene path by
//! running BFS *backward* from the target over an inverted adjacency built
//! from choices. BFS layers guarantee a shortest path; when several
//! shortest parents exist the tie-break follows `(order_index, choice id)`
//! bucket order. That tie-break is deterministic but non-canonical — a
//! choice reordering can legitimately pick the other parent, so callers
//! must not depend on *which* shortest path they get.

use std::collections::{HashMap, HashSet, VecDeque};

use serde::{Deserialize, Serialize};

use fabula_graph::{ChoiceId, GraphSnapshot, SceneId};

/// Shortest ancestry path from the entry scene to a target scene.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AncestryPath {
    /// Scene ids in entry → target order. Empty when no entry or target.
    pub path_scene_ids: Vec<SceneId>,
    /// Choice ids traversed, one per hop (`path_scene_ids.len() - 1`).
    pub path_choice_ids: Vec<ChoiceId>,
}

impl AncestryPath {
    /// True when no ancestry information is available: either an empty
    /// result or a singleton path (target disconnected from the entry).
    pub fn is_degenerate(&self) -> bool {
        self.path_scene_ids.len() <= 1
    }
}

/// Resolve the shortest path from the entry scene to `target`.
///
/// Edge cases:
/// - target == entry → singleton path, no edges;
/// - no entry set, or `target` not in the scene map → empty result;
/// - target unreachable by reverse traversal → singleton path holding only
///   the target and no edges ("no ancestry available", not an error).
pub fn resolve_ancestry(snapshot: &GraphSnapshot, target: &str) -> AncestryPath {
    let entry = match snapshot.entry_scene_id.as_deref() {
        Some(id) if snapshot.scenes.contains_key(id) => id,
        _ => return AncestryPath::default(),
    };
    if !snapshot.scenes.contains_key(target) {
        return AncestryPath::default();
    }
    if target == entry {
        return AncestryPath {
            path_scene_ids: vec![target.to_string()],
            path_choice_ids: vec![],
        };
    }

    // Inverted adjacency: target scene → [(source scene, choice id)].
    // Buckets sorted by (order_index, choice id) for reproducible output.
    let mut incoming: HashMap<&str, Vec<(i32, &str, &str)>> = HashMap::new();
    for choice in snapshot.choices.values() {
        if let Some(to) = choice.target_scene_id.as_deref() {
            if snapshot.scenes.contains_key(choice.source_scene_id.as_str()) {
                incoming.entry(to).or_default().push((
                    choice.order_index,
                    choice.source_scene_id.as_str(),
                    choice.id.as_str(),
                ));
            }
        }
    }
    for bucket in incoming.values_mut() {
        bucket.sort_by(|a, b| (a.0, a.2).cmp(&(b.0, b.2)));
    }

    // Reverse BFS from the target, each queue entry carrying its
    // accumulated node-path and edge-path (target-first order).
    let mut visited: HashSet<&str> = HashSet::new();
    let mut queue: VecDeque<(&str, Vec<&str>, Vec<&str>)> = VecDeque::new();
    visited.insert(target);
    queue.push_back((target, vec![target], vec![]));

    while let Some((id, nodes, edges)) = queue.pop_front() {
        if id == entry {
            let mut path_scene_ids: Vec<SceneId> =
                nodes.into_iter().map(String::from).collect();
            let mut path_choice_ids: Vec<ChoiceId> =
                edges.into_iter().map(String::from).collect();
            path_scene_ids.reverse();
            path_choice_ids.reverse();
            return AncestryPath {
                path_scene_ids,
                path_choice_ids,
            };
        }

        if let Some(parents) = incoming.get(id) {
            for (_, source, choice_id) in parents {
                if visited.insert(source) {
                    let mut nodes = nodes.clone();
                    let mut edges = edges.clone();
                    nodes.push(source);
                    edges.push(choice_id);
                    queue.push_back((source, nodes, edges));
                }
            }
        }
    }

    // Disconnected from the entry: singleton path, no edges.
    AncestryPath {
        path_scene_ids: vec![target.to_string()],
        path_choice_ids: vec![],
    }
}

// ─────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use fabula_graph::{reduce, Choice, GraphSnapshot, Scene, StoryEvent};

    fn graph(scenes: &[&str], choices: &[(&str, &str, &str)], entry: &str) -> GraphSnapshot {
        let mut snap = reduce(
            &GraphSnapshot::empty(),
            &StoryEvent::SceneBatchAdd(
                scenes.iter().map(|id| Scene::new(*id, *id)).collect(),
            ),
        );
        snap = reduce(
            &snap,
            &StoryEvent::ChoiceBatchAdd(
                choices
                    .iter()
                    .map(|(id, f, t)| Choice::new(*id, *f, Some(t.to_string())))
                    .collect(),
            ),
        );
        snap.entry_scene_id = Some(entry.to_string());
        snap
    }

    #[test]
    fn linear_chain_full_path() {
        let snap = graph(
            &["a", "b", "c"],
            &[("c1", "a", "b"), ("c2", "b", "c")],
            "a",
        );
        let path = resolve_ancestry(&snap, "c");
        assert_eq!(path.path_scene_ids, vec!["a", "b", "c"]);
        assert_eq!(path.path_choice_ids, vec!["c1", "c2"]);
        assert!(!path.is_degenerate());
    }

    #[test]
    fn shortest_path_wins_over_longer() {
        // a → b → c → d  and  a → d : ancestry(d) must be the 2-node hop.
        let snap = graph(
            &["a", "b", "c", "d"],
            &[
                ("c1", "a", "b"),
                ("c2", "b", "c"),
                ("c3", "c", "d"),
                ("c4", "a", "d"),
            ],
            "a",
        );
        let path = resolve_ancestry(&snap, "d");
        assert_eq!(path.path_scene_ids, vec!["a", "d"]);
        assert_eq!(path.path_choice_ids, vec!["c4"]);
    }

    #[test]
    fn diamond_returns_some_three_node_path() {
        // a → b → d and a → c → d: either middle scene is acceptable, but
        // the path must have exactly 3 nodes and 2 edges.
        let snap = graph(
            &["a", "b", "c", "d"],
            &[
                ("c1", "a", "b"),
                ("c2", "b", "d"),
                ("c3", "a", "c"),
                ("c4", "c", "d"),
            ],
            "a",
        );
        let path = resolve_ancestry(&snap, "d");
        assert_eq!(path.path_scene_ids.len(), 3);
        assert_eq!(path.path_choice_ids.len(), 2);
        assert_eq!(path.path_scene_ids.first().map(String::as_str), Some("a"));
        assert_eq!(path.path_scene_ids.last().map(String::as_str), Some("d"));
        let middle = path.path_scene_ids[1].as_str();
        assert!(middle == "b" || middle == "c");
    }

    #[test]
    fn target_equals_entry() {
        let snap = graph(&["a", "b"], &[("c1", "a", "b")], "a");
        let path = resolve_ancestry(&snap, "a");
        assert_eq!(path.path_scene_ids, vec!["a"]);
        assert!(path.path_choice_ids.is_empty());
    }

    #[test]
    fn missing_entry_or_target_yields_empty() {
        let mut snap = graph(&["a", "b"], &[("c1", "a", "b")], "a");
        assert_eq!(resolve_ancestry(&snap, "ghost"), AncestryPath::default());

        snap.entry_scene_id = None;
        assert_eq!(resolve_ancestry(&snap, "b"), AncestryPath::default());
    }

    #[test]
    fn disconnected_target_yields_singleton() {
        let snap = graph(&["a", "b", "x"], &[("c1", "a", "b")], "a");
        let path = resolve_ancestry(&snap, "x");
        assert_eq!(path.path_scene_ids, vec!["x"]);
        assert!(path.path_choice_ids.is_empty());
        assert!(path.is_degenerate());
    }

    #[test]
    fn cycle_does_not_hang_reverse_bfs() {
        let snap = graph(
            &["a", "b", "c"],
            &[("c1", "a", "b"), ("c2", "b", "c"), ("c3", "c", "b")],
            "a",
        );
        let path = resolve_ancestry(&snap, "c");
        assert_eq!(path.path_scene_ids, vec!["a", "b", "c"]);
    }

    #[test]
    fn dangling_source_edges_are_ignored() {
        // "ghost" is not a scene; its edge into b must not appear in a path.
        let snap = graph(
            &["a", "b"],
            &[("c1", "a", "b"), ("c2", "ghost", "b")],
            "a",
        );
        let path = resolve_ancestry(&snap, "b");
        assert_eq!(path.path_scene_ids, vec!["a", "b"]);
        assert_eq!(path.path_choice_ids, vec!["c1"]);
    }
}
