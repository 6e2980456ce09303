use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::event::StoryEvent;

/// Opaque scene identifier, supplied by the embedding host.
pub type SceneId = String;

/// Opaque choice identifier, supplied by the embedding host.
pub type ChoiceId = String;

// ─────────────────────────────────────────────
// Scene
// ─────────────────────────────────────────────

/// A node in the narrative graph — one unit of story content.
///
/// Scenes carry no link fields; all connectivity lives in [`Choice`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Scene {
    /// Unique identifier within a snapshot.
    pub id: SceneId,

    /// Display name shown in the editor.
    pub name: String,

    /// Body content. `None` (or empty) means "not yet written".
    pub content: Option<String>,

    /// Short description used in overviews.
    pub description: Option<String>,

    /// Optional image reference (opaque to the core).
    pub image: Option<String>,
}

impl Scene {
    pub fn new(id: impl Into<SceneId>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            content: None,
            description: None,
            image: None,
        }
    }

    /// True when both body content and description are empty or absent.
    pub fn is_incomplete(&self) -> bool {
        let empty = |f: &Option<String>| f.as_deref().map_or(true, |s| s.trim().is_empty());
        empty(&self.content) && empty(&self.description)
    }
}

// ─────────────────────────────────────────────
// Choice
// ─────────────────────────────────────────────

/// A directed edge between scenes, representing a reader decision.
///
/// The source must reference an existing scene for the graph to be valid,
/// but the store tolerates transient dangling references during multi-step
/// edits — the validation engine, not the reducer, flags violations.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Choice {
    /// Unique identifier within a snapshot.
    pub id: ChoiceId,

    /// Scene this choice departs from.
    pub source_scene_id: SceneId,

    /// Scene this choice leads to. `None` means an unresolved dead link.
    pub target_scene_id: Option<SceneId>,

    /// Text presented to the reader.
    pub label: String,

    /// Deterministic sibling ordering among choices of the same source.
    pub order_index: i32,

    /// Free-form condition payload. Opaque to the core.
    pub condition: Option<serde_json::Value>,
}

impl Choice {
    pub fn new(
        id: impl Into<ChoiceId>,
        source: impl Into<SceneId>,
        target: Option<SceneId>,
    ) -> Self {
        Self {
            id: id.into(),
            source_scene_id: source.into(),
            target_scene_id: target,
            label: String::new(),
            order_index: 0,
            condition: None,
        }
    }

    /// True when source and target name the same scene.
    pub fn is_self_reference(&self) -> bool {
        self.target_scene_id.as_deref() == Some(self.source_scene_id.as_str())
    }
}

// ─────────────────────────────────────────────
// GraphSnapshot
// ─────────────────────────────────────────────

/// An immutable, fully-materialized state of the narrative graph at one
/// point in the mutation sequence.
///
/// Collections are `Arc`-wrapped for copy-on-write: the reducer shallow-
/// clones only the maps an event touches, so untouched maps keep the same
/// allocation across snapshots (`Arc::ptr_eq` holds). Readers may hold a
/// snapshot indefinitely; it is never mutated in place.
///
/// Not serializable by design — the host persists raw scenes/choices and
/// reconstructs a snapshot via `graph:sync` on load.
#[derive(Debug, Clone)]
pub struct GraphSnapshot {
    /// scene id → scene.
    pub scenes: Arc<HashMap<SceneId, Arc<Scene>>>,

    /// choice id → choice.
    pub choices: Arc<HashMap<ChoiceId, Arc<Choice>>>,

    /// Designated root of the graph, if any.
    pub entry_scene_id: Option<SceneId>,

    /// Currently selected scene (cosmetic, affects nothing analytic).
    pub selected_scene_id: Option<SceneId>,

    /// Collapsed node ids (cosmetic, affects nothing analytic).
    pub collapsed: Arc<HashSet<SceneId>>,

    /// Strictly +1 per applied event; reset to 0 only by a full graph reset.
    pub mutation_count: u64,

    /// The mutation event that produced this snapshot, if any.
    pub last_event: Option<Arc<StoryEvent>>,
}

impl GraphSnapshot {
    /// The initial, empty snapshot.
    pub fn empty() -> Self {
        Self {
            scenes: Arc::new(HashMap::new()),
            choices: Arc::new(HashMap::new()),
            entry_scene_id: None,
            selected_scene_id: None,
            collapsed: Arc::new(HashSet::new()),
            mutation_count: 0,
            last_event: None,
        }
    }

    pub fn scene(&self, id: &str) -> Option<&Arc<Scene>> {
        self.scenes.get(id)
    }

    pub fn choice(&self, id: &str) -> Option<&Arc<Choice>> {
        self.choices.get(id)
    }

    pub fn scene_count(&self) -> usize {
        self.scenes.len()
    }

    pub fn choice_count(&self) -> usize {
        self.choices.len()
    }

    /// True when the entry scene id is set and references an existing scene.
    pub fn has_valid_entry(&self) -> bool {
        self.entry_scene_id
            .as_deref()
            .map_or(false, |id| self.scenes.contains_key(id))
    }
}

impl Default for GraphSnapshot {
    fn default() -> Self {
        Self::empty()
    }
}

// ─────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────
