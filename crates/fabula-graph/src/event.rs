use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::model::{Choice, ChoiceId, Scene, SceneId};

// ─────────────────────────────────────────────
// Patches
// ─────────────────────────────────────────────

/// Partial update for a scene. Outer `Option` = "field present in the
/// patch"; for nullable fields the inner `Option` is the new value, so
/// `Some(None)` clears the field.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ScenePatch {
    pub name: Option<String>,
    pub content: Option<Option<String>>,
    pub description: Option<Option<String>>,
    pub image: Option<Option<String>>,
}

impl ScenePatch {
    /// Apply this patch to a copy of `scene`.
    pub fn apply_to(&self, scene: &Scene) -> Scene {
        let mut out = scene.clone();
        if let Some(name) = &self.name {
            out.name = name.clone();
        }
        if let Some(content) = &self.content {
            out.content = content.clone();
        }
        if let Some(description) = &self.description {
            out.description = description.clone();
        }
        if let Some(image) = &self.image {
            out.image = image.clone();
        }
        out
    }
}

/// Partial update for a choice. Same outer/inner `Option` convention as
/// [`ScenePatch`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ChoicePatch {
    pub source_scene_id: Option<SceneId>,
    pub target_scene_id: Option<Option<SceneId>>,
    pub label: Option<String>,
    pub order_index: Option<i32>,
    pub condition: Option<Option<serde_json::Value>>,
}

impl ChoicePatch {
    /// Apply this patch to a copy of `choice`.
    pub fn apply_to(&self, choice: &Choice) -> Choice {
        let mut out = choice.clone();
        if let Some(source) = &self.source_scene_id {
            out.source_scene_id = source.clone();
        }
        if let Some(target) = &self.target_scene_id {
            out.target_scene_id = target.clone();
        }
        if let Some(label) = &self.label {
            out.label = label.clone();
        }
        if let Some(order) = self.order_index {
            out.order_index = order;
        }
        if let Some(condition) = &self.condition {
            out.condition = condition.clone();
        }
        out
    }
}

// ─────────────────────────────────────────────
// StoryEvent
// ─────────────────────────────────────────────

/// All mutations that go through the narrative graph store.
///
/// A closed set: the reducer matches exhaustively, so adding a variant is a
/// compile-time-checked obligation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum StoryEvent {
    /// A scene was added (upsert: an existing id is replaced).
    SceneAdd(Scene),
    /// A scene's fields were partially updated.
    SceneUpdate { scene_id: SceneId, patch: ScenePatch },
    /// A scene was deleted. Choices referencing it are left dangling.
    SceneDelete(SceneId),
    /// Several scenes were added in one step.
    SceneBatchAdd(Vec<Scene>),
    /// Several scenes were patched in one step.
    SceneBatchUpdate(Vec<(SceneId, ScenePatch)>),
    /// Several scenes were deleted in one step.
    SceneBatchDelete(Vec<SceneId>),
    /// A choice was added (upsert).
    ChoiceAdd(Choice),
    /// A choice's fields were partially updated.
    ChoiceUpdate { choice_id: ChoiceId, patch: ChoicePatch },
    /// A choice was deleted.
    ChoiceDelete(ChoiceId),
    /// Several choices were added in one step.
    ChoiceBatchAdd(Vec<Choice>),
    /// Several choices were deleted in one step.
    ChoiceBatchDelete(Vec<ChoiceId>),
    /// Full replacement of the graph. Clears selection and the collapsed
    /// set, and resets the mutation counter.
    GraphReset {
        scenes: Vec<Scene>,
        choices: Vec<Choice>,
        entry_scene_id: Option<SceneId>,
    },
    /// Full replacement from a persisted source. Unlike `GraphReset`, this
    /// also carries selection and the collapsed set — the asymmetry is
    /// deliberate and must be preserved.
    GraphSync {
        scenes: Vec<Scene>,
        choices: Vec<Choice>,
        entry_scene_id: Option<SceneId>,
        selected_scene_id: Option<SceneId>,
        collapsed: HashSet<SceneId>,
    },
    /// The selected scene changed (cosmetic).
    SelectionChange(Option<SceneId>),
    /// A node's collapsed state was toggled.
    CollapseToggle(SceneId),
}

impl StoryEvent {
    /// Human-readable tag for logging.
    pub fn tag(&self) -> &'static str {
        match self {
            Self::SceneAdd(_) => "scene:add",
            Self::SceneUpdate { .. } => "scene:update",
            Self::SceneDelete(_) => "scene:delete",
            Self::SceneBatchAdd(_) => "scene:batch-add",
            Self::SceneBatchUpdate(_) => "scene:batch-update",
            Self::SceneBatchDelete(_) => "scene:batch-delete",
            Self::ChoiceAdd(_) => "choice:add",
            Self::ChoiceUpdate { .. } => "choice:update",
            Self::ChoiceDelete(_) => "choice:delete",
            Self::ChoiceBatchAdd(_) => "choice:batch-add",
            Self::ChoiceBatchDelete(_) => "choice:batch-delete",
            Self::GraphReset { .. } => "graph:reset",
            Self::GraphSync { .. } => "graph:sync",
            Self::SelectionChange(_) => "selection:change",
            Self::CollapseToggle(_) => "collapse:toggle",
        }
    }

    /// True when this event can change graph topology.
    ///
    /// `ChoiceUpdate` counts as structural because a patch may retarget the
    /// edge; `SceneUpdate` only touches display fields and is cosmetic.
    pub fn is_structural(&self) -> bool {
        !matches!(
            self,
            Self::SelectionChange(_) | Self::SceneUpdate { .. }
        )
    }

    /// True for events that touch the scene map.
    pub fn is_scene_event(&self) -> bool {
        matches!(
            self,
            Self::SceneAdd(_)
                | Self::SceneUpdate { .. }
                | Self::SceneDelete(_)
                | Self::SceneBatchAdd(_)
                | Self::SceneBatchUpdate(_)
                | Self::SceneBatchDelete(_)
                | Self::GraphReset { .. }
                | Self::GraphSync { .. }
        )
    }

    /// True for events that touch the choice map.
    pub fn is_choice_event(&self) -> bool {
        matches!(
            self,
            Self::ChoiceAdd(_)
                | Self::ChoiceUpdate { .. }
                | Self::ChoiceDelete(_)
                | Self::ChoiceBatchAdd(_)
                | Self::ChoiceBatchDelete(_)
                | Self::GraphReset { .. }
                | Self::GraphSync { .. }
        )
    }
}

// ─────────────────────────────────────────────
// EventFilter
// ─────────────────────────────────────────────

/// Event classes for filtered snapshot subscriptions.
///
/// Expensive consumers (layout) subscribe to `Structural` so that purely
/// cosmetic events (selection change) never wake them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EventFilter {
    /// Every event.
    All,
    /// Topology-changing events only.
    Structural,
    /// Events that touch the scene map.
    Scene,
    /// Events that touch the choice map.
    Choice,
    /// Selection changes only.
    Selection,
}

impl EventFilter {
    pub fn matches(&self, event: &StoryEvent) -> bool {
        match self {
            Self::All => true,
            Self::Structural => event.is_structural(),
            Self::Scene => event.is_scene_event(),
            Self::Choice => event.is_choice_event(),
            Self::Selection => matches!(event, StoryEvent::SelectionChange(_)),
        }
    }
}

// ─────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────
