//! Pure fold from `(snapshot, event)` to the next snapshot.
//!
//! The reducer is total: every event variant is handled, nothing panics,
//! and recognized-but-inapplicable events (e.g. updating a scene that was
//! already deleted) are absorbed silently — the maps keep their `Arc`s and
//! only the mutation counter advances. Rapid edit sequences routinely
//! produce transiently stale references; losing such an edit is preferable
//! to surfacing an error from a pure fold.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use crate::event::StoryEvent;
use crate::model::{Choice, ChoiceId, GraphSnapshot, Scene, SceneId};

/// Apply one event to a snapshot, producing the next snapshot.
///
/// Copy-on-write: only the collections the event touches are shallow-
/// cloned; untouched collections share their allocation with the previous
/// snapshot. `mutation_count` advances by exactly 1 per event, except for
/// [`StoryEvent::GraphReset`], which resets it to 0.
pub fn reduce(snapshot: &GraphSnapshot, event: &StoryEvent) -> GraphSnapshot {
    let mut next = snapshot.clone();
    next.mutation_count = snapshot.mutation_count.saturating_add(1);
    next.last_event = Some(Arc::new(event.clone()));

    match event {
        StoryEvent::SceneAdd(scene) => {
            upsert_scenes(&mut next, std::slice::from_ref(scene));
        }
        StoryEvent::SceneUpdate { scene_id, patch } => {
            if let Some(existing) = snapshot.scenes.get(scene_id) {
                let updated = patch.apply_to(existing);
                let mut scenes = (*next.scenes).clone();
                scenes.insert(scene_id.clone(), Arc::new(updated));
                next.scenes = Arc::new(scenes);
            }
        }
        StoryEvent::SceneDelete(scene_id) => {
            delete_scenes(&mut next, std::slice::from_ref(scene_id));
        }
        StoryEvent::SceneBatchAdd(scenes) => {
            upsert_scenes(&mut next, scenes);
        }
        StoryEvent::SceneBatchUpdate(updates) => {
            // Patches for unknown ids are skipped; the copy happens only if
            // at least one patch applies.
            let applicable: Vec<(&SceneId, Arc<Scene>)> = updates
                .iter()
                .filter_map(|(id, patch)| {
                    snapshot
                        .scenes
                        .get(id)
                        .map(|s| (id, Arc::new(patch.apply_to(s))))
                })
                .collect();
            if !applicable.is_empty() {
                let mut scenes = (*next.scenes).clone();
                for (id, scene) in applicable {
                    scenes.insert(id.clone(), scene);
                }
                next.scenes = Arc::new(scenes);
            }
        }
        StoryEvent::SceneBatchDelete(ids) => {
            delete_scenes(&mut next, ids);
        }
        StoryEvent::ChoiceAdd(choice) => {
            upsert_choices(&mut next, std::slice::from_ref(choice));
        }
        StoryEvent::ChoiceUpdate { choice_id, patch } => {
            if let Some(existing) = snapshot.choices.get(choice_id) {
                let updated = patch.apply_to(existing);
                let mut choices = (*next.choices).clone();
                choices.insert(choice_id.clone(), Arc::new(updated));
                next.choices = Arc::new(choices);
            }
        }
        StoryEvent::ChoiceDelete(choice_id) => {
            delete_choices(&mut next, std::slice::from_ref(choice_id));
        }
        StoryEvent::ChoiceBatchAdd(choices) => {
            upsert_choices(&mut next, choices);
        }
        StoryEvent::ChoiceBatchDelete(ids) => {
            delete_choices(&mut next, ids);
        }
        StoryEvent::GraphReset {
            scenes,
            choices,
            entry_scene_id,
        } => {
            next.scenes = Arc::new(collect_scenes(scenes));
            next.choices = Arc::new(collect_choices(choices));
            next.entry_scene_id = entry_scene_id.clone();
            next.selected_scene_id = None;
            next.collapsed = Arc::new(HashSet::new());
            next.mutation_count = 0;
        }
        StoryEvent::GraphSync {
            scenes,
            choices,
            entry_scene_id,
            selected_scene_id,
            collapsed,
        } => {
            next.scenes = Arc::new(collect_scenes(scenes));
            next.choices = Arc::new(collect_choices(choices));
            next.entry_scene_id = entry_scene_id.clone();
            next.selected_scene_id = selected_scene_id.clone();
            next.collapsed = Arc::new(collapsed.clone());
        }
        StoryEvent::SelectionChange(selected) => {
            next.selected_scene_id = selected.clone();
        }
        StoryEvent::CollapseToggle(scene_id) => {
            let mut collapsed = (*next.collapsed).clone();
            if !collapsed.remove(scene_id) {
                collapsed.insert(scene_id.clone());
            }
            next.collapsed = Arc::new(collapsed);
        }
    }

    next
}

// ─────────────────────────────────────────────
// Map helpers
// ─────────────────────────────────────────────

fn upsert_scenes(next: &mut GraphSnapshot, scenes: &[Scene]) {
    if scenes.is_empty() {
        return;
    }
    let mut map = (*next.scenes).clone();
    for scene in scenes {
        map.insert(scene.id.clone(), Arc::new(scene.clone()));
    }
    next.scenes = Arc::new(map);
}

fn delete_scenes(next: &mut GraphSnapshot, ids: &[SceneId]) {
    if !ids.iter().any(|id| next.scenes.contains_key(id)) {
        return; // nothing to delete — keep the Arc untouched
    }
    let mut map = (*next.scenes).clone();
    for id in ids {
        map.remove(id);
    }
    next.scenes = Arc::new(map);
}

fn upsert_choices(next: &mut GraphSnapshot, choices: &[Choice]) {
    if choices.is_empty() {
        return;
    }
    let mut map = (*next.choices).clone();
    for choice in choices {
        map.insert(choice.id.clone(), Arc::new(choice.clone()));
    }
    next.choices = Arc::new(map);
}

fn delete_choices(next: &mut GraphSnapshot, ids: &[ChoiceId]) {
    if !ids.iter().any(|id| next.choices.contains_key(id)) {
        return;
    }
    let mut map = (*next.choices).clone();
    for id in ids {
        map.remove(id);
    }
    next.choices = Arc::new(map);
}

fn collect_scenes(scenes: &[Scene]) -> HashMap<SceneId, Arc<Scene>> {
    scenes
        .iter()
        .map(|s| (s.id.clone(), Arc::new(s.clone())))
        .collect()
}

fn collect_choices(choices: &[Choice]) -> HashMap<ChoiceId, Arc<Choice>> {
    choices
        .iter()
        .map(|c| (c.id.clone(), Arc::new(c.clone())))
        .collect()
}

// ─────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::{ChoicePatch, ScenePatch};

    fn scene(id: &str) -> Scene {
        Scene::new(id, format!("Scene {id}"))
    }

    fn choice(id: &str, from: &str, to: &str) -> Choice {
        Choice::new(id, from, Some(to.to_string()))
    }

    #[test]
    fn add_scene_inserts() {
        let snap = GraphSnapshot::empty();
        let next = reduce(&snap, &StoryEvent::SceneAdd(scene("s1")));
        assert_eq!(next.scene_count(), 1);
        assert_eq!(next.mutation_count, 1);
        assert!(next.scene("s1").is_some());
    }

    #[test]
    fn add_scene_is_upsert() {
        let snap = reduce(&GraphSnapshot::empty(), &StoryEvent::SceneAdd(scene("s1")));
        let mut replacement = scene("s1");
        replacement.name = "Renamed".to_string();
        let next = reduce(&snap, &StoryEvent::SceneAdd(replacement));
        assert_eq!(next.scene_count(), 1);
        assert_eq!(next.scene("s1").unwrap().name, "Renamed");
    }

    #[test]
    fn update_missing_scene_keeps_map_identity() {
        let snap = reduce(&GraphSnapshot::empty(), &StoryEvent::SceneAdd(scene("s1")));
        let next = reduce(
            &snap,
            &StoryEvent::SceneUpdate {
                scene_id: "ghost".into(),
                patch: ScenePatch {
                    name: Some("x".into()),
                    ..Default::default()
                },
            },
        );
        // Absorbed: same allocation, counter still advanced.
        assert!(Arc::ptr_eq(&snap.scenes, &next.scenes));
        assert!(Arc::ptr_eq(&snap.choices, &next.choices));
        assert_eq!(next.mutation_count, snap.mutation_count + 1);
    }

    #[test]
    fn delete_missing_choice_keeps_map_identity() {
        let snap = reduce(
            &GraphSnapshot::empty(),
            &StoryEvent::ChoiceAdd(choice("c1", "s1", "s2")),
        );
        let next = reduce(&snap, &StoryEvent::ChoiceDelete("ghost".into()));
        assert!(Arc::ptr_eq(&snap.choices, &next.choices));
        assert_eq!(next.mutation_count, snap.mutation_count + 1);
    }

    #[test]
    fn untouched_collections_share_allocation() {
        let snap = reduce(&GraphSnapshot::empty(), &StoryEvent::SceneAdd(scene("s1")));
        let next = reduce(&snap, &StoryEvent::ChoiceAdd(choice("c1", "s1", "s2")));
        // The choice event must not copy the scene map.
        assert!(Arc::ptr_eq(&snap.scenes, &next.scenes));
        assert!(!Arc::ptr_eq(&snap.choices, &next.choices));
    }

    #[test]
    fn scene_delete_leaves_choices_dangling() {
        let mut snap = GraphSnapshot::empty();
        snap = reduce(&snap, &StoryEvent::SceneAdd(scene("s1")));
        snap = reduce(&snap, &StoryEvent::SceneAdd(scene("s2")));
        snap = reduce(&snap, &StoryEvent::ChoiceAdd(choice("c1", "s1", "s2")));
        snap = reduce(&snap, &StoryEvent::SceneDelete("s2".into()));

        assert!(snap.scene("s2").is_none());
        // No cascade: the dangling choice stays and is validation's problem.
        assert!(snap.choice("c1").is_some());
    }

    #[test]
    fn mutation_count_is_monotonic() {
        let mut snap = GraphSnapshot::empty();
        let events = vec![
            StoryEvent::SceneAdd(scene("s1")),
            StoryEvent::SceneAdd(scene("s2")),
            StoryEvent::SelectionChange(Some("s1".into())),
            StoryEvent::ChoiceAdd(choice("c1", "s1", "s2")),
            StoryEvent::ChoiceDelete("nope".into()),
        ];
        let n = events.len() as u64;
        for ev in &events {
            snap = reduce(&snap, ev);
        }
        assert_eq!(snap.mutation_count, n);
    }

    #[test]
    fn reset_replaces_and_zeroes_counter() {
        let mut snap = GraphSnapshot::empty();
        snap = reduce(&snap, &StoryEvent::SceneAdd(scene("old")));
        snap = reduce(&snap, &StoryEvent::SelectionChange(Some("old".into())));
        snap = reduce(&snap, &StoryEvent::CollapseToggle("old".into()));
        assert_eq!(snap.mutation_count, 3);

        snap = reduce(
            &snap,
            &StoryEvent::GraphReset {
                scenes: vec![scene("s1")],
                choices: vec![],
                entry_scene_id: Some("s1".into()),
            },
        );
        assert_eq!(snap.mutation_count, 0);
        assert!(snap.scene("old").is_none());
        assert!(snap.scene("s1").is_some());
        assert_eq!(snap.selected_scene_id, None);
        assert!(snap.collapsed.is_empty(), "reset leaves collapsed empty");
    }

    #[test]
    fn sync_carries_collapsed_set_and_selection() {
        let snap = GraphSnapshot::empty();
        let collapsed: HashSet<SceneId> = ["s1".to_string()].into_iter().collect();
        let next = reduce(
            &snap,
            &StoryEvent::GraphSync {
                scenes: vec![scene("s1"), scene("s2")],
                choices: vec![choice("c1", "s1", "s2")],
                entry_scene_id: Some("s1".into()),
                selected_scene_id: Some("s2".into()),
                collapsed: collapsed.clone(),
            },
        );
        assert_eq!(next.scene_count(), 2);
        assert_eq!(next.choice_count(), 1);
        assert_eq!(next.selected_scene_id.as_deref(), Some("s2"));
        assert_eq!(*next.collapsed, collapsed);
        assert_eq!(next.mutation_count, 1, "sync advances, never resets");
    }

    #[test]
    fn collapse_toggle_roundtrip() {
        let mut snap = GraphSnapshot::empty();
        snap = reduce(&snap, &StoryEvent::CollapseToggle("s1".into()));
        assert!(snap.collapsed.contains("s1"));
        snap = reduce(&snap, &StoryEvent::CollapseToggle("s1".into()));
        assert!(!snap.collapsed.contains("s1"));
    }

    #[test]
    fn batch_update_applies_only_known_ids() {
        let mut snap = GraphSnapshot::empty();
        snap = reduce(&snap, &StoryEvent::SceneAdd(scene("s1")));

        let next = reduce(
            &snap,
            &StoryEvent::SceneBatchUpdate(vec![
                (
                    "s1".into(),
                    ScenePatch {
                        name: Some("Updated".into()),
                        ..Default::default()
                    },
                ),
                (
                    "ghost".into(),
                    ScenePatch {
                        name: Some("Ignored".into()),
                        ..Default::default()
                    },
                ),
            ]),
        );
        assert_eq!(next.scene("s1").unwrap().name, "Updated");
        assert_eq!(next.scene_count(), 1);
    }

    #[test]
    fn batch_update_of_only_unknown_ids_keeps_identity() {
        let snap = reduce(&GraphSnapshot::empty(), &StoryEvent::SceneAdd(scene("s1")));
        let next = reduce(
            &snap,
            &StoryEvent::SceneBatchUpdate(vec![("ghost".into(), ScenePatch::default())]),
        );
        assert!(Arc::ptr_eq(&snap.scenes, &next.scenes));
    }

    #[test]
    fn choice_update_retargets_edge() {
        let mut snap = GraphSnapshot::empty();
        snap = reduce(&snap, &StoryEvent::ChoiceAdd(choice("c1", "s1", "s2")));
        snap = reduce(
            &snap,
            &StoryEvent::ChoiceUpdate {
                choice_id: "c1".into(),
                patch: ChoicePatch {
                    target_scene_id: Some(Some("s3".into())),
                    ..Default::default()
                },
            },
        );
        assert_eq!(
            snap.choice("c1").unwrap().target_scene_id.as_deref(),
            Some("s3")
        );
    }

    #[test]
    fn last_event_references_applied_event() {
        let snap = reduce(&GraphSnapshot::empty(), &StoryEvent::SceneAdd(scene("s1")));
        assert_eq!(snap.last_event.as_ref().unwrap().tag(), "scene:add");
    }
}
