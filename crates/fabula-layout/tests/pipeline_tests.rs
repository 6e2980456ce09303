//! End-to-end pipeline tests: mutate a store, then run analysis,
//! validation, ancestry, and layout against the snapshot it publishes.

use std::collections::HashSet;
use std::sync::Arc;

use fabula_algo::{analyze, resolve_ancestry};
use fabula_graph::{Choice, EventFilter, Scene, ScenePatch, StoryStore};
use fabula_layout::{LayoutCache, LayoutConfig};
use fabula_validate::validate;

// ─────────────────────────────────────────────
// Helpers
// ─────────────────────────────────────────────

fn scene(id: &str, content: &str) -> Scene {
    let mut s = Scene::new(id, format!("Scene {id}"));
    s.content = Some(content.to_string());
    s
}

fn choice(id: &str, from: &str, to: &str, order: i32) -> Choice {
    let mut c = Choice::new(id, from, Some(to.to_string()));
    c.label = format!("go to {to}");
    c.order_index = order;
    c
}

/// The spec's reference story: S1(entry) → S2 → S3.
fn build_linear_story(store: &StoryStore) {
    store.emit_scene_batch_add(vec![
        scene("S1", "The beginning."),
        scene("S2", "The middle."),
        scene("S3", "The end."),
    ]);
    store.emit_choice_batch_add(vec![
        choice("C1", "S1", "S2", 0),
        choice("C2", "S2", "S3", 0),
    ]);
    store.emit_graph_sync(
        store.scenes().iter().map(|s| (**s).clone()).collect(),
        store.choices().iter().map(|c| (**c).clone()).collect(),
        Some("S1".to_string()),
        None,
        HashSet::new(),
    );
}

// ─────────────────────────────────────────────
// Test 1: full pipeline on the linear story
// ─────────────────────────────────────────────

#[test]
fn linear_story_end_to_end() {
    let store = StoryStore::new();
    build_linear_story(&store);
    let snap = store.snapshot();

    // Analysis.
    let analysis = analyze(&snap);
    assert_eq!(analysis.depth_map.get("S1"), Some(&0));
    assert_eq!(analysis.depth_map.get("S2"), Some(&1));
    assert_eq!(analysis.depth_map.get("S3"), Some(&2));
    assert!(analysis.orphans.is_empty());
    assert_eq!(
        analysis.dead_ends,
        HashSet::from(["S3".to_string()])
    );

    // Validation: dead end is only a warning.
    let report = validate(&snap);
    assert!(report.is_valid);
    assert_eq!(report.stats.reachable_count, 3);

    // Ancestry of the final scene.
    let path = resolve_ancestry(&snap, "S3");
    assert_eq!(path.path_scene_ids, vec!["S1", "S2", "S3"]);
    assert_eq!(path.path_choice_ids.len(), 2);

    // Layout: every scene positioned, ranks advance left to right.
    let cache = LayoutCache::new();
    let positions = cache.get_or_compute(
        "project",
        &snap.scenes,
        &snap.choices,
        snap.entry_scene_id.as_deref(),
        &snap.collapsed,
        &analysis,
        &LayoutConfig::default(),
    );
    assert_eq!(positions.len(), 3);
    assert!(positions["S1"].x < positions["S2"].x);
    assert!(positions["S2"].x < positions["S3"].x);
}

// ─────────────────────────────────────────────
// Test 2: consumers see one coherent snapshot
// ─────────────────────────────────────────────

#[test]
fn derived_views_agree_on_one_snapshot() {
    let store = StoryStore::new();
    build_linear_story(&store);

    let held = store.snapshot();
    // The graph keeps changing underneath...
    store.emit_scene_delete("S3".to_string());
    store.emit_choice_delete("C2".to_string());

    // ...but every derivation over the held snapshot stays coherent.
    let analysis = analyze(&held);
    let report = validate(&held);
    assert_eq!(analysis.reachable.len(), 3);
    assert!(report.is_valid);
    assert_eq!(report.stats.total_scenes, 3);

    // The live snapshot reflects the deletions instead.
    let live = validate(&store.snapshot());
    assert_eq!(live.stats.total_scenes, 2);
}

// ─────────────────────────────────────────────
// Test 3: layout consumer driven by the structural stream
// ─────────────────────────────────────────────

#[test]
fn structural_subscriber_skips_cosmetic_churn() {
    let store = StoryStore::new();
    let mut structural = store.subscribe_filtered(EventFilter::Structural);
    build_linear_story(&store);

    let cache = LayoutCache::new();
    let mut layouts = 0usize;
    let mut last = None;
    while let Some(update) = structural.try_latest().unwrap() {
        let analysis = analyze(&update.snapshot);
        last = Some(cache.get_or_compute(
            "project",
            &update.snapshot.scenes,
            &update.snapshot.choices,
            update.snapshot.entry_scene_id.as_deref(),
            &update.snapshot.collapsed,
            &analysis,
            &LayoutConfig::default(),
        ));
        layouts += 1;
    }
    assert_eq!(layouts, 1, "try_latest coalesces the mutation burst");
    let baseline = last.expect("one layout computed");

    // Cosmetic churn: selection changes and a title edit.
    store.emit_selection_change(Some("S2".to_string()));
    store.emit_scene_update(
        "S2".to_string(),
        ScenePatch {
            name: Some("Scene Two, Extended Edition".to_string()),
            ..Default::default()
        },
    );
    assert!(
        structural.try_latest().unwrap().is_none(),
        "cosmetic events never reach the structural stream"
    );

    // Even if the consumer re-runs, the cache reuses the positions.
    let snap = store.snapshot();
    let analysis = analyze(&snap);
    let again = cache.get_or_compute(
        "project",
        &snap.scenes,
        &snap.choices,
        snap.entry_scene_id.as_deref(),
        &snap.collapsed,
        &analysis,
        &LayoutConfig::default(),
    );
    assert!(Arc::ptr_eq(&baseline, &again));
}

// ─────────────────────────────────────────────
// Test 4: messy graph is reported, never fails
// ─────────────────────────────────────────────

#[test]
fn broken_graph_reports_instead_of_failing() {
    let store = StoryStore::new();
    store.emit_scene_batch_add(vec![scene("a", ""), scene("island", "")]);
    store.emit_choice_add(choice("loop", "a", "a", 0));
    store.emit_choice_add(Choice::new("dangling", "a", Some("ghost".to_string())));
    store.emit_choice_add(Choice::new("unresolved", "island", None));

    // No entry scene set: everything still computes.
    let snap = store.snapshot();
    let analysis = analyze(&snap);
    assert!(analysis.depth_map.is_empty());
    assert!(analysis.reachable.is_empty());

    let report = validate(&snap);
    assert!(!report.is_valid);
    assert!(report.stats.error_count >= 3, "no entry + dangling + unresolved");

    let path = resolve_ancestry(&snap, "a");
    assert!(path.path_scene_ids.is_empty(), "no entry means no ancestry");
}
