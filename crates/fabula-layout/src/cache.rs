//! Per-project layout position cache.
//!
//! Layout is the most expensive derived computation, so positions are
//! memoized by structural hashes and reused whenever topology is
//! unchanged. Two signatures are kept per entry:
//!
//! - the **structural hash** covers everything layout-relevant (scene ids,
//!   title lengths, edge triples, entry id, collapsed set) — an exact
//!   match is a plain hit;
//! - the **choice signature** covers only the edge triples. When the
//!   structural hash differs but the choice signature still matches, the
//!   entry scene is unchanged, and the cached positions cover every
//!   current scene, the cached layout is reused — a title edit or collapse
//!   toggle never recomputes positions.
//!
//! Entries are bounded per session: past capacity, the oldest 20% by
//! last-use order are evicted.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use crc32fast::Hasher;
use dashmap::DashMap;

use fabula_algo::GraphAnalysis;
use fabula_graph::{Choice, ChoiceId, Scene, SceneId};

use crate::engine::{compute_layout, LayoutConfig, NodePosition};

/// Default maximum number of cached projects per session.
pub const DEFAULT_CACHE_CAPACITY: usize = 32;

/// Fraction of entries dropped on eviction.
const EVICTION_FRACTION: f64 = 0.2;

// ─────────────────────────────────────────────
// Signatures
// ─────────────────────────────────────────────

/// Hash of everything the layout depends on.
pub fn structural_hash(
    scenes: &HashMap<SceneId, Arc<Scene>>,
    choices: &HashMap<ChoiceId, Arc<Choice>>,
    entry_scene_id: Option<&str>,
    collapsed: impl Iterator<Item = impl AsRef<str>>,
) -> u32 {
    let mut hasher = Hasher::new();

    let mut scene_ids: Vec<&str> = scenes.keys().map(String::as_str).collect();
    scene_ids.sort_unstable();
    for id in scene_ids {
        hasher.update(id.as_bytes());
        // Title *length* only: layout depends on estimated width, and small
        // edits that keep the length do not move nodes.
        let title_len = scenes[id].name.chars().count() as u32;
        hasher.update(&title_len.to_le_bytes());
    }

    hash_edge_triples(&mut hasher, choices);

    hasher.update(entry_scene_id.unwrap_or("").as_bytes());

    let mut collapsed_ids: Vec<String> =
        collapsed.map(|id| id.as_ref().to_string()).collect();
    collapsed_ids.sort_unstable();
    for id in collapsed_ids {
        hasher.update(id.as_bytes());
    }

    hasher.finalize()
}

/// Narrow signature over the (source, target, order) edge triples only.
pub fn choice_signature(choices: &HashMap<ChoiceId, Arc<Choice>>) -> u32 {
    let mut hasher = Hasher::new();
    hash_edge_triples(&mut hasher, choices);
    hasher.finalize()
}

fn hash_edge_triples(hasher: &mut Hasher, choices: &HashMap<ChoiceId, Arc<Choice>>) {
    let mut triples: Vec<(&str, &str, i32)> = choices
        .values()
        .map(|c| {
            (
                c.source_scene_id.as_str(),
                c.target_scene_id.as_deref().unwrap_or(""),
                c.order_index,
            )
        })
        .collect();
    triples.sort_unstable();
    for (source, target, order) in triples {
        hasher.update(source.as_bytes());
        hasher.update(b"\x1f");
        hasher.update(target.as_bytes());
        hasher.update(&order.to_le_bytes());
    }
}

// ─────────────────────────────────────────────
// LayoutCache
// ─────────────────────────────────────────────

struct CacheEntry {
    structural_hash: u32,
    choice_signature: u32,
    /// Entry scene the positions were ranked from. A different entry
    /// reorders the columns, so reuse requires an exact match.
    entry_scene_id: Option<String>,
    positions: Arc<HashMap<SceneId, NodePosition>>,
    /// Logical tick of the last hit; drives eviction order.
    last_used: u64,
}

/// Bounded session cache of computed layouts, keyed per project.
///
/// Reads and writes are sharded (`DashMap`), so a multi-threaded host may
/// share one cache without extra locking.
pub struct LayoutCache {
    entries: DashMap<String, CacheEntry>,
    capacity: usize,
    tick: AtomicU64,
}

impl LayoutCache {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CACHE_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            entries: DashMap::new(),
            capacity: capacity.max(1),
            tick: AtomicU64::new(0),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Return cached positions for `project_key`, recomputing only when the
    /// graph topology changed.
    pub fn get_or_compute(
        &self,
        project_key: &str,
        scenes: &HashMap<SceneId, Arc<Scene>>,
        choices: &HashMap<ChoiceId, Arc<Choice>>,
        entry_scene_id: Option<&str>,
        collapsed: &std::collections::HashSet<SceneId>,
        analysis: &GraphAnalysis,
        config: &LayoutConfig,
    ) -> Arc<HashMap<SceneId, NodePosition>> {
        let struct_hash = structural_hash(
            scenes,
            choices,
            entry_scene_id,
            collapsed.iter().map(String::as_str),
        );
        let choice_sig = choice_signature(choices);
        let tick = self.tick.fetch_add(1, Ordering::Relaxed);

        if let Some(mut entry) = self.entries.get_mut(project_key) {
            if entry.structural_hash == struct_hash {
                entry.last_used = tick;
                tracing::trace!(project_key, "layout cache hit");
                return entry.positions.clone();
            }
            // Topology unchanged (same edges, same entry, same scene set):
            // reuse the positions even though cosmetic fields moved the
            // full hash.
            if entry.choice_signature == choice_sig
                && entry.entry_scene_id.as_deref() == entry_scene_id
                && scenes.keys().all(|id| entry.positions.contains_key(id))
                && entry.positions.len() == scenes.len()
            {
                entry.structural_hash = struct_hash;
                entry.last_used = tick;
                tracing::trace!(project_key, "layout cache hit (cosmetic change)");
                return entry.positions.clone();
            }
        }

        tracing::debug!(project_key, "layout cache miss, recomputing");
        let positions = Arc::new(compute_layout(scenes, choices, analysis, config));
        self.entries.insert(
            project_key.to_string(),
            CacheEntry {
                structural_hash: struct_hash,
                choice_signature: choice_sig,
                entry_scene_id: entry_scene_id.map(String::from),
                positions: positions.clone(),
                last_used: tick,
            },
        );
        self.evict_if_needed();
        positions
    }

    /// Drop the entry for one project (host closes a project).
    pub fn invalidate(&self, project_key: &str) {
        self.entries.remove(project_key);
    }

    /// Drop everything.
    pub fn clear(&self) {
        self.entries.clear();
    }

    fn evict_if_needed(&self) {
        if self.entries.len() <= self.capacity {
            return;
        }
        let mut by_age: Vec<(String, u64)> = self
            .entries
            .iter()
            .map(|kv| (kv.key().clone(), kv.value().last_used))
            .collect();
        by_age.sort_by_key(|(_, last_used)| *last_used);

        let drop_count = ((self.entries.len() as f64) * EVICTION_FRACTION).ceil() as usize;
        for (key, _) in by_age.into_iter().take(drop_count.max(1)) {
            self.entries.remove(&key);
        }
        tracing::debug!(remaining = self.entries.len(), "layout cache evicted oldest entries");
    }
}

impl Default for LayoutCache {
    fn default() -> Self {
        Self::new()
    }
}

// ─────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────
