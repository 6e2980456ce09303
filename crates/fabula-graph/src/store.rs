//! The narrative graph store: sequences events through the reducer and
//! broadcasts the resulting snapshot stream.
//!
//! One store per open project, constructed and owned by the embedding
//! application (no global singleton — the host's composition root decides
//! how many stores exist). The core is single-writer: mutations are
//! applied strictly in submission order. Readers hold immutable snapshot
//! `Arc`s and need no coordination; a multi-threaded host must serialize
//! its *writers*, which the internal lock enforces.

use std::collections::HashSet;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};
use std::time::{SystemTime, UNIX_EPOCH};

use tokio::sync::broadcast;
use tokio::sync::broadcast::error::TryRecvError;
use uuid::Uuid;

use crate::error::StoreError;
use crate::event::{ChoicePatch, EventFilter, ScenePatch, StoryEvent};
use crate::model::{Choice, ChoiceId, GraphSnapshot, Scene, SceneId};
use crate::reducer::reduce;

/// Default broadcast channel capacity. Slow subscribers past this many
/// pending updates observe `StoreError::Lagged`.
pub const DEFAULT_CHANNEL_CAPACITY: usize = 256;

// ─────────────────────────────────────────────
// SnapshotUpdate
// ─────────────────────────────────────────────

/// One element of the snapshot stream: the event that was applied and the
/// snapshot it produced.
#[derive(Debug, Clone)]
pub struct SnapshotUpdate {
    /// Unique id of this log entry.
    pub event_id: Uuid,
    /// Monotonically increasing sequence number (1 for the first apply).
    pub seq: u64,
    /// Unix milliseconds when the event was applied.
    pub timestamp_ms: u64,
    /// The applied mutation.
    pub event: Arc<StoryEvent>,
    /// The snapshot produced by the mutation.
    pub snapshot: Arc<GraphSnapshot>,
}

// ─────────────────────────────────────────────
// StoryStore
// ─────────────────────────────────────────────

/// Event-sourced store for one narrative graph.
pub struct StoryStore {
    current: RwLock<Arc<GraphSnapshot>>,
    tx: broadcast::Sender<SnapshotUpdate>,
    seq: AtomicU64,
}

impl StoryStore {
    /// Create a store holding the empty initial snapshot.
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CHANNEL_CAPACITY)
    }

    /// Create a store with an explicit broadcast channel capacity.
    pub fn with_capacity(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self {
            current: RwLock::new(Arc::new(GraphSnapshot::empty())),
            tx,
            seq: AtomicU64::new(0),
        }
    }

    // ── Read API ───────────────────────────────────────

    /// The current snapshot. Cheap — clones an `Arc`.
    pub fn snapshot(&self) -> Arc<GraphSnapshot> {
        self.current.read().expect("snapshot lock poisoned").clone()
    }

    /// All scenes of the current snapshot, in no particular order.
    pub fn scenes(&self) -> Vec<Arc<Scene>> {
        self.snapshot().scenes.values().cloned().collect()
    }

    /// All choices of the current snapshot, in no particular order.
    pub fn choices(&self) -> Vec<Arc<Choice>> {
        self.snapshot().choices.values().cloned().collect()
    }

    /// Sequence number of the most recently applied event.
    pub fn current_seq(&self) -> u64 {
        self.seq.load(Ordering::Acquire)
    }

    /// Subscribe to every snapshot update.
    pub fn subscribe(&self) -> Subscription {
        self.subscribe_filtered(EventFilter::All)
    }

    /// Subscribe to updates whose event matches `filter`. Relative order of
    /// the underlying stream is preserved; non-matching updates are skipped.
    pub fn subscribe_filtered(&self, filter: EventFilter) -> Subscription {
        Subscription {
            rx: self.tx.subscribe(),
            filter,
        }
    }

    // ── Mutation API ───────────────────────────────────

    /// Apply one event: reduce, publish, return the new snapshot.
    pub fn apply(&self, event: StoryEvent) -> Arc<GraphSnapshot> {
        let mut current = self.current.write().expect("snapshot lock poisoned");
        let next = Arc::new(reduce(&current, &event));
        *current = next.clone();

        let seq = self.seq.fetch_add(1, Ordering::AcqRel) + 1;
        tracing::debug!(
            tag = event.tag(),
            seq,
            mutation_count = next.mutation_count,
            scenes = next.scene_count(),
            choices = next.choice_count(),
            "applied mutation"
        );

        // Send failure just means no active subscribers.
        let _ = self.tx.send(SnapshotUpdate {
            event_id: Uuid::new_v4(),
            seq,
            timestamp_ms: now_ms(),
            event: Arc::new(event),
            snapshot: next.clone(),
        });
        next
    }

    pub fn emit_scene_add(&self, scene: Scene) -> Arc<GraphSnapshot> {
        self.apply(StoryEvent::SceneAdd(scene))
    }

    pub fn emit_scene_update(&self, scene_id: SceneId, patch: ScenePatch) -> Arc<GraphSnapshot> {
        self.apply(StoryEvent::SceneUpdate { scene_id, patch })
    }

    pub fn emit_scene_delete(&self, scene_id: SceneId) -> Arc<GraphSnapshot> {
        self.apply(StoryEvent::SceneDelete(scene_id))
    }

    pub fn emit_scene_batch_add(&self, scenes: Vec<Scene>) -> Arc<GraphSnapshot> {
        self.apply(StoryEvent::SceneBatchAdd(scenes))
    }

    pub fn emit_scene_batch_update(
        &self,
        updates: Vec<(SceneId, ScenePatch)>,
    ) -> Arc<GraphSnapshot> {
        self.apply(StoryEvent::SceneBatchUpdate(updates))
    }

    pub fn emit_scene_batch_delete(&self, ids: Vec<SceneId>) -> Arc<GraphSnapshot> {
        self.apply(StoryEvent::SceneBatchDelete(ids))
    }

    pub fn emit_choice_add(&self, choice: Choice) -> Arc<GraphSnapshot> {
        self.apply(StoryEvent::ChoiceAdd(choice))
    }

    pub fn emit_choice_update(&self, choice_id: ChoiceId, patch: ChoicePatch) -> Arc<GraphSnapshot> {
        self.apply(StoryEvent::ChoiceUpdate { choice_id, patch })
    }

    pub fn emit_choice_delete(&self, choice_id: ChoiceId) -> Arc<GraphSnapshot> {
        self.apply(StoryEvent::ChoiceDelete(choice_id))
    }

    pub fn emit_choice_batch_add(&self, choices: Vec<Choice>) -> Arc<GraphSnapshot> {
        self.apply(StoryEvent::ChoiceBatchAdd(choices))
    }

    pub fn emit_choice_batch_delete(&self, ids: Vec<ChoiceId>) -> Arc<GraphSnapshot> {
        self.apply(StoryEvent::ChoiceBatchDelete(ids))
    }

    pub fn emit_graph_reset(
        &self,
        scenes: Vec<Scene>,
        choices: Vec<Choice>,
        entry_scene_id: Option<SceneId>,
    ) -> Arc<GraphSnapshot> {
        self.apply(StoryEvent::GraphReset {
            scenes,
            choices,
            entry_scene_id,
        })
    }

    /// Full replacement from persisted data — the host calls this on load.
    pub fn emit_graph_sync(
        &self,
        scenes: Vec<Scene>,
        choices: Vec<Choice>,
        entry_scene_id: Option<SceneId>,
        selected_scene_id: Option<SceneId>,
        collapsed: HashSet<SceneId>,
    ) -> Arc<GraphSnapshot> {
        self.apply(StoryEvent::GraphSync {
            scenes,
            choices,
            entry_scene_id,
            selected_scene_id,
            collapsed,
        })
    }

    pub fn emit_selection_change(&self, selected: Option<SceneId>) -> Arc<GraphSnapshot> {
        self.apply(StoryEvent::SelectionChange(selected))
    }

    pub fn emit_collapse_toggle(&self, scene_id: SceneId) -> Arc<GraphSnapshot> {
        self.apply(StoryEvent::CollapseToggle(scene_id))
    }
}

impl Default for StoryStore {
    fn default() -> Self {
        Self::new()
    }
}

// ─────────────────────────────────────────────
// Subscription
// ─────────────────────────────────────────────

/// A (possibly filtered) handle onto the snapshot stream.
pub struct Subscription {
    rx: broadcast::Receiver<SnapshotUpdate>,
    filter: EventFilter,
}

impl Subscription {
    /// Await the next matching update.
    pub async fn recv(&mut self) -> Result<SnapshotUpdate, StoreError> {
        loop {
            let update = self.rx.recv().await?;
            if self.filter.matches(&update.event) {
                return Ok(update);
            }
        }
    }

    /// Non-blocking receive. `Ok(None)` means no matching update is
    /// currently queued.
    pub fn try_recv(&mut self) -> Result<Option<SnapshotUpdate>, StoreError> {
        loop {
            match self.rx.try_recv() {
                Ok(update) if self.filter.matches(&update.event) => return Ok(Some(update)),
                Ok(_) => continue,
                Err(TryRecvError::Empty) => return Ok(None),
                Err(TryRecvError::Lagged(n)) => return Err(StoreError::Lagged(n)),
                Err(TryRecvError::Closed) => return Err(StoreError::Closed),
            }
        }
    }

    /// Drain the queue and return only the newest matching update.
    ///
    /// This is the pull-side equivalent of throttling: a consumer that only
    /// cares about the latest state (layout, validation panel) calls this on
    /// its own cadence and skips every intermediate snapshot. A lag on the
    /// channel is absorbed here, since the consumer asked for "latest" anyway.
    pub fn try_latest(&mut self) -> Result<Option<SnapshotUpdate>, StoreError> {
        let mut latest = None;
        loop {
            match self.rx.try_recv() {
                Ok(update) => {
                    if self.filter.matches(&update.event) {
                        latest = Some(update);
                    }
                }
                Err(TryRecvError::Lagged(_)) => continue,
                Err(TryRecvError::Empty) => return Ok(latest),
                Err(TryRecvError::Closed) if latest.is_some() => return Ok(latest),
                Err(TryRecvError::Closed) => return Err(StoreError::Closed),
            }
        }
    }
}

fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}

// ─────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────
