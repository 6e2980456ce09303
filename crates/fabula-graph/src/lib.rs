//! # fabula-graph
//!
//! State store for a branching narrative graph.
//!
//! Provides the core data model and the event-sourced store:
//! - [`model::Scene`] / [`model::Choice`] — plain entity records
//! - [`model::GraphSnapshot`]  — immutable copy-on-write aggregate
//! - [`event::StoryEvent`]    — closed set of tagged mutation events
//! - [`reducer::reduce`]      — pure total fold `(snapshot, event) → snapshot'`
//! - [`store::StoryStore`]    — sequences events, broadcasts snapshots,
//!   offers filtered subscriptions (structural / scene / choice / selection)

pub mod error;
pub mod event;
pub mod model;
pub mod reducer;
pub mod store;

pub use error::StoreError;
pub use event::{ChoicePatch, EventFilter, ScenePatch, StoryEvent};
pub use model::{Choice, ChoiceId, GraphSnapshot, Scene, SceneId};
pub use reducer::reduce;
pub use store::{SnapshotUpdate, StoryStore, Subscription};
