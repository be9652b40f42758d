//! Knowledge-gain review reordering.
//!
//! Reorders a spaced-repetition review queue so that, within the engine's
//! per-class quotas, the cards served first are those whose review is
//! expected to add the most retained knowledge. Scores come from the FSRS
//! memory model (newest valid version first); selection is a stable sort
//! plus greedy quota fill; the result is cached as a stack and kept
//! coherent with answer/bury/suspend events across a session.
//!
//! Zero I/O: the scheduling engine is reached only through
//! [`SchedulerEngine`].

pub mod cache;
pub mod card;
pub mod constants;
pub mod continuity;
pub mod engine;
pub mod knowledge;
pub mod listener;
pub mod selector;
pub mod session;

pub use cache::{Freshness, ReorderCache, ServedCard, StaleReason};
pub use card::{
    Card, CardId, CardKind, DeckId, LearningState, MemoryState, NewState, NextState, NextStates,
    QueueClass, QueueCounts, QueuedCard, QueuedCards, Rating, RelearningState, ReviewState,
    SchedulingContext,
};
pub use continuity::{ContinuityError, RenderKind, carry_same_day};
pub use engine::SchedulerEngine;
pub use knowledge::{DeckParameters, ForgettingCurve, MemoryModel, ModelVersion, score};
pub use listener::{EventOutcome, SessionEvent};
pub use selector::{KnowledgeScorer, ParameterSource, Scorer, class_counts, select, select_by};
pub use session::{CardSelection, ReorderSettings, ReviewSession};
