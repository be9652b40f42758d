//! Boundary to the review-scheduling engine that owns queue membership,
//! due dates and quota enforcement.

use crate::card::{DeckId, QueuedCards};
use crate::selector::ParameterSource;

/// Synchronous, in-process queries against the scheduling engine.
///
/// Deck configuration lookups come through the [`ParameterSource`]
/// supertrait.
pub trait SchedulerEngine: ParameterSource {
    /// Snapshot of the queue in engine order, at most `fetch_limit` cards,
    /// together with the live per-class counts.
    fn queued_cards(&mut self, fetch_limit: usize) -> QueuedCards;

    /// Widen (positive) or restore (negative) today's new/review limits.
    fn extend_limits(&mut self, new_delta: i64, review_delta: i64);

    /// Total cards in the collection; bounds a full snapshot.
    fn card_count(&self) -> usize;

    /// Day counter, bumped once per rollover.
    fn today(&self) -> u32;

    fn current_deck_id(&self) -> DeckId;
}
