//! Keeps the reorder cache coherent with cards that leave the live queue.

use crate::card::CardId;
use crate::cache::ReorderCache;
use crate::selector::Scorer;

/// Lifecycle notifications the engine raises for a card.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SessionEvent {
    Answered(CardId),
    WillBury(CardId),
    WillSuspend(CardId),
}

impl SessionEvent {
    pub fn card_id(self) -> CardId {
        match self {
            SessionEvent::Answered(id)
            | SessionEvent::WillBury(id)
            | SessionEvent::WillSuspend(id) => id,
        }
    }
}

/// What the cache did in response to an event.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EventOutcome {
    /// The expected top card left the queue; it was popped.
    Consumed,
    /// The event could not be explained by the cache; it was dropped.
    Invalidated,
}

impl<S: Scorer> ReorderCache<S> {
    /// Apply an answer/bury/suspend notification.
    ///
    /// All three events follow one rule: pop on a top-of-stack match,
    /// otherwise discard the cache so the next draw rebuilds.
    pub fn observe(&mut self, event: SessionEvent) -> EventOutcome {
        let card_id = event.card_id();
        if self.pop_if_top(card_id) {
            return EventOutcome::Consumed;
        }
        if !self.is_absent() {
            tracing::debug!(?event, "event does not match cached top, invalidating");
        }
        self.invalidate();
        EventOutcome::Invalidated
    }
}
