//! Reorder cache: the selector's output held as a stack, keyed by the
//! deck and day it was built for.
//!
//! The stack is built once per epoch and only shrinks afterwards, by
//! popping the top when the engine reports it consumed, or by being
//! discarded wholesale when the engine and cache disagree.

use std::time::{Duration, Instant};

use crate::card::{CardId, CardKind, DeckId, QueueCounts, QueuedCard};
use crate::engine::SchedulerEngine;
use crate::selector::{KnowledgeScorer, Scorer, select};

/// The single card handed to the reviewer.
#[derive(Clone, Debug)]
pub struct ServedCard {
    pub queued: QueuedCard,
    pub counts: QueueCounts,
    started_at: Instant,
}

impl ServedCard {
    /// Wrap `queued`, splicing the card's custom data into its branches
    /// and starting the response timer.
    pub fn new(mut queued: QueuedCard, counts: QueueCounts) -> Self {
        queued.states.custom_data = queued.card.custom_data.clone();
        Self {
            queued,
            counts,
            started_at: Instant::now(),
        }
    }

    pub fn id(&self) -> CardId {
        self.queued.id()
    }

    pub fn time_taken(&self) -> Duration {
        self.started_at.elapsed()
    }
}

/// Why a built cache cannot be served from.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StaleReason {
    DeckChanged,
    CountMismatch,
    ClassExhausted,
    DayRolledOver,
    Relearning,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Freshness {
    Absent,
    Stale(StaleReason),
    Fresh,
}

#[derive(Clone, Debug)]
struct CachedStack {
    deck_id: DeckId,
    day: u32,
    /// Last element is served next.
    stack: Vec<QueuedCard>,
}

#[derive(Clone, Debug, Default)]
enum CacheSlot {
    #[default]
    Absent,
    Built(CachedStack),
}

/// Session-scoped stack of prioritized Learning/Review cards.
#[derive(Clone, Debug, Default)]
pub struct ReorderCache<S = KnowledgeScorer> {
    slot: CacheSlot,
    scorer: S,
    rebuilds: usize,
}

impl ReorderCache {
    pub fn new() -> Self {
        Self::default()
    }
}

impl<S: Scorer> ReorderCache<S> {
    pub fn with_scorer(scorer: S) -> Self {
        Self {
            slot: CacheSlot::Absent,
            scorer,
            rebuilds: 0,
        }
    }

    /// Number of rebuilds since the cache was created.
    pub fn rebuild_count(&self) -> usize {
        self.rebuilds
    }

    /// Cached cards, next-to-serve last. Empty when absent.
    pub fn stack(&self) -> &[QueuedCard] {
        match &self.slot {
            CacheSlot::Absent => &[],
            CacheSlot::Built(cached) => &cached.stack,
        }
    }

    pub fn top(&self) -> Option<&QueuedCard> {
        self.stack().last()
    }

    pub fn is_absent(&self) -> bool {
        matches!(self.slot, CacheSlot::Absent)
    }

    /// Drop the cache; the next draw rebuilds.
    pub fn invalidate(&mut self) {
        self.slot = CacheSlot::Absent;
    }

    /// Remove the top card if it is `card_id`.
    pub(crate) fn pop_if_top(&mut self, card_id: CardId) -> bool {
        if let CacheSlot::Built(cached) = &mut self.slot
            && cached.stack.last().is_some_and(|top| top.id() == card_id)
        {
            cached.stack.pop();
            return true;
        }
        false
    }

    /// Decide whether the cache can serve the engine's current state.
    pub fn freshness(&self, deck_id: DeckId, day: u32, counts: &QueueCounts) -> Freshness {
        let CacheSlot::Built(cached) = &self.slot else {
            return Freshness::Absent;
        };
        if cached.deck_id != deck_id {
            return Freshness::Stale(StaleReason::DeckChanged);
        }
        if counts.scored_total() != cached.stack.len() {
            return Freshness::Stale(StaleReason::CountMismatch);
        }
        if let Some(top) = cached.stack.last() {
            if counts[top.queue] == 0 {
                return Freshness::Stale(StaleReason::ClassExhausted);
            }
            if top.card.kind == CardKind::Relearn {
                return Freshness::Stale(StaleReason::Relearning);
            }
        }
        if cached.day != day {
            return Freshness::Stale(StaleReason::DayRolledOver);
        }
        Freshness::Fresh
    }

    /// Replace the cache with a fresh prioritized stack.
    ///
    /// Limits are widened to the whole collection for the snapshot and
    /// restored before returning; the live `counts` are the quotas.
    pub fn rebuild<E>(&mut self, engine: &mut E, counts: &QueueCounts)
    where
        E: SchedulerEngine + ?Sized,
    {
        let deck_id = engine.current_deck_id();
        let day = engine.today();

        let extend = engine.card_count();
        let delta = i64::try_from(extend).unwrap_or(i64::MAX);
        engine.extend_limits(0, delta);
        let snapshot = engine.queued_cards(extend);
        engine.extend_limits(0, -delta);

        let candidates: Vec<QueuedCard> = snapshot
            .cards
            .into_iter()
            .filter(|card| card.queue.is_scored())
            .collect();
        let candidate_count = candidates.len();

        let mut stack = select(candidates, counts, day, &self.scorer, &*engine);
        stack.reverse();

        self.rebuilds += 1;
        tracing::debug!(
            deck_id,
            day,
            candidates = candidate_count,
            selected = stack.len(),
            "rebuilt reorder cache"
        );
        self.slot = CacheSlot::Built(CachedStack {
            deck_id,
            day,
            stack,
        });
    }

    /// Serve the next card, rebuilding first when the cache is absent or
    /// stale. Returns `None` when the engine has nothing to show.
    pub fn next_card<E>(&mut self, engine: &mut E) -> Option<ServedCard>
    where
        E: SchedulerEngine + ?Sized,
    {
        let output = engine.queued_cards(1);
        let counts = output.counts;
        let engine_top = output.cards.into_iter().next()?;

        if !engine_top.queue.is_scored() {
            return Some(ServedCard::new(engine_top, counts));
        }

        let freshness = match self.freshness(engine.current_deck_id(), engine.today(), &counts) {
            // the engine has a scored card to show that the stack cannot account for
            Freshness::Fresh if self.top().is_none() => {
                Freshness::Stale(StaleReason::CountMismatch)
            }
            freshness => freshness,
        };
        match freshness {
            Freshness::Fresh => {
                // keeps the engine's undo bookkeeping in step without moving limits
                engine.extend_limits(0, 0);
            }
            Freshness::Absent => self.rebuild(engine, &counts),
            Freshness::Stale(reason) => {
                tracing::debug!(?reason, "reorder cache stale");
                self.rebuild(engine, &counts);
            }
        }

        match self.top() {
            Some(top) => Some(ServedCard::new(top.clone(), counts)),
            None => {
                tracing::warn!("reorder cache empty after rebuild, serving engine order");
                Some(ServedCard::new(engine_top, counts))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::card::{QueueClass, QueuedCards};
    use crate::knowledge::DeckParameters;
    use crate::selector::ParameterSource;
    use crate::selector::tests::queued;

    struct Ranked;

    impl Scorer for Ranked {
        fn score(&self, card: &QueuedCard, _today: u32, _params: Option<&DeckParameters>) -> f64 {
            -(card.id() as f64)
        }
    }

    struct Queue {
        cards: Vec<QueuedCard>,
        counts: QueueCounts,
        deck: DeckId,
        day: u32,
        extensions: Vec<(i64, i64)>,
    }

    impl Queue {
        fn reviews(ids: &[i64], limit: usize) -> Self {
            Self {
                cards: ids.iter().map(|&id| queued(id, QueueClass::Review)).collect(),
                counts: QueueCounts::new(0, 0, limit.min(ids.len())),
                deck: 1,
                day: 0,
                extensions: Vec::new(),
            }
        }
    }

    impl ParameterSource for Queue {
        fn deck_parameters(&self, _deck_id: DeckId) -> Option<&DeckParameters> {
            None
        }
    }

    impl SchedulerEngine for Queue {
        fn queued_cards(&mut self, fetch_limit: usize) -> QueuedCards {
            QueuedCards {
                cards: self.cards.iter().take(fetch_limit).cloned().collect(),
                counts: self.counts,
            }
        }

        fn extend_limits(&mut self, new_delta: i64, review_delta: i64) {
            self.extensions.push((new_delta, review_delta));
        }

        fn card_count(&self) -> usize {
            self.cards.len()
        }

        fn today(&self) -> u32 {
            self.day
        }

        fn current_deck_id(&self) -> DeckId {
            self.deck
        }
    }

    #[test]
    fn test_absent_cache_rebuilds_and_serves_top() {
        let mut engine = Queue::reviews(&[1, 2, 3], 2);
        let mut cache = ReorderCache::with_scorer(Ranked);
        assert_eq!(cache.freshness(1, 0, &engine.counts), Freshness::Absent);

        let served = cache.next_card(&mut engine).unwrap();
        assert_eq!(served.id(), 3);
        assert_eq!(cache.rebuild_count(), 1);
        let stack: Vec<i64> = cache.stack().iter().map(|c| c.id()).collect();
        assert_eq!(stack, vec![2, 3]);
        // widen, restore
        assert_eq!(engine.extensions, vec![(0, 3), (0, -3)]);
    }

    #[test]
    fn test_fresh_cache_nudges_limits_without_rebuild() {
        let mut engine = Queue::reviews(&[1, 2, 3], 2);
        let mut cache = ReorderCache::with_scorer(Ranked);
        cache.next_card(&mut engine);
        cache.next_card(&mut engine);
        assert_eq!(cache.rebuild_count(), 1);
        assert_eq!(engine.extensions.last(), Some(&(0, 0)));
    }

    #[test]
    fn test_staleness_conditions() {
        let mut engine = Queue::reviews(&[1, 2, 3], 2);
        let mut cache = ReorderCache::with_scorer(Ranked);
        cache.next_card(&mut engine);
        let counts = engine.counts;

        assert_eq!(cache.freshness(1, 0, &counts), Freshness::Fresh);
        assert_eq!(
            cache.freshness(9, 0, &counts),
            Freshness::Stale(StaleReason::DeckChanged)
        );
        assert_eq!(
            cache.freshness(1, 1, &counts),
            Freshness::Stale(StaleReason::DayRolledOver)
        );
        assert_eq!(
            cache.freshness(1, 0, &QueueCounts::new(0, 0, 1)),
            Freshness::Stale(StaleReason::CountMismatch)
        );
        assert_eq!(
            cache.freshness(1, 0, &QueueCounts::new(0, 2, 0)),
            Freshness::Stale(StaleReason::ClassExhausted)
        );
    }

    #[test]
    fn test_relearning_top_forces_rebuild() {
        let mut engine = Queue::reviews(&[], 0);
        let mut relearn = queued(4, QueueClass::Learning);
        relearn.card.kind = CardKind::Relearn;
        engine.cards = vec![relearn];
        engine.counts = QueueCounts::new(0, 1, 0);

        let mut cache = ReorderCache::with_scorer(Ranked);
        cache.next_card(&mut engine);
        assert_eq!(
            cache.freshness(1, 0, &engine.counts),
            Freshness::Stale(StaleReason::Relearning)
        );
        cache.next_card(&mut engine);
        assert_eq!(cache.rebuild_count(), 2);
    }

    #[test]
    fn test_new_cards_bypass_cache() {
        let mut engine = Queue::reviews(&[2], 1);
        engine.cards.insert(0, queued(1, QueueClass::New));
        engine.counts.new = 1;

        let mut cache = ReorderCache::with_scorer(Ranked);
        let served = cache.next_card(&mut engine).unwrap();
        assert_eq!(served.id(), 1);
        assert!(cache.is_absent());
        assert_eq!(cache.rebuild_count(), 0);
    }

    #[test]
    fn test_empty_queue_serves_nothing() {
        let mut engine = Queue::reviews(&[], 0);
        let mut cache = ReorderCache::with_scorer(Ranked);
        assert!(cache.next_card(&mut engine).is_none());
    }

    #[test]
    fn test_empty_rebuild_falls_back_to_engine_top() {
        let mut engine = Queue::reviews(&[5], 1);
        engine.counts = QueueCounts::new(0, 1, 0);
        let mut cache = ReorderCache::with_scorer(Ranked);
        let served = cache.next_card(&mut engine).unwrap();
        assert_eq!(served.id(), 5);
        assert!(cache.stack().is_empty());
    }

    #[test]
    fn test_empty_stack_with_scored_engine_top_is_never_fresh() {
        // engine serves a review card while reporting no remaining counts
        let mut engine = Queue::reviews(&[5], 0);
        assert_eq!(engine.counts, QueueCounts::new(0, 0, 0));
        let mut cache = ReorderCache::with_scorer(Ranked);

        assert_eq!(cache.next_card(&mut engine).unwrap().id(), 5);
        assert_eq!(cache.freshness(1, 0, &engine.counts), Freshness::Fresh);
        assert_eq!(cache.next_card(&mut engine).unwrap().id(), 5);
        assert_eq!(cache.rebuild_count(), 2);
        assert!(!engine.extensions.contains(&(0, 0)));
    }

    #[test]
    fn test_served_card_carries_custom_data() {
        let mut card = queued(1, QueueClass::Review);
        card.card.custom_data = Some("{\"s\":1}".to_string());
        let served = ServedCard::new(card, QueueCounts::new(0, 0, 1));
        assert_eq!(served.queued.states.custom_data.as_deref(), Some("{\"s\":1}"));
    }
}
