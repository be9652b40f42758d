//! Review session: the card-selection strategy chosen at configuration
//! time, plus the hooks the reviewer calls as cards move through it.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::cache::{ReorderCache, ServedCard};
use crate::card::CardId;
use crate::continuity::{ContinuityError, RenderKind, carry_same_day};
use crate::engine::SchedulerEngine;
use crate::listener::SessionEvent;
use crate::selector::{KnowledgeScorer, Scorer};

/// User-facing switches.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReorderSettings {
    pub reorder_cards: bool,
    pub same_day_continuity: bool,
}

impl Default for ReorderSettings {
    fn default() -> Self {
        Self {
            reorder_cards: true,
            same_day_continuity: false,
        }
    }
}

/// How the next card is picked.
#[derive(Debug)]
pub enum CardSelection<S = KnowledgeScorer> {
    /// Whatever the engine puts first.
    Default,
    /// Highest expected knowledge gain first, within the engine's quotas.
    Reordered(ReorderCache<S>),
}

impl<S: Scorer> CardSelection<S> {
    pub fn next_card<E>(&mut self, engine: &mut E) -> Option<ServedCard>
    where
        E: SchedulerEngine + ?Sized,
    {
        match self {
            CardSelection::Default => {
                let output = engine.queued_cards(1);
                let counts = output.counts;
                output
                    .cards
                    .into_iter()
                    .next()
                    .map(|card| ServedCard::new(card, counts))
            }
            CardSelection::Reordered(cache) => cache.next_card(engine),
        }
    }

    pub fn observe(&mut self, event: SessionEvent) {
        match self {
            CardSelection::Default => {}
            CardSelection::Reordered(cache) => {
                cache.observe(event);
            }
        }
    }

    pub fn rebuild_count(&self) -> usize {
        match self {
            CardSelection::Default => 0,
            CardSelection::Reordered(cache) => cache.rebuild_count(),
        }
    }
}

/// One learner's pass through the queue. All state lives here and goes
/// away with the session.
#[derive(Debug)]
pub struct ReviewSession<S = KnowledgeScorer> {
    id: Uuid,
    settings: ReorderSettings,
    selection: CardSelection<S>,
    scorer: S,
}

impl ReviewSession {
    pub fn new(settings: ReorderSettings) -> Self {
        Self::with_scorer(settings, KnowledgeScorer)
    }
}

impl<S: Scorer + Clone> ReviewSession<S> {
    pub fn with_scorer(settings: ReorderSettings, scorer: S) -> Self {
        let selection = Self::selection_for(&settings, &scorer);
        let id = Uuid::new_v4();
        tracing::debug!(session = %id, ?settings, "review session started");
        Self {
            id,
            settings,
            selection,
            scorer,
        }
    }

    fn selection_for(settings: &ReorderSettings, scorer: &S) -> CardSelection<S> {
        if settings.reorder_cards {
            CardSelection::Reordered(ReorderCache::with_scorer(scorer.clone()))
        } else {
            CardSelection::Default
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn settings(&self) -> &ReorderSettings {
        &self.settings
    }

    pub fn is_reordering(&self) -> bool {
        matches!(self.selection, CardSelection::Reordered(_))
    }

    /// Apply new settings. Toggling reordering swaps the strategy; turning
    /// it on starts from an absent cache.
    pub fn reconfigure(&mut self, settings: ReorderSettings) {
        if settings.reorder_cards != self.settings.reorder_cards {
            self.selection = Self::selection_for(&settings, &self.scorer);
        }
        self.settings = settings;
    }

    /// Drop-in for the reviewer's "fetch next card": one card with its four
    /// branches and a running response timer, or `None` when done.
    pub fn next_card<E>(&mut self, engine: &mut E) -> Option<ServedCard>
    where
        E: SchedulerEngine + ?Sized,
    {
        let span = tracing::debug_span!("next_card", session = %self.id);
        let _enter = span.enter();
        self.selection.next_card(engine)
    }

    pub fn card_answered(&mut self, card_id: CardId) {
        self.selection.observe(SessionEvent::Answered(card_id));
    }

    pub fn card_will_be_buried(&mut self, card_id: CardId) {
        self.selection.observe(SessionEvent::WillBury(card_id));
    }

    pub fn card_will_be_suspended(&mut self, card_id: CardId) {
        self.selection.observe(SessionEvent::WillSuspend(card_id));
    }

    /// Render hook. Rewrites short-term branches when continuity is on and
    /// the render shows answer choices; returns the number rewritten.
    pub fn card_will_show(
        &self,
        card: &mut ServedCard,
        kind: RenderKind,
    ) -> Result<usize, ContinuityError> {
        if !self.settings.same_day_continuity || !kind.shows_answer_choices() {
            return Ok(0);
        }
        let card_id = card.id();
        carry_same_day(&mut card.queued.states).inspect_err(|e| {
            tracing::warn!(card_id, "same-day rewrite failed: {e}");
        })
    }

    pub fn rebuild_count(&self) -> usize {
        self.selection.rebuild_count()
    }
}
