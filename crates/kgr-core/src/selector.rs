//! Priority selection: score every Learning/Review card, stable-sort by
//! score, then greedily fill each class up to its quota.

use crate::card::{DeckId, QueueCounts, QueuedCard};
use crate::knowledge::{self, DeckParameters};

/// Ordering key for a queued card. Lower sorts first.
pub trait Scorer {
    fn score(&self, card: &QueuedCard, today: u32, params: Option<&DeckParameters>) -> f64;
}

/// Production scorer: negated expected knowledge gain.
#[derive(Clone, Copy, Debug, Default)]
pub struct KnowledgeScorer;

impl Scorer for KnowledgeScorer {
    fn score(&self, card: &QueuedCard, today: u32, params: Option<&DeckParameters>) -> f64 {
        match params {
            Some(params) => knowledge::score(
                card.card.memory_state,
                card.card.elapsed_days(today),
                params,
            ),
            None => knowledge::NEUTRAL_SCORE,
        }
    }
}

/// Source of per-deck parameter vectors.
pub trait ParameterSource {
    fn deck_parameters(&self, deck_id: DeckId) -> Option<&DeckParameters>;
}

/// Score each Learning/Review card with its own deck's parameters and
/// select in priority order under `quotas`.
pub fn select<S, P>(
    cards: Vec<QueuedCard>,
    quotas: &QueueCounts,
    today: u32,
    scorer: &S,
    params: &P,
) -> Vec<QueuedCard>
where
    S: Scorer + ?Sized,
    P: ParameterSource + ?Sized,
{
    select_by(cards, quotas, |card| {
        scorer.score(card, today, params.deck_parameters(card.card.home_deck_id()))
    })
}

/// Selection with an arbitrary scoring function.
///
/// New-class cards never enter the output. Ties keep input order.
pub fn select_by<F>(cards: Vec<QueuedCard>, quotas: &QueueCounts, mut score: F) -> Vec<QueuedCard>
where
    F: FnMut(&QueuedCard) -> f64,
{
    let mut scored: Vec<(f64, QueuedCard)> = cards
        .into_iter()
        .filter(|card| card.queue.is_scored())
        .map(|card| (score(&card), card))
        .collect();
    // sort_by is stable: equal scores keep snapshot order
    scored.sort_by(|a, b| a.0.total_cmp(&b.0));

    let mut admitted = QueueCounts::default();
    let mut selected = Vec::with_capacity(quotas.scored_total().min(scored.len()));
    for (_, card) in scored {
        let class = card.queue;
        if admitted[class] < quotas[class] {
            admitted[class] += 1;
            selected.push(card);
        }
    }
    selected
}

/// Count selected cards per class.
pub fn class_counts(cards: &[QueuedCard]) -> QueueCounts {
    let mut counts = QueueCounts::default();
    for card in cards {
        counts[card.queue] += 1;
    }
    counts
}
