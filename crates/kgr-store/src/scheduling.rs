//! Card state transitions for the reference engine.
//!
//! The same transition both answers a card and projects its four
//! hypothetical branches, so what the reviewer is shown is exactly what
//! answering will do.

use kgr_core::constants::{LEARNING_STEP_SECS, S_MAX};
use kgr_core::{
    CardKind, LearningState, MemoryModel, MemoryState, NewState, NextState, NextStates, Rating,
    RelearningState, ReviewState,
};

use crate::collection::StoredCard;

/// Learning steps a new card goes through before graduating.
pub const LEARN_STEPS: u32 = 2;

/// Relearning steps after a lapse.
pub const RELEARN_STEPS: u32 = 1;

/// Where a card lands after an answer.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Outcome {
    pub kind: CardKind,
    pub memory: MemoryState,
    /// Days until the card is due again as a review (lapse interval for relearning).
    pub interval_days: u32,
    pub remaining_steps: u32,
    pub lapses: u32,
}

fn interval_days(model: &MemoryModel<'_>, stability: f64, desired_retention: f64) -> u32 {
    model
        .interval(stability, desired_retention)
        .round()
        .clamp(1.0, S_MAX) as u32
}

pub fn transition(
    card: &StoredCard,
    rating: Rating,
    model: &MemoryModel<'_>,
    desired_retention: f64,
    today: u32,
) -> Outcome {
    let elapsed = card
        .last_review_day
        .map(|day| today.saturating_sub(day) as f64)
        .unwrap_or(0.0);
    let memory = match card.memory_state {
        Some(state) if card.kind != CardKind::New => model.next_state(state, elapsed, rating),
        _ => model.initial_state(rating),
    };

    let (kind, remaining_steps, lapses) = match (card.kind, rating) {
        (CardKind::New, Rating::Easy) => (CardKind::Review, 0, card.lapses),
        (CardKind::New, Rating::Good) => (CardKind::Learn, LEARN_STEPS - 1, card.lapses),
        (CardKind::New, _) => (CardKind::Learn, LEARN_STEPS, card.lapses),

        (CardKind::Learn, Rating::Again) => (CardKind::Learn, LEARN_STEPS, card.lapses),
        (CardKind::Learn, Rating::Hard) => (CardKind::Learn, card.remaining_steps, card.lapses),
        (CardKind::Learn, Rating::Good) if card.remaining_steps > 1 => {
            (CardKind::Learn, card.remaining_steps - 1, card.lapses)
        }
        (CardKind::Learn, _) => (CardKind::Review, 0, card.lapses),

        (CardKind::Relearn, Rating::Again | Rating::Hard) => {
            (CardKind::Relearn, RELEARN_STEPS, card.lapses)
        }
        (CardKind::Relearn, _) => (CardKind::Review, 0, card.lapses),

        (CardKind::Review, Rating::Again) => (CardKind::Relearn, RELEARN_STEPS, card.lapses + 1),
        (CardKind::Review, _) => (CardKind::Review, 0, card.lapses),
    };

    Outcome {
        kind,
        memory,
        interval_days: interval_days(model, memory.stability, desired_retention),
        remaining_steps,
        lapses,
    }
}

/// Outcome of answering into `branch`, which may have been rewritten after
/// projection. Lapse bookkeeping and any memory state the branch lacks come
/// from `computed`. `None` for branches that cannot be applied.
pub fn outcome_from_branch(branch: &NextState, computed: Outcome) -> Option<Outcome> {
    let (kind, memory, interval_days, remaining_steps) = match branch {
        NextState::Review(review) => (
            CardKind::Review,
            review.memory_state,
            review.scheduled_days.max(1),
            0,
        ),
        NextState::Learning(learning) => (
            CardKind::Learn,
            learning.memory_state,
            computed.interval_days,
            learning.remaining_steps,
        ),
        NextState::Relearning(relearning) => (
            CardKind::Relearn,
            relearning.learning.memory_state,
            relearning.review.scheduled_days.max(1),
            relearning.learning.remaining_steps,
        ),
        NextState::New(_) | NextState::Unrecognized => return None,
    };
    Some(Outcome {
        kind,
        memory: memory.unwrap_or(computed.memory),
        interval_days,
        remaining_steps,
        lapses: computed.lapses,
    })
}

fn learning_state(remaining_steps: u32, memory: Option<MemoryState>) -> LearningState {
    LearningState {
        remaining_steps,
        scheduled_secs: LEARNING_STEP_SECS,
        memory_state: memory,
    }
}

/// The card's current position, as a branch.
pub fn current_state(card: &StoredCard, today: u32) -> NextState {
    let elapsed_days = card
        .last_review_day
        .map(|day| today.saturating_sub(day))
        .unwrap_or(0);
    let review = ReviewState {
        scheduled_days: card.interval,
        elapsed_days,
        lapses: card.lapses,
        memory_state: card.memory_state,
    };
    match card.kind {
        CardKind::New => NextState::New(NewState {
            position: u32::try_from(card.id).unwrap_or(u32::MAX),
        }),
        CardKind::Learn => NextState::Learning(learning_state(card.remaining_steps, card.memory_state)),
        CardKind::Review => NextState::Review(review),
        CardKind::Relearn => NextState::Relearning(RelearningState {
            learning: learning_state(card.remaining_steps, card.memory_state),
            review,
        }),
    }
}

/// Project an outcome into the branch the reviewer sees.
pub fn project(outcome: &Outcome, elapsed_days: u32) -> NextState {
    let memory = Some(outcome.memory);
    let review = ReviewState {
        scheduled_days: outcome.interval_days,
        elapsed_days,
        lapses: outcome.lapses,
        memory_state: memory,
    };
    match outcome.kind {
        CardKind::Review => NextState::Review(review),
        CardKind::Relearn => NextState::Relearning(RelearningState {
            review,
            learning: learning_state(outcome.remaining_steps, memory),
        }),
        CardKind::Learn | CardKind::New => {
            NextState::Learning(learning_state(outcome.remaining_steps, memory))
        }
    }
}

/// Current state plus all four hypothetical branches for `card`.
pub fn next_states(
    card: &StoredCard,
    model: &MemoryModel<'_>,
    desired_retention: f64,
    today: u32,
) -> NextStates {
    let elapsed_days = card
        .last_review_day
        .map(|day| today.saturating_sub(day))
        .unwrap_or(0);
    let branch = |rating| {
        project(
            &transition(card, rating, model, desired_retention, today),
            elapsed_days,
        )
    };
    NextStates {
        current: current_state(card, today),
        again: branch(Rating::Again),
        hard: branch(Rating::Hard),
        good: branch(Rating::Good),
        easy: branch(Rating::Easy),
        custom_data: card.custom_data.clone(),
    }
}
