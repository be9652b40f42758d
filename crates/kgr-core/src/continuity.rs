//! Same-day continuity: carry short-term branches forward as review
//! branches so a same-day repeat is not fed to the memory model as a fresh
//! short-interval observation.

use std::fmt;

use crate::card::{NextState, NextStates, Rating, ReviewState};
use crate::constants::CARRIED_LEARNING_INTERVAL_DAYS;

/// Render passes a card goes through in the reviewer.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RenderKind {
    ReviewQuestion,
    ReviewAnswer,
    Preview,
}

impl RenderKind {
    /// The pass that shows the answer buttons.
    pub fn shows_answer_choices(self) -> bool {
        self == RenderKind::ReviewAnswer
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContinuityError {
    /// A hypothetical branch outside {review, learning, relearning}; the
    /// engine is not one this crate understands.
    UnexpectedBranch { rating: Rating, kind: &'static str },
}

impl fmt::Display for ContinuityError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ContinuityError::UnexpectedBranch { rating, kind } => {
                write!(f, "unexpected {kind} next state in {rating:?} branch")
            }
        }
    }
}

impl std::error::Error for ContinuityError {}

/// Long-term replacement for a short-term branch, or `None` to leave the
/// branch alone.
fn carried(state: &NextState, rating: Rating) -> Result<Option<ReviewState>, ContinuityError> {
    match state {
        NextState::Review(_) => Ok(None),
        NextState::Learning(learning) => Ok(learning.memory_state.map(|memory| ReviewState {
            scheduled_days: CARRIED_LEARNING_INTERVAL_DAYS,
            elapsed_days: 0,
            lapses: 0,
            memory_state: Some(memory),
        })),
        NextState::Relearning(relearning) => {
            Ok(relearning.learning.memory_state.map(|memory| ReviewState {
                memory_state: Some(memory),
                ..relearning.review.clone()
            }))
        }
        NextState::New(_) | NextState::Unrecognized => Err(ContinuityError::UnexpectedBranch {
            rating,
            kind: state.kind_name(),
        }),
    }
}

/// Rewrite every short-term branch that carries a projected memory state
/// into a review branch. Returns how many branches were rewritten.
///
/// Every branch is checked before any is modified, so an error leaves the
/// states untouched.
pub fn carry_same_day(states: &mut NextStates) -> Result<usize, ContinuityError> {
    let mut replacements = Vec::with_capacity(Rating::ALL.len());
    for rating in Rating::ALL {
        if let Some(review) = carried(states.get(rating), rating)? {
            replacements.push((rating, review));
        }
    }

    let rewritten = replacements.len();
    for (rating, review) in replacements {
        *states.get_mut(rating) = NextState::Review(review);
    }
    Ok(rewritten)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::card::{LearningState, MemoryState, NewState, RelearningState};

    fn learning(memory: Option<MemoryState>) -> NextState {
        NextState::Learning(LearningState {
            remaining_steps: 1,
            scheduled_secs: 600,
            memory_state: memory,
        })
    }

    fn review(days: u32, memory: Option<MemoryState>) -> ReviewState {
        ReviewState {
            scheduled_days: days,
            elapsed_days: 4,
            lapses: 2,
            memory_state: memory,
        }
    }

    fn relearning(days: u32, memory: Option<MemoryState>) -> NextState {
        NextState::Relearning(RelearningState {
            review: review(days, Some(MemoryState::new(9.0, 0.5))),
            learning: LearningState {
                remaining_steps: 1,
                scheduled_secs: 600,
                memory_state: memory,
            },
        })
    }

    fn states() -> NextStates {
        let m = |s| Some(MemoryState::new(5.0, s));
        NextStates {
            current: NextState::Review(review(10, m(10.0))),
            again: relearning(3, m(1.5)),
            hard: learning(m(2.0)),
            good: NextState::Review(review(12, m(12.0))),
            easy: learning(None),
            custom_data: None,
        }
    }

    #[test]
    fn test_learning_branch_becomes_one_day_review() {
        let mut s = states();
        carry_same_day(&mut s).unwrap();
        assert_eq!(
            s.hard,
            NextState::Review(ReviewState {
                scheduled_days: 1,
                elapsed_days: 0,
                lapses: 0,
                memory_state: Some(MemoryState::new(5.0, 2.0)),
            })
        );
    }

    #[test]
    fn test_relearning_branch_keeps_its_interval() {
        let mut s = states();
        carry_same_day(&mut s).unwrap();
        let NextState::Review(again) = &s.again else {
            panic!("again branch should be review: {:?}", s.again);
        };
        assert_eq!(again.scheduled_days, 3);
        assert_eq!(again.lapses, 2);
        assert_eq!(again.memory_state, Some(MemoryState::new(5.0, 1.5)));
    }

    #[test]
    fn test_review_and_memoryless_branches_untouched() {
        let original = states();
        let mut s = original.clone();
        assert_eq!(carry_same_day(&mut s).unwrap(), 2);
        assert_eq!(s.good, original.good);
        assert_eq!(s.easy, original.easy);
        assert_eq!(s.current, original.current);
    }

    #[test]
    fn test_rewrite_is_idempotent() {
        let mut once = states();
        carry_same_day(&mut once).unwrap();
        let mut twice = once.clone();
        assert_eq!(carry_same_day(&mut twice).unwrap(), 0);
        assert_eq!(once, twice);
    }

    #[test]
    fn test_unrecognized_branch_is_fatal_and_leaves_states_alone() {
        let mut s = states();
        s.easy = NextState::Unrecognized;
        let before = s.clone();
        assert_eq!(
            carry_same_day(&mut s),
            Err(ContinuityError::UnexpectedBranch {
                rating: Rating::Easy,
                kind: "unrecognized",
            })
        );
        assert_eq!(s, before);
    }

    #[test]
    fn test_new_state_is_not_a_hypothetical_branch() {
        let mut s = states();
        s.good = NextState::New(NewState { position: 3 });
        let err = carry_same_day(&mut s).unwrap_err();
        assert_eq!(err.to_string(), "unexpected new next state in Good branch");
    }

    #[test]
    fn test_only_answer_render_shows_choices() {
        assert!(RenderKind::ReviewAnswer.shows_answer_choices());
        assert!(!RenderKind::ReviewQuestion.shows_answer_choices());
        assert!(!RenderKind::Preview.shows_answer_choices());
    }
}
