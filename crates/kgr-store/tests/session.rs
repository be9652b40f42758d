//! Review sessions driven against the in-memory collection.

use kgr_core::{
    NextState, ParameterSource, Rating, RenderKind, ReorderSettings, ReviewSession,
    SchedulerEngine, score,
};
use kgr_store::Collection;

const COLLECTION: &str = r#"{
    "today": 100,
    "current_deck": 1,
    "decks": [
        {"id": 1, "name": "Geography", "reviews_per_day": 2, "params": {"fsrs6": [
            0.212, 1.2931, 2.3065, 8.2956, 6.4133, 0.8334, 3.0194, 0.001, 1.8722, 0.1666,
            0.796, 1.4835, 0.0614, 0.2629, 1.6483, 0.6014, 1.8729, 0.5425, 0.0912, 0.0658,
            0.1542]}}
    ],
    "cards": [
        {"id": 1, "deck_id": 1, "kind": "review", "due": 90, "interval": 60,
         "memory_state": {"difficulty": 3.0, "stability": 60.0}, "last_review_day": 30},
        {"id": 2, "deck_id": 1, "kind": "review", "due": 95, "interval": 2,
         "memory_state": {"difficulty": 8.0, "stability": 2.0}, "last_review_day": 93},
        {"id": 3, "deck_id": 1, "kind": "review", "due": 100, "interval": 10,
         "memory_state": {"difficulty": 5.0, "stability": 10.0}, "last_review_day": 90},
        {"id": 4, "deck_id": 1, "kind": "new"}
    ]
}"#;

fn collection() -> Collection {
    Collection::from_json_str(COLLECTION).unwrap()
}

fn reordering(same_day_continuity: bool) -> ReviewSession {
    ReviewSession::new(ReorderSettings {
        reorder_cards: true,
        same_day_continuity,
    })
}

/// Due review ids sorted by knowledge score, lowest (served first) first.
fn expected_order(col: &Collection) -> Vec<i64> {
    let params = col.deck_parameters(1).unwrap();
    let mut scored: Vec<(f64, i64)> = [1, 2, 3]
        .into_iter()
        .map(|id| {
            let card = col.card(id).unwrap();
            let elapsed = (col.today() - card.last_review_day.unwrap()) as f64;
            (score(card.memory_state, elapsed, params), id)
        })
        .collect();
    scored.sort_by(|a, b| a.0.total_cmp(&b.0).then(a.1.cmp(&b.1)));
    scored.into_iter().map(|(_, id)| id).collect()
}

#[test]
fn serves_highest_gain_reviews_within_quota() {
    let mut col = collection();
    let expected = expected_order(&col);
    let mut session = reordering(false);

    let mut served = Vec::new();
    while let Some(card) = session.next_card(&mut col) {
        let id = card.id();
        served.push(id);
        col.answer(id, Rating::Good).unwrap();
        session.card_answered(id);
    }

    // two reviews by score, then the new card and its one learning step
    assert_eq!(&served[..2], &expected[..2]);
    assert_eq!(&served[2..], &[4, 4]);
    assert!(!served.contains(&expected[2]));
    // the second rebuild picks up card 4 once it enters learning
    assert_eq!(session.rebuild_count(), 2);
}

#[test]
fn default_order_follows_engine() {
    let mut col = collection();
    let mut session = ReviewSession::new(ReorderSettings {
        reorder_cards: false,
        same_day_continuity: false,
    });
    let first = session.next_card(&mut col).unwrap();
    assert_eq!(first.id(), 1);
    assert_eq!(session.rebuild_count(), 0);
}

#[test]
fn burying_a_non_top_card_forces_rebuild() {
    let mut col = collection();
    let expected = expected_order(&col);
    let mut session = reordering(false);

    let top = session.next_card(&mut col).unwrap();
    assert_eq!(top.id(), expected[0]);

    let other = expected[1];
    session.card_will_be_buried(other);
    col.bury(other).unwrap();

    let next = session.next_card(&mut col).unwrap();
    assert_eq!(session.rebuild_count(), 2);
    assert_eq!(next.id(), expected[0]);
}

#[test]
fn continuity_rewrites_short_term_branches_on_answer_render() {
    let mut col = collection();
    let mut session = reordering(true);

    let mut card = session.next_card(&mut col).unwrap();
    assert!(matches!(card.queued.states.again, NextState::Relearning(_)));

    assert_eq!(
        session
            .card_will_show(&mut card, RenderKind::ReviewQuestion)
            .unwrap(),
        0
    );
    let rewritten = session
        .card_will_show(&mut card, RenderKind::ReviewAnswer)
        .unwrap();
    assert_eq!(rewritten, 1);
    assert!(matches!(card.queued.states.again, NextState::Review(_)));
    assert!(matches!(card.queued.states.current, NextState::Review(_)));
}

#[test]
fn day_rollover_rebuilds() {
    let mut col = collection();
    let mut session = reordering(false);
    let card = session.next_card(&mut col).unwrap();
    col.answer(card.id(), Rating::Easy).unwrap();
    session.card_answered(card.id());

    col.advance_day();
    assert_eq!(col.today(), 101);
    session.next_card(&mut col).unwrap();
    assert_eq!(session.rebuild_count(), 2);
}
