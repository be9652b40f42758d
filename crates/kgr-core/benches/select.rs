use std::hint::black_box;

use criterion::{Criterion, criterion_group, criterion_main};
use kgr_core::constants::DEFAULT_FSRS6_PARAMS;
use kgr_core::{
    Card, CardKind, DeckId, DeckParameters, KnowledgeScorer, MemoryState, NextState, NextStates,
    ParameterSource, QueueClass, QueueCounts, QueuedCard, ReviewState, SchedulingContext, select,
};

struct OneDeck(DeckParameters);

impl ParameterSource for OneDeck {
    fn deck_parameters(&self, _deck_id: DeckId) -> Option<&DeckParameters> {
        Some(&self.0)
    }
}

fn snapshot(n: usize) -> Vec<QueuedCard> {
    let branch = NextState::Review(ReviewState {
        scheduled_days: 1,
        elapsed_days: 0,
        lapses: 0,
        memory_state: None,
    });
    (0..n)
        .map(|i| QueuedCard {
            card: Card {
                id: i as i64,
                deck_id: 1,
                original_deck_id: None,
                kind: CardKind::Review,
                memory_state: Some(MemoryState::new(
                    1.0 + (i % 9) as f64,
                    0.5 + (i % 97) as f64,
                )),
                last_review_day: Some(1000 - (i % 60) as u32),
                custom_data: None,
            },
            queue: if i % 5 == 0 {
                QueueClass::Learning
            } else {
                QueueClass::Review
            },
            states: NextStates {
                current: branch.clone(),
                again: branch.clone(),
                hard: branch.clone(),
                good: branch.clone(),
                easy: branch.clone(),
                custom_data: None,
            },
            context: SchedulingContext::default(),
        })
        .collect()
}

fn bench_select(c: &mut Criterion) {
    let params = OneDeck(DeckParameters {
        fsrs6: DEFAULT_FSRS6_PARAMS.to_vec(),
        legacy: Vec::new(),
    });
    let cards = snapshot(5_000);
    let quotas = QueueCounts::new(0, 200, 200);

    c.bench_function("select_5000_cards", |b| {
        b.iter(|| {
            black_box(select(
                cards.clone(),
                &quotas,
                1000,
                &KnowledgeScorer,
                &params,
            ))
        })
    });
}

criterion_group!(benches, bench_select);
criterion_main!(benches);
