//! Day-by-day review simulation against a collection.

use std::fmt;

use anyhow::{Context, Result};
use kgr_core::{CardId, Rating, RenderKind, ReviewSession, SchedulerEngine, ServedCard};
use kgr_store::{Collection, Settings};
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};

/// Recall probability assumed for a card with no memory state yet.
const UNSEEN_RECALL: f64 = 0.6;

/// Daily answer cap, as a multiple of the collection size.
const MAX_ANSWERS_PER_CARD: usize = 10;

#[derive(Debug, Default)]
pub struct Report {
    pub days: Vec<(u32, Vec<CardId>)>,
    pub rebuilds: usize,
    pub reordering: bool,
}

impl fmt::Display for Report {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (day, served) in &self.days {
            let ids: Vec<String> = served.iter().map(ToString::to_string).collect();
            writeln!(f, "day {day}: {} served: {}", served.len(), ids.join(" "))?;
        }
        let order = if self.reordering { "knowledge-gain" } else { "default" };
        writeln!(f, "order: {order}")?;
        writeln!(f, "rebuilds: {}", self.rebuilds)
    }
}

fn recall_probability(collection: &Collection, served: &ServedCard) -> f64 {
    let card = &served.queued.card;
    let Some(state) = card.memory_state else {
        return UNSEEN_RECALL;
    };
    collection
        .deck(card.home_deck_id())
        .map_or(UNSEEN_RECALL, |deck| {
            deck.scheduling_model()
                .retrievability(state, card.elapsed_days(collection.today()))
        })
        .clamp(0.0, 1.0)
}

fn pick_rating(rng: &mut SmallRng, recall: f64) -> Rating {
    if !rng.random_bool(recall) {
        return Rating::Again;
    }
    match rng.random_range(0..20) {
        0..3 => Rating::Hard,
        3..18 => Rating::Good,
        _ => Rating::Easy,
    }
}

pub fn run(collection: &mut Collection, settings: &Settings, days: u32) -> Result<Report> {
    let mut rng = SmallRng::seed_from_u64(settings.simulation.seed);
    let mut session = ReviewSession::new(settings.reorder);
    let mut report = Report {
        reordering: session.is_reordering(),
        ..Report::default()
    };
    tracing::info!(session = %session.id(), days, seed = settings.simulation.seed, "simulating");

    for day in 0..days {
        if day > 0 {
            collection.advance_day();
        }
        let cap = collection.card_count().saturating_mul(MAX_ANSWERS_PER_CARD);
        let mut served_ids = Vec::new();

        while let Some(mut served) = session.next_card(collection) {
            if served_ids.len() >= cap {
                tracing::warn!(day = collection.today(), cap, "answer cap reached, ending day");
                break;
            }
            session
                .card_will_show(&mut served, RenderKind::ReviewAnswer)
                .context("same-day rewrite failed")?;

            let card_id = served.id();
            let rating = pick_rating(&mut rng, recall_probability(collection, &served));
            collection
                .answer_with(card_id, rating, served.queued.states.get(rating))
                .with_context(|| format!("failed to answer card {card_id}"))?;
            session.card_answered(card_id);
            served_ids.push(card_id);
        }
        report.days.push((collection.today(), served_ids));
    }

    report.rebuilds = session.rebuild_count();
    Ok(report)
}
