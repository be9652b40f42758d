//! In-memory reference scheduling engine.
//!
//! Decks carry daily new/review limits, desired retention and parameter
//! vectors; cards carry their lifecycle stage, due day and memory state.
//! The collection is loaded from JSON and implements
//! [`SchedulerEngine`], so it can drive a [`kgr_core::ReviewSession`].

use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::path::Path;

use kgr_core::constants::DEFAULT_DESIRED_RETENTION;
use kgr_core::{
    Card, CardId, CardKind, DeckId, DeckParameters, MemoryModel, MemoryState, NextState,
    ParameterSource, QueueClass, QueueCounts, QueuedCard, QueuedCards, Rating, SchedulerEngine,
    SchedulingContext,
};
use serde::{Deserialize, Serialize};

use crate::error::{Result, StoreError};
use crate::scheduling::{self, Outcome};

fn default_new_per_day() -> usize {
    20
}

fn default_reviews_per_day() -> usize {
    200
}

fn default_retention() -> f64 {
    DEFAULT_DESIRED_RETENTION
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DeckConfig {
    pub id: DeckId,
    pub name: String,
    #[serde(default = "default_new_per_day")]
    pub new_per_day: usize,
    #[serde(default = "default_reviews_per_day")]
    pub reviews_per_day: usize,
    #[serde(default = "default_retention")]
    pub desired_retention: f64,
    #[serde(default)]
    pub params: DeckParameters,
}

impl DeckConfig {
    /// Model used to schedule this deck's cards: the deck's own parameters
    /// when they validate, FSRS-6 defaults otherwise.
    pub fn scheduling_model(&self) -> MemoryModel<'_> {
        MemoryModel::resolve_or_default(&self.params)
    }
}

/// A card as persisted in the collection.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct StoredCard {
    pub id: CardId,
    pub deck_id: DeckId,
    #[serde(default)]
    pub original_deck_id: Option<DeckId>,
    pub kind: CardKind,
    /// Day number for review cards; in-day ordinal for learning cards.
    #[serde(default)]
    pub due: u32,
    /// Last scheduled interval in days.
    #[serde(default)]
    pub interval: u32,
    #[serde(default)]
    pub memory_state: Option<MemoryState>,
    #[serde(default)]
    pub last_review_day: Option<u32>,
    #[serde(default)]
    pub remaining_steps: u32,
    #[serde(default)]
    pub lapses: u32,
    #[serde(default)]
    pub buried: bool,
    #[serde(default)]
    pub suspended: bool,
    #[serde(default)]
    pub custom_data: Option<String>,
}

impl StoredCard {
    pub fn home_deck_id(&self) -> DeckId {
        self.original_deck_id.unwrap_or(self.deck_id)
    }

    pub fn queue_class(&self) -> QueueClass {
        match self.kind {
            CardKind::New => QueueClass::New,
            CardKind::Learn | CardKind::Relearn => QueueClass::Learning,
            CardKind::Review => QueueClass::Review,
        }
    }

    fn is_available(&self) -> bool {
        !self.buried && !self.suspended
    }

    fn to_card(&self) -> Card {
        Card {
            id: self.id,
            deck_id: self.deck_id,
            original_deck_id: self.original_deck_id,
            kind: self.kind,
            memory_state: self.memory_state,
            last_review_day: self.last_review_day,
            custom_data: self.custom_data.clone(),
        }
    }
}

/// On-disk shape of a collection.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct CollectionFile {
    #[serde(default)]
    pub today: u32,
    pub current_deck: DeckId,
    pub decks: Vec<DeckConfig>,
    #[serde(default)]
    pub cards: Vec<StoredCard>,
}

/// What a deck has used of today's limits.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
struct DailyTally {
    new_done: usize,
    review_done: usize,
    new_extension: i64,
    review_extension: i64,
}

impl DailyTally {
    fn remaining(limit: usize, done: usize, extension: i64) -> usize {
        let limit = i64::try_from(limit).unwrap_or(i64::MAX);
        let done = i64::try_from(done).unwrap_or(i64::MAX);
        usize::try_from(limit.saturating_add(extension).saturating_sub(done)).unwrap_or(0)
    }
}

#[derive(Debug)]
pub struct Collection {
    today: u32,
    current_deck: DeckId,
    decks: BTreeMap<DeckId, DeckConfig>,
    cards: BTreeMap<CardId, StoredCard>,
    tallies: HashMap<DeckId, DailyTally>,
    next_learning_due: u32,
}

impl Collection {
    pub fn from_file(file: CollectionFile) -> Result<Self> {
        let mut decks = BTreeMap::new();
        for deck in file.decks {
            let id = deck.id;
            if decks.insert(id, deck).is_some() {
                return Err(StoreError::InvalidData(format!("duplicate deck id {id}")));
            }
        }
        if !decks.contains_key(&file.current_deck) {
            return Err(StoreError::UnknownDeck(file.current_deck));
        }

        let mut cards = BTreeMap::new();
        for card in file.cards {
            for deck_id in [Some(card.deck_id), card.original_deck_id].into_iter().flatten() {
                if !decks.contains_key(&deck_id) {
                    return Err(StoreError::UnknownDeck(deck_id));
                }
            }
            let id = card.id;
            if cards.insert(id, card).is_some() {
                return Err(StoreError::InvalidData(format!("duplicate card id {id}")));
            }
        }

        let next_learning_due = cards
            .values()
            .filter(|c: &&StoredCard| c.queue_class() == QueueClass::Learning)
            .map(|c| c.due.saturating_add(1))
            .max()
            .unwrap_or(0);

        Ok(Self {
            today: file.today,
            current_deck: file.current_deck,
            decks,
            cards,
            tallies: HashMap::new(),
            next_learning_due,
        })
    }

    pub fn from_json_str(json: &str) -> Result<Self> {
        Self::from_file(serde_json::from_str(json)?)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let json = fs::read_to_string(path)?;
        let collection = Self::from_json_str(&json)?;
        tracing::debug!(
            path = %path.display(),
            decks = collection.decks.len(),
            cards = collection.cards.len(),
            "loaded collection"
        );
        Ok(collection)
    }

    pub fn to_file(&self) -> CollectionFile {
        CollectionFile {
            today: self.today,
            current_deck: self.current_deck,
            decks: self.decks.values().cloned().collect(),
            cards: self.cards.values().cloned().collect(),
        }
    }

    pub fn to_json_string(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(&self.to_file())?)
    }

    pub fn decks(&self) -> impl Iterator<Item = &DeckConfig> {
        self.decks.values()
    }

    pub fn deck(&self, deck_id: DeckId) -> Option<&DeckConfig> {
        self.decks.get(&deck_id)
    }

    pub fn card(&self, card_id: CardId) -> Option<&StoredCard> {
        self.cards.get(&card_id)
    }

    pub fn set_current_deck(&mut self, deck_id: DeckId) -> Result<()> {
        if !self.decks.contains_key(&deck_id) {
            return Err(StoreError::UnknownDeck(deck_id));
        }
        self.current_deck = deck_id;
        Ok(())
    }

    /// Roll over to the next day: tallies and limit extensions reset,
    /// buried cards come back.
    pub fn advance_day(&mut self) {
        self.today += 1;
        self.tallies.clear();
        for card in self.cards.values_mut() {
            card.buried = false;
        }
        tracing::debug!(today = self.today, "advanced day");
    }

    pub fn bury(&mut self, card_id: CardId) -> Result<()> {
        self.card_mut(card_id)?.buried = true;
        Ok(())
    }

    pub fn suspend(&mut self, card_id: CardId) -> Result<()> {
        self.card_mut(card_id)?.suspended = true;
        Ok(())
    }

    /// Record an answer and move the card to its next state.
    pub fn answer(&mut self, card_id: CardId, rating: Rating) -> Result<Outcome> {
        self.apply_answer(card_id, rating, None)
    }

    /// Record an answer, moving the card into `branch`: the branch the
    /// reviewer was shown for `rating`, possibly rewritten since it was
    /// projected. A review branch schedules the card `scheduled_days` out
    /// with the branch's memory state.
    pub fn answer_with(
        &mut self,
        card_id: CardId,
        rating: Rating,
        branch: &NextState,
    ) -> Result<Outcome> {
        self.apply_answer(card_id, rating, Some(branch))
    }

    fn apply_answer(
        &mut self,
        card_id: CardId,
        rating: Rating,
        branch: Option<&NextState>,
    ) -> Result<Outcome> {
        let today = self.today;
        let card = self
            .cards
            .get(&card_id)
            .ok_or(StoreError::UnknownCard(card_id))?;
        if !card.is_available() {
            return Err(StoreError::InvalidData(format!(
                "card {card_id} is buried or suspended"
            )));
        }
        let deck = self
            .decks
            .get(&card.home_deck_id())
            .ok_or(StoreError::UnknownDeck(card.home_deck_id()))?;
        let model = deck.scheduling_model();
        let computed = scheduling::transition(card, rating, &model, deck.desired_retention, today);
        let outcome = match branch {
            None => computed,
            Some(branch) => scheduling::outcome_from_branch(branch, computed).ok_or_else(|| {
                StoreError::InvalidData(format!(
                    "cannot answer card {card_id} into a {} branch",
                    branch.kind_name()
                ))
            })?,
        };
        let previous = card.kind;
        let deck_id = card.deck_id;

        let tally = self.tallies.entry(deck_id).or_default();
        match previous {
            CardKind::New => tally.new_done += 1,
            CardKind::Review => tally.review_done += 1,
            CardKind::Learn | CardKind::Relearn => {}
        }

        let learning_due = self.next_learning_due;
        let card = self.card_mut(card_id)?;
        card.kind = outcome.kind;
        card.memory_state = Some(outcome.memory);
        card.last_review_day = Some(today);
        card.remaining_steps = outcome.remaining_steps;
        card.lapses = outcome.lapses;
        if outcome.kind == CardKind::Review {
            card.interval = outcome.interval_days;
            card.due = today.saturating_add(outcome.interval_days);
        } else {
            card.due = learning_due;
            self.next_learning_due += 1;
        }

        tracing::debug!(
            card_id,
            ?rating,
            from = ?previous,
            to = ?outcome.kind,
            stability = outcome.memory.stability,
            "answered card"
        );
        Ok(outcome)
    }

    fn card_mut(&mut self, card_id: CardId) -> Result<&mut StoredCard> {
        self.cards
            .get_mut(&card_id)
            .ok_or(StoreError::UnknownCard(card_id))
    }

    fn tally(&self) -> DailyTally {
        self.tallies
            .get(&self.current_deck)
            .copied()
            .unwrap_or_default()
    }

    /// Cards of the current deck that are due today, per class, in engine
    /// order and cut to today's limits.
    fn due_cards(&self) -> [Vec<&StoredCard>; 3] {
        let mut learning = Vec::new();
        let mut review = Vec::new();
        let mut new = Vec::new();
        for card in self.cards.values() {
            if card.deck_id != self.current_deck || !card.is_available() {
                continue;
            }
            match card.queue_class() {
                QueueClass::Learning => learning.push(card),
                QueueClass::Review if card.due <= self.today => review.push(card),
                QueueClass::Review => {}
                QueueClass::New => new.push(card),
            }
        }
        learning.sort_by_key(|c| (c.due, c.id));
        review.sort_by_key(|c| (c.due, c.id));

        if let Some(deck) = self.decks.get(&self.current_deck) {
            let tally = self.tally();
            review.truncate(DailyTally::remaining(
                deck.reviews_per_day,
                tally.review_done,
                tally.review_extension,
            ));
            new.truncate(DailyTally::remaining(
                deck.new_per_day,
                tally.new_done,
                tally.new_extension,
            ));
        }
        [learning, review, new]
    }

    fn queued_card(&self, card: &StoredCard) -> Option<QueuedCard> {
        let deck = self.decks.get(&card.home_deck_id())?;
        let model = deck.scheduling_model();
        Some(QueuedCard {
            card: card.to_card(),
            queue: card.queue_class(),
            states: scheduling::next_states(card, &model, deck.desired_retention, self.today),
            context: SchedulingContext {
                deck_name: deck.name.clone(),
                seed: (card.id as u64).wrapping_add(u64::from(card.lapses)),
            },
        })
    }
}

impl ParameterSource for Collection {
    fn deck_parameters(&self, deck_id: DeckId) -> Option<&DeckParameters> {
        self.decks.get(&deck_id).map(|deck| &deck.params)
    }
}

impl SchedulerEngine for Collection {
    fn queued_cards(&mut self, fetch_limit: usize) -> QueuedCards {
        let [learning, review, new] = self.due_cards();
        let counts = QueueCounts::new(new.len(), learning.len(), review.len());
        let cards = learning
            .into_iter()
            .chain(review)
            .chain(new)
            .take(fetch_limit)
            .filter_map(|card| self.queued_card(card))
            .collect();
        QueuedCards { cards, counts }
    }

    fn extend_limits(&mut self, new_delta: i64, review_delta: i64) {
        let tally = self.tallies.entry(self.current_deck).or_default();
        tally.new_extension += new_delta;
        tally.review_extension += review_delta;
    }

    fn card_count(&self) -> usize {
        self.cards.len()
    }

    fn today(&self) -> u32 {
        self.today
    }

    fn current_deck_id(&self) -> DeckId {
        self.current_deck
    }
}
