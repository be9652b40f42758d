use std::ops::{Index, IndexMut};

use serde::{Deserialize, Serialize};

pub type CardId = i64;
pub type DeckId = i64;

/// The engine's primary partition of due cards.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QueueClass {
    New,
    Learning,
    Review,
}

impl QueueClass {
    pub const ALL: [QueueClass; 3] = [QueueClass::New, QueueClass::Learning, QueueClass::Review];

    /// Fixed index used for quota bookkeeping.
    pub fn index(self) -> usize {
        match self {
            QueueClass::New => 0,
            QueueClass::Learning => 1,
            QueueClass::Review => 2,
        }
    }

    /// Learning and Review are the classes this crate reorders.
    pub fn is_scored(self) -> bool {
        matches!(self, QueueClass::Learning | QueueClass::Review)
    }
}

/// Lifecycle stage of a card. Relearning cards sit in the Learning queue.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CardKind {
    New,
    Learn,
    Review,
    Relearn,
}

/// Memory-model position of a card. Difficulty is on the 1..10 scale,
/// stability in days.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct MemoryState {
    pub difficulty: f64,
    pub stability: f64,
}

impl MemoryState {
    pub fn new(difficulty: f64, stability: f64) -> Self {
        Self {
            difficulty,
            stability,
        }
    }
}

/// Per-class card counts, indexed by [`QueueClass`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueCounts {
    pub new: usize,
    pub learning: usize,
    pub review: usize,
}

impl QueueCounts {
    pub fn new(new: usize, learning: usize, review: usize) -> Self {
        Self {
            new,
            learning,
            review,
        }
    }

    /// Remaining Learning + Review cards.
    pub fn scored_total(&self) -> usize {
        self.learning + self.review
    }

    pub fn total(&self) -> usize {
        self.new + self.learning + self.review
    }
}

impl Index<QueueClass> for QueueCounts {
    type Output = usize;

    fn index(&self, class: QueueClass) -> &usize {
        match class {
            QueueClass::New => &self.new,
            QueueClass::Learning => &self.learning,
            QueueClass::Review => &self.review,
        }
    }
}

impl IndexMut<QueueClass> for QueueCounts {
    fn index_mut(&mut self, class: QueueClass) -> &mut usize {
        match class {
            QueueClass::New => &mut self.new,
            QueueClass::Learning => &mut self.learning,
            QueueClass::Review => &mut self.review,
        }
    }
}

/// Card data carried by a queue snapshot.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Card {
    pub id: CardId,
    pub deck_id: DeckId,
    /// Home deck when the card currently sits in a filtered deck.
    #[serde(default)]
    pub original_deck_id: Option<DeckId>,
    pub kind: CardKind,
    #[serde(default)]
    pub memory_state: Option<MemoryState>,
    #[serde(default)]
    pub last_review_day: Option<u32>,
    #[serde(default)]
    pub custom_data: Option<String>,
}

impl Card {
    /// Deck whose configuration governs this card.
    pub fn home_deck_id(&self) -> DeckId {
        self.original_deck_id.unwrap_or(self.deck_id)
    }

    /// Days since the last review, 0 when never reviewed or reviewed in the future.
    pub fn elapsed_days(&self, today: u32) -> f64 {
        self.last_review_day
            .map(|day| today.saturating_sub(day) as f64)
            .unwrap_or(0.0)
    }
}

/// A card not yet studied; only ever a current state.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct NewState {
    #[serde(default)]
    pub position: u32,
}

/// Review-branch projection: the card leaves the day's queue.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ReviewState {
    pub scheduled_days: u32,
    #[serde(default)]
    pub elapsed_days: u32,
    #[serde(default)]
    pub lapses: u32,
    #[serde(default)]
    pub memory_state: Option<MemoryState>,
}

/// Learning-branch projection: the card comes back the same day.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LearningState {
    pub remaining_steps: u32,
    pub scheduled_secs: u32,
    #[serde(default)]
    pub memory_state: Option<MemoryState>,
}

/// Relearning-branch projection: a lapsed review card in short-term steps.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RelearningState {
    pub review: ReviewState,
    pub learning: LearningState,
}

/// One projected next state.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum NextState {
    New(NewState),
    Review(ReviewState),
    Learning(LearningState),
    Relearning(RelearningState),
    /// A branch kind this crate does not know how to read.
    #[serde(other)]
    Unrecognized,
}

impl NextState {
    /// Projected memory state carried by the branch, if any.
    pub fn memory_state(&self) -> Option<MemoryState> {
        match self {
            NextState::Review(review) => review.memory_state,
            NextState::Learning(learning) => learning.memory_state,
            NextState::Relearning(relearning) => relearning.learning.memory_state,
            NextState::New(_) | NextState::Unrecognized => None,
        }
    }

    pub fn kind_name(&self) -> &'static str {
        match self {
            NextState::New(_) => "new",
            NextState::Review(_) => "review",
            NextState::Learning(_) => "learning",
            NextState::Relearning(_) => "relearning",
            NextState::Unrecognized => "unrecognized",
        }
    }

    pub fn is_short_term(&self) -> bool {
        matches!(self, NextState::Learning(_) | NextState::Relearning(_))
    }
}

/// The four learner responses.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Rating {
    Again = 1,
    Hard = 2,
    Good = 3,
    Easy = 4,
}

impl Rating {
    pub const ALL: [Rating; 4] = [Rating::Again, Rating::Hard, Rating::Good, Rating::Easy];

    pub fn grade(self) -> f64 {
        self as u8 as f64
    }
}

/// Current state plus the four hypothetical outcomes of answering a card.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct NextStates {
    pub current: NextState,
    pub again: NextState,
    pub hard: NextState,
    pub good: NextState,
    pub easy: NextState,
    #[serde(default)]
    pub custom_data: Option<String>,
}

impl NextStates {
    pub fn get(&self, rating: Rating) -> &NextState {
        match rating {
            Rating::Again => &self.again,
            Rating::Hard => &self.hard,
            Rating::Good => &self.good,
            Rating::Easy => &self.easy,
        }
    }

    pub fn get_mut(&mut self, rating: Rating) -> &mut NextState {
        match rating {
            Rating::Again => &mut self.again,
            Rating::Hard => &mut self.hard,
            Rating::Good => &mut self.good,
            Rating::Easy => &mut self.easy,
        }
    }
}

/// Engine-side context attached to a queued card.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct SchedulingContext {
    #[serde(default)]
    pub deck_name: String,
    #[serde(default)]
    pub seed: u64,
}

/// A card as the engine queued it: card data, queue class, and the four
/// hypothetical outcomes.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct QueuedCard {
    pub card: Card,
    pub queue: QueueClass,
    pub states: NextStates,
    #[serde(default)]
    pub context: SchedulingContext,
}

impl QueuedCard {
    pub fn id(&self) -> CardId {
        self.card.id
    }
}

/// Result of a queue query: the cards in engine order plus live counts.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct QueuedCards {
    pub cards: Vec<QueuedCard>,
    pub counts: QueueCounts,
}
