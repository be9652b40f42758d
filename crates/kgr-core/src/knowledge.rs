//! Expected-knowledge-gain scoring over the FSRS family of memory models.
//!
//! A card's "knowledge" over the next year is its mean predicted
//! retrievability across that horizon. Reviewing it now replaces the
//! current curve with one of two new curves (recalled or forgotten),
//! weighted by the probability of each. The difference between that
//! expectation and leaving the card alone is the expected gain.
//!
//! Parameters are tried newest model first; the first version whose
//! vector is well formed wins, otherwise the card scores neutral.

use serde::{Deserialize, Serialize};

use crate::card::{MemoryState, Rating};
use crate::constants::{
    D_MAX, D_MIN, DEFAULT_FSRS6_PARAMS, FSRS5_DECAY, FSRS5_FACTOR, FSRS6_DECAY_RANGE,
    KNOWLEDGE_HORIZON_DAYS, S_MAX, S_MIN,
};

/// Score assigned when no model applies.
pub const NEUTRAL_SCORE: f64 = 0.0;

/// Supported memory-model generations.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModelVersion {
    Fsrs6,
    Fsrs5,
    Fsrs4,
}

impl ModelVersion {
    pub const NEWEST_FIRST: [ModelVersion; 3] =
        [ModelVersion::Fsrs6, ModelVersion::Fsrs5, ModelVersion::Fsrs4];

    pub fn param_count(self) -> usize {
        match self {
            ModelVersion::Fsrs6 => 21,
            ModelVersion::Fsrs5 => 19,
            ModelVersion::Fsrs4 => 17,
        }
    }

    /// Structural validity of a parameter vector for this version.
    pub fn is_valid(self, w: &[f64]) -> bool {
        if w.len() != self.param_count() || !w.iter().all(|v| v.is_finite()) {
            return false;
        }
        if w[..4].iter().any(|&s| s <= 0.0) {
            return false;
        }
        match self {
            ModelVersion::Fsrs6 => FSRS6_DECAY_RANGE.contains(&w[20]),
            ModelVersion::Fsrs5 | ModelVersion::Fsrs4 => true,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            ModelVersion::Fsrs6 => "fsrs-6",
            ModelVersion::Fsrs5 => "fsrs-5",
            ModelVersion::Fsrs4 => "fsrs-4.5",
        }
    }
}

/// Parameter vectors stored in a deck's configuration.
///
/// `fsrs6` feeds FSRS-6; `legacy` feeds FSRS-5 or FSRS-4.5 depending on its
/// length.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct DeckParameters {
    #[serde(default)]
    pub fsrs6: Vec<f64>,
    #[serde(default)]
    pub legacy: Vec<f64>,
}

impl DeckParameters {
    pub fn for_version(&self, version: ModelVersion) -> &[f64] {
        match version {
            ModelVersion::Fsrs6 => &self.fsrs6,
            ModelVersion::Fsrs5 | ModelVersion::Fsrs4 => &self.legacy,
        }
    }

    /// Newest version whose parameters validate.
    pub fn resolve(&self) -> Option<ModelVersion> {
        ModelVersion::NEWEST_FIRST
            .into_iter()
            .find(|v| v.is_valid(self.for_version(*v)))
    }
}

/// Power forgetting curve `R(t) = (1 + factor * t / S)^(-decay)`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ForgettingCurve {
    pub decay: f64,
    pub factor: f64,
}

impl ForgettingCurve {
    pub fn with_decay(decay: f64) -> Self {
        Self {
            decay,
            factor: 0.9f64.powf(-1.0 / decay) - 1.0,
        }
    }

    pub fn retrievability(&self, elapsed_days: f64, stability: f64) -> f64 {
        if stability <= 0.0 {
            return 0.0;
        }
        (1.0 + self.factor * elapsed_days.max(0.0) / stability).powf(-self.decay)
    }

    /// Mean retrievability over `[from, to]` (closed-form integral).
    pub fn mean_retrievability(&self, stability: f64, from: f64, to: f64) -> f64 {
        if stability <= 0.0 || to <= from {
            return 0.0;
        }
        let p = 1.0 - self.decay;
        let antiderivative = |t: f64| (1.0 + self.factor * t / stability).powf(p);
        stability / (self.factor * p) * (antiderivative(to) - antiderivative(from)) / (to - from)
    }

    /// Days until retrievability falls to `desired_retention`.
    pub fn interval(&self, stability: f64, desired_retention: f64) -> f64 {
        let r = desired_retention.clamp(0.0001, 0.9999);
        stability / self.factor * (r.powf(-1.0 / self.decay) - 1.0)
    }
}

/// A validated parameter vector bound to its model version.
#[derive(Clone, Copy, Debug)]
pub struct MemoryModel<'a> {
    version: ModelVersion,
    w: &'a [f64],
    curve: ForgettingCurve,
}

impl<'a> MemoryModel<'a> {
    pub fn new(version: ModelVersion, w: &'a [f64]) -> Option<Self> {
        if !version.is_valid(w) {
            return None;
        }
        let curve = match version {
            ModelVersion::Fsrs6 => ForgettingCurve::with_decay(w[20]),
            ModelVersion::Fsrs5 | ModelVersion::Fsrs4 => ForgettingCurve {
                decay: FSRS5_DECAY,
                factor: FSRS5_FACTOR,
            },
        };
        Some(Self { version, w, curve })
    }

    /// FSRS-6 with its published default parameters.
    pub fn fsrs6_default() -> MemoryModel<'static> {
        let w: &'static [f64] = &DEFAULT_FSRS6_PARAMS;
        MemoryModel {
            version: ModelVersion::Fsrs6,
            w,
            curve: ForgettingCurve::with_decay(w[20]),
        }
    }

    /// Newest valid model for a deck's parameters, or the FSRS-6 defaults
    /// when none validates.
    pub fn resolve_or_default(params: &'a DeckParameters) -> Self {
        Self::resolve(params).unwrap_or_else(|| MemoryModel::fsrs6_default())
    }

    /// Newest valid model for a deck's parameters.
    pub fn resolve(params: &'a DeckParameters) -> Option<Self> {
        ModelVersion::NEWEST_FIRST.into_iter().find_map(|version| {
            let model = Self::new(version, params.for_version(version));
            if model.is_none() {
                tracing::trace!(version = version.name(), "parameters invalid, falling back");
            }
            model
        })
    }

    pub fn version(&self) -> ModelVersion {
        self.version
    }

    pub fn curve(&self) -> ForgettingCurve {
        self.curve
    }

    pub fn retrievability(&self, state: MemoryState, elapsed_days: f64) -> f64 {
        self.curve.retrievability(elapsed_days, state.stability)
    }

    pub fn initial_state(&self, rating: Rating) -> MemoryState {
        MemoryState::new(
            self.initial_difficulty(rating),
            clamp_stability(self.w[rating as usize - 1]),
        )
    }

    fn initial_difficulty(&self, rating: Rating) -> f64 {
        let w = self.w;
        let g = rating.grade();
        let d = match self.version {
            ModelVersion::Fsrs4 => w[4] - (g - 3.0) * w[5],
            ModelVersion::Fsrs5 | ModelVersion::Fsrs6 => w[4] - (w[5] * (g - 1.0)).exp() + 1.0,
        };
        d.clamp(D_MIN, D_MAX)
    }

    pub fn next_difficulty(&self, difficulty: f64, rating: Rating) -> f64 {
        let w = self.w;
        let delta = -w[6] * (rating.grade() - 3.0);
        let next = match self.version {
            ModelVersion::Fsrs4 => {
                let d = difficulty + delta;
                w[7] * self.initial_difficulty(Rating::Good) + (1.0 - w[7]) * d
            }
            ModelVersion::Fsrs5 | ModelVersion::Fsrs6 => {
                let d = difficulty + delta * (10.0 - difficulty) / 9.0;
                w[7] * self.initial_difficulty(Rating::Easy) + (1.0 - w[7]) * d
            }
        };
        next.clamp(D_MIN, D_MAX)
    }

    /// Stability after a successful recall at retrievability `r`.
    pub fn recall_stability(&self, state: MemoryState, r: f64, rating: Rating) -> f64 {
        let w = self.w;
        let hard_penalty = if rating == Rating::Hard { w[15] } else { 1.0 };
        let easy_bonus = if rating == Rating::Easy { w[16] } else { 1.0 };
        let s = state.stability;
        let d = state.difficulty.clamp(D_MIN, D_MAX);
        clamp_stability(
            s * (1.0
                + w[8].exp()
                    * (11.0 - d)
                    * s.powf(-w[9])
                    * (((1.0 - r) * w[10]).exp() - 1.0)
                    * hard_penalty
                    * easy_bonus),
        )
    }

    /// Stability after a lapse at retrievability `r`.
    pub fn forget_stability(&self, state: MemoryState, r: f64) -> f64 {
        let w = self.w;
        let s = state.stability;
        let d = state.difficulty.clamp(D_MIN, D_MAX);
        let mut next =
            w[11] * d.powf(-w[12]) * ((s + 1.0).powf(w[13]) - 1.0) * ((1.0 - r) * w[14]).exp();
        next = next.min(s);
        if self.version != ModelVersion::Fsrs4 {
            next = next.min(s / (w[17] * w[18]).exp());
        }
        clamp_stability(next)
    }

    /// Stability after a same-day review. FSRS-4.5 has no short-term term.
    pub fn short_term_stability(&self, state: MemoryState, rating: Rating) -> f64 {
        let w = self.w;
        let s = state.stability;
        let next = match self.version {
            ModelVersion::Fsrs4 => s,
            ModelVersion::Fsrs5 => s * (w[17] * (rating.grade() - 3.0 + w[18])).exp(),
            ModelVersion::Fsrs6 => {
                s * (w[17] * (rating.grade() - 3.0 + w[18])).exp() * s.powf(-w[19])
            }
        };
        clamp_stability(next)
    }

    /// Memory state after answering `rating` having waited `elapsed_days`.
    pub fn next_state(&self, state: MemoryState, elapsed_days: f64, rating: Rating) -> MemoryState {
        let difficulty = self.next_difficulty(state.difficulty, rating);
        let stability = if elapsed_days < 1.0 {
            self.short_term_stability(state, rating)
        } else {
            let r = self.retrievability(state, elapsed_days);
            match rating {
                Rating::Again => self.forget_stability(state, r),
                _ => self.recall_stability(state, r, rating),
            }
        };
        MemoryState::new(difficulty, stability)
    }

    pub fn interval(&self, stability: f64, desired_retention: f64) -> f64 {
        self.curve.interval(stability, desired_retention)
    }

    /// Expected change in mean retrievability over the knowledge horizon
    /// from reviewing the card now rather than not at all.
    pub fn expected_knowledge_gain(&self, state: MemoryState, elapsed_days: f64) -> f64 {
        let elapsed = elapsed_days.max(0.0);
        let horizon = KNOWLEDGE_HORIZON_DAYS;
        let r = self.retrievability(state, elapsed);

        let untouched = self
            .curve
            .mean_retrievability(state.stability, elapsed, elapsed + horizon);
        let recalled = self.curve.mean_retrievability(
            self.recall_stability(state, r, Rating::Good),
            0.0,
            horizon,
        );
        let forgotten =
            self.curve
                .mean_retrievability(self.forget_stability(state, r), 0.0, horizon);

        r * recalled + (1.0 - r) * forgotten - untouched
    }
}

fn clamp_stability(s: f64) -> f64 {
    if s.is_finite() {
        s.clamp(S_MIN, S_MAX)
    } else {
        S_MIN
    }
}

/// Ordering key for a card: negated expected gain, so ascending order
/// puts the most valuable review first. Neutral when the card has no
/// memory state or no parameter set validates.
pub fn score(memory_state: Option<MemoryState>, elapsed_days: f64, params: &DeckParameters) -> f64 {
    let Some(state) = memory_state else {
        return NEUTRAL_SCORE;
    };
    match MemoryModel::resolve(params) {
        Some(model) => -model.expected_knowledge_gain(state, elapsed_days),
        None => NEUTRAL_SCORE,
    }
}
