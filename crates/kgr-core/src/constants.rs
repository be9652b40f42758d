/// Horizon (days) over which expected knowledge is integrated.
pub const KNOWLEDGE_HORIZON_DAYS: f64 = 365.0;

/// Stability bounds (days).
pub const S_MIN: f64 = 0.001;
pub const S_MAX: f64 = 36500.0;

/// Difficulty bounds.
pub const D_MIN: f64 = 1.0;
pub const D_MAX: f64 = 10.0;

/// FSRS-4.5 / FSRS-5 forgetting curve decay.
pub const FSRS5_DECAY: f64 = 0.5;

/// FSRS-4.5 / FSRS-5 forgetting curve factor: 0.9^(-1/0.5) - 1 = 19/81
pub const FSRS5_FACTOR: f64 = 19.0 / 81.0;

/// Accepted range for the FSRS-6 trainable decay (w20).
pub const FSRS6_DECAY_RANGE: std::ops::RangeInclusive<f64> = 0.1..=0.8;

/// Retention used when a deck does not specify one.
pub const DEFAULT_DESIRED_RETENTION: f64 = 0.9;

/// Learning step length used when projecting short-term branches.
pub const LEARNING_STEP_SECS: u32 = 600;

/// Scheduled interval (days) for a learning branch carried into review.
pub const CARRIED_LEARNING_INTERVAL_DAYS: u32 = 1;

pub const DEFAULT_FSRS6_PARAMS: [f64; 21] = [
    0.212, 1.2931, 2.3065, 8.2956, 6.4133, 0.8334, 3.0194, 0.001, 1.8722, 0.1666, 0.796, 1.4835,
    0.0614, 0.2629, 1.6483, 0.6014, 1.8729, 0.5425, 0.0912, 0.0658, 0.1542,
];

pub const DEFAULT_FSRS5_PARAMS: [f64; 19] = [
    0.40255, 1.18385, 3.173, 15.69105, 7.1949, 0.5345, 1.4604, 0.0046, 1.54575, 0.1192, 1.01925,
    1.9395, 0.11, 0.29605, 2.2698, 0.2315, 2.9898, 0.51655, 0.6621,
];

pub const DEFAULT_FSRS4_PARAMS: [f64; 17] = [
    0.4872, 1.4003, 3.7145, 13.8206, 5.1618, 1.2298, 0.8975, 0.031, 1.6474, 0.1367, 1.0461,
    2.1072, 0.0793, 0.3246, 1.587, 0.2272, 2.8755,
];
