// Rating scale
pub const DEFAULT_RATING: f64 = 1500.0;
pub const DEFAULT_RD: f64 = 350.0;
pub const DEFAULT_VOLATILITY: f64 = 0.06;
pub const MAX_RD: f64 = 350.0;
pub const GLICKO2_SCALE: f64 = 173.7178;

// Synthetic opponent every session outcome is scored against
pub const OPPONENT_RATING: f64 = 1500.0;
pub const OPPONENT_RD: f64 = 150.0;
pub const OUTCOME_STEEPNESS: f64 = 1.5;

// Session normalization
pub const MIN_PARTICIPANTS: usize = 2;
pub const DYNAMIC_FLOOR_MIN_SAMPLES: usize = 4;
pub const DYNAMIC_FLOOR_PERCENTILE: f64 = 0.25;
pub const DYNAMIC_FLOOR_MEAN_FRACTION: f64 = 0.1;

// Composite score
pub const RANK_WEIGHT: f64 = 0.5;
pub const MAX_CONFIDENCE_BOOST: f64 = 0.02;

// Date windows
pub const DAYS_PER_MONTH: u64 = 30;
pub const DAYS_PER_YEAR: u64 = 365;
