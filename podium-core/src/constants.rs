/// Default exponent applied to relative scores.
/// 1.0 keeps strengths linear in score; 2.0 widens the gap between the
/// favourites and the rest of the field.
pub const DEFAULT_STRENGTH_POWER: f64 = 2.0;

/// Floor for every strength so that `ln(strength)` stays finite in the sampler.
pub const MIN_STRENGTH: f64 = 1e-4;

/// Fewest entrants for which gold, silver and bronze can all be awarded.
pub const MIN_FIELD_SIZE: usize = 3;

/// Allowed deviation of each medal column sum from 1.0.
pub const PROBABILITY_TOLERANCE: f64 = 1e-3;

/// Maximum absolute gap between simulated and exact probabilities
/// before a run is considered not converged.
pub const DEFAULT_CONVERGENCE_TOLERANCE: f64 = 0.02;

/// Gumbel scale. 1.0 reproduces the Plackett-Luce distribution of the raw strengths.
pub const DEFAULT_TEMPERATURE: f64 = 1.0;

/// Log-space standard deviation of the per-trial strength multiplier.
/// 0.15 is roughly a 15% coefficient of variation on strength estimates.
pub const DEFAULT_STRENGTH_UNCERTAINTY: f64 = 0.15;

pub const DEFAULT_NUM_TRIALS: usize = 100_000;

pub const DEFAULT_CONFIDENCE_LEVEL: f64 = 0.95;

/// Longest accepted time limit, one week.
pub const MAX_TIME_LIMIT_SECS: f64 = 7.0 * 24.0 * 3_600.0;

/// Trials handed to one rayon task. Budgets are checked between trials,
/// the reduction runs once per chunk.
pub const TRIAL_CHUNK_SIZE: usize = 1_024;

/// Country breakdowns below this expected medal total are left out of reports.
pub const MIN_BREAKDOWN_TOTAL: f64 = 0.01;
