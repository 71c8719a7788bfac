//! podium-core: Pure-computation medal prediction engine.
//!
//! Raw scores → Plackett-Luce strengths → exact top-3 probabilities, plus a
//! Monte Carlo simulation of the same model (with optional strength
//! uncertainty shared across events) for medal-table intervals.
//! No IO, no filesystem, no network.
//!
//! Entrants are identified by caller-provided `i64` IDs. The same ID in two
//! competitions is the same entrant.
//!
//! # Quick start
//!
//! ```rust
//! use podium_core::{CompetitionInput, EntrantInput, ModelConfig, ScoringDirection, run_forecast};
//!
//! let entrant = |id: i64, country: &str, score: f64| EntrantInput {
//!     id,
//!     name: format!("Athlete {id}"),
//!     country: country.to_string(),
//!     score,
//! };
//!
//! let competitions = vec![CompetitionInput {
//!     id: "sprint".to_string(),
//!     name: "Men's Sprint".to_string(),
//!     sport: None,
//!     scoring: ScoringDirection::HigherIsBetter,
//!     entrants: vec![entrant(1, "NOR", 100.0), entrant(2, "SWE", 80.0), entrant(3, "FIN", 60.0)],
//! }];
//!
//! let report = run_forecast(&competitions, &ModelConfig {
//!     num_trials: 10_000,
//!     seed: Some(42),
//!     ..Default::default()
//! }).unwrap();
//!
//! for c in &report.countries {
//!     println!("{}: {:.2} gold, {:.2} total", c.country, c.gold, c.total);
//! }
//! ```

pub mod aggregate;
pub mod config;
pub mod constants;
pub mod error;
pub mod forecast;
pub mod plackett_luce;
pub mod sampler;
pub mod simulation;
pub mod strength;
pub mod types;
pub mod uncertainty;
pub mod validation;

// Re-export primary public API at crate root.
pub use aggregate::{CountHistogram, aggregate_exact_by_country, country_breakdowns};
pub use config::ModelConfig;
pub use error::{PodiumError, Result};
pub use forecast::{run_forecast, run_forecast_with_cancel};
pub use plackett_luce::{DistributionCheck, MedalProbabilities, MedalTable, check_distribution, medal_probabilities};
pub use sampler::NoiseModel;
pub use simulation::{RunBudget, SimulationOutcome, SimulationPlan, SimulationSettings, simulate};
pub use strength::{CompetitionField, InvalidScorePolicy, StrengthProfile, StrengthTransform};
pub use types::{
    CompetitionEntry, CompetitionForecast, CompetitionInput, CountryCompetitionBreakdown, CountryForecast,
    EntrantForecast, EntrantInput, ForecastReport, Interval, ScoringDirection, SkippedCompetition,
    StopReason,
};
pub use uncertainty::StrengthUncertainty;
pub use validation::{ConvergenceReport, ConvergenceWarning, check_convergence};
