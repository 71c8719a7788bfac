//! Convergence check: simulated frequencies against the exact engine.
//!
//! Only noise models with an exact counterpart can be checked (Gumbel without
//! extra noise, or position-weighted with all powers equal to 1). The exact
//! side is computed on the tempered field, so any temperature works.
use std::fmt;

use tracing::warn;

use crate::error::{PodiumError, Result};
use crate::plackett_luce::medal_probabilities;
use crate::sampler::NoiseModel;
use crate::simulation::{RunBudget, SimulationPlan, SimulationSettings, simulate};
use crate::strength::CompetitionField;
use crate::uncertainty::StrengthUncertainty;

/// Deviation between one simulated field and its exact distribution.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ConvergenceReport {
    pub competition_id: String,
    pub num_trials: usize,
    pub tolerance: f64,
    pub max_gold_deviation: f64,
    pub mean_gold_deviation: f64,
    /// Over gold, silver and bronze for every entrant.
    pub max_abs_deviation: f64,
    pub mean_abs_deviation: f64,
    pub converged: bool,
}

impl ConvergenceReport {
    pub fn warning(&self) -> Option<ConvergenceWarning> {
        if self.converged {
            return None;
        }
        Some(ConvergenceWarning {
            competition_id: self.competition_id.clone(),
            max_abs_deviation: self.max_abs_deviation,
            tolerance: self.tolerance,
            num_trials: self.num_trials,
        })
    }
}

/// Non-fatal: the sampler strayed from the exact distribution.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ConvergenceWarning {
    pub competition_id: String,
    pub max_abs_deviation: f64,
    pub tolerance: f64,
    pub num_trials: usize,
}

impl fmt::Display for ConvergenceWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}: simulated probabilities deviate by {:.4} (tolerance {:.4}) after {} trials",
            self.competition_id, self.max_abs_deviation, self.tolerance, self.num_trials
        )
    }
}

/// Sample `field` for `num_trials` trials and compare with the exact engine.
///
/// Fails with `DegenerateField` for unresolvable fields and `InvalidConfig`
/// when `noise` has no exact counterpart.
pub fn check_convergence(
    field: &CompetitionField,
    noise: NoiseModel,
    num_trials: usize,
    seed: u64,
    tolerance: f64,
) -> Result<ConvergenceReport> {
    noise.validate()?;
    let temperature = noise.exact_temperature().ok_or_else(|| {
        PodiumError::invalid_config("noise model has no closed-form counterpart to converge to")
    })?;
    if num_trials == 0 {
        return Err(PodiumError::invalid_config("convergence check needs at least one trial"));
    }
    field.ensure_resolvable()?;

    let exact = medal_probabilities(&field.tempered(temperature)?)?;
    let plan = SimulationPlan::new(std::slice::from_ref(field))?;
    let settings = SimulationSettings {
        noise,
        uncertainty: StrengthUncertainty::none(),
        seed,
        confidence_level: 0.95,
    };
    let outcome = simulate(&plan, &settings, &RunBudget::trials(num_trials));
    let simulated = &outcome.field_frequencies[0];

    let mut max_gold: f64 = 0.0;
    let mut sum_gold = 0.0;
    let mut max_abs: f64 = 0.0;
    let mut sum_abs = 0.0;
    for (p, freq) in exact.entries.iter().zip(simulated) {
        let deviations = [
            (freq[0] - p.gold).abs(),
            (freq[1] - p.silver).abs(),
            (freq[2] - p.bronze).abs(),
        ];
        max_gold = max_gold.max(deviations[0]);
        sum_gold += deviations[0];
        for d in deviations {
            max_abs = max_abs.max(d);
            sum_abs += d;
        }
    }

    let n = exact.len() as f64;
    let report = ConvergenceReport {
        competition_id: field.id().to_string(),
        num_trials: outcome.trials_completed,
        tolerance,
        max_gold_deviation: max_gold,
        mean_gold_deviation: sum_gold / n,
        max_abs_deviation: max_abs,
        mean_abs_deviation: sum_abs / (3.0 * n),
        converged: max_abs <= tolerance,
    };

    if let Some(w) = report.warning() {
        warn!(competition = %w.competition_id, deviation = w.max_abs_deviation, tolerance = w.tolerance, "{w}");
    }
    Ok(report)
}
