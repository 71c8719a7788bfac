use std::time::Duration;

use crate::constants::{
    DEFAULT_CONFIDENCE_LEVEL, DEFAULT_NUM_TRIALS, DEFAULT_STRENGTH_POWER, DEFAULT_STRENGTH_UNCERTAINTY,
    DEFAULT_TEMPERATURE, MAX_TIME_LIMIT_SECS,
};
use crate::error::{PodiumError, Result};
use crate::sampler::NoiseModel;
use crate::strength::{InvalidScorePolicy, StrengthTransform};
use crate::uncertainty::StrengthUncertainty;

/// Options for `run_forecast()`.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct ModelConfig {
    /// Exponent applied to relative scores (e.g. 2.0).
    pub strength_power: f64,
    /// Monte Carlo trials. 0 = exact probabilities only.
    pub num_trials: usize,
    /// Gumbel scale. Below 1.0 favourites win more often.
    pub temperature: f64,
    /// Standard deviation of extra Gaussian performance noise. 0.0 = none.
    pub extra_noise_scale: f64,
    /// Log-space σ of the per-trial strength multiplier. 0.0 = none.
    pub strength_uncertainty: f64,
    /// Base seed. `None` = draw one at random (it is reported back).
    pub seed: Option<u64>,
    /// Confidence interval level (e.g. 0.95).
    pub confidence_level: f64,
    pub invalid_score_policy: InvalidScorePolicy,
    /// Replaces the Gumbel model built from `temperature` and `extra_noise_scale`.
    pub noise_model: Option<NoiseModel>,
    /// Wall-clock limit for the simulation, in seconds.
    pub time_limit_secs: Option<f64>,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            strength_power: DEFAULT_STRENGTH_POWER,
            num_trials: DEFAULT_NUM_TRIALS,
            temperature: DEFAULT_TEMPERATURE,
            extra_noise_scale: 0.0,
            strength_uncertainty: DEFAULT_STRENGTH_UNCERTAINTY,
            seed: None,
            confidence_level: DEFAULT_CONFIDENCE_LEVEL,
            invalid_score_policy: InvalidScorePolicy::default(),
            noise_model: None,
            time_limit_secs: None,
        }
    }
}

impl ModelConfig {
    /// Check every value, returning the first problem found.
    pub fn validate(&self) -> Result<()> {
        self.strength_transform()?;
        self.noise_model().validate()?;
        self.uncertainty()?;
        if !(self.confidence_level > 0.0 && self.confidence_level < 1.0) {
            return Err(PodiumError::invalid_config(format!(
                "confidence level must be in (0, 1), got {}",
                self.confidence_level
            )));
        }
        if let Some(secs) = self.time_limit_secs {
            if !(0.0..=MAX_TIME_LIMIT_SECS).contains(&secs) || Duration::try_from_secs_f64(secs).is_err() {
                return Err(PodiumError::invalid_config(format!(
                    "time limit must be between 0 and {MAX_TIME_LIMIT_SECS} seconds, got {secs}"
                )));
            }
        }
        Ok(())
    }

    pub fn strength_transform(&self) -> Result<StrengthTransform> {
        Ok(StrengthTransform::new(self.strength_power)?.with_policy(self.invalid_score_policy))
    }

    pub fn noise_model(&self) -> NoiseModel {
        self.noise_model.unwrap_or(NoiseModel::Gumbel {
            temperature: self.temperature,
            extra_noise_scale: self.extra_noise_scale,
        })
    }

    pub fn uncertainty(&self) -> Result<StrengthUncertainty> {
        StrengthUncertainty::new(self.strength_uncertainty)
    }

    /// The time limit as a `Duration`. Values `validate()` would reject give `None`.
    pub fn time_limit(&self) -> Option<Duration> {
        self.time_limit_secs
            .filter(|secs| *secs <= MAX_TIME_LIMIT_SECS)
            .and_then(|secs| Duration::try_from_secs_f64(secs).ok())
    }

    /// The configured seed, or a fresh random one.
    pub fn resolve_seed(&self) -> u64 {
        self.seed.unwrap_or_else(rand::random)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_valid() {
        let config = ModelConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.noise_model(), NoiseModel::default());
    }

    #[test]
    fn test_invalid_values() {
        let cases = [
            ModelConfig { strength_power: -1.0, ..Default::default() },
            ModelConfig { temperature: 0.0, ..Default::default() },
            ModelConfig { extra_noise_scale: -0.5, ..Default::default() },
            ModelConfig { strength_uncertainty: f64::NAN, ..Default::default() },
            ModelConfig { confidence_level: 1.0, ..Default::default() },
            ModelConfig { time_limit_secs: Some(-1.0), ..Default::default() },
            ModelConfig { time_limit_secs: Some(f64::NAN), ..Default::default() },
            ModelConfig { time_limit_secs: Some(1e20), ..Default::default() },
        ];
        for config in cases {
            assert!(
                matches!(config.validate(), Err(PodiumError::InvalidConfig { .. })),
                "{config:?}"
            );
        }
    }

    #[test]
    fn test_noise_model_override() {
        let weighted = NoiseModel::PositionWeighted {
            gold_power: 1.5,
            silver_power: 1.2,
            bronze_power: 1.0,
        };
        let config = ModelConfig {
            temperature: 0.3,
            noise_model: Some(weighted),
            ..Default::default()
        };
        assert_eq!(config.noise_model(), weighted);
    }

    #[test]
    fn test_seed_resolution() {
        let fixed = ModelConfig { seed: Some(42), ..Default::default() };
        assert_eq!(fixed.resolve_seed(), 42);
        assert_eq!(fixed.time_limit(), None);
        let timed = ModelConfig { time_limit_secs: Some(1.5), ..Default::default() };
        assert_eq!(timed.time_limit(), Some(Duration::from_millis(1500)));
    }

    #[test]
    fn test_huge_time_limit_does_not_panic() {
        let config = ModelConfig { time_limit_secs: Some(1e20), ..Default::default() };
        assert!(config.validate().is_err());
        assert_eq!(config.time_limit(), None);
        let week = ModelConfig { time_limit_secs: Some(MAX_TIME_LIMIT_SECS), ..Default::default() };
        assert!(week.validate().is_ok());
        assert!(week.time_limit().is_some());
    }
}
