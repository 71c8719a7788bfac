//! Monte Carlo podium sampler.
//!
//! The Gumbel-max trick: if every entrant's performance is
//! `ln(strength) + Gumbel(0, 1)`, the descending order of performances is a
//! Plackett-Luce ranking. Gold, silver and bronze frequencies therefore converge
//! to [`crate::plackett_luce`] as the trial count grows.
//!
//! All simulation variants sit behind [`NoiseModel`], so there is a single
//! trial loop regardless of which generative process is configured.
use rand::Rng;

use crate::constants::{DEFAULT_TEMPERATURE, MIN_FIELD_SIZE};
use crate::error::{PodiumError, Result};

/// One sampled top-3 finish, as indices into the field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Podium(pub [usize; 3]);

impl Podium {
    pub fn gold(&self) -> usize {
        self.0[0]
    }

    pub fn silver(&self) -> usize {
        self.0[1]
    }

    pub fn bronze(&self) -> usize {
        self.0[2]
    }
}

/// Generative process used to resolve one field in one trial.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(tag = "kind", rename_all = "snake_case"))]
pub enum NoiseModel {
    /// `ln(strength) + temperature · Gumbel(0,1) + extra_noise_scale · N(0,1)`.
    ///
    /// Lower temperature means favourites win more often. Extra noise models
    /// unpredictability beyond Plackett-Luce and is skipped entirely at 0.
    Gumbel {
        temperature: f64,
        extra_noise_scale: f64,
    },
    /// Sequential draws without replacement: each position picks among the
    /// remaining entrants with probability ∝ `strength ^ power` for that position.
    ///
    /// Each position is a proper distribution over who is left, so every
    /// medal column sums to 1. With all powers equal to 1 this is plain
    /// Plackett-Luce; otherwise there is no closed form to compare against.
    PositionWeighted {
        gold_power: f64,
        silver_power: f64,
        bronze_power: f64,
    },
}

impl Default for NoiseModel {
    fn default() -> Self {
        NoiseModel::Gumbel {
            temperature: DEFAULT_TEMPERATURE,
            extra_noise_scale: 0.0,
        }
    }
}

impl NoiseModel {
    pub fn validate(&self) -> Result<()> {
        match *self {
            NoiseModel::Gumbel {
                temperature,
                extra_noise_scale,
            } => {
                if !temperature.is_finite() || temperature <= 0.0 {
                    return Err(PodiumError::invalid_config(format!(
                        "temperature must be positive and finite, got {temperature}"
                    )));
                }
                if !extra_noise_scale.is_finite() || extra_noise_scale < 0.0 {
                    return Err(PodiumError::invalid_config(format!(
                        "extra noise scale must be non-negative, got {extra_noise_scale}"
                    )));
                }
            }
            NoiseModel::PositionWeighted {
                gold_power,
                silver_power,
                bronze_power,
            } => {
                let powers = [gold_power, silver_power, bronze_power];
                if let Some(p) = powers.iter().find(|p| !p.is_finite() || **p <= 0.0) {
                    return Err(PodiumError::invalid_config(format!(
                        "position powers must be positive and finite, got {p}"
                    )));
                }
            }
        }
        Ok(())
    }

    /// The temperature at which the exact engine describes this model,
    /// or `None` when sampled frequencies are not expected to match it.
    pub fn exact_temperature(&self) -> Option<f64> {
        match *self {
            NoiseModel::Gumbel {
                temperature,
                extra_noise_scale,
            } if extra_noise_scale == 0.0 => Some(temperature),
            NoiseModel::PositionWeighted {
                gold_power,
                silver_power,
                bronze_power,
            } if [gold_power, silver_power, bronze_power] == [1.0; 3] => Some(1.0),
            _ => None,
        }
    }

    /// Resolve one field. `strengths` must hold at least three positive values;
    /// `scratch` is reused between calls to avoid allocating per trial.
    pub fn sample_podium<R: Rng + ?Sized>(
        &self,
        strengths: &[f64],
        rng: &mut R,
        scratch: &mut Vec<f64>,
    ) -> Podium {
        debug_assert!(strengths.len() >= MIN_FIELD_SIZE);
        match *self {
            NoiseModel::Gumbel {
                temperature,
                extra_noise_scale,
            } => {
                scratch.clear();
                scratch.extend(strengths.iter().map(|&s| {
                    let mut performance = s.ln() + temperature * gumbel(rng);
                    if extra_noise_scale > 0.0 {
                        performance += extra_noise_scale * standard_normal(rng);
                    }
                    performance
                }));
                Podium(top_three(scratch))
            }
            NoiseModel::PositionWeighted {
                gold_power,
                silver_power,
                bronze_power,
            } => sequential_podium(
                strengths,
                &[gold_power, silver_power, bronze_power],
                rng,
                scratch,
            ),
        }
    }
}

/// Standard Gumbel(0, 1) draw by inverse transform.
pub fn gumbel<R: Rng + ?Sized>(rng: &mut R) -> f64 {
    let mut u: f64 = rng.random();
    while u == 0.0 {
        u = rng.random();
    }
    -(-u.ln()).ln()
}

/// Box-Muller transform for a standard normal.
pub fn standard_normal<R: Rng + ?Sized>(rng: &mut R) -> f64 {
    let u1: f64 = rng.random::<f64>().max(1e-15);
    let u2: f64 = rng.random();
    (-2.0 * u1.ln()).sqrt() * (2.0 * std::f64::consts::PI * u2).cos()
}

/// Indices of the three largest values, largest first. Ties keep the lower index.
pub fn top_three(values: &[f64]) -> [usize; 3] {
    let mut best = [usize::MAX; 3];
    let mut best_val = [f64::NEG_INFINITY; 3];

    for (i, &v) in values.iter().enumerate() {
        if best[2] != usize::MAX && v <= best_val[2] {
            continue;
        }
        if best[0] == usize::MAX || v > best_val[0] {
            best = [i, best[0], best[1]];
            best_val = [v, best_val[0], best_val[1]];
        } else if best[1] == usize::MAX || v > best_val[1] {
            best = [best[0], i, best[1]];
            best_val = [best_val[0], v, best_val[1]];
        } else {
            best[2] = i;
            best_val[2] = v;
        }
    }

    best
}

fn sequential_podium<R: Rng + ?Sized>(
    strengths: &[f64],
    powers: &[f64; 3],
    rng: &mut R,
    weights: &mut Vec<f64>,
) -> Podium {
    let mut taken = [usize::MAX; 3];

    for (position, &power) in powers.iter().enumerate() {
        weights.clear();
        weights.extend(strengths.iter().enumerate().map(|(i, &s)| {
            if taken[..position].contains(&i) {
                0.0
            } else {
                s.powf(power)
            }
        }));

        let total: f64 = weights.iter().sum();
        let target = rng.random::<f64>() * total;
        let mut cumulative = 0.0;
        let mut chosen = None;
        for (i, &w) in weights.iter().enumerate() {
            if w == 0.0 {
                continue;
            }
            cumulative += w;
            chosen = Some(i);
            if target < cumulative {
                break;
            }
        }
        // Rounding can leave `target` just past the last bucket; that entrant is kept.
        // If every remaining weight underflowed, take the first entrant not yet placed.
        let pick = chosen
            .or_else(|| (0..strengths.len()).find(|i| !taken[..position].contains(i)))
            .unwrap_or(0);
        taken[position] = pick;
    }

    Podium(taken)
}
