//! Strength uncertainty shared across events.
//!
//! Each trial draws one log-normal multiplier `exp(σ · N(0,1))` per entrant
//! before any field is resolved. The same multiplier scales that entrant's base
//! strength in every field of the trial, so an entrant who is "on form" in one
//! event is on form in all of them and country totals pick up the correlation.
use rand::Rng;

use crate::constants::MIN_STRENGTH;
use crate::error::{PodiumError, Result};
use crate::sampler::standard_normal;

/// Log-space standard deviation of per-trial strength multipliers.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct StrengthUncertainty {
    sigma: f64,
}

impl StrengthUncertainty {
    pub fn new(sigma: f64) -> Result<Self> {
        if !sigma.is_finite() || sigma < 0.0 {
            return Err(PodiumError::invalid_config(format!(
                "strength uncertainty must be non-negative and finite, got {sigma}"
            )));
        }
        Ok(Self { sigma })
    }

    /// No uncertainty: every multiplier is exactly 1.
    pub fn none() -> Self {
        Self { sigma: 0.0 }
    }

    pub fn sigma(&self) -> f64 {
        self.sigma
    }

    pub fn is_active(&self) -> bool {
        self.sigma > 0.0
    }

    /// Fill `multipliers` with one draw per entrant.
    ///
    /// When inactive the slice is set to 1.0 without touching `rng`, so a run
    /// with σ = 0 samples exactly the same podiums as plain Plackett-Luce.
    pub fn fill<R: Rng + ?Sized>(&self, rng: &mut R, multipliers: &mut [f64]) {
        if !self.is_active() {
            multipliers.fill(1.0);
            return;
        }
        for m in multipliers.iter_mut() {
            *m = (self.sigma * standard_normal(rng)).exp();
        }
    }
}

/// Base strength scaled by a trial multiplier, kept above the strength floor.
pub fn perturbed_strength(base: f64, multiplier: f64) -> f64 {
    (base * multiplier).max(MIN_STRENGTH)
}
