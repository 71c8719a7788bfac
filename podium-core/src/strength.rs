//! Strength transform: raw scores → Plackett-Luce strengths.
//!
//! `relative_score = score / max_score_in_field`, `strength = relative_score ^ power`,
//! floored at [`MIN_STRENGTH`]. The scoring direction is resolved once per
//! competition before any score reaches the transform.

use tracing::warn;

use crate::constants::{DEFAULT_STRENGTH_POWER, MIN_FIELD_SIZE, MIN_STRENGTH};
use crate::error::{PodiumError, Result};
use crate::types::{CompetitionInput, EntrantInput, IdMap, ScoringDirection};

/// What to do with a negative or non-finite raw score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum InvalidScorePolicy {
    /// Fail the whole field with `InvalidScore`.
    #[default]
    Reject,
    /// Give negative scores the weakest strength and drop entrants whose score
    /// is not finite.
    Floor,
}

/// An entrant together with its model strength in one field.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct StrengthProfile {
    pub entrant: EntrantInput,
    /// Score divided by the best score in the field, in [0, 1].
    pub relative_score: f64,
    /// `relative_score ^ power`, never below `MIN_STRENGTH` outside a
    /// [`CompetitionField::tempered`] field.
    pub strength: f64,
}

/// Ordered strength profiles for one competition.
#[derive(Debug, Clone, PartialEq)]
pub struct CompetitionField {
    id: String,
    profiles: Vec<StrengthProfile>,
}

impl CompetitionField {
    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn profiles(&self) -> &[StrengthProfile] {
        &self.profiles
    }

    pub fn len(&self) -> usize {
        self.profiles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.profiles.is_empty()
    }

    pub fn strengths(&self) -> Vec<f64> {
        self.profiles.iter().map(|p| p.strength).collect()
    }

    pub fn total_strength(&self) -> f64 {
        self.profiles.iter().map(|p| p.strength).sum()
    }

    /// Whether gold, silver and bronze can all be awarded in this field.
    pub fn is_resolvable(&self) -> bool {
        self.len() >= MIN_FIELD_SIZE && self.total_strength() > 0.0
    }

    /// Fail with `DegenerateField` unless the field is resolvable.
    pub fn ensure_resolvable(&self) -> Result<()> {
        if self.len() < MIN_FIELD_SIZE {
            return Err(PodiumError::degenerate_field(format!(
                "competition {} has {} valid entrants, need at least {}",
                self.id,
                self.len(),
                MIN_FIELD_SIZE
            )));
        }
        if self.total_strength() <= 0.0 {
            return Err(PodiumError::degenerate_field(format!(
                "competition {} has no positive strength",
                self.id
            )));
        }
        Ok(())
    }

    /// The field whose plain Plackett-Luce distribution equals sampling this
    /// field at `temperature`.
    ///
    /// Scaling the Gumbel term by T is the same as dividing log-strength by T,
    /// so every strength becomes `strength ^ (1 / T)`. The result is not
    /// floored at `MIN_STRENGTH` again, matching the sampler; only underflow
    /// to zero is guarded.
    pub fn tempered(&self, temperature: f64) -> Result<CompetitionField> {
        if !temperature.is_finite() || temperature <= 0.0 {
            return Err(PodiumError::invalid_config(format!(
                "temperature must be positive and finite, got {temperature}"
            )));
        }
        let profiles = self
            .profiles
            .iter()
            .map(|p| StrengthProfile {
                entrant: p.entrant.clone(),
                relative_score: p.relative_score,
                strength: p.strength.powf(1.0 / temperature).max(f64::MIN_POSITIVE),
            })
            .collect();
        Ok(CompetitionField {
            id: self.id.clone(),
            profiles,
        })
    }
}

/// Converts raw scores into normalized strengths.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StrengthTransform {
    power: f64,
    policy: InvalidScorePolicy,
}

impl Default for StrengthTransform {
    fn default() -> Self {
        Self {
            power: DEFAULT_STRENGTH_POWER,
            policy: InvalidScorePolicy::default(),
        }
    }
}

impl StrengthTransform {
    pub fn new(power: f64) -> Result<Self> {
        if !power.is_finite() || power <= 0.0 {
            return Err(PodiumError::invalid_config(format!(
                "strength power must be positive and finite, got {power}"
            )));
        }
        Ok(Self {
            power,
            policy: InvalidScorePolicy::default(),
        })
    }

    pub fn with_policy(mut self, policy: InvalidScorePolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn power(&self) -> f64 {
        self.power
    }

    /// Strength for a relative score in [0, 1].
    pub fn strength_for(&self, relative_score: f64) -> f64 {
        relative_score.powf(self.power).max(MIN_STRENGTH)
    }

    /// Build the field for one competition.
    pub fn build_field(&self, competition: &CompetitionInput) -> Result<CompetitionField> {
        self.build_field_from(&competition.id, competition.scoring, &competition.entrants)
    }

    /// Build a field from entrants whose scores follow `direction`.
    ///
    /// Fails with `DuplicateEntrant`, `InvalidScore` (under `Reject`), or
    /// `DegenerateField` when no entrant has a positive oriented score.
    /// Fields with fewer than three entrants are still returned; callers that
    /// need medals check [`CompetitionField::ensure_resolvable`].
    pub fn build_field_from(
        &self,
        id: &str,
        direction: ScoringDirection,
        entrants: &[EntrantInput],
    ) -> Result<CompetitionField> {
        let ids: Vec<i64> = entrants.iter().map(|e| e.id).collect();
        IdMap::from_unique_ids(&ids)?;

        let mut screened: Vec<(&EntrantInput, f64)> = Vec::with_capacity(entrants.len());
        for entrant in entrants {
            let raw = entrant.score;
            if raw.is_finite() && raw >= 0.0 {
                screened.push((entrant, direction.orient(raw)));
                continue;
            }
            match self.policy {
                InvalidScorePolicy::Reject => {
                    return Err(PodiumError::invalid_score(entrant.id, raw));
                }
                // Floored entrants rank last whatever the direction.
                InvalidScorePolicy::Floor if raw.is_finite() => {
                    screened.push((entrant, 0.0));
                }
                InvalidScorePolicy::Floor => {
                    warn!(competition = id, entrant = entrant.id, score = raw, "dropping entrant with non-finite score");
                }
            }
        }

        let max_score = screened.iter().map(|&(_, s)| s).fold(f64::NEG_INFINITY, f64::max);
        if !(max_score > 0.0) {
            return Err(PodiumError::degenerate_field(format!(
                "competition {id} has no positive score"
            )));
        }

        let profiles = screened
            .into_iter()
            .map(|(entrant, score)| {
                let relative_score = score / max_score;
                StrengthProfile {
                    entrant: entrant.clone(),
                    relative_score,
                    strength: self.strength_for(relative_score),
                }
            })
            .collect();

        Ok(CompetitionField {
            id: id.to_string(),
            profiles,
        })
    }
}
