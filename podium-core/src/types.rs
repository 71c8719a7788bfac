use std::collections::HashMap;

use crate::error::{PodiumError, Result};

/// One entrant's row in a competition, as read from the data store.
///
/// Entrants are identified by caller-provided `i64` IDs. The same ID in two
/// competitions is the same entrant, which is what lets strength uncertainty
/// be shared across events.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct EntrantInput {
    pub id: i64,
    pub name: String,
    /// Country code used for medal-table grouping (e.g. "NOR").
    pub country: String,
    /// Raw performance score in the competition's scoring direction.
    pub score: f64,
}

/// How raw scores in a competition relate to performance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum ScoringDirection {
    /// Points-style scores: more is better.
    #[default]
    HigherIsBetter,
    /// Ranking-style scores: 1 is best.
    LowerIsBetter,
}

impl ScoringDirection {
    /// Map a raw score onto a higher-is-better scale.
    ///
    /// Ranking-style scores are inverted as `1 / max(x, 1)`; any constant
    /// factor cancels when the transform divides by the field maximum.
    pub fn orient(self, raw: f64) -> f64 {
        match self {
            ScoringDirection::HigherIsBetter => raw,
            ScoringDirection::LowerIsBetter => 1.0 / raw.max(1.0),
        }
    }
}

/// One competition: a list of entrants and how to read their scores.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct CompetitionInput {
    pub id: String,
    pub name: String,
    #[cfg_attr(feature = "serde", serde(default))]
    pub sport: Option<String>,
    #[cfg_attr(feature = "serde", serde(default))]
    pub scoring: ScoringDirection,
    pub entrants: Vec<EntrantInput>,
}

/// Two-sided percentile interval.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Interval {
    pub lower: f64,
    pub upper: f64,
}

/// Expected medal table row for one country.
///
/// Intervals come from per-trial totals and are `None` when the figures are
/// exact expectations without simulation.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct CountryForecast {
    pub country: String,
    pub gold: f64,
    pub silver: f64,
    pub bronze: f64,
    pub total: f64,
    pub gold_interval: Option<Interval>,
    pub silver_interval: Option<Interval>,
    pub bronze_interval: Option<Interval>,
    pub total_interval: Option<Interval>,
}

/// One country's expected medals in one competition.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct CountryCompetitionBreakdown {
    pub country: String,
    pub gold: f64,
    pub silver: f64,
    pub bronze: f64,
    pub total: f64,
    /// The country's entrant with the highest gold probability.
    pub top_entrant_id: i64,
    pub top_entrant_name: String,
}

/// Expected medals for one entrant summed over every competition they enter.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct EntrantForecast {
    pub entrant_id: i64,
    pub name: String,
    pub country: String,
    pub gold: f64,
    pub silver: f64,
    pub bronze: f64,
    pub total: f64,
    pub total_interval: Interval,
}

/// One entrant's row in a competition forecast.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct CompetitionEntry {
    pub entrant_id: i64,
    pub name: String,
    pub country: String,
    pub relative_score: f64,
    pub strength: f64,
    /// Closed-form probabilities.
    pub exact: [f64; 3],
    /// Simulated frequencies, `None` when no trials ran.
    pub simulated: Option<[f64; 3]>,
}

#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct CompetitionForecast {
    pub competition_id: String,
    pub name: String,
    pub sport: Option<String>,
    /// Entrants in input order.
    pub entries: Vec<CompetitionEntry>,
    /// Sorted by expected gold, then total.
    pub countries: Vec<CountryCompetitionBreakdown>,
}

/// A competition left out of the forecast, with the reason.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SkippedCompetition {
    pub competition_id: String,
    pub name: String,
    pub reason: PodiumError,
}

/// Why a simulation finished before its trial budget.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum StopReason {
    TimeLimit,
    Cancelled,
}

/// Result from `run_forecast()`.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ForecastReport {
    pub competitions: Vec<CompetitionForecast>,
    pub skipped: Vec<SkippedCompetition>,
    /// Medal table, sorted by expected gold, then total.
    pub countries: Vec<CountryForecast>,
    /// Per-entrant totals, sorted by expected total. Empty when no trials ran.
    pub entrants: Vec<EntrantForecast>,
    pub trials_requested: usize,
    pub trials_completed: usize,
    /// Base seed of the run, for replay.
    pub seed: u64,
    pub stopped_early: Option<StopReason>,
}

/// Maps between caller-provided i64 IDs and internal 0..N indices.
#[derive(Debug, Clone, Default)]
pub(crate) struct IdMap {
    ids: Vec<i64>,
    id_to_idx: HashMap<i64, usize>,
}

impl IdMap {
    /// Build a map from IDs that must be unique.
    pub fn from_unique_ids(ids: &[i64]) -> Result<Self> {
        let mut map = IdMap {
            ids: Vec::with_capacity(ids.len()),
            id_to_idx: HashMap::with_capacity(ids.len()),
        };
        for &id in ids {
            if map.id_to_idx.contains_key(&id) {
                return Err(PodiumError::DuplicateEntrant { entrant_id: id });
            }
            map.insert(id);
        }
        Ok(map)
    }

    /// Return the index for `id`, assigning the next free one if unseen.
    pub fn insert(&mut self, id: i64) -> usize {
        if let Some(&idx) = self.id_to_idx.get(&id) {
            return idx;
        }
        let idx = self.ids.len();
        self.ids.push(id);
        self.id_to_idx.insert(id, idx);
        idx
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    pub fn get(&self, id: i64) -> Option<usize> {
        self.id_to_idx.get(&id).copied()
    }
}
