//! Exact Plackett-Luce medal probabilities.
//!
//! For strengths s₁..sₙ with total S:
//!
//! ```text
//! P(i gold)   = sᵢ / S
//! P(i silver) = Σ_{k≠i} (s_k / S) · sᵢ / (S − s_k)
//! P(i bronze) = Σ_{k≠i} Σ_{j≠i,k} (s_k / S) · (s_j / (S − s_k)) · sᵢ / (S − s_k − s_j)
//! ```
//!
//! Silver factors as `sᵢ · (A − aᵢ)` with `a_k = s_k / (S (S − s_k))` and `A = Σ a_k`.
//! Bronze factors the same way over the pairwise kernel
//! `T(k, j) = s_k s_j / (S (S − s_k) (S − s_k − s_j))`: the sum over pairs that
//! avoid i is the full sum minus row i minus column i, so the whole table
//! costs O(n²) rather than O(n³).

use crate::constants::{MIN_FIELD_SIZE, PROBABILITY_TOLERANCE};
use crate::error::{PodiumError, Result};
use crate::strength::CompetitionField;

/// Exact medal probabilities for one entrant in one field.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct MedalProbabilities {
    pub entrant_id: i64,
    pub gold: f64,
    pub silver: f64,
    pub bronze: f64,
}

impl MedalProbabilities {
    /// Probability of finishing anywhere on the podium.
    pub fn medal(&self) -> f64 {
        self.gold + self.silver + self.bronze
    }
}

/// Exact medal distribution for a field, in field order.
/// Empty when the field has fewer than three entrants.
#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct MedalTable {
    pub competition_id: String,
    pub entries: Vec<MedalProbabilities>,
}

impl MedalTable {
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn get(&self, entrant_id: i64) -> Option<&MedalProbabilities> {
        self.entries.iter().find(|p| p.entrant_id == entrant_id)
    }

    /// Sums of the gold, silver and bronze columns.
    pub fn column_sums(&self) -> [f64; 3] {
        self.entries.iter().fold([0.0; 3], |acc, p| {
            [acc[0] + p.gold, acc[1] + p.silver, acc[2] + p.bronze]
        })
    }
}

/// Consistency summary of a medal table.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct DistributionCheck {
    pub gold_sum: f64,
    pub silver_sum: f64,
    pub bronze_sum: f64,
    /// Largest per-entrant P(any medal).
    pub max_medal_probability: f64,
    pub valid: bool,
}

/// Exact gold/silver/bronze probabilities for every entrant in `field`.
///
/// Returns an empty table for fields with fewer than three entrants
/// (an unresolved competition, not an error).
pub fn medal_probabilities(field: &CompetitionField) -> Result<MedalTable> {
    if field.len() < MIN_FIELD_SIZE {
        return Ok(MedalTable {
            competition_id: field.id().to_string(),
            entries: Vec::new(),
        });
    }

    let podium = podium_probabilities(&field.strengths())?;
    let entries = field
        .profiles()
        .iter()
        .zip(podium)
        .map(|(profile, [gold, silver, bronze])| MedalProbabilities {
            entrant_id: profile.entrant.id,
            gold,
            silver,
            bronze,
        })
        .collect();

    Ok(MedalTable {
        competition_id: field.id().to_string(),
        entries,
    })
}

/// `[gold, silver, bronze]` probabilities for raw strengths, in input order.
///
/// Needs at least three strictly positive, finite strengths; anything else is
/// a `DegenerateField`.
pub fn podium_probabilities(strengths: &[f64]) -> Result<Vec<[f64; 3]>> {
    let n = strengths.len();
    if n < MIN_FIELD_SIZE {
        return Err(PodiumError::degenerate_field(format!(
            "{n} entrants, need at least {MIN_FIELD_SIZE}"
        )));
    }
    if let Some(&bad) = strengths.iter().find(|s| !(s.is_finite() && **s > 0.0)) {
        return Err(PodiumError::degenerate_field(format!(
            "strength {bad} is not positive"
        )));
    }

    let total: f64 = strengths.iter().sum();
    if !(total > 0.0) {
        return Err(PodiumError::degenerate_field("total strength is not positive"));
    }

    // a[k] = P(k wins) / (strength left after k)
    let after_first: Vec<f64> = strengths.iter().map(|&s| total - s).collect();
    let a: Vec<f64> = strengths
        .iter()
        .zip(&after_first)
        .map(|(&s, &rest)| s / (total * rest))
        .collect();
    let a_sum: f64 = a.iter().sum();

    // Pairwise bronze kernel, accumulated into row and column sums.
    let mut row = vec![0.0; n];
    let mut col = vec![0.0; n];
    let mut kernel_sum = 0.0;
    for k in 0..n {
        let a_k = a[k];
        for j in 0..n {
            if j == k {
                continue;
            }
            let s_j = strengths[j];
            let t = a_k * s_j / (after_first[k] - s_j);
            row[k] += t;
            col[j] += t;
            kernel_sum += t;
        }
    }

    let podium = (0..n)
        .map(|i| {
            let s_i = strengths[i];
            let gold = s_i / total;
            let silver = s_i * (a_sum - a[i]);
            let bronze = s_i * (kernel_sum - row[i] - col[i]);
            [gold, silver.max(0.0), bronze.max(0.0)]
        })
        .collect();

    Ok(podium)
}

/// Check that each medal column sums to 1 and no entrant exceeds 1 in total.
pub fn check_distribution(table: &MedalTable) -> DistributionCheck {
    let [gold_sum, silver_sum, bronze_sum] = table.column_sums();
    let max_medal_probability = table
        .entries
        .iter()
        .map(|p| p.medal())
        .fold(0.0_f64, f64::max);

    let columns_ok = [gold_sum, silver_sum, bronze_sum]
        .iter()
        .all(|s| (s - 1.0).abs() < PROBABILITY_TOLERANCE);
    let valid =
        !table.is_empty() && columns_ok && max_medal_probability <= 1.0 + PROBABILITY_TOLERANCE;

    DistributionCheck {
        gold_sum,
        silver_sum,
        bronze_sum,
        max_medal_probability,
        valid,
    }
}
