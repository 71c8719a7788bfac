//! One-call forecast pipeline.
//!
//! Competitions are independent until the simulation: a competition that
//! cannot be modelled is recorded as skipped and the rest carry on.
use std::sync::Arc;
use std::sync::atomic::AtomicBool;

use tracing::{debug, warn};

use crate::aggregate::{aggregate_exact_by_country, country_breakdowns};
use crate::config::ModelConfig;
use crate::error::Result;
use crate::plackett_luce::{MedalTable, check_distribution, medal_probabilities};
use crate::simulation::{RunBudget, SimulationPlan, SimulationSettings, simulate};
use crate::strength::CompetitionField;
use crate::types::{
    CompetitionEntry, CompetitionForecast, CompetitionInput, ForecastReport, SkippedCompetition,
};

/// Forecast every competition under `config`.
///
/// Only an invalid configuration is an error; per-competition problems land
/// in [`ForecastReport::skipped`].
pub fn run_forecast(competitions: &[CompetitionInput], config: &ModelConfig) -> Result<ForecastReport> {
    run_forecast_with_cancel(competitions, config, None)
}

/// [`run_forecast`] with a flag that stops the simulation early when set.
pub fn run_forecast_with_cancel(
    competitions: &[CompetitionInput],
    config: &ModelConfig,
    cancel: Option<Arc<AtomicBool>>,
) -> Result<ForecastReport> {
    config.validate()?;
    let transform = config.strength_transform()?;

    let mut resolved: Vec<(&CompetitionInput, CompetitionField, MedalTable)> = Vec::new();
    let mut skipped = Vec::new();
    for competition in competitions {
        let prepared = transform.build_field(competition).and_then(|field| {
            field.ensure_resolvable()?;
            let table = medal_probabilities(&field)?;
            let check = check_distribution(&table);
            if !check.valid {
                warn!(
                    competition = %competition.id,
                    gold = check.gold_sum,
                    silver = check.silver_sum,
                    bronze = check.bronze_sum,
                    "medal columns do not sum to one"
                );
            }
            Ok((field, table))
        });
        match prepared {
            Ok((field, table)) => resolved.push((competition, field, table)),
            Err(reason) => {
                warn!(competition = %competition.id, %reason, "skipping competition");
                skipped.push(SkippedCompetition {
                    competition_id: competition.id.clone(),
                    name: competition.name.clone(),
                    reason,
                });
            }
        }
    }

    let seed = config.resolve_seed();
    debug!(
        competitions = resolved.len(),
        skipped = skipped.len(),
        seed,
        "fields prepared"
    );

    let fields: Vec<CompetitionField> = resolved.iter().map(|(_, f, _)| f.clone()).collect();
    let plan = SimulationPlan::new(&fields)?;
    let settings = SimulationSettings {
        noise: config.noise_model(),
        uncertainty: config.uncertainty()?,
        seed,
        confidence_level: config.confidence_level,
    };
    let budget = RunBudget {
        max_trials: config.num_trials,
        time_limit: config.time_limit(),
        cancel,
    };
    let outcome = simulate(&plan, &settings, &budget);
    let simulated = outcome.trials_completed > 0;

    let competitions = resolved
        .iter()
        .enumerate()
        .map(|(f, (input, field, table))| {
            let entries = field
                .profiles()
                .iter()
                .zip(&table.entries)
                .enumerate()
                .map(|(slot, (profile, p))| CompetitionEntry {
                    entrant_id: profile.entrant.id,
                    name: profile.entrant.name.clone(),
                    country: profile.entrant.country.clone(),
                    relative_score: profile.relative_score,
                    strength: profile.strength,
                    exact: [p.gold, p.silver, p.bronze],
                    simulated: simulated.then(|| outcome.field_frequencies[f][slot]),
                })
                .collect();
            CompetitionForecast {
                competition_id: input.id.clone(),
                name: input.name.clone(),
                sport: input.sport.clone(),
                entries,
                countries: country_breakdowns(field, table),
            }
        })
        .collect();

    let (countries, entrants) = if simulated {
        (outcome.countries, outcome.entrants)
    } else {
        let exact: Vec<(&CompetitionField, &MedalTable)> = resolved.iter().map(|(_, f, t)| (f, t)).collect();
        (aggregate_exact_by_country(&exact), Vec::new())
    };

    Ok(ForecastReport {
        competitions,
        skipped,
        countries,
        entrants,
        trials_requested: outcome.trials_requested,
        trials_completed: outcome.trials_completed,
        seed,
        stopped_early: outcome.stopped_early,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::PodiumError;
    use crate::types::{EntrantInput, ScoringDirection};

    fn competition(id: &str, rows: &[(i64, &str, f64)]) -> CompetitionInput {
        CompetitionInput {
            id: id.to_string(),
            name: format!("Event {id}"),
            sport: Some("biathlon".to_string()),
            scoring: ScoringDirection::HigherIsBetter,
            entrants: rows
                .iter()
                .map(|&(id, country, score)| EntrantInput {
                    id,
                    name: format!("E{id}"),
                    country: country.to_string(),
                    score,
                })
                .collect(),
        }
    }

    fn inputs() -> Vec<CompetitionInput> {
        vec![
            competition("sprint", &[(1, "NOR", 100.0), (2, "SWE", 90.0), (3, "FIN", 80.0), (4, "NOR", 70.0)]),
            competition("pursuit", &[(1, "NOR", 95.0), (5, "USA", 100.0), (6, "SWE", 60.0)]),
            competition("duel", &[(1, "NOR", 95.0), (5, "USA", 100.0)]),
            competition("broken", &[(7, "GER", -1.0), (8, "AUT", 5.0), (9, "SUI", 4.0)]),
        ]
    }

    #[test]
    fn test_skips_bad_competitions_and_keeps_going() {
        let config = ModelConfig {
            num_trials: 2_000,
            seed: Some(1),
            ..Default::default()
        };
        let report = run_forecast(&inputs(), &config).unwrap();

        assert_eq!(report.competitions.len(), 2);
        assert_eq!(report.skipped.len(), 2);
        assert!(report.skipped[0].reason.is_degenerate());
        assert_eq!(report.skipped[1].reason, PodiumError::invalid_score(7, -1.0));
        assert_eq!(report.trials_completed, 2_000);
        assert_eq!(report.seed, 1);
    }

    #[test]
    fn test_exact_only_when_no_trials() {
        let config = ModelConfig {
            num_trials: 0,
            ..Default::default()
        };
        let report = run_forecast(&inputs(), &config).unwrap();
        assert_eq!(report.trials_completed, 0);
        assert!(report.entrants.is_empty());
        assert!(report.countries.iter().all(|c| c.total_interval.is_none()));
        let total: f64 = report.countries.iter().map(|c| c.total).sum();
        assert!((total - 6.0).abs() < 1e-9);
        for entry in &report.competitions[0].entries {
            assert!(entry.simulated.is_none());
        }
    }

    #[test]
    fn test_simulated_entries_present() {
        let config = ModelConfig {
            num_trials: 5_000,
            seed: Some(9),
            strength_uncertainty: 0.0,
            ..Default::default()
        };
        let report = run_forecast(&inputs(), &config).unwrap();
        for competition in &report.competitions {
            for entry in &competition.entries {
                let sim = entry.simulated.unwrap();
                assert!((sim[0] - entry.exact[0]).abs() < 0.05, "{entry:?}");
            }
        }
        assert!(report.countries.iter().all(|c| c.total_interval.is_some()));
        assert_eq!(report.entrants.len(), 6);
    }

    #[test]
    fn test_same_seed_same_report() {
        let config = ModelConfig {
            num_trials: 3_000,
            seed: Some(77),
            ..Default::default()
        };
        assert_eq!(run_forecast(&inputs(), &config), run_forecast(&inputs(), &config));
    }

    #[test]
    fn test_invalid_config_is_an_error() {
        let config = ModelConfig {
            confidence_level: 2.0,
            ..Default::default()
        };
        assert!(run_forecast(&inputs(), &config).is_err());
    }

    #[test]
    fn test_cancel_flag_keeps_exact_output() {
        let config = ModelConfig {
            num_trials: 1_000,
            seed: Some(3),
            ..Default::default()
        };
        let cancel = Arc::new(AtomicBool::new(true));
        let report = run_forecast_with_cancel(&inputs(), &config, Some(cancel)).unwrap();
        assert_eq!(report.trials_completed, 0);
        assert_eq!(report.stopped_early, Some(crate::types::StopReason::Cancelled));
        assert_eq!(report.competitions.len(), 2);
        assert!(!report.countries.is_empty());
    }
}
