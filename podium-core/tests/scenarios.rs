//! End-to-end scenarios: exact engine, convergence and shared uncertainty.

use rand::SeedableRng;
use rand::rngs::SmallRng;

use podium_core::constants::DEFAULT_CONVERGENCE_TOLERANCE;
use podium_core::simulation::trial_strengths;
use podium_core::{
    CompetitionField, CompetitionInput, EntrantInput, ModelConfig, NoiseModel, ScoringDirection, SimulationPlan,
    SimulationSettings, StrengthTransform, StrengthUncertainty, check_convergence, medal_probabilities,
    run_forecast,
};

fn competition(id: &str, scoring: ScoringDirection, rows: &[(i64, &str, f64)]) -> CompetitionInput {
    CompetitionInput {
        id: id.to_string(),
        name: id.to_string(),
        sport: None,
        scoring,
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

fn field(id: &str, rows: &[(i64, &str, f64)]) -> CompetitionField {
    StrengthTransform::default()
        .build_field(&competition(id, ScoringDirection::HigherIsBetter, rows))
        .unwrap()
}

fn scenario_fields() -> Vec<CompetitionField> {
    vec![
        field("ordered", &[(1, "A", 100.0), (2, "B", 80.0), (3, "C", 60.0), (4, "D", 40.0)]),
        field("tied", &[(1, "A", 100.0), (2, "B", 100.0), (3, "C", 100.0)]),
        field("dominant", &[(1, "A", 1000.0), (2, "X", 100.0), (3, "Y", 100.0), (4, "Z", 100.0)]),
    ]
}

#[test]
fn scenario_ordered_field() {
    let table = medal_probabilities(&scenario_fields()[0]).unwrap();
    let gold: Vec<f64> = table.entries.iter().map(|p| p.gold).collect();
    assert!(gold[0] > gold[1] && gold[1] > gold[2] && gold[2] > gold[3], "{gold:?}");
    assert!((gold.iter().sum::<f64>() - 1.0).abs() < 1e-3);
}

#[test]
fn scenario_tied_field() {
    let table = medal_probabilities(&scenario_fields()[1]).unwrap();
    for p in &table.entries {
        assert!((p.gold - 1.0 / 3.0).abs() < 1e-4);
    }
}

#[test]
fn scenario_dominant_entrant() {
    let table = medal_probabilities(&scenario_fields()[2]).unwrap();
    let dominant = table.get(1).unwrap();
    assert!(dominant.gold > 0.9);
    assert!(dominant.bronze < 0.01);
}

#[test]
fn simulation_converges_to_exact() {
    for (i, f) in scenario_fields().iter().enumerate() {
        let report =
            check_convergence(f, NoiseModel::default(), 50_000, 1_000 + i as u64, DEFAULT_CONVERGENCE_TOLERANCE)
                .unwrap();
        assert!(report.converged, "{report:?}");
    }
}

#[test]
fn low_temperature_converges_with_floored_field() {
    let mut rows: Vec<(i64, &str, f64)> = vec![(1, "NOR", 1000.0)];
    rows.extend((2..=400).map(|id| (id, "SWE", 0.5)));
    let f = field("crowded", &rows);
    let noise = NoiseModel::Gumbel {
        temperature: 0.3,
        extra_noise_scale: 0.0,
    };
    let report = check_convergence(&f, noise, 50_000, 11, DEFAULT_CONVERGENCE_TOLERANCE).unwrap();
    assert!(report.converged, "{report:?}");
}

#[test]
fn position_weighted_unit_powers_converge() {
    let noise = NoiseModel::PositionWeighted {
        gold_power: 1.0,
        silver_power: 1.0,
        bronze_power: 1.0,
    };
    let report = check_convergence(&scenario_fields()[0], noise, 50_000, 5, DEFAULT_CONVERGENCE_TOLERANCE).unwrap();
    assert!(report.converged, "{report:?}");
}

#[test]
fn ranking_scores_invert() {
    let input = competition(
        "slalom",
        ScoringDirection::LowerIsBetter,
        &[(1, "AUT", 1.0), (2, "SUI", 3.0), (3, "NOR", 2.0), (4, "FRA", 25.0)],
    );
    let config = ModelConfig {
        num_trials: 0,
        ..Default::default()
    };
    let report = run_forecast(&[input], &config).unwrap();
    let entries = &report.competitions[0].entries;
    assert!(entries[0].exact[0] > entries[2].exact[0]);
    assert!(entries[2].exact[0] > entries[1].exact[0]);
    assert!(entries[1].exact[0] > entries[3].exact[0]);
}

/// Per-trial medal indicator for entrant 1 in each of two fields.
fn medal_indicators(sigma: f64, trials: u64) -> Vec<(f64, f64)> {
    let rows_a = [(1, "NOR", 80.0), (2, "SWE", 85.0), (3, "FIN", 80.0), (4, "USA", 75.0), (5, "GER", 82.0)];
    let rows_b = [(6, "ITA", 84.0), (1, "NOR", 80.0), (7, "FRA", 79.0), (8, "AUT", 86.0), (9, "SUI", 77.0)];
    let plan = SimulationPlan::new(&[field("a", &rows_a), field("b", &rows_b)]).unwrap();
    let settings = SimulationSettings {
        noise: NoiseModel::default(),
        uncertainty: StrengthUncertainty::new(sigma).unwrap(),
        seed: 2024,
        confidence_level: 0.95,
    };

    let noise = NoiseModel::default();
    let mut scratch = Vec::new();
    (0..trials)
        .map(|t| {
            let strengths = trial_strengths(&plan, &settings, t);
            let mut rng = SmallRng::seed_from_u64(t.wrapping_mul(0x9E37_79B9_7F4A_7C15));
            let in_a = noise.sample_podium(&strengths[0], &mut rng, &mut scratch).0.contains(&0);
            let in_b = noise.sample_podium(&strengths[1], &mut rng, &mut scratch).0.contains(&1);
            (in_a as u8 as f64, in_b as u8 as f64)
        })
        .collect()
}

fn correlation(pairs: &[(f64, f64)]) -> f64 {
    let n = pairs.len() as f64;
    let (mx, my) = pairs.iter().fold((0.0, 0.0), |(x, y), p| (x + p.0 / n, y + p.1 / n));
    let (mut cov, mut vx, mut vy) = (0.0, 0.0, 0.0);
    for &(x, y) in pairs {
        cov += (x - mx) * (y - my);
        vx += (x - mx).powi(2);
        vy += (y - my).powi(2);
    }
    cov / (vx * vy).sqrt()
}

#[test]
fn shared_uncertainty_correlates_events() {
    let independent = correlation(&medal_indicators(0.0, 20_000));
    let shared = correlation(&medal_indicators(0.5, 20_000));
    assert!(independent.abs() < 0.03, "independent = {independent}");
    assert!(shared > 0.05, "shared = {shared}");
}

#[test]
fn uncertainty_widens_country_interval() {
    let rows_a = [(1, "NOR", 90.0), (2, "SWE", 85.0), (3, "FIN", 80.0), (4, "USA", 75.0)];
    let rows_b = [(1, "NOR", 90.0), (5, "SWE", 85.0), (6, "FIN", 80.0), (7, "USA", 75.0)];
    let rows_c = [(1, "NOR", 90.0), (8, "SWE", 85.0), (9, "FIN", 80.0), (10, "USA", 75.0)];
    let inputs: Vec<CompetitionInput> = [("a", &rows_a), ("b", &rows_b), ("c", &rows_c)]
        .iter()
        .map(|(id, rows)| competition(id, ScoringDirection::HigherIsBetter, &rows[..]))
        .collect();

    let run = |sigma: f64| {
        let config = ModelConfig {
            num_trials: 20_000,
            seed: Some(11),
            strength_uncertainty: sigma,
            ..Default::default()
        };
        let report = run_forecast(&inputs, &config).unwrap();
        report.countries.into_iter().find(|c| c.country == "NOR").unwrap()
    };

    let calm = run(0.0);
    let wild = run(1.0);
    let calm_width = calm.gold_interval.unwrap().upper - calm.gold_interval.unwrap().lower;
    let wild_width = wild.gold_interval.unwrap().upper - wild.gold_interval.unwrap().lower;
    assert!(wild_width >= calm_width, "calm {calm:?}, wild {wild:?}");
}
