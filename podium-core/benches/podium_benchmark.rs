//! Benchmarks for the exact engine and the simulation loop.

use criterion::{BenchmarkId, Criterion, black_box, criterion_group, criterion_main};
use podium_core::plackett_luce::podium_probabilities;
use podium_core::simulation::simulate;
use podium_core::{
    CompetitionField, CompetitionInput, EntrantInput, NoiseModel, RunBudget, ScoringDirection, SimulationPlan,
    SimulationSettings, StrengthTransform, StrengthUncertainty,
};

/// Field of `n` entrants with a smoothly decaying score profile.
fn sample_field(id: usize, n: usize) -> CompetitionField {
    let entrants = (0..n)
        .map(|i| EntrantInput {
            id: ((id * 7 + i) % (n * 3)) as i64,
            name: format!("E{i}"),
            country: format!("C{}", i % 12),
            score: 100.0 / (1.0 + i as f64 * 0.15),
        })
        .collect();
    StrengthTransform::default()
        .build_field(&CompetitionInput {
            id: format!("c{id}"),
            name: format!("Competition {id}"),
            sport: None,
            scoring: ScoringDirection::HigherIsBetter,
            entrants,
        })
        .unwrap()
}

fn bench_exact(c: &mut Criterion) {
    let mut group = c.benchmark_group("exact");
    for n in [10, 100, 1_000] {
        let strengths = sample_field(0, n).strengths();
        group.bench_with_input(BenchmarkId::new("podium_probabilities", n), &strengths, |b, s| {
            b.iter(|| podium_probabilities(black_box(s)).unwrap())
        });
    }
    group.finish();
}

fn bench_simulation(c: &mut Criterion) {
    let fields: Vec<CompetitionField> = (0..20).map(|i| sample_field(i, 30)).collect();
    let plan = SimulationPlan::new(&fields).unwrap();

    let mut group = c.benchmark_group("simulation");
    group.sample_size(10);
    for sigma in [0.0, 0.15] {
        let settings = SimulationSettings {
            noise: NoiseModel::default(),
            uncertainty: StrengthUncertainty::new(sigma).unwrap(),
            seed: 42,
            confidence_level: 0.95,
        };
        group.bench_with_input(BenchmarkId::new("10k_trials_20_fields", sigma), &settings, |b, s| {
            b.iter(|| simulate(black_box(&plan), s, &RunBudget::trials(10_000)))
        });
    }
    group.finish();
}

criterion_group!(benches, bench_exact, bench_simulation);
criterion_main!(benches);
