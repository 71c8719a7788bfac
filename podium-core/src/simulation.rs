//! The Monte Carlo trial loop.
//!
//! Trial `t` runs on its own `SmallRng` seeded with `seed + t`, so a run is a
//! pure function of its seed and trial count no matter how rayon schedules the
//! work. Trials are grouped into fixed-size chunks; each chunk fills its own
//! [`TrialAccumulator`] and the chunks are merged at the end. Budgets are
//! checked between trials, never inside one.
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use rayon::prelude::*;
use tracing::debug;

use crate::aggregate::{TallyLayout, TrialAccumulator, sort_countries};
use crate::constants::TRIAL_CHUNK_SIZE;
use crate::error::Result;
use crate::sampler::{NoiseModel, Podium};
use crate::strength::CompetitionField;
use crate::types::{CountryForecast, EntrantForecast, EntrantInput, IdMap, StopReason};
use crate::uncertainty::{StrengthUncertainty, perturbed_strength};

/// Limits on how much work a run may do.
#[derive(Debug, Clone, Default)]
pub struct RunBudget {
    pub max_trials: usize,
    pub time_limit: Option<Duration>,
    /// Set to `true` from any thread to stop after the trials in flight.
    pub cancel: Option<Arc<AtomicBool>>,
}

impl RunBudget {
    pub fn trials(max_trials: usize) -> Self {
        Self {
            max_trials,
            ..Default::default()
        }
    }

    fn is_cancelled(&self) -> bool {
        self.cancel.as_ref().is_some_and(|c| c.load(Ordering::Relaxed))
    }
}

/// How each trial is generated.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SimulationSettings {
    pub noise: NoiseModel,
    pub uncertainty: StrengthUncertainty,
    pub seed: u64,
    pub confidence_level: f64,
}

/// Every distinct entrant across the fields of a run.
#[derive(Debug, Clone)]
pub struct Roster {
    ids: IdMap,
    entrants: Vec<EntrantInput>,
    countries: Vec<String>,
}

impl Roster {
    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    /// Index of an entrant id, shared by every field it appears in.
    pub fn index_of(&self, entrant_id: i64) -> Option<usize> {
        self.ids.get(entrant_id)
    }

    pub fn entrant(&self, idx: usize) -> &EntrantInput {
        &self.entrants[idx]
    }

    pub fn countries(&self) -> &[String] {
        &self.countries
    }
}

/// Fields materialized for sampling, with roster indices for every slot.
#[derive(Debug, Clone)]
pub struct SimulationPlan {
    roster: Roster,
    competition_ids: Vec<String>,
    base_strengths: Vec<Vec<f64>>,
    layout: TallyLayout,
}

impl SimulationPlan {
    /// Build a plan over resolvable fields. An entrant's name and country are
    /// taken from the first field it appears in.
    pub fn new(fields: &[CompetitionField]) -> Result<Self> {
        let mut ids = IdMap::default();
        let mut entrants = Vec::new();
        let mut countries: Vec<String> = Vec::new();
        let mut entrant_country = Vec::new();
        let mut field_entrants = Vec::with_capacity(fields.len());
        let mut base_strengths = Vec::with_capacity(fields.len());

        for field in fields {
            field.ensure_resolvable()?;
            let mut slots = Vec::with_capacity(field.len());
            for profile in field.profiles() {
                let idx = ids.insert(profile.entrant.id);
                if idx == entrants.len() {
                    let country = match countries.iter().position(|c| *c == profile.entrant.country) {
                        Some(c) => c,
                        None => {
                            countries.push(profile.entrant.country.clone());
                            countries.len() - 1
                        }
                    };
                    entrants.push(profile.entrant.clone());
                    entrant_country.push(country);
                }
                slots.push(idx);
            }
            field_entrants.push(slots);
            base_strengths.push(field.strengths());
        }

        let layout = TallyLayout::new(field_entrants, entrant_country, countries.len());
        Ok(Self {
            roster: Roster {
                ids,
                entrants,
                countries,
            },
            competition_ids: fields.iter().map(|f| f.id().to_string()).collect(),
            base_strengths,
            layout,
        })
    }

    pub fn roster(&self) -> &Roster {
        &self.roster
    }

    pub fn num_fields(&self) -> usize {
        self.base_strengths.len()
    }

    pub fn competition_ids(&self) -> &[String] {
        &self.competition_ids
    }
}

/// Result of a simulation run.
#[derive(Debug, Clone, PartialEq)]
pub struct SimulationOutcome {
    pub seed: u64,
    pub trials_requested: usize,
    pub trials_completed: usize,
    pub stopped_early: Option<StopReason>,
    /// Per field (plan order), per slot (field order): gold/silver/bronze frequency.
    pub field_frequencies: Vec<Vec<[f64; 3]>>,
    pub countries: Vec<CountryForecast>,
    pub entrants: Vec<EntrantForecast>,
}

/// Per-worker buffers reused across trials.
struct TrialWorker {
    multipliers: Vec<f64>,
    strengths: Vec<f64>,
    scratch: Vec<f64>,
    podiums: Vec<Podium>,
}

impl TrialWorker {
    fn new(plan: &SimulationPlan) -> Self {
        Self {
            multipliers: vec![1.0; plan.roster.len()],
            strengths: Vec::new(),
            scratch: Vec::new(),
            podiums: Vec::with_capacity(plan.num_fields()),
        }
    }

    /// Draw this trial's multipliers, then one podium per field.
    fn run_trial<R: Rng>(&mut self, plan: &SimulationPlan, settings: &SimulationSettings, rng: &mut R) {
        settings.uncertainty.fill(rng, &mut self.multipliers);
        self.podiums.clear();
        for (field, base) in plan.base_strengths.iter().enumerate() {
            self.perturb(plan, field, base);
            let podium = settings.noise.sample_podium(&self.strengths, rng, &mut self.scratch);
            self.podiums.push(podium);
        }
    }

    fn perturb(&mut self, plan: &SimulationPlan, field: usize, base: &[f64]) {
        let slots = plan.layout.field_entrants(field);
        self.strengths.clear();
        self.strengths.extend(
            base.iter()
                .zip(slots)
                .map(|(&s, &e)| perturbed_strength(s, self.multipliers[e])),
        );
    }
}

/// Run up to `budget.max_trials` trials over `plan`.
pub fn simulate(plan: &SimulationPlan, settings: &SimulationSettings, budget: &RunBudget) -> SimulationOutcome {
    let requested = if plan.num_fields() == 0 { 0 } else { budget.max_trials };
    let start = Instant::now();
    // A limit past what `Instant` can represent means no deadline.
    let deadline = budget.time_limit.and_then(|limit| start.checked_add(limit));
    let halted = AtomicBool::new(false);

    debug!(
        fields = plan.num_fields(),
        entrants = plan.roster.len(),
        trials = requested,
        seed = settings.seed,
        "starting simulation"
    );

    let should_stop = || {
        if halted.load(Ordering::Relaxed) {
            return true;
        }
        let hit = budget.is_cancelled() || deadline.is_some_and(|d| Instant::now() >= d);
        if hit {
            halted.store(true, Ordering::Relaxed);
        }
        hit
    };

    let num_chunks = requested.div_ceil(TRIAL_CHUNK_SIZE);
    let accumulator = (0..num_chunks)
        .into_par_iter()
        .map(|chunk| {
            let mut acc = TrialAccumulator::new(&plan.layout);
            let mut worker = TrialWorker::new(plan);
            let first = chunk * TRIAL_CHUNK_SIZE;
            let last = (first + TRIAL_CHUNK_SIZE).min(requested);
            for trial in first..last {
                if should_stop() {
                    break;
                }
                let mut rng = SmallRng::seed_from_u64(settings.seed.wrapping_add(trial as u64));
                worker.run_trial(plan, settings, &mut rng);
                acc.record_trial(&worker.podiums);
            }
            acc
        })
        .reduce(|| TrialAccumulator::new(&plan.layout), |a, b| a.merged(b));

    let trials_completed = accumulator.trials() as usize;
    let stopped_early = if trials_completed < requested {
        Some(if budget.is_cancelled() {
            StopReason::Cancelled
        } else {
            StopReason::TimeLimit
        })
    } else {
        None
    };

    debug!(
        trials = trials_completed,
        elapsed_ms = start.elapsed().as_millis() as u64,
        stopped_early = ?stopped_early,
        "simulation finished"
    );

    let summary = accumulator.finish(settings.confidence_level);
    let roster = &plan.roster;

    let mut countries: Vec<CountryForecast> = roster
        .countries
        .iter()
        .enumerate()
        .map(|(c, country)| {
            let [gold, silver, bronze] = summary.country_expected[c];
            let [gi, si, bi, ti] = summary.country_intervals[c];
            CountryForecast {
                country: country.clone(),
                gold,
                silver,
                bronze,
                total: gold + silver + bronze,
                gold_interval: Some(gi),
                silver_interval: Some(si),
                bronze_interval: Some(bi),
                total_interval: Some(ti),
            }
        })
        .collect();
    sort_countries(&mut countries);

    let mut entrants: Vec<EntrantForecast> = roster
        .entrants
        .iter()
        .enumerate()
        .map(|(e, entrant)| {
            let [gold, silver, bronze] = summary.entrant_expected[e];
            EntrantForecast {
                entrant_id: entrant.id,
                name: entrant.name.clone(),
                country: entrant.country.clone(),
                gold,
                silver,
                bronze,
                total: gold + silver + bronze,
                total_interval: summary.entrant_total_intervals[e],
            }
        })
        .collect();
    entrants.sort_by(|a, b| {
        b.total
            .total_cmp(&a.total)
            .then(b.gold.total_cmp(&a.gold))
            .then(a.entrant_id.cmp(&b.entrant_id))
    });

    SimulationOutcome {
        seed: settings.seed,
        trials_requested: requested,
        trials_completed,
        stopped_early,
        field_frequencies: summary.field_frequencies,
        countries,
        entrants,
    }
}

/// Perturbed strengths every field sees in trial `trial`, for inspection and replay.
pub fn trial_strengths(plan: &SimulationPlan, settings: &SimulationSettings, trial: u64) -> Vec<Vec<f64>> {
    let mut rng = SmallRng::seed_from_u64(settings.seed.wrapping_add(trial));
    let mut worker = TrialWorker::new(plan);
    settings.uncertainty.fill(&mut rng, &mut worker.multipliers);
    plan.base_strengths
        .iter()
        .enumerate()
        .map(|(field, base)| {
            worker.perturb(plan, field, base);
            worker.strengths.clone()
        })
        .collect()
}
