//! Trial accumulation and medal-table aggregation.
//!
//! Per-trial medal tallies are small non-negative integers, so percentile
//! intervals are read off integer histograms instead of sorted per-trial
//! vectors. The rank convention is the same one used for sorted samples:
//! for confidence level c and α = 1 − c, the interval is
//! `[sorted[⌊α/2 · n⌋], sorted[max(⌊(1 − α/2) · n⌋ − 1, lower)]]`.
use std::collections::HashMap;

use crate::constants::MIN_BREAKDOWN_TOTAL;
use crate::plackett_luce::MedalTable;
use crate::sampler::Podium;
use crate::strength::CompetitionField;
use crate::types::{CountryCompetitionBreakdown, CountryForecast, Interval};

/// Exact distribution of a non-negative integer statistic over trials.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CountHistogram {
    counts: Vec<u64>,
}

impl CountHistogram {
    pub fn push(&mut self, value: usize) {
        if value >= self.counts.len() {
            self.counts.resize(value + 1, 0);
        }
        self.counts[value] += 1;
    }

    pub fn merge(&mut self, other: &CountHistogram) {
        if other.counts.len() > self.counts.len() {
            self.counts.resize(other.counts.len(), 0);
        }
        for (c, o) in self.counts.iter_mut().zip(&other.counts) {
            *c += o;
        }
    }

    /// Number of observations.
    pub fn len(&self) -> u64 {
        self.counts.iter().sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Record zeros until the histogram holds `total` observations.
    pub fn pad_zeros_to(&mut self, total: u64) {
        let missing = total.saturating_sub(self.len());
        if missing > 0 {
            if self.counts.is_empty() {
                self.counts.push(0);
            }
            self.counts[0] += missing;
        }
    }

    pub fn mean(&self) -> f64 {
        let n = self.len();
        if n == 0 {
            return 0.0;
        }
        let sum: f64 = self
            .counts
            .iter()
            .enumerate()
            .map(|(v, &c)| v as f64 * c as f64)
            .sum();
        sum / n as f64
    }

    /// Value at 0-based `rank` in ascending order.
    pub fn value_at_rank(&self, rank: u64) -> Option<usize> {
        let mut seen = 0;
        for (value, &count) in self.counts.iter().enumerate() {
            seen += count;
            if rank < seen {
                return Some(value);
            }
        }
        None
    }

    /// Percentile interval at `confidence_level`. `[0, 0]` when empty.
    pub fn interval(&self, confidence_level: f64) -> Interval {
        let n = self.len();
        if n == 0 {
            return Interval::default();
        }
        let alpha = 1.0 - confidence_level;
        let lower_idx = ((alpha / 2.0) * n as f64).floor() as u64;
        let upper_idx = ((1.0 - alpha / 2.0) * n as f64).floor() as u64;
        let upper_idx = upper_idx.saturating_sub(1).max(lower_idx).min(n - 1);
        let lower_idx = lower_idx.min(n - 1);
        Interval {
            lower: self.value_at_rank(lower_idx).unwrap_or(0) as f64,
            upper: self.value_at_rank(upper_idx).unwrap_or(0) as f64,
        }
    }
}

/// Which roster entrant sits in each field slot, and each entrant's country.
///
/// Fields and entrants are index-addressed; the caller owns the mapping back
/// to ids and names.
#[derive(Debug, Clone, PartialEq)]
pub struct TallyLayout {
    field_entrants: Vec<Vec<usize>>,
    entrant_country: Vec<usize>,
    num_countries: usize,
    field_offsets: Vec<usize>,
}

impl TallyLayout {
    pub fn new(field_entrants: Vec<Vec<usize>>, entrant_country: Vec<usize>, num_countries: usize) -> Self {
        let mut field_offsets = Vec::with_capacity(field_entrants.len());
        let mut offset = 0;
        for field in &field_entrants {
            field_offsets.push(offset);
            offset += field.len();
        }
        Self {
            field_entrants,
            entrant_country,
            num_countries,
            field_offsets,
        }
    }

    pub fn num_fields(&self) -> usize {
        self.field_entrants.len()
    }

    pub fn num_entrants(&self) -> usize {
        self.entrant_country.len()
    }

    pub fn num_countries(&self) -> usize {
        self.num_countries
    }

    pub fn field_entrants(&self, field: usize) -> &[usize] {
        &self.field_entrants[field]
    }

    fn num_slots(&self) -> usize {
        self.field_entrants.iter().map(Vec::len).sum()
    }
}

/// Running medal counts over trials.
///
/// Histograms only see entrants and countries that medalled in a trial; the
/// zeros are filled in once, by [`TrialAccumulator::finish`].
#[derive(Debug, Clone)]
pub struct TrialAccumulator<'a> {
    layout: &'a TallyLayout,
    trials: u64,
    slot_counts: Vec<[u64; 3]>,
    entrant_totals: Vec<CountHistogram>,
    /// gold, silver, bronze, total
    country_medals: Vec<[CountHistogram; 4]>,
    entrant_scratch: Vec<usize>,
    country_scratch: Vec<[usize; 3]>,
    touched_entrants: Vec<usize>,
    touched_countries: Vec<usize>,
}

impl<'a> TrialAccumulator<'a> {
    pub fn new(layout: &'a TallyLayout) -> Self {
        Self {
            layout,
            trials: 0,
            slot_counts: vec![[0; 3]; layout.num_slots()],
            entrant_totals: vec![CountHistogram::default(); layout.num_entrants()],
            country_medals: vec![Default::default(); layout.num_countries()],
            entrant_scratch: vec![0; layout.num_entrants()],
            country_scratch: vec![[0; 3]; layout.num_countries()],
            touched_entrants: Vec::new(),
            touched_countries: Vec::new(),
        }
    }

    pub fn trials(&self) -> u64 {
        self.trials
    }

    /// Record one complete trial: one podium per field, in layout order.
    pub fn record_trial(&mut self, podiums: &[Podium]) {
        debug_assert_eq!(podiums.len(), self.layout.num_fields());
        let layout = self.layout;

        for (field, podium) in podiums.iter().enumerate() {
            let offset = layout.field_offsets[field];
            let roster = &layout.field_entrants[field];
            for (position, &slot) in podium.0.iter().enumerate() {
                self.slot_counts[offset + slot][position] += 1;

                let entrant = roster[slot];
                if self.entrant_scratch[entrant] == 0 {
                    self.touched_entrants.push(entrant);
                }
                self.entrant_scratch[entrant] += 1;

                let country = layout.entrant_country[entrant];
                if self.country_scratch[country] == [0; 3] {
                    self.touched_countries.push(country);
                }
                self.country_scratch[country][position] += 1;
            }
        }

        for entrant in self.touched_entrants.drain(..) {
            self.entrant_totals[entrant].push(self.entrant_scratch[entrant]);
            self.entrant_scratch[entrant] = 0;
        }
        for country in self.touched_countries.drain(..) {
            let [g, s, b] = self.country_scratch[country];
            let hist = &mut self.country_medals[country];
            // Zero medal counts are padded in at the end, with the rest.
            for (h, v) in hist.iter_mut().zip([g, s, b, g + s + b]) {
                if v > 0 {
                    h.push(v);
                }
            }
            self.country_scratch[country] = [0; 3];
        }

        self.trials += 1;
    }

    /// Fold another accumulator over the same layout into this one.
    pub fn merge(&mut self, other: &TrialAccumulator<'_>) {
        self.trials += other.trials;
        for (a, b) in self.slot_counts.iter_mut().zip(&other.slot_counts) {
            for p in 0..3 {
                a[p] += b[p];
            }
        }
        for (a, b) in self.entrant_totals.iter_mut().zip(&other.entrant_totals) {
            a.merge(b);
        }
        for (a, b) in self.country_medals.iter_mut().zip(&other.country_medals) {
            for k in 0..4 {
                a[k].merge(&b[k]);
            }
        }
    }

    pub fn merged(mut self, other: TrialAccumulator<'_>) -> Self {
        self.merge(&other);
        self
    }

    /// Convert counts into frequencies, expectations and intervals.
    pub fn finish(mut self, confidence_level: f64) -> TrialSummary {
        let trials = self.trials;
        let layout = self.layout;
        let freq = |count: u64| if trials == 0 { 0.0 } else { count as f64 / trials as f64 };

        let mut field_frequencies = Vec::with_capacity(layout.num_fields());
        let mut entrant_expected = vec![[0.0; 3]; layout.num_entrants()];
        let mut country_expected = vec![[0.0; 3]; layout.num_countries()];

        for field in 0..layout.num_fields() {
            let offset = layout.field_offsets[field];
            let roster = &layout.field_entrants[field];
            let mut rows = Vec::with_capacity(roster.len());
            for (slot, &entrant) in roster.iter().enumerate() {
                let counts = self.slot_counts[offset + slot];
                let row = [freq(counts[0]), freq(counts[1]), freq(counts[2])];
                let country = layout.entrant_country[entrant];
                for p in 0..3 {
                    entrant_expected[entrant][p] += row[p];
                    country_expected[country][p] += row[p];
                }
                rows.push(row);
            }
            field_frequencies.push(rows);
        }

        let entrant_total_intervals = self
            .entrant_totals
            .iter_mut()
            .map(|h| {
                h.pad_zeros_to(trials);
                h.interval(confidence_level)
            })
            .collect();
        let country_intervals = self
            .country_medals
            .iter_mut()
            .map(|hists| {
                let mut out = [Interval::default(); 4];
                for (o, h) in out.iter_mut().zip(hists.iter_mut()) {
                    h.pad_zeros_to(trials);
                    *o = h.interval(confidence_level);
                }
                out
            })
            .collect();

        TrialSummary {
            trials,
            field_frequencies,
            entrant_expected,
            entrant_total_intervals,
            country_expected,
            country_intervals,
        }
    }
}

/// Finalized trial statistics, index-addressed like the [`TallyLayout`].
#[derive(Debug, Clone, PartialEq)]
pub struct TrialSummary {
    pub trials: u64,
    /// Per field, per slot: simulated gold/silver/bronze frequency.
    pub field_frequencies: Vec<Vec<[f64; 3]>>,
    /// Per entrant: expected gold/silver/bronze across all fields.
    pub entrant_expected: Vec<[f64; 3]>,
    pub entrant_total_intervals: Vec<Interval>,
    pub country_expected: Vec<[f64; 3]>,
    /// Per country: gold, silver, bronze and total intervals.
    pub country_intervals: Vec<[Interval; 4]>,
}

/// Expected medal table from exact probabilities alone.
pub fn aggregate_exact_by_country(fields: &[(&CompetitionField, &MedalTable)]) -> Vec<CountryForecast> {
    let mut totals: HashMap<&str, [f64; 3]> = HashMap::new();
    for (field, table) in fields {
        for (profile, p) in field.profiles().iter().zip(&table.entries) {
            let t = totals.entry(profile.entrant.country.as_str()).or_insert([0.0; 3]);
            t[0] += p.gold;
            t[1] += p.silver;
            t[2] += p.bronze;
        }
    }

    let mut countries: Vec<CountryForecast> = totals
        .into_iter()
        .map(|(country, [gold, silver, bronze])| CountryForecast {
            country: country.to_string(),
            gold,
            silver,
            bronze,
            total: gold + silver + bronze,
            gold_interval: None,
            silver_interval: None,
            bronze_interval: None,
            total_interval: None,
        })
        .collect();
    sort_countries(&mut countries);
    countries
}

/// Expected medals per country in one competition, with each country's
/// strongest entrant. Countries below the breakdown threshold are left out.
pub fn country_breakdowns(field: &CompetitionField, table: &MedalTable) -> Vec<CountryCompetitionBreakdown> {
    let mut by_country: Vec<CountryCompetitionBreakdown> = Vec::new();
    let mut index: HashMap<&str, usize> = HashMap::new();
    let mut top_gold: Vec<f64> = Vec::new();

    for (profile, p) in field.profiles().iter().zip(&table.entries) {
        let entrant = &profile.entrant;
        let idx = *index.entry(entrant.country.as_str()).or_insert_with(|| {
            by_country.push(CountryCompetitionBreakdown {
                country: entrant.country.clone(),
                gold: 0.0,
                silver: 0.0,
                bronze: 0.0,
                total: 0.0,
                top_entrant_id: entrant.id,
                top_entrant_name: entrant.name.clone(),
            });
            top_gold.push(f64::NEG_INFINITY);
            by_country.len() - 1
        });

        let row = &mut by_country[idx];
        row.gold += p.gold;
        row.silver += p.silver;
        row.bronze += p.bronze;
        row.total += p.medal();
        if p.gold > top_gold[idx] {
            top_gold[idx] = p.gold;
            row.top_entrant_id = entrant.id;
            row.top_entrant_name = entrant.name.clone();
        }
    }

    by_country.retain(|b| b.total >= MIN_BREAKDOWN_TOTAL);
    by_country.sort_by(|a, b| {
        b.gold
            .total_cmp(&a.gold)
            .then(b.total.total_cmp(&a.total))
            .then_with(|| a.country.cmp(&b.country))
    });
    by_country
}

/// Medal-table order: expected gold, then total, then country code.
pub fn sort_countries(countries: &mut [CountryForecast]) {
    countries.sort_by(|a, b| {
        b.gold
            .total_cmp(&a.gold)
            .then(b.total.total_cmp(&a.total))
            .then_with(|| a.country.cmp(&b.country))
    });
}
