//! Output formatting: terminal tables and JSON.
use podium_core::{ConvergenceReport, ForecastReport, Interval, StopReason};
use serde::Serialize;

fn interval(i: Option<Interval>) -> String {
    match i {
        Some(i) => format!("[{:.0}, {:.0}]", i.lower, i.upper),
        None => "-".to_string(),
    }
}

/// Print the medal table and per-competition favourites.
pub fn print_table(report: &ForecastReport, top: usize) {
    let width = report
        .countries
        .iter()
        .map(|c| c.country.len())
        .max()
        .unwrap_or(7)
        .max(7); // at least "Country"

    println!(" # | {:<width$} |   Gold | Silver | Bronze |  Total |     Total CI", "Country");
    println!("---|-{}-|--------|--------|--------|--------|-------------", "-".repeat(width));
    for (i, c) in report.countries.iter().take(top).enumerate() {
        println!(
            "{:>2} | {:<width$} | {:>6.2} | {:>6.2} | {:>6.2} | {:>6.2} | {:>12}",
            i + 1,
            c.country,
            c.gold,
            c.silver,
            c.bronze,
            c.total,
            interval(c.total_interval),
        );
    }

    println!();
    for competition in &report.competitions {
        let Some(favourite) = competition
            .entries
            .iter()
            .max_by(|a, b| a.exact[0].total_cmp(&b.exact[0]))
        else {
            continue;
        };
        println!(
            "{}: {} ({}) gold {:.1}%, podium {:.1}%",
            competition.name,
            favourite.name,
            favourite.country,
            favourite.exact[0] * 100.0,
            favourite.exact.iter().sum::<f64>() * 100.0,
        );
    }

    for s in &report.skipped {
        println!("Skipped {}: {}", s.name, s.reason);
    }

    println!(
        "\n{} competitions forecast, {} skipped, {} of {} trials (seed {})",
        report.competitions.len(),
        report.skipped.len(),
        report.trials_completed,
        report.trials_requested,
        report.seed,
    );
    match report.stopped_early {
        Some(StopReason::TimeLimit) => println!("Simulation stopped at the time limit; intervals use completed trials."),
        Some(StopReason::Cancelled) => println!("Simulation cancelled; intervals use completed trials."),
        None => {}
    }
}

/// Print the full report as JSON.
pub fn print_json<T: Serialize>(value: &T) {
    match serde_json::to_string_pretty(value) {
        Ok(json) => println!("{json}"),
        Err(e) => crate::bail(format!("Failed to serialize output: {e}")),
    }
}

/// Print one line per convergence check.
pub fn print_convergence(reports: &[ConvergenceReport]) {
    let width = reports
        .iter()
        .map(|r| r.competition_id.len())
        .max()
        .unwrap_or(11)
        .max(11); // at least "Competition"

    println!("{:<width$} |  Trials | Max gold dev | Max dev | Mean dev | Converged", "Competition");
    println!("{}-|---------|--------------|---------|----------|----------", "-".repeat(width));
    for r in reports {
        println!(
            "{:<width$} | {:>7} | {:>12.4} | {:>7.4} | {:>8.4} | {}",
            r.competition_id,
            r.num_trials,
            r.max_gold_deviation,
            r.max_abs_deviation,
            r.mean_abs_deviation,
            if r.converged { "yes" } else { "NO" },
        );
    }
}
