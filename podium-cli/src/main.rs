mod config;
mod output;

use clap::Parser;
use podium_core::constants::DEFAULT_CONVERGENCE_TOLERANCE;
use podium_core::{
    CompetitionInput, ConvergenceReport, ForecastReport, InvalidScorePolicy, ModelConfig, check_convergence,
    run_forecast,
};
use serde::Deserialize;
use std::io::{self, IsTerminal, Read};
use std::path::PathBuf;
use tracing::{debug, warn};
use tracing_subscriber::EnvFilter;

pub fn bail(msg: impl std::fmt::Display) -> ! {
    eprintln!("Error: {msg}");
    std::process::exit(1);
}

#[derive(Parser)]
#[command(name = "podium", version, about = "Forecast medal tables from entrant scores")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(clap::Subcommand)]
enum Commands {
    /// Forecast medals for every competition in a snapshot
    Predict(PredictArgs),
    /// Check that the simulation converges to the exact probabilities
    Validate(ValidateArgs),
    /// Write a commented default config file
    Init {
        /// Where to write it (default: $PODIUM_CONFIG, then ~/.config/podium/config.toml)
        #[arg(long)]
        config: Option<PathBuf>,
    },
}

/// Flags shared by every command that reads a snapshot.
#[derive(clap::Args)]
struct CommonArgs {
    /// JSON snapshot of competitions (reads stdin if omitted)
    #[arg(long)]
    input: Option<PathBuf>,

    /// Path to config file (default: $PODIUM_CONFIG, then ~/.config/podium/config.toml)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Exponent applied to relative scores
    #[arg(long)]
    power: Option<f64>,

    /// Gumbel temperature. Below 1.0 favourites win more often.
    #[arg(long)]
    temperature: Option<f64>,

    /// Base seed for reproducible runs
    #[arg(long)]
    seed: Option<u64>,

    /// Clamp negative scores to zero and drop non-numeric ones instead of failing
    #[arg(long)]
    floor_invalid: bool,

    /// Output JSON instead of a table
    #[arg(long)]
    json: bool,

    /// Debug logging (otherwise PODIUM_LOG, default "info")
    #[arg(short, long)]
    verbose: bool,
}

#[derive(Parser)]
struct PredictArgs {
    #[command(flatten)]
    common: CommonArgs,

    /// Monte Carlo trials (0 = exact probabilities only)
    #[arg(long)]
    trials: Option<usize>,

    /// Extra Gaussian performance noise
    #[arg(long)]
    extra_noise: Option<f64>,

    /// Log-space spread of per-trial strength multipliers
    #[arg(long)]
    uncertainty: Option<f64>,

    /// Confidence level for medal-count intervals
    #[arg(long)]
    confidence: Option<f64>,

    /// Stop the simulation after this many seconds
    #[arg(long)]
    time_limit: Option<f64>,

    /// Countries shown in the table
    #[arg(long, default_value_t = 20)]
    top: usize,

    /// Only report these country codes, comma-separated (e.g. NOR,SWE,FIN,DEN)
    #[arg(long, value_delimiter = ',')]
    countries: Vec<String>,
}

#[derive(Parser)]
struct ValidateArgs {
    #[command(flatten)]
    common: CommonArgs,

    /// Trials per competition
    #[arg(long, default_value_t = 50_000)]
    trials: usize,

    /// Largest allowed gap between simulated and exact probabilities
    #[arg(long, default_value_t = DEFAULT_CONVERGENCE_TOLERANCE)]
    tolerance: f64,
}

/// A snapshot is either a bare array of competitions or `{"competitions": [...]}`.
#[derive(Deserialize)]
#[serde(untagged)]
enum Snapshot {
    List(Vec<CompetitionInput>),
    Wrapped { competitions: Vec<CompetitionInput> },
}

fn parse_snapshot(content: &str) -> Result<Vec<CompetitionInput>, serde_json::Error> {
    Ok(match serde_json::from_str(content)? {
        Snapshot::List(c) | Snapshot::Wrapped { competitions: c } => c,
    })
}

/// Load competitions from --input or stdin.
fn load_competitions(args: &CommonArgs) -> Vec<CompetitionInput> {
    let content = match args.input {
        Some(ref path) => std::fs::read_to_string(path)
            .unwrap_or_else(|e| bail(format!("Failed to read input file {}: {e}", path.display()))),
        None => {
            let mut stdin = io::stdin();
            if stdin.is_terminal() {
                bail("No input provided. Use --input <file> or pipe a JSON snapshot via stdin.");
            }
            let mut buf = String::new();
            stdin
                .read_to_string(&mut buf)
                .unwrap_or_else(|e| bail(format!("Failed to read from stdin: {e}")));
            buf
        }
    };

    let competitions = parse_snapshot(&content).unwrap_or_else(|e| bail(format!("Invalid snapshot: {e}")));
    if competitions.is_empty() {
        bail("Snapshot contains no competitions");
    }
    competitions
}

/// Keep only the medal-table rows for `codes`. An empty list keeps everything.
fn focus_countries(report: &mut ForecastReport, codes: &[String]) {
    if codes.is_empty() {
        return;
    }
    let wanted = |country: &str| codes.iter().any(|c| c.trim().eq_ignore_ascii_case(country));
    report.countries.retain(|c| wanted(&c.country));
    report.entrants.retain(|e| wanted(&e.country));
}

fn init_tracing(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_env("PODIUM_LOG").unwrap_or_else(|_| EnvFilter::new("info"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(false)
        .init();
}

/// Built-in defaults, then the config file, then CLI flags.
fn model_config(args: &CommonArgs) -> ModelConfig {
    let config_path = args.config.clone().unwrap_or_else(config::config_path);
    let cfg = config::load_config(&config_path);
    debug!(path = %config_path.display(), "loaded config");

    let mut model = ModelConfig::default();
    cfg.apply(&mut model);

    if let Some(v) = args.power {
        model.strength_power = v;
    }
    if let Some(v) = args.temperature {
        model.temperature = v;
    }
    if args.seed.is_some() {
        model.seed = args.seed;
    }
    if args.floor_invalid {
        model.invalid_score_policy = InvalidScorePolicy::Floor;
    }
    model
}

fn main() {
    let cli = Cli::parse();

    match cli.command {
        Commands::Predict(args) => run_predict(args),
        Commands::Validate(args) => run_validate(args),
        Commands::Init { config } => {
            let path = config.unwrap_or_else(config::config_path);
            match config::write_template(&path) {
                Ok(()) => println!("Wrote default config to {}", path.display()),
                Err(e) if e.kind() == io::ErrorKind::AlreadyExists => {
                    bail(format!("{} already exists; edit it or remove it first", path.display()))
                }
                Err(e) => bail(format!("Cannot write config {}: {e}", path.display())),
            }
        }
    }
}

fn run_predict(args: PredictArgs) {
    init_tracing(args.common.verbose);
    let mut model = model_config(&args.common);
    if let Some(v) = args.trials {
        model.num_trials = v;
    }
    if let Some(v) = args.extra_noise {
        model.extra_noise_scale = v;
    }
    if let Some(v) = args.uncertainty {
        model.strength_uncertainty = v;
    }
    if let Some(v) = args.confidence {
        model.confidence_level = v;
    }
    if args.time_limit.is_some() {
        model.time_limit_secs = args.time_limit;
    }

    let competitions = load_competitions(&args.common);
    let mut report = run_forecast(&competitions, &model).unwrap_or_else(|e| bail(e));

    if report.competitions.is_empty() {
        bail(format!("No competition could be forecast ({} skipped)", report.skipped.len()));
    }

    focus_countries(&mut report, &args.countries);
    if report.countries.is_empty() && !args.countries.is_empty() {
        warn!(countries = ?args.countries, "no forecast for the requested countries");
    }

    if args.common.json {
        output::print_json(&report);
    } else {
        output::print_table(&report, args.top);
    }
}

fn run_validate(args: ValidateArgs) {
    init_tracing(args.common.verbose);
    let model = model_config(&args.common);
    model.validate().unwrap_or_else(|e| bail(e));
    let transform = model.strength_transform().unwrap_or_else(|e| bail(e));
    let noise = model.noise_model();
    let seed = model.resolve_seed();

    let competitions = load_competitions(&args.common);
    let mut reports: Vec<ConvergenceReport> = Vec::new();
    for competition in &competitions {
        let checked = transform
            .build_field(competition)
            .and_then(|field| check_convergence(&field, noise, args.trials, seed, args.tolerance));
        match checked {
            Ok(report) => reports.push(report),
            Err(e) if e.is_degenerate() => warn!(competition = %competition.id, reason = %e, "skipping competition"),
            Err(e) => bail(format!("{}: {e}", competition.id)),
        }
    }

    if args.common.json {
        output::print_json(&reports);
    } else {
        output::print_convergence(&reports);
    }

    let failed = reports.iter().filter(|r| !r.converged).count();
    if failed > 0 {
        bail(format!("{failed} of {} competitions did not converge", reports.len()));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_snapshot_accepts_list_and_wrapper() {
        let list = r#"[{"id": "c1", "name": "Sprint", "entrants": [
            {"id": 1, "name": "A", "country": "NOR", "score": 10.0}
        ]}]"#;
        let wrapped = format!(r#"{{"competitions": {list}}}"#);
        let a = parse_snapshot(list).unwrap();
        let b = parse_snapshot(&wrapped).unwrap();
        assert_eq!(a, b);
        assert_eq!(a[0].scoring, podium_core::ScoringDirection::HigherIsBetter);
        assert_eq!(a[0].sport, None);
    }

    #[test]
    fn test_snapshot_scoring_direction() {
        let json = r#"[{"id": "c1", "name": "Downhill", "scoring": "lower_is_better", "entrants": []}]"#;
        let parsed = parse_snapshot(json).unwrap();
        assert_eq!(parsed[0].scoring, podium_core::ScoringDirection::LowerIsBetter);
    }

    #[test]
    fn test_cli_parses_predict_flags() {
        let cli = Cli::try_parse_from([
            "podium", "predict", "--input", "snap.json", "--trials", "1000", "--seed", "7", "--json",
        ])
        .unwrap();
        match cli.command {
            Commands::Predict(args) => {
                assert_eq!(args.trials, Some(1000));
                assert_eq!(args.common.seed, Some(7));
                assert!(args.common.json);
                assert_eq!(args.top, 20);
                assert!(args.countries.is_empty());
            }
            _ => panic!("expected predict"),
        }
    }

    #[test]
    fn test_focus_countries_filters_table() {
        let cli = Cli::try_parse_from(["podium", "predict", "--countries", "NOR,swe"]).unwrap();
        let Commands::Predict(args) = cli.command else {
            panic!("expected predict");
        };
        assert_eq!(args.countries, vec!["NOR".to_string(), "swe".to_string()]);

        let snapshot = r#"[{"id": "c1", "name": "Sprint", "entrants": [
            {"id": 1, "name": "A", "country": "NOR", "score": 100.0},
            {"id": 2, "name": "B", "country": "SWE", "score": 90.0},
            {"id": 3, "name": "C", "country": "FIN", "score": 80.0},
            {"id": 4, "name": "D", "country": "USA", "score": 70.0}
        ]}]"#;
        let config = ModelConfig {
            num_trials: 500,
            seed: Some(4),
            ..Default::default()
        };
        let mut report = run_forecast(&parse_snapshot(snapshot).unwrap(), &config).unwrap();
        focus_countries(&mut report, &args.countries);
        let mut kept: Vec<&str> = report.countries.iter().map(|c| c.country.as_str()).collect();
        kept.sort_unstable();
        assert_eq!(kept, vec!["NOR", "SWE"]);
        assert!(report.entrants.iter().all(|e| e.country == "NOR" || e.country == "SWE"));
        // Per-competition results are untouched.
        assert_eq!(report.competitions[0].entries.len(), 4);
    }
}
