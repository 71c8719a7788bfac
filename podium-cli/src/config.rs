//! Config file loading and creation for the podium CLI.
//!
//! The file is looked up at `$PODIUM_CONFIG`, then
//! `$XDG_CONFIG_HOME/podium/config.toml`, then `~/.config/podium/config.toml`.
//! All fields are optional; CLI args override config values, which override
//! the built-in model defaults.
use podium_core::{InvalidScorePolicy, ModelConfig, NoiseModel};
use serde::Deserialize;
use std::ffi::OsString;
use std::fs::OpenOptions;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::bail;

const CONFIG_FILE_NAME: &str = "config.toml";

#[derive(Deserialize, Default, Debug, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct PodiumConfig {
    pub strength_power: Option<f64>,
    pub trials: Option<usize>,
    pub temperature: Option<f64>,
    pub extra_noise: Option<f64>,
    pub strength_uncertainty: Option<f64>,
    pub seed: Option<u64>,
    pub confidence_level: Option<f64>,
    pub invalid_scores: Option<InvalidScorePolicy>,
    pub time_limit_secs: Option<f64>,
    pub noise_model: Option<NoiseModel>,
}

impl PodiumConfig {
    /// Lay the file's values over the model defaults.
    pub fn apply(&self, model: &mut ModelConfig) {
        if let Some(v) = self.strength_power {
            model.strength_power = v;
        }
        if let Some(v) = self.trials {
            model.num_trials = v;
        }
        if let Some(v) = self.temperature {
            model.temperature = v;
        }
        if let Some(v) = self.extra_noise {
            model.extra_noise_scale = v;
        }
        if let Some(v) = self.strength_uncertainty {
            model.strength_uncertainty = v;
        }
        if let Some(v) = self.confidence_level {
            model.confidence_level = v;
        }
        if let Some(v) = self.invalid_scores {
            model.invalid_score_policy = v;
        }
        model.seed = self.seed.or(model.seed);
        model.time_limit_secs = self.time_limit_secs.or(model.time_limit_secs);
        model.noise_model = self.noise_model.or(model.noise_model);
    }
}

const DEFAULT_CONFIG_TEMPLATE: &str = "\
# podium configuration
# All values here can be overridden by CLI flags.

# Exponent applied to relative scores (1.0 = linear)
# strength_power = 2.0

# Monte Carlo trials per forecast (0 = exact probabilities only)
# trials = 100000

# Gumbel temperature: below 1.0 favourites win more often
# temperature = 1.0

# Extra Gaussian performance noise (0.0 = none)
# extra_noise = 0.0

# Log-space spread of per-trial strength multipliers shared across events
# strength_uncertainty = 0.15

# Fixed base seed for reproducible runs
# seed = 42

# Confidence level for medal-count intervals
# confidence_level = 0.95

# What to do with negative or non-numeric scores: \"reject\" or \"floor\"
# invalid_scores = \"reject\"

# Stop the simulation after this many seconds and report what completed
# time_limit_secs = 30.0

# Position-weighted sampling instead of Gumbel noise
# [noise_model]
# kind = \"position_weighted\"
# gold_power = 1.5
# silver_power = 1.2
# bronze_power = 1.0
";

/// Where the config file lives when `--config` is not given.
pub fn config_path() -> PathBuf {
    resolve_config_path(
        std::env::var_os("PODIUM_CONFIG"),
        std::env::var_os("XDG_CONFIG_HOME"),
        std::env::var_os("HOME"),
    )
    .unwrap_or_else(|| bail("Cannot locate a config directory: set HOME, XDG_CONFIG_HOME or PODIUM_CONFIG"))
}

fn resolve_config_path(explicit: Option<OsString>, xdg: Option<OsString>, home: Option<OsString>) -> Option<PathBuf> {
    let set = |v: Option<OsString>| v.filter(|p| !p.is_empty()).map(PathBuf::from);
    if let Some(path) = set(explicit) {
        return Some(path);
    }
    let base = match set(xdg) {
        Some(dir) => dir,
        None => set(home)?.join(".config"),
    };
    Some(base.join("podium").join(CONFIG_FILE_NAME))
}

pub fn parse_config(content: &str) -> Result<PodiumConfig, toml::de::Error> {
    toml::from_str(content)
}

/// A missing file is an empty config; anything else unreadable is fatal.
pub fn load_config(path: &Path) -> PodiumConfig {
    let content = match std::fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            debug!(path = %path.display(), "no config file, using defaults");
            return PodiumConfig::default();
        }
        Err(e) => bail(format!("Cannot read config {}: {e}", path.display())),
    };
    parse_config(&content).unwrap_or_else(|e| bail(format!("Invalid config {}: {e}", path.display())))
}

/// Write the commented template to `path`. Never overwrites an existing file.
pub fn write_template(path: &Path) -> io::Result<()> {
    if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
        std::fs::create_dir_all(dir)?;
    }
    let mut file = OpenOptions::new().write(true).create_new(true).open(path)?;
    file.write_all(DEFAULT_CONFIG_TEMPLATE.as_bytes())
}
