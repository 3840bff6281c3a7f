//! CLI argument parsing for Screener

use crate::qc::QualityConfig;
use clap::{Parser, ValueEnum};
use std::path::PathBuf;

/// Output format for the gate report
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable summary (default)
    Text,
    /// JSON report for machine parsing
    Json,
    /// Debrief markup shown to the participant
    Html,
}

/// Named threshold sets
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Preset {
    Default,
    Strict,
    Permissive,
}

impl Preset {
    pub fn config(self) -> QualityConfig {
        match self {
            Preset::Default => QualityConfig::default(),
            Preset::Strict => QualityConfig::strict(),
            Preset::Permissive => QualityConfig::permissive(),
        }
    }
}

#[derive(Parser, Debug)]
#[command(name = "screener")]
#[command(version)]
#[command(about = "Quality control for crowdsourced image rating participants", long_about = None)]
pub struct Cli {
    /// JSON response log of the practice block
    #[arg(value_name = "TRIALS_JSON")]
    pub trials: PathBuf,

    /// TOML file with quality thresholds (overrides --preset)
    #[arg(long = "config", value_name = "TOML")]
    pub config: Option<PathBuf>,

    /// Threshold preset used when no config file is given
    #[arg(long = "preset", value_enum, default_value = "default")]
    pub preset: Preset,

    /// Attribute participants judge images by (e.g. "interesting")
    #[arg(long = "attribute", value_name = "WORD")]
    pub attribute: Option<String>,

    /// Largest acceptable 1 - p from the position-bias test
    #[arg(long = "max-prob-random", value_name = "RATE")]
    pub max_prob_random: Option<f64>,

    /// Largest acceptable fraction of contradicted choices
    #[arg(long = "max-frac-contradictions", value_name = "RATE")]
    pub max_frac_contradictions: Option<f64>,

    /// Largest acceptable fraction of missed trials
    #[arg(long = "max-frac-unanswered", value_name = "RATE")]
    pub max_frac_unanswered: Option<f64>,

    /// Largest acceptable fraction of too-fast responses
    #[arg(long = "max-frac-too-fast", value_name = "RATE")]
    pub max_frac_too_fast: Option<f64>,

    /// Reaction-time floor in milliseconds
    #[arg(long = "min-rt-ms", value_name = "MS")]
    pub min_rt_ms: Option<i64>,

    /// Output format
    #[arg(long = "format", value_enum, default_value = "text")]
    pub format: OutputFormat,

    /// Enable debug tracing output to stderr
    #[arg(long = "debug")]
    pub debug: bool,
}

impl Cli {
    /// Apply command-line overrides on top of a base configuration
    pub fn apply_overrides(&self, mut config: QualityConfig) -> QualityConfig {
        if let Some(attribute) = &self.attribute {
            config.attribute = attribute.clone();
        }
        if let Some(value) = self.max_prob_random {
            config.max_prob_random = value;
        }
        if let Some(value) = self.max_frac_contradictions {
            config.max_frac_contradictions = value;
        }
        if let Some(value) = self.max_frac_unanswered {
            config.max_frac_unanswered = value;
        }
        if let Some(value) = self.max_frac_too_fast {
            config.max_frac_too_fast = value;
        }
        if let Some(value) = self.min_rt_ms {
            config.min_trial_rt_ms = value;
        }
        config
    }

    /// Resolve the effective configuration: file or preset, then flags
    pub fn quality_config(&self) -> anyhow::Result<QualityConfig> {
        let base = match &self.config {
            Some(path) => QualityConfig::from_toml(path)?,
            None => self.preset.config(),
        };
        let config = self.apply_overrides(base);
        config
            .validate()
            .map_err(|e| anyhow::anyhow!("Invalid threshold: {}", e))?;
        Ok(config)
    }
}
