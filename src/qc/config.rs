// Thresholds for participant quality control
//
// Defaults are the limits the image-rating deployment validated tasks with.
// Every rate threshold is "fail when the measured value is strictly greater".

use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Configuration for the four quality-control checks
///
/// # Example
/// ```
/// use screener::qc::QualityConfig;
///
/// let config = QualityConfig::default();
/// assert_eq!(config.max_prob_random, 0.8);
/// assert_eq!(config.min_trial_rt_ms, 200);
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct QualityConfig {
    /// Largest acceptable `1 - p` from the position-bias chi-square test
    ///
    /// - 0.8 (default): only clearly lopsided clicking fails
    /// - 0.5: fails anyone whose clicks are more skewed than the median
    ///   uniformly random clicker
    pub max_prob_random: f64,

    /// Largest acceptable fraction of contradicted choices
    ///
    /// The fraction counts both halves of each contradictory keep/reject
    /// pair, so one contradiction in ten answered trials is 0.2.
    pub max_frac_contradictions: f64,

    /// Largest acceptable fraction of trials without a response
    pub max_frac_unanswered: f64,

    /// Largest acceptable fraction of answered trials at or below `min_trial_rt_ms`
    pub max_frac_too_fast: f64,

    /// Reaction-time floor in milliseconds
    ///
    /// Choices made this fast or faster count as "too fast".
    pub min_trial_rt_ms: i64,

    /// Attribute participants judge images by ("most interesting", ...)
    pub attribute: String,
}

impl Default for QualityConfig {
    fn default() -> Self {
        Self {
            max_prob_random: 0.8,
            max_frac_contradictions: 0.3,
            max_frac_unanswered: 0.3,
            max_frac_too_fast: 0.3,
            min_trial_rt_ms: 200,
            attribute: "interesting".to_string(),
        }
    }
}

impl QualityConfig {
    /// Stricter limits for paid tasks after the practice has been passed
    pub fn strict() -> Self {
        Self {
            max_prob_random: 0.5,
            max_frac_contradictions: 0.15,
            max_frac_unanswered: 0.1,
            max_frac_too_fast: 0.1,
            min_trial_rt_ms: 300,
            ..Self::default()
        }
    }

    /// Looser limits for a first practice attempt
    pub fn permissive() -> Self {
        Self {
            max_prob_random: 0.95,
            max_frac_contradictions: 0.5,
            max_frac_unanswered: 0.5,
            max_frac_too_fast: 0.5,
            min_trial_rt_ms: 150,
            ..Self::default()
        }
    }

    /// Load configuration from a TOML file
    ///
    /// Missing keys keep their default values.
    ///
    /// # Example TOML
    /// ```toml
    /// max_prob_random = 0.8
    /// max_frac_contradictions = 0.3
    /// min_trial_rt_ms = 250
    /// attribute = "memorable"
    /// ```
    pub fn from_toml<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let content = fs::read_to_string(path.as_ref()).with_context(|| {
            format!("Failed to read config file: {}", path.as_ref().display())
        })?;
        let config: Self =
            toml::from_str(&content).with_context(|| "Failed to parse TOML quality config")?;
        config.validate().map_err(|e| anyhow::anyhow!(e))?;
        Ok(config)
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), String> {
        let rates = [
            ("max_prob_random", self.max_prob_random),
            ("max_frac_contradictions", self.max_frac_contradictions),
            ("max_frac_unanswered", self.max_frac_unanswered),
            ("max_frac_too_fast", self.max_frac_too_fast),
        ];
        for (name, value) in rates {
            if !(0.0..=1.0).contains(&value) {
                return Err(format!("{} must be in [0, 1], got {}", name, value));
            }
        }

        if self.min_trial_rt_ms < 0 {
            return Err(format!(
                "min_trial_rt_ms must be non-negative, got {}",
                self.min_trial_rt_ms
            ));
        }

        if self.attribute.trim().is_empty() {
            return Err("attribute must not be empty".to_string());
        }

        Ok(())
    }
}
