//! Pipeline configuration
//!
//! Defaults cover production use; a YAML file pointed to by
//! `DEBT_INTEL_CONFIG_PATH` (default `config.yaml`) can override any field,
//! and a handful of environment variables override the file.

use serde::Deserialize;
use std::fs;
use std::path::Path;

const ENV_CONFIG_PATH: &str = "DEBT_INTEL_CONFIG_PATH";
const DEFAULT_CONFIG_PATH: &str = "config.yaml";

const ENV_QA_THRESHOLD: &str = "DEBT_INTEL_QA_THRESHOLD";
const ENV_MAX_ITERATIONS: &str = "DEBT_INTEL_MAX_ITERATIONS";
const ENV_PRIMARY_MODEL: &str = "DEBT_INTEL_PRIMARY_MODEL";
const ENV_ESCALATED_MODEL: &str = "DEBT_INTEL_ESCALATED_MODEL";

const DEFAULT_QA_THRESHOLD_PCT: f64 = 85.0;
const DEFAULT_MAX_ITERATIONS: u32 = 3;
const DEFAULT_CHECK_PASS_FLOOR_PCT: f64 = 80.0;
const DEFAULT_CHECK_WARN_FLOOR_PCT: f64 = 50.0;
const DEFAULT_WARN_CREDIT: f64 = 0.7;
const DEFAULT_AMOUNT_TOLERANCE_PCT: f64 = 10.0;
const DEFAULT_CONTENT_BUDGET_CHARS: usize = 5_000_000;
const DEFAULT_WINDOW_CHARS: usize = 10_000;
const DEFAULT_FOOTNOTE_BUDGET_CHARS: usize = 150_000;
const DEFAULT_CALL_TIMEOUT_SECS: u64 = 120;

/// Per-model pricing in microdollars per million tokens
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct ModelRates {
    pub prompt_microdollars_per_mtok: u64,
    pub completion_microdollars_per_mtok: u64,
}

/// Pricing for both tiers
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct TierRates {
    pub primary: ModelRates,
    pub escalated: ModelRates,
}

impl Default for TierRates {
    fn default() -> Self {
        Self {
            primary: ModelRates {
                prompt_microdollars_per_mtok: 150_000,
                completion_microdollars_per_mtok: 600_000,
            },
            escalated: ModelRates {
                prompt_microdollars_per_mtok: 2_500_000,
                completion_microdollars_per_mtok: 10_000_000,
            },
        }
    }
}

/// Configuration for one company's extraction loop
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Acceptance threshold for the aggregate QA score, percent
    pub qa_threshold_pct: f64,
    /// Extraction calls allowed per model tier
    pub max_iterations: u32,
    /// Ratio at or above which a model-assisted check passes, percent
    pub check_pass_floor_pct: f64,
    /// Ratio at or above which it warns instead of failing, percent
    pub check_warn_floor_pct: f64,
    /// Weight credit a WARN verdict retains relative to a PASS
    pub warn_credit: f64,
    /// Tolerance for amount matching against footnote text, percent
    pub amount_tolerance_pct: f64,
    /// Combined-content size above which windowing kicks in
    pub content_budget_chars: usize,
    /// Size of each keyword-anchored excerpt window
    pub window_chars: usize,
    /// Cap on source excerpts handed to verification prompts
    pub footnote_budget_chars: usize,
    /// Per-call provider timeout
    pub call_timeout_secs: u64,
    /// Run the JV/VIE check as the sixth verification check
    pub jv_vie_check: bool,
    /// Model name overrides; provider defaults apply when unset
    pub primary_model: Option<String>,
    pub escalated_model: Option<String>,
    pub rates: TierRates,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            qa_threshold_pct: DEFAULT_QA_THRESHOLD_PCT,
            max_iterations: DEFAULT_MAX_ITERATIONS,
            check_pass_floor_pct: DEFAULT_CHECK_PASS_FLOOR_PCT,
            check_warn_floor_pct: DEFAULT_CHECK_WARN_FLOOR_PCT,
            warn_credit: DEFAULT_WARN_CREDIT,
            amount_tolerance_pct: DEFAULT_AMOUNT_TOLERANCE_PCT,
            content_budget_chars: DEFAULT_CONTENT_BUDGET_CHARS,
            window_chars: DEFAULT_WINDOW_CHARS,
            footnote_budget_chars: DEFAULT_FOOTNOTE_BUDGET_CHARS,
            call_timeout_secs: DEFAULT_CALL_TIMEOUT_SECS,
            jv_vie_check: true,
            primary_model: None,
            escalated_model: None,
            rates: TierRates::default(),
        }
    }
}

/// YAML configuration file structure; every field optional
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ConfigFile {
    pub qa_threshold_pct: Option<f64>,
    pub max_iterations: Option<u32>,
    pub check_pass_floor_pct: Option<f64>,
    pub check_warn_floor_pct: Option<f64>,
    pub warn_credit: Option<f64>,
    pub amount_tolerance_pct: Option<f64>,
    pub content_budget_chars: Option<usize>,
    pub window_chars: Option<usize>,
    pub footnote_budget_chars: Option<usize>,
    pub call_timeout_secs: Option<u64>,
    pub jv_vie_check: Option<bool>,
    pub primary_model: Option<String>,
    pub escalated_model: Option<String>,
    pub rates: Option<TierRates>,
}

impl PipelineConfig {
    /// Load configuration from the config file and environment
    pub fn from_env() -> Self {
        let config_path =
            std::env::var(ENV_CONFIG_PATH).unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string());
        let file = Self::load_config_file(&config_path).unwrap_or_default();

        let mut config = Self::default();
        config.apply_file(file);
        config.apply_env();
        config
    }

    fn apply_file(&mut self, file: ConfigFile) {
        if let Some(v) = file.qa_threshold_pct {
            self.qa_threshold_pct = v;
        }
        if let Some(v) = file.max_iterations {
            self.max_iterations = v;
        }
        if let Some(v) = file.check_pass_floor_pct {
            self.check_pass_floor_pct = v;
        }
        if let Some(v) = file.check_warn_floor_pct {
            self.check_warn_floor_pct = v;
        }
        if let Some(v) = file.warn_credit {
            self.warn_credit = v;
        }
        if let Some(v) = file.amount_tolerance_pct {
            self.amount_tolerance_pct = v;
        }
        if let Some(v) = file.content_budget_chars {
            self.content_budget_chars = v;
        }
        if let Some(v) = file.window_chars {
            self.window_chars = v;
        }
        if let Some(v) = file.footnote_budget_chars {
            self.footnote_budget_chars = v;
        }
        if let Some(v) = file.call_timeout_secs {
            self.call_timeout_secs = v;
        }
        if let Some(v) = file.jv_vie_check {
            self.jv_vie_check = v;
        }
        if file.primary_model.is_some() {
            self.primary_model = file.primary_model;
        }
        if file.escalated_model.is_some() {
            self.escalated_model = file.escalated_model;
        }
        if let Some(v) = file.rates {
            self.rates = v;
        }
    }

    fn apply_env(&mut self) {
        if let Some(v) = std::env::var(ENV_QA_THRESHOLD)
            .ok()
            .and_then(|v| v.parse().ok())
        {
            self.qa_threshold_pct = v;
        }
        if let Some(v) = std::env::var(ENV_MAX_ITERATIONS)
            .ok()
            .and_then(|v| v.parse().ok())
        {
            self.max_iterations = v;
        }
        if let Ok(v) = std::env::var(ENV_PRIMARY_MODEL) {
            self.primary_model = Some(v);
        }
        if let Ok(v) = std::env::var(ENV_ESCALATED_MODEL) {
            self.escalated_model = Some(v);
        }
    }

    /// Load configuration from YAML file
    fn load_config_file(path: &str) -> Option<ConfigFile> {
        let path = Path::new(path);

        if !path.exists() {
            tracing::debug!(path = %path.display(), "Config file not found, using defaults");
            return None;
        }

        match fs::read_to_string(path) {
            Ok(contents) => {
                let contents = contents.trim();
                if contents.is_empty() {
                    tracing::debug!(path = %path.display(), "Config file is empty, using defaults");
                    return Some(ConfigFile::default());
                }

                match serde_yaml::from_str(contents) {
                    Ok(config) => {
                        tracing::info!(path = %path.display(), "Loaded configuration from file");
                        Some(config)
                    }
                    Err(e) => {
                        tracing::warn!(path = %path.display(), error = %e, "Failed to parse config file, using defaults");
                        None
                    }
                }
            }
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "Failed to read config file, using defaults");
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = PipelineConfig::default();
        assert_eq!(config.qa_threshold_pct, 85.0);
        assert_eq!(config.max_iterations, 3);
        assert_eq!(config.check_pass_floor_pct, 80.0);
        assert_eq!(config.check_warn_floor_pct, 50.0);
    }

    #[test]
    fn test_file_overrides_defaults() {
        let file: ConfigFile = serde_yaml::from_str(
            "qa_threshold_pct: 90.0\nmax_iterations: 2\nprimary_model: gpt-4o-mini-2024\n",
        )
        .unwrap();
        let mut config = PipelineConfig::default();
        config.apply_file(file);
        assert_eq!(config.qa_threshold_pct, 90.0);
        assert_eq!(config.max_iterations, 2);
        assert_eq!(config.primary_model.as_deref(), Some("gpt-4o-mini-2024"));
        // Untouched fields keep their defaults
        assert_eq!(config.warn_credit, 0.7);
    }
}
