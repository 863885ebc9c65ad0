use anyhow::{Context, Result};
use figment::providers::{Env, Format, Serialized, Yaml};
use figment::Figment;
use thiserror::Error;

use crate::domain::models::config::Config;

/// Comma-separated API keys per judge provider, keyed by provider name.
const JUDGE_KEY_ENV: [(&str, &str); 2] = [("openai", "OPENAI_API_LIST"), ("gemini", "GEMINI_API_LIST")];
const SEARCH_KEY_ENV: &str = "TAVILY_API_KEY";

/// Configuration error types
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Invalid web_verifier_slots: {0}. Must be between 0 and 10")]
    InvalidWebVerifierSlots(usize),

    #[error("Invalid temperature for {0}: {1}. Must be between 0.0 and 2.0")]
    InvalidTemperature(&'static str, f32),

    #[error("Invalid rate limit: {0}. Must be positive")]
    InvalidRateLimit(u32),

    #[error("Invalid json_attempts: {0}. Cannot be 0")]
    InvalidJsonAttempts(u32),

    #[error(
        "Invalid backoff configuration: initial_backoff_ms ({0}) must be less than max_backoff_ms ({1})"
    )]
    InvalidBackoff(u64, u64),

    #[error("Invalid log level: {0}. Must be one of: trace, debug, info, warn, error")]
    InvalidLogLevel(String),

    #[error("Invalid log format: {0}. Must be one of: json, pretty")]
    InvalidLogFormat(String),

    #[error("Invalid log rotation: {0}. Must be one of: daily, hourly, never")]
    InvalidLogRotation(String),

    #[error("Invalid scorer threshold: {0}. Must be strictly between 0 and 1")]
    InvalidThreshold(f64),

    #[error("Configuration validation failed: {0}")]
    ValidationFailed(String),
}

/// Configuration loader with hierarchical merging
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration with hierarchical merging
    ///
    /// Precedence (lowest to highest):
    /// 1. Programmatic defaults (Serialized)
    /// 2. .glassscore/config.yaml (project config)
    /// 3. .glassscore/local.yaml (project local overrides, optional)
    /// 4. Environment variables (GLASSSCORE_* prefix, highest priority)
    ///
    /// Provider keys left empty are then filled from `OPENAI_API_LIST`,
    /// `GEMINI_API_LIST` and `TAVILY_API_KEY`.
    pub fn load() -> Result<Config> {
        let mut config: Config = Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Yaml::file(".glassscore/config.yaml"))
            .merge(Yaml::file(".glassscore/local.yaml"))
            .merge(Env::prefixed("GLASSSCORE_").split("__"))
            .extract()
            .context("Failed to extract configuration from figment")?;

        Self::resolve_credentials(&mut config);
        Self::validate(&config)?;
        Ok(config)
    }

    /// Load configuration from a specific file
    pub fn load_from_file(path: impl AsRef<std::path::Path>) -> Result<Config> {
        let mut config: Config = Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Yaml::file(path.as_ref()))
            .extract()
            .context(format!(
                "Failed to load config from {}",
                path.as_ref().display()
            ))?;

        Self::resolve_credentials(&mut config);
        Self::validate(&config)?;
        Ok(config)
    }

    /// Fills empty provider credentials from the process environment.
    pub fn resolve_credentials(config: &mut Config) {
        for (provider_name, var) in JUDGE_KEY_ENV {
            let Some(provider) = config
                .judge
                .providers
                .iter_mut()
                .find(|p| p.name == provider_name && p.api_keys.is_empty())
            else {
                continue;
            };
            if let Ok(list) = std::env::var(var) {
                provider.api_keys = list
                    .split(',')
                    .map(str::trim)
                    .filter(|k| !k.is_empty())
                    .map(ToString::to_string)
                    .collect();
            }
        }

        if config.search.api_key.as_deref().is_none_or(str::is_empty) {
            config.search.api_key = std::env::var(SEARCH_KEY_ENV)
                .ok()
                .filter(|k| !k.trim().is_empty());
        }
    }

    /// Validate configuration after loading
    pub fn validate(config: &Config) -> Result<(), ConfigError> {
        let evaluation = &config.evaluation;
        if evaluation.web_verifier_slots > 10 {
            return Err(ConfigError::InvalidWebVerifierSlots(
                evaluation.web_verifier_slots,
            ));
        }

        for (name, value) in [
            ("judge_temperature", evaluation.judge_temperature),
            ("planning_temperature", evaluation.planning_temperature),
            ("reevaluation_temperature", evaluation.reevaluation_temperature),
        ] {
            if !(0.0..=2.0).contains(&value) {
                return Err(ConfigError::InvalidTemperature(name, value));
            }
        }

        // Validate judge config
        let judge = &config.judge;
        if judge.requests_per_second == 0 {
            return Err(ConfigError::InvalidRateLimit(judge.requests_per_second));
        }

        if judge.json_attempts == 0 {
            return Err(ConfigError::InvalidJsonAttempts(judge.json_attempts));
        }

        if judge.initial_backoff_ms >= judge.max_backoff_ms {
            return Err(ConfigError::InvalidBackoff(
                judge.initial_backoff_ms,
                judge.max_backoff_ms,
            ));
        }

        for provider in &judge.providers {
            if provider.base_url.trim().is_empty() {
                return Err(ConfigError::ValidationFailed(format!(
                    "judge provider '{}' base_url cannot be empty",
                    provider.name
                )));
            }
            if provider.model.trim().is_empty() {
                return Err(ConfigError::ValidationFailed(format!(
                    "judge provider '{}' model cannot be empty",
                    provider.name
                )));
            }
        }

        let threshold = config.scorer.threshold;
        if threshold.is_nan() || threshold <= 0.0 || threshold >= 1.0 {
            return Err(ConfigError::InvalidThreshold(threshold));
        }

        // Validate logging config
        let valid_log_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_log_levels.contains(&config.logging.level.as_str()) {
            return Err(ConfigError::InvalidLogLevel(config.logging.level.clone()));
        }

        let valid_log_formats = ["json", "pretty"];
        if !valid_log_formats.contains(&config.logging.format.as_str()) {
            return Err(ConfigError::InvalidLogFormat(config.logging.format.clone()));
        }

        let valid_rotations = ["daily", "hourly", "never"];
        if !valid_rotations.contains(&config.logging.rotation.as_str()) {
            return Err(ConfigError::InvalidLogRotation(
                config.logging.rotation.clone(),
            ));
        }

        Ok(())
    }
}
