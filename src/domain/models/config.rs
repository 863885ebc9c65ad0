use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Main configuration structure for GlassScore
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct Config {
    /// Evaluation run configuration
    #[serde(default)]
    pub evaluation: EvaluationConfig,

    /// Language judge provider pool
    #[serde(default)]
    pub judge: JudgeConfig,

    /// Web search provider
    #[serde(default)]
    pub search: SearchConfig,

    /// Statistical scorer coefficients
    #[serde(default)]
    pub scorer: ScorerConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Evaluation run configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct EvaluationConfig {
    /// Number of web verifier slots per run (0-10)
    #[serde(default = "default_web_verifier_slots")]
    pub web_verifier_slots: usize,

    /// Temperature for text analysis and hit verification
    #[serde(default = "default_judge_temperature")]
    pub judge_temperature: f32,

    /// Temperature for search query planning
    #[serde(default = "default_planning_temperature")]
    pub planning_temperature: f32,

    /// Temperature for re-evaluation after invalidation
    #[serde(default = "default_judge_temperature")]
    pub reevaluation_temperature: f32,
}

const fn default_web_verifier_slots() -> usize {
    3
}

const fn default_judge_temperature() -> f32 {
    0.3
}

const fn default_planning_temperature() -> f32 {
    0.0
}

impl Default for EvaluationConfig {
    fn default() -> Self {
        Self {
            web_verifier_slots: default_web_verifier_slots(),
            judge_temperature: default_judge_temperature(),
            planning_temperature: default_planning_temperature(),
            reevaluation_temperature: default_judge_temperature(),
        }
    }
}

/// Language judge configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct JudgeConfig {
    /// OpenAI-compatible chat completion endpoints, one pool entry per API key
    #[serde(default = "default_judge_providers")]
    pub providers: Vec<JudgeProviderConfig>,

    /// Per-request timeout in seconds
    #[serde(default = "default_judge_timeout")]
    pub timeout_secs: u64,

    /// Retries per pool entry before falling back to the next one
    #[serde(default = "default_judge_max_retries")]
    pub max_retries: u32,

    /// Initial backoff delay in milliseconds
    #[serde(default = "default_initial_backoff_ms")]
    pub initial_backoff_ms: u64,

    /// Maximum backoff delay in milliseconds
    #[serde(default = "default_max_backoff_ms")]
    pub max_backoff_ms: u64,

    /// Resends when the reply is not parseable JSON
    #[serde(default = "default_json_attempts")]
    pub json_attempts: u32,

    /// Outgoing judge requests per second across the pool
    #[serde(default = "default_requests_per_second")]
    pub requests_per_second: u32,
}

/// One OpenAI-compatible provider
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct JudgeProviderConfig {
    /// Display name (`openai`, `gemini`)
    pub name: String,

    /// Base URL up to and excluding `/chat/completions`
    pub base_url: String,

    /// Model identifier
    pub model: String,

    /// API keys; also read from `<NAME>_API_LIST` (comma separated) when empty
    #[serde(default)]
    pub api_keys: Vec<String>,
}

fn default_judge_providers() -> Vec<JudgeProviderConfig> {
    vec![
        JudgeProviderConfig {
            name: "gemini".to_string(),
            base_url: "https://generativelanguage.googleapis.com/v1beta/openai".to_string(),
            model: "gemini-2.5-flash".to_string(),
            api_keys: vec![],
        },
        JudgeProviderConfig {
            name: "openai".to_string(),
            base_url: "https://api.openai.com/v1".to_string(),
            model: "gpt-4o-mini".to_string(),
            api_keys: vec![],
        },
    ]
}

const fn default_judge_timeout() -> u64 {
    60
}

const fn default_judge_max_retries() -> u32 {
    2
}

const fn default_initial_backoff_ms() -> u64 {
    500
}

const fn default_max_backoff_ms() -> u64 {
    10_000
}

const fn default_json_attempts() -> u32 {
    3
}

const fn default_requests_per_second() -> u32 {
    5
}

impl Default for JudgeConfig {
    fn default() -> Self {
        Self {
            providers: default_judge_providers(),
            timeout_secs: default_judge_timeout(),
            max_retries: default_judge_max_retries(),
            initial_backoff_ms: default_initial_backoff_ms(),
            max_backoff_ms: default_max_backoff_ms(),
            json_attempts: default_json_attempts(),
            requests_per_second: default_requests_per_second(),
        }
    }
}

/// Web search configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct SearchConfig {
    /// Tavily API key (can also be set via TAVILY_API_KEY env var)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    /// Base URL for the search API
    #[serde(default = "default_search_base_url")]
    pub base_url: String,

    /// Maximum hits per query
    #[serde(default = "default_max_results")]
    pub max_results: u32,

    /// Request timeout in seconds
    #[serde(default = "default_search_timeout")]
    pub timeout_secs: u64,
}

fn default_search_base_url() -> String {
    "https://api.tavily.com".to_string()
}

const fn default_max_results() -> u32 {
    5
}

const fn default_search_timeout() -> u64 {
    30
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: default_search_base_url(),
            max_results: default_max_results(),
            timeout_secs: default_search_timeout(),
        }
    }
}

/// Logistic scorer coefficients
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct ScorerConfig {
    /// Model intercept
    #[serde(default)]
    pub intercept: f64,

    /// Feature weights keyed by feature name (`loan_int_rate`, `loan_grade=D`, ...)
    #[serde(default)]
    pub weights: BTreeMap<String, f64>,

    /// Probability at or above which the label is `default`
    #[serde(default = "default_threshold")]
    pub threshold: f64,
}

const fn default_threshold() -> f64 {
    0.5
}

impl Default for ScorerConfig {
    fn default() -> Self {
        Self {
            intercept: 0.0,
            weights: BTreeMap::new(),
            threshold: default_threshold(),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct LoggingConfig {
    /// Log level: trace, debug, info, warn, error
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Log format: json or pretty
    #[serde(default = "default_log_format")]
    pub format: String,

    /// Directory for rolling log files (stdout only when unset)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub log_dir: Option<String>,

    /// Rotation: daily, hourly or never
    #[serde(default = "default_rotation")]
    pub rotation: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "json".to_string()
}

fn default_rotation() -> String {
    "daily".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
            log_dir: None,
            rotation: default_rotation(),
        }
    }
}
