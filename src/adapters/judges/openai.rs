//! OpenAI-compatible chat completion judge with key rotation.
//!
//! One pool entry per (provider, API key). Each call starts at the next entry
//! in round-robin order and falls back through the rest. Each entry is retried
//! with exponential backoff on retryable statuses; other failures move on to
//! the next entry immediately.

use async_trait::async_trait;
use backoff::ExponentialBackoffBuilder;
use governor::{DefaultDirectRateLimiter, Quota, RateLimiter};
use reqwest::{Client as ReqwestClient, StatusCode};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::num::NonZeroU32;
use std::sync::atomic::{AtomicU32, AtomicUsize, Ordering};
use std::time::Duration;
use tracing::{debug, instrument, warn};

use crate::domain::errors::ProviderError;
use crate::domain::models::{ChatMessage, JudgeConfig, JudgeRequest};
use crate::domain::ports::LanguageJudge;

const PROVIDER: &str = "language judge";

#[derive(Debug, Clone)]
struct PoolEntry {
    provider: String,
    base_url: String,
    model: String,
    api_key: String,
}

#[derive(Serialize)]
struct ResponseFormat {
    #[serde(rename = "type")]
    kind: &'static str,
}

#[derive(Serialize)]
struct ChatCompletionRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    temperature: f32,
    response_format: ResponseFormat,
}

#[derive(Deserialize)]
struct ChatCompletionResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Deserialize)]
struct ChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

/// Parses a judge reply, tolerating a Markdown code fence or prose around
/// the JSON object.
pub fn extract_json(text: &str) -> Option<Value> {
    let trimmed = text.trim();
    let unfenced = trimmed
        .strip_prefix("```json")
        .or_else(|| trimmed.strip_prefix("```"))
        .map_or(trimmed, |rest| rest.trim_end().trim_end_matches("```"))
        .trim();

    if let Ok(value) = serde_json::from_str::<Value>(unfenced) {
        return Some(value);
    }

    let start = unfenced.find('{')?;
    let end = unfenced.rfind('}')?;
    (start < end)
        .then(|| serde_json::from_str(&unfenced[start..=end]).ok())
        .flatten()
}

/// Judge backed by a rotating pool of OpenAI-compatible endpoints.
pub struct RotatingJudge {
    http_client: ReqwestClient,
    pool: Vec<PoolEntry>,
    next_entry: AtomicUsize,
    limiter: DefaultDirectRateLimiter,
    config: JudgeConfig,
}

impl RotatingJudge {
    pub fn new(config: JudgeConfig) -> Result<Self, ProviderError> {
        let http_client = ReqwestClient::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .pool_max_idle_per_host(10)
            .build()
            .map_err(|e| ProviderError::transient(PROVIDER, format!("HTTP client: {e}")))?;

        let pool = config
            .providers
            .iter()
            .flat_map(|provider| {
                provider.api_keys.iter().filter(|k| !k.trim().is_empty()).map(|key| PoolEntry {
                    provider: provider.name.clone(),
                    base_url: provider.base_url.trim_end_matches('/').to_string(),
                    model: provider.model.clone(),
                    api_key: key.trim().to_string(),
                })
            })
            .collect();

        let per_second = NonZeroU32::new(config.requests_per_second).unwrap_or(NonZeroU32::MIN);
        Ok(Self {
            http_client,
            pool,
            next_entry: AtomicUsize::new(0),
            limiter: RateLimiter::direct(Quota::per_second(per_second)),
            config,
        })
    }

    /// Number of (provider, key) entries available.
    pub fn pool_size(&self) -> usize {
        self.pool.len()
    }

    /// Entry indices for one call, starting at the next round-robin position.
    fn rotation(&self) -> impl Iterator<Item = usize> + '_ {
        let len = self.pool.len();
        let start = self.next_entry.fetch_add(1, Ordering::Relaxed) % len.max(1);
        (0..len).map(move |offset| (start + offset) % len)
    }

    async fn send_once(
        &self,
        entry: &PoolEntry,
        request: &JudgeRequest,
    ) -> Result<String, backoff::Error<ProviderError>> {
        self.limiter.until_ready().await;

        let body = ChatCompletionRequest {
            model: &entry.model,
            messages: &request.messages,
            temperature: request.temperature,
            response_format: ResponseFormat {
                kind: "json_object",
            },
        };
        let response = self
            .http_client
            .post(format!("{}/chat/completions", entry.base_url))
            .bearer_auth(&entry.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| backoff::Error::transient(ProviderError::transient(&entry.provider, e.to_string())))?;

        let status = response.status();
        if !status.is_success() {
            let text = response
                .text()
                .await
                .unwrap_or_else(|_| "Failed to read error response".to_string());
            let err = ProviderError::transient(&entry.provider, format!("HTTP {status}: {text}"));
            return Err(if is_retryable(status) {
                backoff::Error::transient(err)
            } else {
                backoff::Error::permanent(err)
            });
        }

        let parsed: ChatCompletionResponse = response
            .json()
            .await
            .map_err(|e| backoff::Error::permanent(ProviderError::malformed(&entry.provider, e.to_string())))?;
        parsed
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or_else(|| backoff::Error::permanent(ProviderError::malformed(&entry.provider, "empty completion")))
    }

    /// One entry with exponential backoff, bounded by `max_retries`.
    async fn send_with_retry(&self, entry: &PoolEntry, request: &JudgeRequest) -> Result<String, ProviderError> {
        let policy = ExponentialBackoffBuilder::new()
            .with_initial_interval(Duration::from_millis(self.config.initial_backoff_ms))
            .with_max_interval(Duration::from_millis(self.config.max_backoff_ms))
            .with_max_elapsed_time(None)
            .build();
        let attempts = &AtomicU32::new(0);

        backoff::future::retry(policy, move || async move {
            let attempt = attempts.fetch_add(1, Ordering::Relaxed);
            match self.send_once(entry, request).await {
                Err(backoff::Error::Transient { err, .. }) if attempt < self.config.max_retries => {
                    debug!(provider = %entry.provider, attempt, error = %err, "retrying judge call");
                    Err(backoff::Error::transient(err))
                }
                Err(backoff::Error::Transient { err, .. }) => Err(backoff::Error::permanent(err)),
                other => other,
            }
        })
        .await
    }

    /// Walks the pool once; the last failure is returned if every entry fails.
    async fn complete_text(&self, request: &JudgeRequest) -> Result<String, ProviderError> {
        let mut last_error = None;
        for index in self.rotation() {
            let entry = &self.pool[index];
            match self.send_with_retry(entry, request).await {
                Ok(text) => return Ok(text),
                Err(err) => {
                    warn!(provider = %entry.provider, model = %entry.model, error = %err, "judge entry failed, falling back");
                    last_error = Some(err);
                }
            }
        }
        Err(last_error.unwrap_or_else(|| ProviderError::not_configured(PROVIDER, "no API keys configured")))
    }
}

const fn is_retryable(status: StatusCode) -> bool {
    matches!(status.as_u16(), 429 | 500 | 502 | 503 | 504 | 529)
}

#[async_trait]
impl LanguageJudge for RotatingJudge {
    fn name(&self) -> &str {
        PROVIDER
    }

    #[instrument(skip(self, request), fields(purpose = %request.purpose))]
    async fn complete_json(&self, request: JudgeRequest) -> Result<Value, ProviderError> {
        if self.pool.is_empty() {
            return Err(ProviderError::not_configured(
                PROVIDER,
                "no API keys configured (set OPENAI_API_LIST or GEMINI_API_LIST)",
            ));
        }

        let attempts = self.config.json_attempts.max(1);
        for attempt in 1..=attempts {
            let text = self.complete_text(&request).await?;
            if let Some(value) = extract_json(&text) {
                return Ok(value);
            }
            warn!(attempt, attempts, "judge reply was not valid JSON");
        }
        Err(ProviderError::malformed(
            PROVIDER,
            format!("no parseable JSON after {attempts} attempts"),
        ))
    }
}
