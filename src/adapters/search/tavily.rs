//! Tavily web search adapter.

use async_trait::async_trait;
use reqwest::Client as ReqwestClient;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, instrument};

use crate::domain::errors::ProviderError;
use crate::domain::models::{SearchConfig, SearchHit};
use crate::domain::ports::WebSearch;

const PROVIDER: &str = "web search";

#[derive(Serialize)]
struct SearchRequest<'a> {
    api_key: &'a str,
    query: &'a str,
    max_results: u32,
}

#[derive(Deserialize)]
struct SearchResponse {
    #[serde(default)]
    results: Vec<SearchHit>,
}

pub struct TavilySearch {
    http_client: ReqwestClient,
    api_key: Option<String>,
    base_url: String,
    max_results: u32,
}

impl TavilySearch {
    pub fn new(config: &SearchConfig) -> Result<Self, ProviderError> {
        let http_client = ReqwestClient::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| ProviderError::transient(PROVIDER, format!("HTTP client: {e}")))?;

        Ok(Self {
            http_client,
            api_key: config
                .api_key
                .as_deref()
                .map(str::trim)
                .filter(|k| !k.is_empty())
                .map(ToString::to_string),
            base_url: config.base_url.trim_end_matches('/').to_string(),
            max_results: config.max_results,
        })
    }
}

#[async_trait]
impl WebSearch for TavilySearch {
    fn name(&self) -> &str {
        "tavily"
    }

    #[instrument(skip(self))]
    async fn search(&self, query: &str) -> Result<Vec<SearchHit>, ProviderError> {
        let Some(api_key) = &self.api_key else {
            return Err(ProviderError::not_configured(PROVIDER, "missing TAVILY_API_KEY"));
        };

        let response = self
            .http_client
            .post(format!("{}/search", self.base_url))
            .json(&SearchRequest {
                api_key,
                query,
                max_results: self.max_results,
            })
            .send()
            .await
            .map_err(|e| ProviderError::transient(PROVIDER, e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ProviderError::transient(PROVIDER, format!("HTTP {status}: {body}")));
        }

        let parsed: SearchResponse = response
            .json()
            .await
            .map_err(|e| ProviderError::malformed(PROVIDER, e.to_string()))?;
        debug!(hits = parsed.results.len(), "search results received");
        Ok(parsed.results)
    }
}
