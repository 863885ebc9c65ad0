//! Language judge port
//!
//! A judge answers one constrained prompt or conversation with a JSON value.
//! Interpreting that value (verdicts, query plans, hit indices) is the
//! caller's job.

use async_trait::async_trait;

use crate::domain::errors::ProviderError;
use crate::domain::models::JudgeRequest;

#[async_trait]
pub trait LanguageJudge: Send + Sync {
    /// Provider name for logs
    fn name(&self) -> &str;

    /// Sends the request and returns the parsed JSON reply
    ///
    /// # Errors
    /// - `NotConfigured` when no credentials are available
    /// - `Transient` when every provider attempt failed
    /// - `Malformed` when no attempt produced parseable JSON
    async fn complete_json(&self, request: JudgeRequest) -> Result<serde_json::Value, ProviderError>;
}
