//! Web search port

use async_trait::async_trait;

use crate::domain::errors::ProviderError;
use crate::domain::models::SearchHit;

#[async_trait]
pub trait WebSearch: Send + Sync {
    fn name(&self) -> &str;

    /// Runs one query; an empty result is not an error
    async fn search(&self, query: &str) -> Result<Vec<SearchHit>, ProviderError>;
}
