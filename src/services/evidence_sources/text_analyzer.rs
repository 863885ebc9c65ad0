//! Behavioral text analysis job.

use async_trait::async_trait;
use futures::future::join_all;
use std::sync::Arc;
use tracing::{debug, instrument};

use super::{EvidenceSource, JobDescriptor, JobKind, SharedEvidence};
use crate::domain::errors::{DomainResult, ProviderError};
use crate::domain::models::{Evidence, JudgePurpose, JudgeRequest, JudgeVerdict, Snippet};
use crate::domain::ports::LanguageJudge;
use crate::services::{citation, prompts};

/// Judges one snippet and returns its verified evidence.
///
/// Scores are snapped to the risk scale, every item carries the snippet's
/// source and key, and items whose citation is not verbatim are dropped.
pub async fn analyze_snippet(
    judge: &dyn LanguageJudge,
    snippet: &Snippet,
    objective: Option<&str>,
    context: &[Evidence],
    temperature: f32,
) -> Result<Vec<Evidence>, ProviderError> {
    let request = JudgeRequest::prompt(
        JudgePurpose::TextAnalysis,
        prompts::text_analysis(snippet, objective, context),
        temperature,
    );
    let reply = judge.complete_json(request).await?;
    let verdict = JudgeVerdict::from_value(reply)
        .map_err(|e| ProviderError::malformed(judge.name(), e.to_string()))?;

    let items = verdict
        .evidence
        .into_iter()
        .map(|candidate| {
            Evidence::new(
                candidate.level().score(),
                candidate.description,
                candidate.citation,
                snippet.source.clone(),
            )
            .with_snippet_key(snippet.key.clone())
        })
        .collect();

    Ok(citation::retain_verbatim(items, &snippet.text))
}

/// Analyzes one attached snippet, optionally after upstream jobs finish.
pub struct TextAnalyzer {
    descriptor: JobDescriptor,
    judge: Arc<dyn LanguageJudge>,
    snippet: Snippet,
    upstream: Vec<SharedEvidence>,
    temperature: f32,
}

impl TextAnalyzer {
    pub fn new(judge: Arc<dyn LanguageJudge>, snippet: Snippet, temperature: f32) -> Self {
        Self {
            descriptor: JobDescriptor::new(
                JobKind::TextAnalyzer,
                format!("TextAnalyzer({})", snippet.key),
                snippet.source.clone(),
            ),
            judge,
            snippet,
            upstream: Vec::new(),
            temperature,
        }
    }

    /// Adds an upstream job whose items are given to the judge as context.
    #[must_use]
    pub fn with_upstream(mut self, upstream: SharedEvidence) -> Self {
        self.upstream.push(upstream);
        self
    }

    async fn gather_context(&self) -> Vec<Evidence> {
        let outcomes = join_all(self.upstream.iter().cloned()).await;
        let mut context = Vec::new();
        for outcome in outcomes {
            match outcome {
                Ok(items) => context.extend(items),
                Err(err) => debug!(key = %self.snippet.key, %err, "upstream failed, analyzing without it"),
            }
        }
        context
    }
}

#[async_trait]
impl EvidenceSource for TextAnalyzer {
    fn descriptor(&self) -> &JobDescriptor {
        &self.descriptor
    }

    #[instrument(skip(self), fields(key = %self.snippet.key))]
    async fn produce(&self) -> DomainResult<Vec<Evidence>> {
        let context = self.gather_context().await;
        let items = analyze_snippet(
            self.judge.as_ref(),
            &self.snippet,
            None,
            &context,
            self.temperature,
        )
        .await?;
        debug!(count = items.len(), "text analysis finished");
        Ok(items)
    }
}
