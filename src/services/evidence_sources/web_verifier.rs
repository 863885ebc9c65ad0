//! Web background-check job.

use async_trait::async_trait;
use std::sync::Arc;
use tracing::{debug, instrument};

use super::{analyze_snippet, verify_hits, EvidenceSource, JobDescriptor, JobKind};
use crate::domain::errors::DomainResult;
use crate::domain::models::{
    ApplicantProfile, Evidence, SearchHit, SessionId, Snippet, WEB_SEARCH_SOURCE,
};
use crate::domain::ports::{LanguageJudge, SessionStore, WebSearch};
use crate::services::query_generator::QueryGenerator;

/// Collaborators shared by every slot of one run.
#[derive(Clone)]
pub struct WebVerifierDeps {
    pub generator: Arc<QueryGenerator>,
    pub search: Arc<dyn WebSearch>,
    pub judge: Arc<dyn LanguageJudge>,
    pub store: Arc<dyn SessionStore>,
}

/// Claims one entry of the shared query plan and verifies it on the web.
///
/// Steps: search, store the aggregated hits as a snippet, keep the hits the
/// judge accepts for the objective's kind, then analyze the accepted text.
/// Once some hits are accepted, the stored snippet holds only those.
/// A slot beyond the plan yields nothing.
pub struct WebVerifier {
    descriptor: JobDescriptor,
    slot: usize,
    deps: WebVerifierDeps,
    session_id: SessionId,
    profile: Option<ApplicantProfile>,
    temperature: f32,
}

impl WebVerifier {
    pub fn new(
        slot: usize,
        deps: WebVerifierDeps,
        session_id: SessionId,
        profile: Option<ApplicantProfile>,
        temperature: f32,
    ) -> Self {
        Self {
            descriptor: JobDescriptor::new(
                JobKind::WebVerifier,
                format!("WebVerifier[{slot}]"),
                WEB_SEARCH_SOURCE,
            ),
            slot,
            deps,
            session_id,
            profile,
            temperature,
        }
    }
}

#[async_trait]
impl EvidenceSource for WebVerifier {
    fn descriptor(&self) -> &JobDescriptor {
        &self.descriptor
    }

    #[instrument(skip(self), fields(slot = self.slot, session_id = %self.session_id))]
    async fn produce(&self) -> DomainResult<Vec<Evidence>> {
        let Some(objective) = self.deps.generator.objective(self.slot).await else {
            debug!("no query for slot");
            return Ok(Vec::new());
        };

        let source = format!("{WEB_SEARCH_SOURCE}: {}", objective.query);
        let hits = self.deps.search.search(&objective.query).await?;
        debug!(query = %objective.query, hits = hits.len(), "search finished");

        if hits.is_empty() {
            return Ok(vec![Evidence::new(
                0,
                format!("No web results found for: {}", objective.query),
                "",
                source,
            )]);
        }

        let key = self
            .deps
            .store
            .save_snippet(
                self.session_id,
                Snippet::new(
                    format!("web_search_{}", self.slot),
                    SearchHit::aggregate(&hits),
                    source.clone(),
                ),
            )
            .await?;

        let accepted = verify_hits(
            self.deps.judge.as_ref(),
            self.profile.as_ref(),
            &objective,
            &hits,
            self.temperature,
        )
        .await?;

        if accepted.is_empty() {
            return Ok(vec![Evidence::new(
                0,
                format!("No matching web results for: {}", objective.objective),
                "",
                source,
            )
            .with_snippet_key(key)]);
        }

        let accepted_text = SearchHit::aggregate(accepted.iter().map(|&i| &hits[i]));
        if accepted.len() < hits.len() {
            // Re-evaluation reads this snippet back; rejected hits may be about someone else.
            self.deps
                .store
                .replace_snippet_text(self.session_id, &key, accepted_text.clone())
                .await?;
            debug!(
                accepted = accepted.len(),
                rejected = hits.len() - accepted.len(),
                "snippet narrowed to accepted hits"
            );
        }
        let scoped = Snippet::new(key, accepted_text, source);
        let items = analyze_snippet(
            self.deps.judge.as_ref(),
            &scoped,
            Some(&objective.objective),
            &[],
            self.temperature,
        )
        .await?;
        Ok(items)
    }
}
