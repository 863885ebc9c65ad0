//! Operations the transport layer calls.

use std::sync::Arc;
use tracing::instrument;

use super::evaluation_orchestrator::{EvaluationOrchestrator, EvaluationRun};
use crate::domain::errors::DomainResult;
use crate::domain::models::{
    ApplicantProfile, EvaluationConfig, LoanApplication, Session, SessionId, Snippet,
};
use crate::domain::ports::{
    EventReceiver, LanguageJudge, SessionStore, StatisticalScorer, WebSearch,
};
use crate::services::{Invalidation, ReevaluationEngine};

/// Facade over the store, the orchestrator and the re-evaluation engine.
pub struct EvaluationService {
    store: Arc<dyn SessionStore>,
    orchestrator: EvaluationOrchestrator,
    reevaluation: ReevaluationEngine,
}

impl EvaluationService {
    pub fn new(
        store: Arc<dyn SessionStore>,
        judge: Arc<dyn LanguageJudge>,
        search: Arc<dyn WebSearch>,
        scorer: Arc<dyn StatisticalScorer>,
        config: EvaluationConfig,
    ) -> Self {
        let reevaluation =
            ReevaluationEngine::new(Arc::clone(&store), Arc::clone(&judge), config.reevaluation_temperature);
        let orchestrator =
            EvaluationOrchestrator::new(Arc::clone(&store), judge, search, scorer, config);
        Self {
            store,
            orchestrator,
            reevaluation,
        }
    }

    pub async fn create_session(
        &self,
        profile: Option<ApplicantProfile>,
        application: Option<LoanApplication>,
    ) -> DomainResult<Session> {
        self.store.create(profile, application).await
    }

    pub async fn session(&self, session_id: SessionId) -> DomainResult<Session> {
        self.store.get(session_id).await
    }

    pub async fn update_profile(
        &self,
        session_id: SessionId,
        profile: Option<ApplicantProfile>,
        application: Option<LoanApplication>,
    ) -> DomainResult<Session> {
        self.store.update_profile(session_id, profile, application).await
    }

    /// Stores a snippet and returns its collision-resolved key.
    #[instrument(skip(self, snippet), fields(key = %snippet.key))]
    pub async fn attach_snippet(&self, session_id: SessionId, snippet: Snippet) -> DomainResult<String> {
        self.store.save_snippet(session_id, snippet).await
    }

    pub async fn start_evaluation(&self, session_id: SessionId) -> DomainResult<EvaluationRun> {
        self.orchestrator.start_evaluation(session_id).await
    }

    pub async fn invalidate(
        &self,
        session_id: SessionId,
        evidence_id: u64,
        reason: &str,
    ) -> DomainResult<Invalidation> {
        self.reevaluation.invalidate(session_id, evidence_id, reason).await
    }

    /// Long-lived stream of the session's records.
    ///
    /// The stream outlives evaluation runs; re-evaluation records arrive on
    /// it after the completion marker.
    pub async fn subscribe(&self, session_id: SessionId) -> DomainResult<EventReceiver> {
        self.store.subscribe(session_id).await
    }
}
