//! Evaluation run orchestration: job fan-out, fan-in in completion order,
//! lifecycle markers.

use std::sync::Arc;
use tokio::task::{JoinHandle, JoinSet};
use tracing::{error, info, instrument, warn};

use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::models::{EvaluationConfig, EventType, Evidence, Session, SessionId};
use crate::domain::ports::{LanguageJudge, SessionStore, StatisticalScorer, WebSearch};
use crate::services::evidence_sources::{run_guarded, settle};
use crate::services::{
    EvidenceSource, ModelScorer, QueryGenerator, ResultStreamer, TextAnalyzer, UpstreamEvidence,
    WebVerifier, WebVerifierDeps,
};

/// Totals of one finished run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RunSummary {
    /// Jobs spawned
    pub jobs: usize,
    /// Ledger records published, lifecycle markers excluded
    pub published: usize,
    /// Jobs that errored or panicked; an unconfigured provider degrades to a
    /// neutral item and is not counted
    pub failed_jobs: usize,
}

/// Handle to a run whose fan-in loop is executing in the background.
#[derive(Debug)]
pub struct EvaluationRun {
    pub session_id: SessionId,
    pub job_count: usize,
    handle: JoinHandle<RunSummary>,
}

impl EvaluationRun {
    /// Waits for the completion marker to be published.
    pub async fn wait(self) -> DomainResult<RunSummary> {
        self.handle
            .await
            .map_err(|e| DomainError::JobFailed(format!("fan-in task: {e}")))
    }
}

/// Builds the job set for a session and drives it to completion.
pub struct EvaluationOrchestrator {
    store: Arc<dyn SessionStore>,
    judge: Arc<dyn LanguageJudge>,
    search: Arc<dyn WebSearch>,
    scorer: Arc<dyn StatisticalScorer>,
    config: EvaluationConfig,
}

impl EvaluationOrchestrator {
    pub fn new(
        store: Arc<dyn SessionStore>,
        judge: Arc<dyn LanguageJudge>,
        search: Arc<dyn WebSearch>,
        scorer: Arc<dyn StatisticalScorer>,
        config: EvaluationConfig,
    ) -> Self {
        Self {
            store,
            judge,
            search,
            scorer,
            config,
        }
    }

    /// Starts a run and returns once the start marker is queued.
    ///
    /// # Errors
    /// - `SessionNotFound` for unknown sessions
    /// - `AlreadyEvaluating` while another run is active; nothing is queued
    #[instrument(skip(self))]
    pub async fn start_evaluation(&self, session_id: SessionId) -> DomainResult<EvaluationRun> {
        self.store.begin_evaluation(session_id).await?;

        match self.launch(session_id).await {
            Ok(run) => Ok(run),
            Err(err) => {
                error!(error = %err, "run could not start");
                if let Err(reset) = self.store.finish_evaluation(session_id).await {
                    warn!(error = %reset, "evaluating flag could not be cleared");
                }
                Err(err)
            }
        }
    }

    async fn launch(&self, session_id: SessionId) -> DomainResult<EvaluationRun> {
        let streamer = ResultStreamer::new(Arc::clone(&self.store), session_id);
        streamer
            .push(Evidence::lifecycle(EventType::EvaluationStart))
            .await?;

        let session = self.store.get(session_id).await?;
        let jobs = self.build_jobs(&session);
        let job_count = jobs.len();
        self.store.set_pending(session_id, job_count).await?;
        info!(
            job_count,
            snippets = session.snippets.len(),
            web_slots = self.config.web_verifier_slots,
            "evaluation started"
        );

        let store = Arc::clone(&self.store);
        let handle = tokio::spawn(fan_in(store, streamer, jobs));
        Ok(EvaluationRun {
            session_id,
            job_count,
            handle,
        })
    }

    /// One model scorer, one analyzer per snapshotted snippet, N web slots.
    fn build_jobs(&self, session: &Session) -> Vec<Arc<dyn EvidenceSource>> {
        let model = Arc::new(UpstreamEvidence::new(Arc::new(ModelScorer::new(
            Arc::clone(&self.scorer),
            session.application.clone(),
        ))));

        let mut jobs: Vec<Arc<dyn EvidenceSource>> = vec![model.clone()];
        for snippet in session.snippets.values() {
            jobs.push(Arc::new(
                TextAnalyzer::new(
                    Arc::clone(&self.judge),
                    snippet.clone(),
                    self.config.judge_temperature,
                )
                .with_upstream(model.outcome()),
            ));
        }

        let slots = self.config.web_verifier_slots;
        let generator = Arc::new(QueryGenerator::new(
            Arc::clone(&self.judge),
            session.profile.clone(),
            session
                .snippets
                .values()
                .filter(|s| !s.is_web_search())
                .cloned()
                .collect(),
            slots,
            self.config.planning_temperature,
        ));
        let deps = WebVerifierDeps {
            generator,
            search: Arc::clone(&self.search),
            judge: Arc::clone(&self.judge),
            store: Arc::clone(&self.store),
        };
        for slot in 0..slots {
            jobs.push(Arc::new(WebVerifier::new(
                slot,
                deps.clone(),
                session.id,
                session.profile.clone(),
                self.config.judge_temperature,
            )));
        }

        jobs
    }
}

/// Publishes every job's records as the job completes, then the completion
/// marker, then clears the run state.
async fn fan_in(
    store: Arc<dyn SessionStore>,
    streamer: ResultStreamer,
    jobs: Vec<Arc<dyn EvidenceSource>>,
) -> RunSummary {
    let session_id = streamer.session_id();
    let mut summary = RunSummary {
        jobs: jobs.len(),
        ..RunSummary::default()
    };

    let mut set = JoinSet::new();
    for job in jobs {
        set.spawn(async move {
            let result = run_guarded(job.as_ref()).await;
            (job.descriptor().clone(), result)
        });
    }

    while let Some(joined) = set.join_next().await {
        let items = match joined {
            Ok((descriptor, result)) => {
                match &result {
                    Err(DomainError::Provider(err)) if err.is_configuration() => {
                        info!(
                            job = %descriptor.label,
                            reason = %err,
                            "job degraded, provider not configured"
                        );
                    }
                    Err(err) => {
                        summary.failed_jobs += 1;
                        warn!(job = %descriptor.label, error = %err, "job failed");
                    }
                    Ok(_) => {}
                }
                settle(&descriptor, result)
            }
            Err(join_err) => {
                summary.failed_jobs += 1;
                warn!(error = %join_err, "job task aborted");
                vec![Evidence::system_error(format!("Error in job: {join_err}"))]
            }
        };
        summary.published += streamer.push_all(items).await;
    }

    if let Err(err) = streamer
        .push(Evidence::lifecycle(EventType::EvaluationComplete))
        .await
    {
        warn!(%session_id, error = %err, "completion marker not published");
    }
    if let Err(err) = store.finish_evaluation(session_id).await {
        warn!(%session_id, error = %err, "run state not cleared");
    }

    info!(
        %session_id,
        published = summary.published,
        failed_jobs = summary.failed_jobs,
        "evaluation complete"
    );
    summary
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::memory::InMemorySessionStore;
    use crate::adapters::mock::{MockJudge, MockScorer, MockSearch};
    use crate::domain::errors::ProviderError;
    use crate::domain::models::{JudgePurpose, Snippet, SYSTEM_ERROR_SOURCE};
    use serde_json::json;

    fn orchestrator(
        store: Arc<InMemorySessionStore>,
        judge: MockJudge,
        slots: usize,
    ) -> EvaluationOrchestrator {
        EvaluationOrchestrator::new(
            store,
            Arc::new(judge),
            Arc::new(MockSearch::new()),
            Arc::new(MockScorer::with_probability(0.1)),
            EvaluationConfig {
                web_verifier_slots: slots,
                ..EvaluationConfig::default()
            },
        )
    }

    #[tokio::test]
    async fn test_unknown_session_is_not_found() {
        let store = Arc::new(InMemorySessionStore::new());
        let err = orchestrator(store, MockJudge::new(), 0)
            .start_evaluation(uuid::Uuid::new_v4())
            .await
            .unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_reentrant_start_is_rejected() {
        let store = Arc::new(InMemorySessionStore::new());
        let session = store.create(None, None).await.unwrap();
        store.begin_evaluation(session.id).await.unwrap();
        let mut rx = store.subscribe(session.id).await.unwrap();

        let err = orchestrator(store.clone(), MockJudge::new(), 0)
            .start_evaluation(session.id)
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::AlreadyEvaluating(_)));
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_unconfigured_judge_is_not_a_failed_job() {
        let store = Arc::new(InMemorySessionStore::new());
        let session = store.create(None, None).await.unwrap();
        store
            .save_snippet(session.id, Snippet::new("a.txt", "I have a stable job", "user_upload"))
            .await
            .unwrap();
        let judge = MockJudge::new().fail(
            JudgePurpose::TextAnalysis,
            ProviderError::not_configured("language judge", "no API keys"),
        );

        let summary = orchestrator(store.clone(), judge, 0)
            .start_evaluation(session.id)
            .await
            .unwrap()
            .wait()
            .await
            .unwrap();

        assert_eq!(summary.jobs, 2);
        assert_eq!(summary.failed_jobs, 0);
        let snapshot = store.get(session.id).await.unwrap();
        assert!(snapshot.evidence.iter().any(|e| {
            e.source == "user_upload" && e.description.starts_with("TextAnalyzer(a.txt) unavailable")
        }));
        assert!(snapshot.evidence.iter().all(|e| e.source != SYSTEM_ERROR_SOURCE));
    }

    #[tokio::test]
    async fn test_panicking_job_isolated() {
        let store = Arc::new(InMemorySessionStore::new());
        let session = store.create(None, None).await.unwrap();
        store
            .save_snippet(session.id, Snippet::new("a.txt", "explodes here", "user_upload"))
            .await
            .unwrap();
        store
            .save_snippet(session.id, Snippet::new("b.txt", "I have a stable job", "user_upload"))
            .await
            .unwrap();
        let judge = MockJudge::new()
            .panic_when(JudgePurpose::TextAnalysis, "explodes here")
            .respond_when(
                JudgePurpose::TextAnalysis,
                "stable job",
                json!({"evidence": [{"score": 2, "citation": "stable job", "description": "Employment"}]}),
            );

        let summary = orchestrator(store.clone(), judge, 0)
            .start_evaluation(session.id)
            .await
            .unwrap()
            .wait()
            .await
            .unwrap();

        assert_eq!(summary.jobs, 3);
        assert_eq!(summary.failed_jobs, 1);
        let snapshot = store.get(session.id).await.unwrap();
        assert_eq!(snapshot.evidence.len(), 3);
        assert!(snapshot
            .evidence
            .iter()
            .any(|e| e.source == SYSTEM_ERROR_SOURCE && e.description.contains("TextAnalyzer(a.txt)")));
        assert!(!snapshot.is_evaluating);
    }
}
