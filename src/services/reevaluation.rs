//! Re-judgment of a single invalidated evidence item.
//!
//! ```text
//! Valid -> Invalidated -> ContextMissing -> Terminal
//!                      -> ContextFound -> Judging -> JudgedReplacement
//!                                                 -> JudgedEmpty
//!                                                 -> JudgeFailed -> Terminal
//! ```

use futures::FutureExt;
use std::collections::HashSet;
use std::panic::AssertUnwindSafe;
use std::sync::{Arc, Mutex, PoisonError};
use tokio::task::JoinHandle;
use tracing::{debug, info, instrument, warn};

use crate::domain::errors::{DomainResult, ProviderError};
use crate::domain::models::{Evidence, JudgePurpose, JudgeRequest, JudgeVerdict, SessionId};
use crate::domain::ports::{LanguageJudge, SessionStore};
use crate::services::result_streamer::ResultStreamer;
use crate::services::{citation, prompts};

const REASON_PREFIX: &str = "Reason: ";

/// Terminal state of one re-evaluation task.
#[derive(Debug, Clone, PartialEq)]
pub enum ReevaluationOutcome {
    /// One corrected item was published
    Replaced(Evidence),
    /// The judge confirmed removal, or its replacement failed the citation check
    Removed,
    /// Judge call failed; carries the published error record
    Failed(Evidence),
    /// Neither snippet nor description was usable; carries the published error record
    CannotReevaluate(Evidence),
}

/// Result of an invalidation call.
#[derive(Debug)]
pub struct Invalidation {
    /// The ledger entry after the flag update
    pub evidence: Evidence,
    /// `None` when a re-evaluation of the same item is already running
    pub reevaluation: Option<JoinHandle<ReevaluationOutcome>>,
}

type InFlight = Arc<Mutex<HashSet<(SessionId, u64)>>>;

/// Releases the in-flight claim when the task ends, panics included.
struct InFlightToken {
    in_flight: InFlight,
    key: (SessionId, u64),
}

impl InFlightToken {
    fn claim(in_flight: &InFlight, key: (SessionId, u64)) -> Option<Self> {
        let inserted = in_flight
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(key);
        inserted.then(|| Self {
            in_flight: Arc::clone(in_flight),
            key,
        })
    }
}

impl Drop for InFlightToken {
    fn drop(&mut self) {
        self.in_flight
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&self.key);
    }
}

/// Handles invalidation and schedules background re-judgment.
pub struct ReevaluationEngine {
    store: Arc<dyn SessionStore>,
    judge: Arc<dyn LanguageJudge>,
    temperature: f32,
    in_flight: InFlight,
}

impl ReevaluationEngine {
    pub fn new(store: Arc<dyn SessionStore>, judge: Arc<dyn LanguageJudge>, temperature: f32) -> Self {
        Self {
            store,
            judge,
            temperature,
            in_flight: Arc::default(),
        }
    }

    /// Marks the item invalid and spawns its re-evaluation.
    ///
    /// # Errors
    /// `SessionNotFound` / `EvidenceNotFound`, with nothing mutated or queued.
    #[instrument(skip(self, reason))]
    pub async fn invalidate(
        &self,
        session_id: SessionId,
        evidence_id: u64,
        reason: &str,
    ) -> DomainResult<Invalidation> {
        let evidence = self.store.mark_invalid(session_id, evidence_id, reason).await?;
        info!("evidence invalidated");

        let Some(token) = InFlightToken::claim(&self.in_flight, (session_id, evidence_id)) else {
            debug!("re-evaluation already running for this item");
            return Ok(Invalidation {
                evidence,
                reevaluation: None,
            });
        };

        let task = Reevaluation {
            streamer: ResultStreamer::new(Arc::clone(&self.store), session_id),
            store: Arc::clone(&self.store),
            judge: Arc::clone(&self.judge),
            temperature: self.temperature,
            original: evidence.clone(),
            reason: reason.to_string(),
        };
        let handle = tokio::spawn(async move {
            let _token = token;
            task.run().await
        });

        Ok(Invalidation {
            evidence,
            reevaluation: Some(handle),
        })
    }

    /// Whether a re-evaluation of this item is running.
    pub fn is_in_flight(&self, session_id: SessionId, evidence_id: u64) -> bool {
        self.in_flight
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .contains(&(session_id, evidence_id))
    }
}

struct Reevaluation {
    streamer: ResultStreamer,
    store: Arc<dyn SessionStore>,
    judge: Arc<dyn LanguageJudge>,
    temperature: f32,
    original: Evidence,
    reason: String,
}

impl Reevaluation {
    #[instrument(skip(self), fields(session_id = %self.streamer.session_id(), evidence_id = self.original.id))]
    async fn run(self) -> ReevaluationOutcome {
        let Some(context) = self.recover_context().await else {
            info!(state = "context_missing");
            return ReevaluationOutcome::CannotReevaluate(
                self.publish_error(format!(
                    "Cannot re-evaluate Evidence #{}: no source text available",
                    self.original.id
                ))
                .await,
            );
        };
        debug!(state = "context_found");

        let judged = AssertUnwindSafe(self.judge_replacement(&context))
            .catch_unwind()
            .await
            .unwrap_or_else(|_| {
                Err(ProviderError::transient(self.judge.name(), "re-evaluation panicked"))
            });

        match judged {
            Ok(None) => {
                info!(state = "judged_empty");
                ReevaluationOutcome::Removed
            }
            Ok(Some(replacement)) => match self.streamer.push(replacement.clone()).await {
                Ok(stored) => {
                    info!(state = "judged_replacement", replacement_id = stored.id);
                    ReevaluationOutcome::Replaced(stored)
                }
                Err(err) => {
                    warn!(error = %err, "replacement could not be published");
                    ReevaluationOutcome::Failed(replacement)
                }
            },
            Err(err) => {
                warn!(state = "judge_failed", error = %err);
                ReevaluationOutcome::Failed(
                    self.publish_error(format!(
                        "Re-evaluation of Evidence #{} failed: {err}",
                        self.original.id
                    ))
                    .await,
                )
            }
        }
    }

    /// Snippet text by back-reference, else the item's own description.
    async fn recover_context(&self) -> Option<String> {
        if let Some(key) = &self.original.text_content_key {
            match self.store.snippet(self.streamer.session_id(), key).await {
                Ok(Some(snippet)) if !snippet.text.trim().is_empty() => return Some(snippet.text),
                Ok(_) => debug!(%key, "snippet missing, falling back to description"),
                Err(err) => warn!(%key, error = %err, "snippet lookup failed"),
            }
        }
        let description = self.original.description.trim();
        (!description.is_empty()).then(|| description.to_string())
    }

    async fn judge_replacement(&self, context: &str) -> Result<Option<Evidence>, ProviderError> {
        let reason = self
            .reason
            .strip_prefix(REASON_PREFIX)
            .unwrap_or(&self.reason);
        let request = JudgeRequest::new(
            JudgePurpose::Reevaluation,
            prompts::reevaluation(context, &self.original, reason),
            self.temperature,
        );

        let reply = self.judge.complete_json(request).await?;
        let verdict = JudgeVerdict::from_value(reply)
            .map_err(|e| ProviderError::malformed(self.judge.name(), e.to_string()))?;
        if let Some(reasoning) = &verdict.reasoning {
            debug!(%reasoning, "re-evaluation reasoning");
        }

        let Some(candidate) = verdict.evidence.into_iter().next() else {
            return Ok(None);
        };
        if !citation::is_verbatim(&candidate.citation, context) {
            debug!(citation = %candidate.citation, "replacement citation not in context, dropping");
            return Ok(None);
        }

        let mut replacement = Evidence::new(
            candidate.level().score(),
            candidate.description,
            candidate.citation,
            self.original.source.clone(),
        );
        replacement.text_content_key = self.original.text_content_key.clone();
        Ok(Some(replacement))
    }

    async fn publish_error(&self, description: String) -> Evidence {
        let mut record = Evidence::reevaluation_error(description);
        record.text_content_key = self.original.text_content_key.clone();
        match self.streamer.push(record.clone()).await {
            Ok(stored) => stored,
            Err(err) => {
                warn!(error = %err, "error record could not be published");
                record
            }
        }
    }
}
