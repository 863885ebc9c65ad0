/// Session store port (trait) for dependency injection.
///
/// Defines the contract for session storage operations that infrastructure
/// adapters must implement. The orchestrator, result streamer and
/// re-evaluation engine depend on this trait, not concrete implementations.
use crate::domain::errors::DomainResult;
use crate::domain::models::{ApplicantProfile, Evidence, LoanApplication, Session, SessionId, Snippet};
use async_trait::async_trait;
use tokio::sync::mpsc;

/// Receiving half of a session's live event queue.
pub type EventReceiver = mpsc::UnboundedReceiver<Evidence>;

/// Store for evaluation sessions
///
/// Implementations should handle:
/// - Atomic ledger id assignment across concurrent writers
/// - Deterministic snippet key collision resolution
/// - A FIFO event queue per session with a single logical consumer
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Creates a new empty session
    async fn create(
        &self,
        profile: Option<ApplicantProfile>,
        application: Option<LoanApplication>,
    ) -> DomainResult<Session>;

    /// Retrieves a snapshot of the session
    ///
    /// # Errors
    /// Returns `SessionNotFound` for unknown ids
    async fn get(&self, session_id: SessionId) -> DomainResult<Session>;

    /// Replaces profile and application data
    async fn update_profile(
        &self,
        session_id: SessionId,
        profile: Option<ApplicantProfile>,
        application: Option<LoanApplication>,
    ) -> DomainResult<Session>;

    /// Stores a snippet, suffixing the key on collision
    ///
    /// # Returns
    /// The key the snippet was stored under
    async fn save_snippet(&self, session_id: SessionId, snippet: Snippet) -> DomainResult<String>;

    /// Looks up a snippet by key
    async fn snippet(&self, session_id: SessionId, key: &str) -> DomainResult<Option<Snippet>>;

    /// Overwrites the text of an existing snippet, keeping its key and source
    ///
    /// # Returns
    /// `false` when no snippet is stored under `key`
    async fn replace_snippet_text(
        &self,
        session_id: SessionId,
        key: &str,
        text: String,
    ) -> DomainResult<bool>;

    /// Appends (unless lifecycle marker) and enqueues in one critical section
    ///
    /// # Returns
    /// The record as stored, carrying its assigned id
    async fn publish(&self, session_id: SessionId, evidence: Evidence) -> DomainResult<Evidence>;

    /// Sets the evaluating flag
    ///
    /// # Errors
    /// Returns `AlreadyEvaluating` if the flag is already set
    async fn begin_evaluation(&self, session_id: SessionId) -> DomainResult<()>;

    /// Records the number of jobs in the current run
    async fn set_pending(&self, session_id: SessionId, pending: usize) -> DomainResult<()>;

    /// Clears the evaluating flag and pending count
    async fn finish_evaluation(&self, session_id: SessionId) -> DomainResult<()>;

    /// Marks a ledger entry invalid with a reason
    ///
    /// # Errors
    /// Returns `EvidenceNotFound` when the id is not in the ledger
    async fn mark_invalid(
        &self,
        session_id: SessionId,
        evidence_id: u64,
        reason: &str,
    ) -> DomainResult<Evidence>;

    /// Takes the session's event queue
    ///
    /// A later call replaces the queue; the newest subscriber owns the stream.
    async fn subscribe(&self, session_id: SessionId) -> DomainResult<EventReceiver>;
}
