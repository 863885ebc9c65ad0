//! In-memory session store.
//!
//! Sessions live in a map of individually locked slots. Every mutation of a
//! session happens under that slot's mutex, which makes ledger appends (read
//! last id, increment, push) and the matching queue push one critical section.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{mpsc, Mutex, RwLock};
use tracing::{debug, instrument};
use uuid::Uuid;

use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::models::{
    ApplicantProfile, Evidence, LoanApplication, Session, SessionId, Snippet,
};
use crate::domain::ports::{EventReceiver, SessionStore};

struct SessionSlot {
    session: Session,
    events_tx: mpsc::UnboundedSender<Evidence>,
    /// Held until the first subscriber takes it, so early records are buffered
    events_rx: Option<EventReceiver>,
}

impl SessionSlot {
    fn new(session: Session) -> Self {
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        Self {
            session,
            events_tx,
            events_rx: Some(events_rx),
        }
    }
}

/// Session store backed by process memory.
#[derive(Default)]
pub struct InMemorySessionStore {
    sessions: RwLock<HashMap<SessionId, Arc<Mutex<SessionSlot>>>>,
}

impl InMemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    async fn slot(&self, session_id: SessionId) -> DomainResult<Arc<Mutex<SessionSlot>>> {
        self.sessions
            .read()
            .await
            .get(&session_id)
            .cloned()
            .ok_or(DomainError::SessionNotFound(session_id))
    }

    /// Number of sessions held
    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

#[async_trait]
impl SessionStore for InMemorySessionStore {
    #[instrument(skip_all)]
    async fn create(
        &self,
        profile: Option<ApplicantProfile>,
        application: Option<LoanApplication>,
    ) -> DomainResult<Session> {
        let session = Session::new(Uuid::new_v4(), profile, application);
        let snapshot = session.clone();
        self.sessions
            .write()
            .await
            .insert(session.id, Arc::new(Mutex::new(SessionSlot::new(session))));
        debug!(session_id = %snapshot.id, "session created");
        Ok(snapshot)
    }

    async fn get(&self, session_id: SessionId) -> DomainResult<Session> {
        let slot = self.slot(session_id).await?;
        let guard = slot.lock().await;
        Ok(guard.session.clone())
    }

    async fn update_profile(
        &self,
        session_id: SessionId,
        profile: Option<ApplicantProfile>,
        application: Option<LoanApplication>,
    ) -> DomainResult<Session> {
        let slot = self.slot(session_id).await?;
        let mut guard = slot.lock().await;
        guard.session.profile = profile;
        guard.session.application = application;
        guard.session.touch();
        Ok(guard.session.clone())
    }

    #[instrument(skip(self, snippet), fields(requested_key = %snippet.key))]
    async fn save_snippet(&self, session_id: SessionId, snippet: Snippet) -> DomainResult<String> {
        let slot = self.slot(session_id).await?;
        let mut guard = slot.lock().await;
        let key = guard.session.insert_snippet(snippet);
        debug!(%key, "snippet stored");
        Ok(key)
    }

    async fn snippet(&self, session_id: SessionId, key: &str) -> DomainResult<Option<Snippet>> {
        let slot = self.slot(session_id).await?;
        let guard = slot.lock().await;
        Ok(guard.session.snippets.get(key).cloned())
    }

    async fn replace_snippet_text(
        &self,
        session_id: SessionId,
        key: &str,
        text: String,
    ) -> DomainResult<bool> {
        let slot = self.slot(session_id).await?;
        let mut guard = slot.lock().await;
        let Some(snippet) = guard.session.snippets.get_mut(key) else {
            return Ok(false);
        };
        snippet.text = text;
        guard.session.touch();
        debug!(%key, "snippet text replaced");
        Ok(true)
    }

    async fn publish(&self, session_id: SessionId, evidence: Evidence) -> DomainResult<Evidence> {
        let slot = self.slot(session_id).await?;
        let mut guard = slot.lock().await;

        let stored = if evidence.is_lifecycle() {
            evidence
        } else {
            guard.session.append_evidence(evidence)
        };

        if guard.events_tx.send(stored.clone()).is_err() {
            debug!(
                %session_id,
                evidence_id = stored.id,
                "stream consumer gone, record kept in ledger only"
            );
        }

        Ok(stored)
    }

    async fn begin_evaluation(&self, session_id: SessionId) -> DomainResult<()> {
        let slot = self.slot(session_id).await?;
        let mut guard = slot.lock().await;
        if guard.session.is_evaluating {
            return Err(DomainError::AlreadyEvaluating(session_id));
        }
        guard.session.is_evaluating = true;
        guard.session.touch();
        Ok(())
    }

    async fn set_pending(&self, session_id: SessionId, pending: usize) -> DomainResult<()> {
        let slot = self.slot(session_id).await?;
        let mut guard = slot.lock().await;
        guard.session.pending_jobs = pending;
        Ok(())
    }

    async fn finish_evaluation(&self, session_id: SessionId) -> DomainResult<()> {
        let slot = self.slot(session_id).await?;
        let mut guard = slot.lock().await;
        guard.session.is_evaluating = false;
        guard.session.pending_jobs = 0;
        guard.session.touch();
        Ok(())
    }

    async fn mark_invalid(
        &self,
        session_id: SessionId,
        evidence_id: u64,
        reason: &str,
    ) -> DomainResult<Evidence> {
        let slot = self.slot(session_id).await?;
        let mut guard = slot.lock().await;
        let evidence = guard
            .session
            .evidence_by_id_mut(evidence_id)
            .ok_or(DomainError::EvidenceNotFound {
                session_id,
                evidence_id,
            })?;
        evidence.valid = false;
        evidence.invalidate_reason = reason.to_string();
        let updated = evidence.clone();
        guard.session.touch();
        Ok(updated)
    }

    async fn subscribe(&self, session_id: SessionId) -> DomainResult<EventReceiver> {
        let slot = self.slot(session_id).await?;
        let mut guard = slot.lock().await;
        if let Some(receiver) = guard.events_rx.take() {
            return Ok(receiver);
        }
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        guard.events_tx = events_tx;
        debug!(%session_id, "event queue replaced for new subscriber");
        Ok(events_rx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::models::EventType;

    #[tokio::test]
    async fn test_unknown_session_is_not_found() {
        let store = InMemorySessionStore::new();
        let err = store.get(Uuid::new_v4()).await.unwrap_err();
        assert!(matches!(err, DomainError::SessionNotFound(_)));
    }

    #[tokio::test]
    async fn test_concurrent_publish_assigns_contiguous_ids() {
        let store = Arc::new(InMemorySessionStore::new());
        let session = store.create(None, None).await.unwrap();

        let handles: Vec<_> = (0..64)
            .map(|i| {
                let store = store.clone();
                tokio::spawn(async move {
                    store
                        .publish(session.id, Evidence::new(0, format!("item {i}"), "", "test"))
                        .await
                        .unwrap()
                })
            })
            .collect();
        for handle in handles {
            handle.await.unwrap();
        }

        let snapshot = store.get(session.id).await.unwrap();
        let ids: Vec<u64> = snapshot.evidence.iter().map(|e| e.id).collect();
        assert_eq!(ids, (1..=64).collect::<Vec<_>>());
    }

    #[tokio::test]
    async fn test_lifecycle_markers_skip_ledger() {
        let store = InMemorySessionStore::new();
        let session = store.create(None, None).await.unwrap();
        let mut rx = store.subscribe(session.id).await.unwrap();

        store
            .publish(session.id, Evidence::lifecycle(EventType::EvaluationStart))
            .await
            .unwrap();
        let stored = store
            .publish(session.id, Evidence::new(2, "stable", "", "test"))
            .await
            .unwrap();

        assert_eq!(stored.id, 1);
        assert_eq!(store.get(session.id).await.unwrap().evidence.len(), 1);
        assert_eq!(rx.recv().await.unwrap().event_type, EventType::EvaluationStart);
        assert_eq!(rx.recv().await.unwrap().id, 1);
    }

    #[tokio::test]
    async fn test_records_buffer_until_first_subscribe() {
        let store = InMemorySessionStore::new();
        let session = store.create(None, None).await.unwrap();
        store
            .publish(session.id, Evidence::new(0, "early", "", "test"))
            .await
            .unwrap();

        let mut rx = store.subscribe(session.id).await.unwrap();
        assert_eq!(rx.recv().await.unwrap().description, "early");
    }

    #[tokio::test]
    async fn test_publish_after_disconnect_still_appends() {
        let store = InMemorySessionStore::new();
        let session = store.create(None, None).await.unwrap();
        drop(store.subscribe(session.id).await.unwrap());

        let stored = store
            .publish(session.id, Evidence::new(0, "late", "", "test"))
            .await
            .unwrap();
        assert_eq!(stored.id, 1);
        assert_eq!(store.get(session.id).await.unwrap().evidence.len(), 1);
    }

    #[tokio::test]
    async fn test_resubscribe_receives_new_records() {
        let store = InMemorySessionStore::new();
        let session = store.create(None, None).await.unwrap();
        drop(store.subscribe(session.id).await.unwrap());

        let mut rx = store.subscribe(session.id).await.unwrap();
        store
            .publish(session.id, Evidence::new(0, "after reconnect", "", "test"))
            .await
            .unwrap();
        assert_eq!(rx.recv().await.unwrap().description, "after reconnect");
    }

    #[tokio::test]
    async fn test_replace_snippet_text_keeps_key_and_source() {
        let store = InMemorySessionStore::new();
        let session = store.create(None, None).await.unwrap();
        let key = store
            .save_snippet(session.id, Snippet::new("web_search_0", "all hits", "web_search: q"))
            .await
            .unwrap();

        assert!(store
            .replace_snippet_text(session.id, &key, "accepted hit".to_string())
            .await
            .unwrap());
        let stored = store.snippet(session.id, &key).await.unwrap().unwrap();
        assert_eq!(stored.text, "accepted hit");
        assert_eq!(stored.source, "web_search: q");
        assert!(!store
            .replace_snippet_text(session.id, "missing", String::new())
            .await
            .unwrap());
    }

    #[tokio::test]
    async fn test_begin_evaluation_rejects_reentry() {
        let store = InMemorySessionStore::new();
        let session = store.create(None, None).await.unwrap();

        store.begin_evaluation(session.id).await.unwrap();
        let err = store.begin_evaluation(session.id).await.unwrap_err();
        assert!(matches!(err, DomainError::AlreadyEvaluating(_)));

        store.finish_evaluation(session.id).await.unwrap();
        store.begin_evaluation(session.id).await.unwrap();
    }

    #[tokio::test]
    async fn test_mark_invalid_only_touches_validity() {
        let store = InMemorySessionStore::new();
        let session = store.create(None, None).await.unwrap();
        store
            .publish(session.id, Evidence::new(-10, "gambling", "I gamble", "test"))
            .await
            .unwrap();

        let updated = store.mark_invalid(session.id, 1, "irrelevant").await.unwrap();
        assert!(!updated.valid);
        assert_eq!(updated.invalidate_reason, "irrelevant");
        assert_eq!(updated.score, -10);
        assert_eq!(updated.citation, "I gamble");

        let err = store.mark_invalid(session.id, 999, "x").await.unwrap_err();
        assert!(err.is_not_found());
    }
}
