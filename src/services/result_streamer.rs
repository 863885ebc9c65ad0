//! Publishing path shared by the fan-in loop and the re-evaluation engine.

use std::sync::Arc;
use tracing::{debug, warn};

use crate::domain::errors::DomainResult;
use crate::domain::models::{Evidence, SessionId};
use crate::domain::ports::SessionStore;

/// Pushes records for one session in call order.
///
/// Each push appends to the ledger (lifecycle markers excepted) and enqueues
/// to the live stream in one store operation.
#[derive(Clone)]
pub struct ResultStreamer {
    store: Arc<dyn SessionStore>,
    session_id: SessionId,
}

impl ResultStreamer {
    pub fn new(store: Arc<dyn SessionStore>, session_id: SessionId) -> Self {
        Self { store, session_id }
    }

    pub const fn session_id(&self) -> SessionId {
        self.session_id
    }

    pub async fn push(&self, evidence: Evidence) -> DomainResult<Evidence> {
        let stored = self.store.publish(self.session_id, evidence).await?;
        debug!(
            session_id = %self.session_id,
            evidence_id = stored.id,
            event_type = %stored.event_type,
            source = %stored.source,
            "record published"
        );
        Ok(stored)
    }

    /// Pushes every item, returning how many made it. A store failure is
    /// logged and does not stop the remaining items.
    pub async fn push_all(&self, items: Vec<Evidence>) -> usize {
        let mut published = 0;
        for item in items {
            match self.push(item).await {
                Ok(_) => published += 1,
                Err(err) => warn!(session_id = %self.session_id, error = %err, "publish failed"),
            }
        }
        published
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::memory::InMemorySessionStore;
    use crate::domain::models::EventType;

    #[tokio::test]
    async fn test_queue_order_matches_push_order() {
        let store = Arc::new(InMemorySessionStore::new());
        let session = store.create(None, None).await.unwrap();
        let mut rx = store.subscribe(session.id).await.unwrap();
        let streamer = ResultStreamer::new(store.clone(), session.id);

        streamer.push(Evidence::lifecycle(EventType::EvaluationStart)).await.unwrap();
        let published = streamer
            .push_all(vec![
                Evidence::new(2, "first", "", "test"),
                Evidence::new(-5, "second", "", "test"),
            ])
            .await;
        streamer.push(Evidence::lifecycle(EventType::EvaluationComplete)).await.unwrap();

        assert_eq!(published, 2);
        let mut seen = Vec::new();
        while let Ok(record) = rx.try_recv() {
            seen.push((record.event_type, record.id));
        }
        assert_eq!(
            seen,
            vec![
                (EventType::EvaluationStart, 0),
                (EventType::Evidence, 1),
                (EventType::Evidence, 2),
                (EventType::EvaluationComplete, 0),
            ]
        );
    }

    #[tokio::test]
    async fn test_unknown_session_fails_push() {
        let store = Arc::new(InMemorySessionStore::new());
        let streamer = ResultStreamer::new(store, uuid::Uuid::new_v4());
        assert!(streamer.push(Evidence::new(0, "x", "", "test")).await.is_err());
        assert_eq!(streamer.push_all(vec![Evidence::new(0, "y", "", "test")]).await, 0);
    }
}
