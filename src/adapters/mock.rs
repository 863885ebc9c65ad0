//! Deterministic collaborator stand-ins for tests and offline runs.

use async_trait::async_trait;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::Semaphore;

use crate::domain::errors::ProviderError;
use crate::domain::models::{JudgePurpose, JudgeRequest, LoanApplication, Prediction, SearchHit};
use crate::domain::ports::{LanguageJudge, StatisticalScorer, WebSearch};

#[derive(Debug, Clone)]
enum MockReply {
    Json(Value),
    Fail(ProviderError),
    Panic,
}

#[derive(Debug, Clone)]
struct MockRule {
    purpose: JudgePurpose,
    contains: Option<String>,
    reply: MockReply,
}

/// Language judge answering from purpose-keyed rules.
///
/// Rules with a transcript substring are tried before purpose-only rules.
/// Without a matching rule the reply is `{"evidence": []}`.
#[derive(Default)]
pub struct MockJudge {
    rules: Vec<MockRule>,
    gate: Option<Arc<Semaphore>>,
    requests: Mutex<Vec<JudgeRequest>>,
}

impl MockJudge {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn respond(mut self, purpose: JudgePurpose, reply: Value) -> Self {
        self.rules.push(MockRule {
            purpose,
            contains: None,
            reply: MockReply::Json(reply),
        });
        self
    }

    /// Replies only when the request transcript contains `needle`.
    #[must_use]
    pub fn respond_when(mut self, purpose: JudgePurpose, needle: impl Into<String>, reply: Value) -> Self {
        self.rules.push(MockRule {
            purpose,
            contains: Some(needle.into()),
            reply: MockReply::Json(reply),
        });
        self
    }

    #[must_use]
    pub fn fail(mut self, purpose: JudgePurpose, error: ProviderError) -> Self {
        self.rules.push(MockRule {
            purpose,
            contains: None,
            reply: MockReply::Fail(error),
        });
        self
    }

    /// Panics when the transcript contains `needle`.
    #[must_use]
    pub fn panic_when(mut self, purpose: JudgePurpose, needle: impl Into<String>) -> Self {
        self.rules.push(MockRule {
            purpose,
            contains: Some(needle.into()),
            reply: MockReply::Panic,
        });
        self
    }

    /// Every call waits for a permit; permits are returned after the wait.
    #[must_use]
    pub fn with_gate(mut self, gate: Arc<Semaphore>) -> Self {
        self.gate = Some(gate);
        self
    }

    pub fn calls(&self) -> usize {
        self.requests.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn calls_for(&self, purpose: JudgePurpose) -> usize {
        self.requests
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .filter(|r| r.purpose == purpose)
            .count()
    }

    pub fn requests(&self) -> Vec<JudgeRequest> {
        self.requests.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    fn reply_for(&self, request: &JudgeRequest) -> MockReply {
        let transcript = request.transcript();
        let specific = self.rules.iter().find(|rule| {
            rule.purpose == request.purpose
                && rule.contains.as_deref().is_some_and(|needle| transcript.contains(needle))
        });
        let general = || {
            self.rules
                .iter()
                .find(|rule| rule.purpose == request.purpose && rule.contains.is_none())
        };
        specific
            .or_else(general)
            .map_or_else(|| MockReply::Json(json!({"evidence": []})), |rule| rule.reply.clone())
    }
}

#[async_trait]
impl LanguageJudge for MockJudge {
    fn name(&self) -> &str {
        "mock-judge"
    }

    async fn complete_json(&self, request: JudgeRequest) -> Result<Value, ProviderError> {
        let reply = self.reply_for(&request);
        self.requests
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(request);

        if let Some(gate) = &self.gate {
            gate.acquire()
                .await
                .map_err(|_| ProviderError::transient("mock-judge", "gate closed"))?;
        }

        match reply {
            MockReply::Json(value) => Ok(value),
            MockReply::Fail(error) => Err(error),
            MockReply::Panic => panic!("mock judge panic"),
        }
    }
}

/// Web search answering from a fixed query map; unknown queries return nothing.
#[derive(Default)]
pub struct MockSearch {
    results: HashMap<String, Vec<SearchHit>>,
    failure: Option<ProviderError>,
    calls: AtomicUsize,
}

impl MockSearch {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_hits(mut self, query: impl Into<String>, hits: Vec<SearchHit>) -> Self {
        self.results.insert(query.into(), hits);
        self
    }

    pub fn failing(error: ProviderError) -> Self {
        Self {
            failure: Some(error),
            ..Self::default()
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl WebSearch for MockSearch {
    fn name(&self) -> &str {
        "mock-search"
    }

    async fn search(&self, query: &str) -> Result<Vec<SearchHit>, ProviderError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(error) = &self.failure {
            return Err(error.clone());
        }
        Ok(self.results.get(query).cloned().unwrap_or_default())
    }
}

/// Statistical scorer with a fixed answer.
pub struct MockScorer {
    outcome: Result<Prediction, ProviderError>,
    calls: AtomicUsize,
}

impl MockScorer {
    pub fn with_probability(probability: f64) -> Self {
        let label = if probability >= 0.5 { "default" } else { "non_default" };
        Self {
            outcome: Ok(Prediction {
                label: label.to_string(),
                probability,
            }),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn failing(error: ProviderError) -> Self {
        Self {
            outcome: Err(error),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl StatisticalScorer for MockScorer {
    fn name(&self) -> &str {
        "mock-scorer"
    }

    fn predict(&self, _application: &LoanApplication) -> Result<Prediction, ProviderError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.outcome.clone()
    }
}
