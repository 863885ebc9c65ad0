/// Domain models for evaluation sessions.
///
/// A session holds the applicant data, the snippet map, the evidence ledger and
/// the run bookkeeping. The live event queue belongs to the store, not to this
/// snapshot type.
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use uuid::Uuid;

use super::applicant::{ApplicantProfile, LoanApplication};
use super::evidence::Evidence;

/// Session identifier
pub type SessionId = Uuid;

/// Source prefix marking snippets produced by web verification.
pub const WEB_SEARCH_SOURCE: &str = "web_search";

/// A unit of text held in a session under a unique key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Snippet {
    /// Usually a file name; made unique by the store on save
    pub key: String,
    pub text: String,
    /// Origin label (`user_upload`, `web_search: <query>`, ...)
    pub source: String,
}

impl Snippet {
    pub fn new(key: impl Into<String>, text: impl Into<String>, source: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            text: text.into(),
            source: source.into(),
        }
    }

    pub fn is_web_search(&self) -> bool {
        self.source.starts_with(WEB_SEARCH_SOURCE)
    }
}

/// Point-in-time view of a session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    pub id: SessionId,

    pub profile: Option<ApplicantProfile>,

    pub application: Option<LoanApplication>,

    /// Snippets keyed by their collision-resolved key
    pub snippets: BTreeMap<String, Snippet>,

    /// Append-only ledger, ids 1..=k in order
    pub evidence: Vec<Evidence>,

    pub is_evaluating: bool,

    pub pending_jobs: usize,

    pub created_at: DateTime<Utc>,

    pub last_update_time: DateTime<Utc>,
}

impl Session {
    /// Creates an empty session
    pub fn new(
        id: SessionId,
        profile: Option<ApplicantProfile>,
        application: Option<LoanApplication>,
    ) -> Self {
        let now = Utc::now();
        Self {
            id,
            profile,
            application,
            snippets: BTreeMap::new(),
            evidence: Vec::new(),
            is_evaluating: false,
            pending_jobs: 0,
            created_at: now,
            last_update_time: now,
        }
    }

    /// Returns the first free key among `key`, `key_1`, `key_2`, ...
    pub fn resolve_snippet_key(&self, key: &str) -> String {
        if !self.snippets.contains_key(key) {
            return key.to_string();
        }
        (1..)
            .map(|n| format!("{key}_{n}"))
            .find(|candidate| !self.snippets.contains_key(candidate))
            .unwrap_or_else(|| key.to_string())
    }

    /// Stores a snippet under a collision-resolved key and returns that key.
    pub fn insert_snippet(&mut self, mut snippet: Snippet) -> String {
        let key = self.resolve_snippet_key(&snippet.key);
        snippet.key.clone_from(&key);
        self.snippets.insert(key.clone(), snippet);
        self.touch();
        key
    }

    /// Appends to the ledger, assigning the next id. Caller holds the session lock.
    pub fn append_evidence(&mut self, mut evidence: Evidence) -> Evidence {
        evidence.id = self.next_evidence_id();
        self.evidence.push(evidence.clone());
        self.touch();
        evidence
    }

    pub fn next_evidence_id(&self) -> u64 {
        self.evidence.last().map_or(1, |last| last.id + 1)
    }

    pub fn evidence_by_id(&self, evidence_id: u64) -> Option<&Evidence> {
        self.evidence.iter().find(|e| e.id == evidence_id)
    }

    pub fn evidence_by_id_mut(&mut self, evidence_id: u64) -> Option<&mut Evidence> {
        self.evidence.iter_mut().find(|e| e.id == evidence_id)
    }

    pub fn touch(&mut self) {
        self.last_update_time = Utc::now();
    }
}
