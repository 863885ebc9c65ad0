//! Language judge request/response shapes.

use serde::{Deserialize, Serialize};

use super::scoring::RiskLevel;

/// Conversation role
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    System,
    User,
    Assistant,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: ChatRole,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::Assistant,
            content: content.into(),
        }
    }
}

/// What a judge call is for. Adapters only log it; stand-ins route on it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JudgePurpose {
    QueryPlanning,
    HitVerification,
    TextAnalysis,
    Reevaluation,
}

impl std::fmt::Display for JudgePurpose {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::QueryPlanning => write!(f, "query_planning"),
            Self::HitVerification => write!(f, "hit_verification"),
            Self::TextAnalysis => write!(f, "text_analysis"),
            Self::Reevaluation => write!(f, "reevaluation"),
        }
    }
}

/// A single constrained judgment.
#[derive(Debug, Clone, PartialEq)]
pub struct JudgeRequest {
    pub purpose: JudgePurpose,
    pub messages: Vec<ChatMessage>,
    pub temperature: f32,
}

impl JudgeRequest {
    pub const fn new(purpose: JudgePurpose, messages: Vec<ChatMessage>, temperature: f32) -> Self {
        Self {
            purpose,
            messages,
            temperature,
        }
    }

    /// Single user turn.
    pub fn prompt(purpose: JudgePurpose, prompt: impl Into<String>, temperature: f32) -> Self {
        Self::new(purpose, vec![ChatMessage::user(prompt)], temperature)
    }

    /// All message contents joined, used for matching and logging.
    pub fn transcript(&self) -> String {
        self.messages
            .iter()
            .map(|m| m.content.as_str())
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// Evidence item proposed by the judge before validation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CandidateEvidence {
    #[serde(default)]
    pub score: i64,
    #[serde(default)]
    pub citation: String,
    #[serde(default = "default_description")]
    pub description: String,
}

fn default_description() -> String {
    "No description provided.".to_string()
}

impl CandidateEvidence {
    pub fn level(&self) -> RiskLevel {
        RiskLevel::nearest(self.score)
    }
}

/// Judge verdict in either accepted shape: `{evidence: [...]}` or a bare item.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct JudgeVerdict {
    pub evidence: Vec<CandidateEvidence>,
    pub reasoning: Option<String>,
}

#[derive(Deserialize)]
struct VerdictEnvelope {
    #[serde(default)]
    evidence: Vec<CandidateEvidence>,
    #[serde(default)]
    reasoning: Option<String>,
}

impl JudgeVerdict {
    pub fn from_value(value: serde_json::Value) -> Result<Self, serde_json::Error> {
        if value.get("evidence").is_some() || value.get("score").is_none() {
            let envelope: VerdictEnvelope = serde_json::from_value(value)?;
            return Ok(Self {
                evidence: envelope.evidence,
                reasoning: envelope.reasoning,
            });
        }
        let single: CandidateEvidence = serde_json::from_value(value)?;
        Ok(Self {
            evidence: vec![single],
            reasoning: None,
        })
    }
}

/// Hit verification answer: indices of hits accepted as relevant.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct HitVerdict {
    #[serde(default)]
    pub accepted: Vec<i64>,
    #[serde(default)]
    pub reasoning: Option<String>,
}
