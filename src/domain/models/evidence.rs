//! Evidence records: the unit appended to a session ledger and streamed to clients.

use serde::{Deserialize, Serialize};

/// Source label used for job failures converted into evidence.
pub const SYSTEM_ERROR_SOURCE: &str = "System Error";

/// Source label used when a re-evaluation cannot produce a verdict.
pub const REEVALUATION_ERROR_SOURCE: &str = "Re-evaluation Error";

/// Stream record kind
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum EventType {
    /// Scored observation, appended to the ledger
    #[default]
    Evidence,
    /// Marks the beginning of an evaluation run (stream only)
    EvaluationStart,
    /// Marks the end of an evaluation run (stream only)
    EvaluationComplete,
}

impl EventType {
    /// Lifecycle markers are pushed to the queue but never appended to the ledger.
    pub const fn is_lifecycle(self) -> bool {
        matches!(self, Self::EvaluationStart | Self::EvaluationComplete)
    }
}

impl std::fmt::Display for EventType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Evidence => write!(f, "evidence"),
            Self::EvaluationStart => write!(f, "evaluation_start"),
            Self::EvaluationComplete => write!(f, "evaluation_complete"),
        }
    }
}

/// One scored, citable observation about an applicant.
///
/// `id` is zero until the session store appends the record, at which point it
/// receives the next ledger id. Only `valid` and `invalidate_reason` change
/// after that.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Evidence {
    #[serde(default)]
    pub id: u64,
    pub score: i32,
    pub description: String,
    #[serde(default)]
    pub citation: String,
    pub source: String,
    #[serde(default = "default_valid")]
    pub valid: bool,
    #[serde(default)]
    pub invalidate_reason: String,
    #[serde(default)]
    pub event_type: EventType,
    /// Back-reference into the session snippet map
    #[serde(default)]
    pub text_content_key: Option<String>,
}

const fn default_valid() -> bool {
    true
}

impl Evidence {
    /// Creates an unappended evidence item
    pub fn new(
        score: i32,
        description: impl Into<String>,
        citation: impl Into<String>,
        source: impl Into<String>,
    ) -> Self {
        Self {
            id: 0,
            score,
            description: description.into(),
            citation: citation.into(),
            source: source.into(),
            valid: true,
            invalidate_reason: String::new(),
            event_type: EventType::Evidence,
            text_content_key: None,
        }
    }

    /// Zero-score record describing a failed job.
    pub fn system_error(description: impl Into<String>) -> Self {
        Self::new(0, description, "", SYSTEM_ERROR_SOURCE)
    }

    /// Zero-score record describing a failed or impossible re-evaluation.
    pub fn reevaluation_error(description: impl Into<String>) -> Self {
        Self::new(0, description, "", REEVALUATION_ERROR_SOURCE)
    }

    /// Lifecycle marker bracketing an evaluation run.
    pub fn lifecycle(event_type: EventType) -> Self {
        let description = match event_type {
            EventType::EvaluationStart => "Evaluation started",
            EventType::EvaluationComplete => "Evaluation complete",
            EventType::Evidence => "",
        };
        Self {
            event_type,
            ..Self::new(0, description, "", "System")
        }
    }

    /// Attach the snippet key this evidence was judged from.
    pub fn with_snippet_key(mut self, key: impl Into<String>) -> Self {
        self.text_content_key = Some(key.into());
        self
    }

    pub const fn is_lifecycle(&self) -> bool {
        self.event_type.is_lifecycle()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wire_shape() {
        let evidence = Evidence::new(-5, "Gambling mentioned", "I sometimes gamble", "user_upload")
            .with_snippet_key("gambling.txt");
        let value = serde_json::to_value(&evidence).unwrap();

        assert_eq!(value["id"], 0);
        assert_eq!(value["score"], -5);
        assert_eq!(value["valid"], true);
        assert_eq!(value["invalidate_reason"], "");
        assert_eq!(value["event_type"], "evidence");
        assert_eq!(value["text_content_key"], "gambling.txt");
    }

    #[test]
    fn test_lifecycle_marker_shape() {
        let marker = Evidence::lifecycle(EventType::EvaluationComplete);
        assert!(marker.is_lifecycle());
        assert_eq!(marker.score, 0);

        let value = serde_json::to_value(&marker).unwrap();
        assert_eq!(value["event_type"], "evaluation_complete");
        assert!(value["text_content_key"].is_null());
    }

    #[test]
    fn test_deserialize_applies_defaults() {
        let evidence: Evidence =
            serde_json::from_str(r#"{"score": 2, "description": "Stable job", "source": "x"}"#)
                .unwrap();
        assert!(evidence.valid);
        assert_eq!(evidence.event_type, EventType::Evidence);
        assert!(evidence.citation.is_empty());
    }
}
