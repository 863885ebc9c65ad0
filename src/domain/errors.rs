//! Domain errors for the GlassScore evaluation core.

use thiserror::Error;
use uuid::Uuid;

/// Failure reported by an external collaborator (statistical model, language
/// judge, web search).
///
/// Cloneable so a single upstream failure can be observed by every job that
/// awaits it.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ProviderError {
    /// A required credential or model resource is missing.
    #[error("{provider} is not configured: {reason}")]
    NotConfigured { provider: String, reason: String },

    /// The provider call failed (network, HTTP status, inference error).
    #[error("{provider} request failed: {message}")]
    Transient { provider: String, message: String },

    /// The provider answered but the payload could not be interpreted.
    #[error("{provider} returned malformed output: {message}")]
    Malformed { provider: String, message: String },
}

impl ProviderError {
    pub fn not_configured(provider: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::NotConfigured {
            provider: provider.into(),
            reason: reason.into(),
        }
    }

    pub fn transient(provider: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Transient {
            provider: provider.into(),
            message: message.into(),
        }
    }

    pub fn malformed(provider: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Malformed {
            provider: provider.into(),
            message: message.into(),
        }
    }

    /// Missing credentials degrade to neutral evidence instead of a System Error.
    pub const fn is_configuration(&self) -> bool {
        matches!(self, Self::NotConfigured { .. })
    }
}

/// Domain-level errors that can occur in the evaluation core.
#[derive(Debug, Error)]
pub enum DomainError {
    #[error("Session not found: {0}")]
    SessionNotFound(Uuid),

    #[error("Evidence {evidence_id} not found in session {session_id}")]
    EvidenceNotFound { session_id: Uuid, evidence_id: u64 },

    #[error("Session {0} is already evaluating")]
    AlreadyEvaluating(Uuid),

    #[error(transparent)]
    Provider(#[from] ProviderError),

    #[error("Job failed: {0}")]
    JobFailed(String),

    #[error("Validation failed: {0}")]
    ValidationFailed(String),
}

impl DomainError {
    /// Unknown session or evidence id.
    pub const fn is_not_found(&self) -> bool {
        matches!(
            self,
            Self::SessionNotFound(_) | Self::EvidenceNotFound { .. }
        )
    }
}

pub type DomainResult<T> = Result<T, DomainError>;

impl From<serde_json::Error> for DomainError {
    fn from(err: serde_json::Error) -> Self {
        DomainError::ValidationFailed(err.to_string())
    }
}
