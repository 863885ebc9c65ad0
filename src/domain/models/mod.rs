pub mod applicant;
pub mod config;
pub mod evidence;
pub mod judgment;
pub mod scoring;
pub mod search;
pub mod session;

pub use applicant::{
    ApplicantProfile, DefaultOnFile, HomeOwnership, LoanApplication, LoanGrade, LoanIntent,
};
pub use config::{
    Config, EvaluationConfig, JudgeConfig, JudgeProviderConfig, LoggingConfig, ScorerConfig,
    SearchConfig,
};
pub use evidence::{Evidence, EventType, REEVALUATION_ERROR_SOURCE, SYSTEM_ERROR_SOURCE};
pub use judgment::{
    CandidateEvidence, ChatMessage, ChatRole, HitVerdict, JudgePurpose, JudgeRequest, JudgeVerdict,
};
pub use scoring::{Prediction, RiskLevel};
pub use search::{ObjectiveKind, QueryPlan, SearchHit, SearchObjective};
pub use session::{Session, SessionId, Snippet, WEB_SEARCH_SOURCE};
