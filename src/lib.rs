//! GlassScore - loan applicant risk assessment
//!
//! Each evaluation session runs a statistical scorer, one text analyzer per
//! attached snippet and a configurable number of web background checks
//! concurrently, streaming every scored evidence item to the client as soon
//! as it is produced. Users can later invalidate an item, which triggers a
//! scoped re-judgment of the text it came from.
//!
//! # Architecture
//!
//! - **Domain Layer** (`domain`): evidence, sessions, errors and port traits
//! - **Service Layer** (`services`): evidence sources, prompts, re-evaluation
//! - **Application Layer** (`application`): run orchestration and the service facade
//! - **Adapters** (`adapters`): in-memory store, HTTP providers, stand-ins
//! - **Infrastructure Layer** (`infrastructure`): configuration and logging
//! - **CLI Layer** (`cli`): command-line interface
//!
//! # Example
//!
//! ```ignore
//! use glassscore::cli::commands::evaluate::build_service;
//!
//! let service = build_service(&glassscore::ConfigLoader::load()?)?;
//! let session = service.create_session(None, None).await?;
//! let mut events = service.subscribe(session.id).await?;
//! service.start_evaluation(session.id).await?;
//! ```

pub mod adapters;
pub mod application;
pub mod cli;
pub mod domain;
pub mod infrastructure;
pub mod services;

// Re-export commonly used types for convenience
pub use application::{EvaluationOrchestrator, EvaluationRun, EvaluationService, RunSummary};
pub use domain::models::{
    ApplicantProfile, Config, EventType, Evidence, LoanApplication, RiskLevel, Session,
    SessionId, Snippet,
};
pub use domain::ports::{LanguageJudge, SessionStore, StatisticalScorer, WebSearch};
pub use domain::{DomainError, DomainResult, ProviderError};
pub use infrastructure::config::{ConfigError, ConfigLoader};
pub use services::{Invalidation, ReevaluationOutcome};
