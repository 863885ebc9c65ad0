//! Port trait definitions (Hexagonal Architecture)
//!
//! This module defines the interfaces that infrastructure adapters must implement:
//! - SessionStore: session state, ledger and event queue
//! - LanguageJudge: constrained JSON judgments
//! - WebSearch: background-check searches
//! - StatisticalScorer: default-probability model
//!
//! These traits keep the evaluation core independent of specific providers.

pub mod language_judge;
pub mod session_store;
pub mod statistical_scorer;
pub mod web_search;

pub use language_judge::LanguageJudge;
pub use session_store::{EventReceiver, SessionStore};
pub use statistical_scorer::StatisticalScorer;
pub use web_search::WebSearch;
