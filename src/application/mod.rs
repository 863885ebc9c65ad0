pub mod evaluation_orchestrator;
pub mod evaluation_service;

pub use evaluation_orchestrator::{EvaluationOrchestrator, EvaluationRun, RunSummary};
pub use evaluation_service::EvaluationService;
