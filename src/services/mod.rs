pub mod citation;
pub mod evidence_sources;
pub mod prompts;
pub mod query_generator;
pub mod reevaluation;
pub mod result_streamer;

pub use evidence_sources::{
    EvidenceSource, JobDescriptor, JobKind, ModelScorer, TextAnalyzer, UpstreamEvidence,
    WebVerifier, WebVerifierDeps,
};
pub use query_generator::QueryGenerator;
pub use reevaluation::{Invalidation, ReevaluationEngine, ReevaluationOutcome};
pub use result_streamer::ResultStreamer;
