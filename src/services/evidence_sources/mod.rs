//! Evidence source jobs.
//!
//! Every job produces zero or more [`Evidence`] items. The fan-in loop never
//! sees a raw failure: [`run_guarded`] turns panics into errors and
//! [`settle`] turns errors into evidence-shaped records.

pub mod hit_verifier;
pub mod model_scorer;
pub mod text_analyzer;
pub mod web_verifier;

pub use hit_verifier::verify_hits;
pub use model_scorer::{ModelScorer, MODEL_SOURCE};
pub use text_analyzer::{analyze_snippet, TextAnalyzer};
pub use web_verifier::{WebVerifier, WebVerifierDeps};

use async_trait::async_trait;
use futures::future::{BoxFuture, FutureExt, Shared};
use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use tracing::warn;

use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::models::Evidence;

/// Which kind of job produced a record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum JobKind {
    ModelScorer,
    TextAnalyzer,
    WebVerifier,
}

impl std::fmt::Display for JobKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::ModelScorer => write!(f, "model_scorer"),
            Self::TextAnalyzer => write!(f, "text_analyzer"),
            Self::WebVerifier => write!(f, "web_verifier"),
        }
    }
}

/// Capabilities of a job, fixed at construction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobDescriptor {
    pub kind: JobKind,
    /// Human-readable name used in error records (`TextAnalyzer(report.txt)`)
    pub label: String,
    /// Source label for records this job emits when a collaborator is unavailable
    pub source: String,
}

impl JobDescriptor {
    pub fn new(kind: JobKind, label: impl Into<String>, source: impl Into<String>) -> Self {
        Self {
            kind,
            label: label.into(),
            source: source.into(),
        }
    }
}

/// A unit of work that produces evidence.
#[async_trait]
pub trait EvidenceSource: Send + Sync {
    fn descriptor(&self) -> &JobDescriptor;

    async fn produce(&self) -> DomainResult<Vec<Evidence>>;
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    payload
        .downcast_ref::<&str>()
        .map(|s| (*s).to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "job panicked".to_string())
}

/// Runs a job, converting a panic into `JobFailed`.
pub async fn run_guarded(source: &dyn EvidenceSource) -> DomainResult<Vec<Evidence>> {
    match AssertUnwindSafe(source.produce()).catch_unwind().await {
        Ok(result) => result,
        Err(payload) => {
            let message = panic_message(payload.as_ref());
            warn!(job = %source.descriptor().label, %message, "job panicked");
            Err(DomainError::JobFailed(format!("panic: {message}")))
        }
    }
}

/// Converts a job result into the records the streamer publishes.
///
/// Missing credentials become a neutral item under the job's own source;
/// every other failure becomes a single System Error item.
pub fn settle(descriptor: &JobDescriptor, result: DomainResult<Vec<Evidence>>) -> Vec<Evidence> {
    match result {
        Ok(items) => items,
        Err(DomainError::Provider(err)) if err.is_configuration() => vec![Evidence::new(
            0,
            format!("{} unavailable: {err}", descriptor.label),
            "",
            descriptor.source.clone(),
        )],
        Err(err) => vec![Evidence::system_error(format!(
            "Error in {}: {err}",
            descriptor.label
        ))],
    }
}

/// Memoised outcome of an upstream job, observable by many awaiters.
pub type SharedEvidence = Shared<BoxFuture<'static, Result<Vec<Evidence>, String>>>;

/// Wraps a job so its output is computed once and shared.
///
/// The fan-in loop publishes the items through [`EvidenceSource::produce`];
/// dependent jobs read them as context through [`UpstreamEvidence::outcome`].
pub struct UpstreamEvidence {
    descriptor: JobDescriptor,
    shared: SharedEvidence,
}

impl UpstreamEvidence {
    pub fn new(source: Arc<dyn EvidenceSource>) -> Self {
        let descriptor = source.descriptor().clone();
        let shared = async move { run_guarded(source.as_ref()).await.map_err(|e| e.to_string()) }
            .boxed()
            .shared();
        Self { descriptor, shared }
    }

    pub fn outcome(&self) -> SharedEvidence {
        self.shared.clone()
    }
}

#[async_trait]
impl EvidenceSource for UpstreamEvidence {
    fn descriptor(&self) -> &JobDescriptor {
        &self.descriptor
    }

    async fn produce(&self) -> DomainResult<Vec<Evidence>> {
        self.shared.clone().await.map_err(DomainError::JobFailed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::errors::ProviderError;
    use crate::domain::models::SYSTEM_ERROR_SOURCE;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct Counting {
        descriptor: JobDescriptor,
        calls: AtomicUsize,
    }

    #[async_trait]
    impl EvidenceSource for Counting {
        fn descriptor(&self) -> &JobDescriptor {
            &self.descriptor
        }

        async fn produce(&self) -> DomainResult<Vec<Evidence>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(vec![Evidence::new(2, "computed", "", "test")])
        }
    }

    struct Panicking(JobDescriptor);

    #[async_trait]
    impl EvidenceSource for Panicking {
        fn descriptor(&self) -> &JobDescriptor {
            &self.0
        }

        async fn produce(&self) -> DomainResult<Vec<Evidence>> {
            panic!("boom");
        }
    }

    fn descriptor() -> JobDescriptor {
        JobDescriptor::new(JobKind::ModelScorer, "ModelScorer", "Machine Learning Model")
    }

    #[tokio::test]
    async fn test_upstream_computes_once() {
        let inner = Arc::new(Counting {
            descriptor: descriptor(),
            calls: AtomicUsize::new(0),
        });
        let upstream = UpstreamEvidence::new(inner.clone());

        let (a, b, c) = tokio::join!(upstream.produce(), upstream.outcome(), upstream.outcome());
        assert_eq!(a.unwrap().len(), 1);
        assert_eq!(b.unwrap()[0].description, "computed");
        assert!(c.is_ok());
        assert_eq!(inner.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_panic_becomes_job_failure() {
        let job = Panicking(descriptor());
        let err = run_guarded(&job).await.unwrap_err();
        assert!(err.to_string().contains("boom"));

        let items = settle(job.descriptor(), Err(err));
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].source, SYSTEM_ERROR_SOURCE);
        assert!(items[0].description.starts_with("Error in ModelScorer"));
    }

    #[test]
    fn test_configuration_error_is_neutral() {
        let err = ProviderError::not_configured("web search", "missing TAVILY_API_KEY");
        let items = settle(&descriptor(), Err(err.into()));
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].score, 0);
        assert_eq!(items[0].source, "Machine Learning Model");
        assert!(items[0].description.contains("unavailable"));
    }
}
