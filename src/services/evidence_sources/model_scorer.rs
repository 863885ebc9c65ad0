//! Statistical model job.

use async_trait::async_trait;
use std::sync::Arc;
use tracing::{debug, warn};

use super::{EvidenceSource, JobDescriptor, JobKind};
use crate::domain::errors::DomainResult;
use crate::domain::models::{Evidence, LoanApplication, RiskLevel};
use crate::domain::ports::StatisticalScorer;

pub const MODEL_SOURCE: &str = "Machine Learning Model";

/// Scores the application payload with the statistical collaborator.
///
/// Never fails: a missing payload or a scorer failure both produce one
/// zero-score record.
pub struct ModelScorer {
    descriptor: JobDescriptor,
    scorer: Arc<dyn StatisticalScorer>,
    application: Option<LoanApplication>,
}

impl ModelScorer {
    pub fn new(scorer: Arc<dyn StatisticalScorer>, application: Option<LoanApplication>) -> Self {
        Self {
            descriptor: JobDescriptor::new(JobKind::ModelScorer, "ModelScorer", MODEL_SOURCE),
            scorer,
            application,
        }
    }
}

#[async_trait]
impl EvidenceSource for ModelScorer {
    fn descriptor(&self) -> &JobDescriptor {
        &self.descriptor
    }

    async fn produce(&self) -> DomainResult<Vec<Evidence>> {
        let Some(application) = self.application.clone() else {
            return Ok(vec![Evidence::new(
                0,
                "No application data available",
                "",
                MODEL_SOURCE,
            )]);
        };

        let scorer = Arc::clone(&self.scorer);
        let outcome = tokio::task::spawn_blocking(move || scorer.predict(&application)).await;

        let evidence = match outcome {
            Ok(Ok(prediction)) if !prediction.probability.is_finite() => {
                warn!(
                    scorer = self.scorer.name(),
                    probability = prediction.probability,
                    "model returned a non-finite probability"
                );
                Evidence::new(
                    0,
                    "Model prediction unavailable: non-finite probability",
                    "",
                    MODEL_SOURCE,
                )
            }
            Ok(Ok(prediction)) => {
                let level = RiskLevel::from_default_probability(prediction.probability);
                debug!(
                    scorer = self.scorer.name(),
                    probability = prediction.probability,
                    ?level,
                    "model prediction"
                );
                Evidence::new(
                    level.score(),
                    format!(
                        "Predicted default probability {:.1}% ({})",
                        prediction.probability * 100.0,
                        prediction.label
                    ),
                    "",
                    MODEL_SOURCE,
                )
            }
            Ok(Err(err)) => {
                warn!(error = %err, "model prediction failed");
                Evidence::new(0, format!("Model prediction unavailable: {err}"), "", MODEL_SOURCE)
            }
            Err(join_err) => {
                warn!(error = %join_err, "model inference task aborted");
                Evidence::new(0, format!("Model inference failed: {join_err}"), "", MODEL_SOURCE)
            }
        };

        Ok(vec![evidence])
    }
}
