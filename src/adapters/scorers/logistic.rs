//! Logistic regression scorer over configured coefficients.

use tracing::debug;

use crate::domain::errors::ProviderError;
use crate::domain::models::{LoanApplication, Prediction, ScorerConfig};
use crate::domain::ports::StatisticalScorer;

const PROVIDER: &str = "statistical model";

/// `p(default) = sigmoid(intercept + sum(weight * feature))`.
///
/// Features without a weight contribute nothing; one-hot categorical
/// features are keyed `field=VALUE`.
pub struct LogisticScorer {
    config: ScorerConfig,
}

impl LogisticScorer {
    pub const fn new(config: ScorerConfig) -> Self {
        Self { config }
    }

    fn linear_term(&self, application: &LoanApplication) -> f64 {
        application
            .features()
            .iter()
            .filter_map(|(name, value)| self.config.weights.get(name).map(|w| w * value))
            .sum::<f64>()
            + self.config.intercept
    }
}

fn sigmoid(x: f64) -> f64 {
    1.0 / (1.0 + (-x).exp())
}

impl StatisticalScorer for LogisticScorer {
    fn name(&self) -> &str {
        "logistic"
    }

    fn predict(&self, application: &LoanApplication) -> Result<Prediction, ProviderError> {
        if self.config.weights.is_empty() {
            return Err(ProviderError::not_configured(PROVIDER, "no coefficients configured"));
        }

        let z = self.linear_term(application);
        if !z.is_finite() {
            return Err(ProviderError::transient(PROVIDER, "non-finite linear term"));
        }
        let probability = sigmoid(z);
        let label = if probability >= self.config.threshold {
            "default"
        } else {
            "non_default"
        };
        debug!(z, probability, label, "logistic prediction");

        Ok(Prediction {
            label: label.to_string(),
            probability,
        })
    }
}
