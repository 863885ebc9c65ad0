//! Statistical scorer port
//!
//! Inference is synchronous and may be CPU bound; callers run it on the
//! blocking pool so it never stalls the fan-in loop.

use crate::domain::errors::ProviderError;
use crate::domain::models::{LoanApplication, Prediction};

pub trait StatisticalScorer: Send + Sync {
    fn name(&self) -> &str;

    /// Predicts the default label and probability for one application
    fn predict(&self, application: &LoanApplication) -> Result<Prediction, ProviderError>;
}
