//! Search hit verification.

use std::collections::BTreeSet;
use tracing::debug;

use crate::domain::errors::ProviderError;
use crate::domain::models::{
    ApplicantProfile, HitVerdict, JudgePurpose, JudgeRequest, SearchHit, SearchObjective,
};
use crate::domain::ports::LanguageJudge;
use crate::services::prompts;

/// Asks the judge which hits concern the applicant (identity objectives) or
/// the topic (factual objectives).
///
/// Returns the accepted indices, deduplicated and bounded by `hits.len()`.
/// No hits means no judge call.
pub async fn verify_hits(
    judge: &dyn LanguageJudge,
    profile: Option<&ApplicantProfile>,
    objective: &SearchObjective,
    hits: &[SearchHit],
    temperature: f32,
) -> Result<BTreeSet<usize>, ProviderError> {
    if hits.is_empty() {
        return Ok(BTreeSet::new());
    }

    let request = JudgeRequest::prompt(
        JudgePurpose::HitVerification,
        prompts::hit_verification(profile, objective, hits),
        temperature,
    );
    let reply = judge.complete_json(request).await?;
    let verdict: HitVerdict = serde_json::from_value(reply)
        .map_err(|e| ProviderError::malformed(judge.name(), e.to_string()))?;

    let accepted: BTreeSet<usize> = verdict
        .accepted
        .into_iter()
        .filter_map(|i| usize::try_from(i).ok())
        .filter(|&i| i < hits.len())
        .collect();

    debug!(
        query = %objective.query,
        kind = ?objective.kind,
        accepted = accepted.len(),
        reasoning = verdict.reasoning.as_deref().unwrap_or(""),
        "hits verified"
    );
    Ok(accepted)
}
