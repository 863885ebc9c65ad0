//! Single-flight search query planning shared by all web verifier slots.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::OnceCell;
use tracing::{info, instrument, warn};

use crate::domain::models::{
    ApplicantProfile, JudgePurpose, JudgeRequest, QueryPlan, SearchObjective, Snippet,
};
use crate::domain::ports::LanguageJudge;
use crate::services::prompts;

/// Computes the run's search objectives at most once.
///
/// The first slot to ask pays for the judge call; every other slot awaits
/// the same cell. A failed plan is cached as an empty list.
pub struct QueryGenerator {
    judge: Arc<dyn LanguageJudge>,
    profile: Option<ApplicantProfile>,
    snippets: Vec<Snippet>,
    max_queries: usize,
    temperature: f32,
    plan: OnceCell<Vec<SearchObjective>>,
    generations: AtomicUsize,
}

impl QueryGenerator {
    pub fn new(
        judge: Arc<dyn LanguageJudge>,
        profile: Option<ApplicantProfile>,
        snippets: Vec<Snippet>,
        max_queries: usize,
        temperature: f32,
    ) -> Self {
        Self {
            judge,
            profile,
            snippets,
            max_queries,
            temperature,
            plan: OnceCell::new(),
            generations: AtomicUsize::new(0),
        }
    }

    /// The shared objective list.
    pub async fn objectives(&self) -> &[SearchObjective] {
        self.plan.get_or_init(|| self.generate()).await
    }

    /// Objective claimed by `slot`, `None` when the plan is shorter.
    pub async fn objective(&self, slot: usize) -> Option<SearchObjective> {
        self.objectives().await.get(slot).cloned()
    }

    /// Number of judge calls made so far (0 or 1).
    pub fn generations(&self) -> usize {
        self.generations.load(Ordering::SeqCst)
    }

    #[instrument(skip(self), fields(max_queries = self.max_queries))]
    async fn generate(&self) -> Vec<SearchObjective> {
        self.generations.fetch_add(1, Ordering::SeqCst);
        if self.max_queries == 0 {
            return Vec::new();
        }

        let request = JudgeRequest::prompt(
            JudgePurpose::QueryPlanning,
            prompts::query_planning(self.profile.as_ref(), &self.snippets, self.max_queries),
            self.temperature,
        );

        let reply = match self.judge.complete_json(request).await {
            Ok(reply) => reply,
            Err(err) => {
                warn!(error = %err, "query planning failed, web verification disabled for this run");
                return Vec::new();
            }
        };

        let plan: QueryPlan = match serde_json::from_value(reply) {
            Ok(plan) => plan,
            Err(err) => {
                warn!(error = %err, "query plan malformed");
                return Vec::new();
            }
        };

        let objectives: Vec<SearchObjective> = plan
            .queries
            .into_iter()
            .filter(|o| !o.query.trim().is_empty())
            .take(self.max_queries)
            .collect();
        info!(count = objectives.len(), "search queries planned");
        objectives
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::mock::MockJudge;
    use crate::domain::errors::ProviderError;
    use serde_json::json;

    fn plan_reply() -> serde_json::Value {
        json!({"queries": [
            {"query": "Jane Doe Acme", "objective": "confirm employer", "kind": "identity"},
            {"query": "", "objective": "blank is skipped"},
            {"query": "Acme Corp layoffs", "objective": "employer stability", "kind": "factual"},
            {"query": "Jane Doe court records", "objective": "legal history", "kind": "identity"}
        ]})
    }

    #[tokio::test]
    async fn test_concurrent_slots_share_one_generation() {
        let judge = Arc::new(MockJudge::new().respond(JudgePurpose::QueryPlanning, plan_reply()));
        let generator = Arc::new(QueryGenerator::new(judge.clone(), None, vec![], 2, 0.0));

        let handles: Vec<_> = (0..5)
            .map(|slot| {
                let generator = generator.clone();
                tokio::spawn(async move { generator.objective(slot).await })
            })
            .collect();
        let mut claimed = Vec::new();
        for handle in handles {
            claimed.push(handle.await.unwrap());
        }

        assert_eq!(judge.calls(), 1);
        assert_eq!(generator.generations(), 1);
        assert_eq!(claimed[0].as_ref().unwrap().query, "Jane Doe Acme");
        assert_eq!(claimed[1].as_ref().unwrap().query, "Acme Corp layoffs");
        assert!(claimed[2..].iter().all(Option::is_none));
    }

    #[tokio::test]
    async fn test_failure_caches_empty_plan() {
        let judge = Arc::new(MockJudge::new().fail(
            JudgePurpose::QueryPlanning,
            ProviderError::transient("judge", "503"),
        ));
        let generator = QueryGenerator::new(judge.clone(), None, vec![], 3, 0.0);

        assert!(generator.objective(0).await.is_none());
        assert!(generator.objectives().await.is_empty());
        assert_eq!(judge.calls(), 1);
    }

    #[tokio::test]
    async fn test_zero_slots_skip_judge() {
        let judge = Arc::new(MockJudge::new());
        let generator = QueryGenerator::new(judge.clone(), None, vec![], 0, 0.0);
        assert!(generator.objectives().await.is_empty());
        assert_eq!(judge.calls(), 0);
    }
}
