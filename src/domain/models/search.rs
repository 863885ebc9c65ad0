//! Web verification inputs: planned queries and raw search hits.

use serde::{Deserialize, Serialize};

/// How strictly search hits must match the applicant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ObjectiveKind {
    /// Hits must plausibly concern the same person
    Identity,
    /// Topical relevance is enough (employer, business, claim checks)
    #[default]
    Factual,
}

/// One planned background-check query.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchObjective {
    pub query: String,
    #[serde(default)]
    pub objective: String,
    #[serde(default)]
    pub kind: ObjectiveKind,
}

/// Planner output as returned by the judge.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct QueryPlan {
    #[serde(default)]
    pub queries: Vec<SearchObjective>,
}

/// A single web search result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchHit {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub content: String,
}

impl SearchHit {
    /// Renders hits as a single text block, the form stored in the snippet map.
    pub fn aggregate<'a>(hits: impl IntoIterator<Item = &'a Self>) -> String {
        hits.into_iter()
            .map(|hit| {
                format!(
                    "Title: {}\nURL: {}\nContent: {}\n",
                    hit.title, hit.url, hit.content
                )
            })
            .collect::<Vec<_>>()
            .join("\n")
    }
}
