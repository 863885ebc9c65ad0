//! Property tests for ledger ordering, citation filtering, score snapping and
//! query-plan slot claims.

use glassscore::adapters::memory::InMemorySessionStore;
use glassscore::adapters::mock::MockJudge;
use glassscore::domain::models::{
    EventType, Evidence, JudgePurpose, ObjectiveKind, RiskLevel, SearchHit, SearchObjective, Snippet,
};
use glassscore::services::citation::{is_verbatim, retain_verbatim};
use glassscore::services::evidence_sources::verify_hits;
use glassscore::services::QueryGenerator;
use glassscore::SessionStore;
use proptest::prelude::*;
use serde_json::json;
use std::sync::Arc;

fn runtime() -> tokio::runtime::Runtime {
    tokio::runtime::Builder::new_multi_thread()
        .worker_threads(4)
        .enable_all()
        .build()
        .unwrap()
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    /// Property: concurrent writers get contiguous ids and the queue order
    /// equals ledger order; lifecycle markers never take an id.
    #[test]
    fn prop_ledger_ids_contiguous_and_queue_ordered(
        writers in 1usize..8,
        per_writer in 1usize..12,
        markers in 0usize..3,
    ) {
        let (ledger, streamed) = runtime().block_on(async move {
            let store = Arc::new(InMemorySessionStore::new());
            let session = store.create(None, None).await.unwrap();
            let mut events = store.subscribe(session.id).await.unwrap();

            let mut handles = Vec::new();
            for w in 0..writers {
                let store = store.clone();
                handles.push(tokio::spawn(async move {
                    for i in 0..per_writer {
                        store
                            .publish(session.id, Evidence::new(0, format!("w{w} item {i}"), "", "prop"))
                            .await
                            .unwrap();
                        if i < markers {
                            store
                                .publish(session.id, Evidence::lifecycle(EventType::EvaluationStart))
                                .await
                                .unwrap();
                        }
                    }
                }));
            }
            for handle in handles {
                handle.await.unwrap();
            }

            let ledger = store.get(session.id).await.unwrap().evidence;
            let mut streamed = Vec::new();
            while let Ok(record) = events.try_recv() {
                streamed.push(record);
            }
            (ledger, streamed)
        });

        let expected: Vec<u64> = (1..=(writers * per_writer) as u64).collect();
        let ids: Vec<u64> = ledger.iter().map(|e| e.id).collect();
        prop_assert_eq!(&ids, &expected);

        let streamed_ids: Vec<u64> = streamed
            .iter()
            .filter(|r| !r.is_lifecycle())
            .map(|r| r.id)
            .collect();
        prop_assert_eq!(streamed_ids, expected);
        prop_assert!(streamed.iter().filter(|r| r.is_lifecycle()).all(|r| r.id == 0));
    }

    /// Property: any contiguous word run of the text is accepted as a citation
    #[test]
    fn prop_word_runs_are_verbatim(
        words in prop::collection::vec("[a-zA-Z0-9]{1,8}", 1..20),
        start in 0usize..20,
        len in 1usize..6,
    ) {
        let text = words.join(" ");
        let start = start % words.len();
        let end = (start + len).min(words.len());
        let citation = words[start..end].join("  ");
        prop_assert!(is_verbatim(&citation, &text));
        prop_assert!(is_verbatim(&citation.to_uppercase(), &text));
    }

    /// Property: the filter keeps exactly the items that pass the single check
    #[test]
    fn prop_retain_verbatim_matches_check(
        text in "[a-z ]{0,60}",
        citations in prop::collection::vec("[a-z ]{0,12}", 0..8),
    ) {
        let items: Vec<Evidence> = citations
            .iter()
            .map(|c| Evidence::new(0, "d", c.clone(), "prop"))
            .collect();
        let kept = retain_verbatim(items, &text);
        let expected: Vec<&String> = citations.iter().filter(|c| is_verbatim(c, &text)).collect();
        let kept_citations: Vec<&String> = kept.iter().map(|e| &e.citation).collect();
        prop_assert_eq!(kept_citations, expected);
    }

    /// Property: snapped scores land on the scale at minimal distance
    #[test]
    fn prop_nearest_level_is_closest(raw in any::<i64>()) {
        let level = RiskLevel::nearest(raw);
        let distance = raw.abs_diff(i64::from(level.score()));
        for other in RiskLevel::ALL {
            prop_assert!(distance <= raw.abs_diff(i64::from(other.score())));
        }
    }

    /// Property: slots at or beyond the plan length claim nothing, and the
    /// plan is generated once however many slots ask
    #[test]
    fn prop_slots_beyond_plan_are_empty(
        planned in 0usize..6,
        max_queries in 0usize..11,
        slot in 0usize..11,
    ) {
        let queries: Vec<_> = (0..planned)
            .map(|i| json!({"query": format!("query {i}"), "objective": "check", "kind": "factual"}))
            .collect();
        let judge = Arc::new(MockJudge::new().respond(JudgePurpose::QueryPlanning, json!({"queries": queries})));
        let generator = QueryGenerator::new(judge.clone(), None, Vec::new(), max_queries, 0.0);

        let (claimed, first) = runtime().block_on(async {
            (generator.objective(slot).await, generator.objective(0).await)
        });

        let plan_len = planned.min(max_queries);
        prop_assert_eq!(claimed.is_some(), slot < plan_len);
        prop_assert_eq!(first.is_some(), plan_len > 0);
        prop_assert_eq!(generator.generations(), 1);
        prop_assert_eq!(judge.calls(), usize::from(max_queries > 0));
    }

    /// Property: identity verification over the same hits and objective is
    /// idempotent and only yields in-range indices
    #[test]
    fn prop_hit_verification_idempotent(
        hit_count in 0usize..8,
        accepted in prop::collection::vec(-3i64..12, 0..10),
    ) {
        let hits: Vec<SearchHit> = (0..hit_count)
            .map(|i| SearchHit {
                title: format!("Result {i}"),
                url: format!("https://example.com/{i}"),
                content: format!("Jane Doe mention {i}"),
            })
            .collect();
        let objective = SearchObjective {
            query: "Jane Doe".to_string(),
            objective: "confirm identity".to_string(),
            kind: ObjectiveKind::Identity,
        };
        let judge = MockJudge::new().respond(JudgePurpose::HitVerification, json!({"accepted": accepted}));

        let (first, second) = runtime().block_on(async {
            let first = verify_hits(&judge, None, &objective, &hits, 0.0).await.unwrap();
            let second = verify_hits(&judge, None, &objective, &hits, 0.0).await.unwrap();
            (first, second)
        });

        prop_assert_eq!(&first, &second);
        prop_assert!(first.iter().all(|&i| i < hit_count));
    }
}

#[tokio::test]
async fn test_colliding_snippet_keys_are_suffixed() {
    let store = InMemorySessionStore::new();
    let session = store.create(None, None).await.unwrap();

    let first = store
        .save_snippet(session.id, Snippet::new("report.txt", "first upload", "user_upload"))
        .await
        .unwrap();
    let second = store
        .save_snippet(session.id, Snippet::new("report.txt", "second upload", "user_upload"))
        .await
        .unwrap();

    assert_eq!(first, "report.txt");
    assert_eq!(second, "report.txt_1");
    let stored = store.snippet(session.id, "report.txt_1").await.unwrap().unwrap();
    assert_eq!(stored.text, "second upload");
    assert_eq!(
        store.snippet(session.id, "report.txt").await.unwrap().unwrap().text,
        "first upload"
    );
}
