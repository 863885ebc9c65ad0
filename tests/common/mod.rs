//! Common test utilities for integration tests
//!
//! Shared fixtures and helpers for driving evaluation sessions against the
//! in-memory store and the deterministic collaborator stand-ins.

#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use glassscore::adapters::memory::InMemorySessionStore;
use glassscore::adapters::mock::{MockJudge, MockScorer, MockSearch};
use glassscore::domain::models::{
    ApplicantProfile, DefaultOnFile, EvaluationConfig, EventType, Evidence, HomeOwnership,
    LoanApplication, LoanGrade, LoanIntent, Snippet,
};
use glassscore::domain::ports::EventReceiver;
use glassscore::EvaluationService;

pub const PAYSLIP: &str = "Payslip March: Net pay 4,000 EUR monthly from Acme Corp.";
pub const BANK: &str = "Bank statement: Overdraft fee charged twice in February.";
pub const REFERENCE: &str = "Reference letter: Reliable tenant since 2019, rent always on time.";

pub fn profile() -> ApplicantProfile {
    ApplicantProfile {
        name: "Jane Doe".to_string(),
        age: 34,
        gender: "female".to_string(),
        income: 48_000,
        loan_amount: 15_000,
        loan_term: 36,
    }
}

pub fn application() -> LoanApplication {
    LoanApplication {
        person_age: 34,
        person_income: 48_000.0,
        person_home_ownership: HomeOwnership::Rent,
        person_emp_length: 6.0,
        loan_intent: LoanIntent::HomeImprovement,
        loan_grade: LoanGrade::B,
        loan_amnt: 15_000.0,
        loan_int_rate: 11.5,
        cb_person_default_on_file: DefaultOnFile::N,
        cb_person_cred_hist_length: 9,
    }
}

pub fn snippets() -> Vec<Snippet> {
    vec![
        Snippet::new("payslip.txt", PAYSLIP, "user_upload"),
        Snippet::new("bank.txt", BANK, "user_upload"),
        Snippet::new("reference.txt", REFERENCE, "user_upload"),
    ]
}

/// Service over a fresh in-memory store, returned alongside the store.
pub fn service(
    judge: Arc<MockJudge>,
    search: Arc<MockSearch>,
    scorer: Arc<MockScorer>,
    web_verifier_slots: usize,
) -> (Arc<InMemorySessionStore>, EvaluationService) {
    let store = Arc::new(InMemorySessionStore::new());
    let service = EvaluationService::new(
        store.clone(),
        judge,
        search,
        scorer,
        EvaluationConfig {
            web_verifier_slots,
            ..EvaluationConfig::default()
        },
    );
    (store, service)
}

/// Reads the stream up to and including the completion marker.
pub async fn collect_run(events: &mut EventReceiver) -> Vec<Evidence> {
    let mut records = Vec::new();
    loop {
        let record = tokio::time::timeout(Duration::from_secs(5), events.recv())
            .await
            .expect("stream stalled")
            .expect("stream closed before completion");
        let done = record.event_type == EventType::EvaluationComplete;
        records.push(record);
        if done {
            return records;
        }
    }
}

/// Ledger records of a run, lifecycle markers excluded.
pub fn ledger_records(records: &[Evidence]) -> Vec<&Evidence> {
    records.iter().filter(|r| !r.is_lifecycle()).collect()
}
