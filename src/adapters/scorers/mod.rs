//! Statistical scorer adapters.

pub mod logistic;

pub use logistic::LogisticScorer;
