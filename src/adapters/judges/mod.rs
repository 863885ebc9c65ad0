//! Language judge adapters.

pub mod openai;

pub use openai::{extract_json, RotatingJudge};
