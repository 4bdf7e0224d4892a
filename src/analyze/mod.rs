// src/analyze/mod.rs
//! Heuristic analysis: shared text signals and the rule-based risk scorer.

pub mod rules;
pub mod signals;

pub use crate::analyze::rules::{score, score_with_age, token_floor, Heuristic};
pub use crate::analyze::signals::SUSPICIOUS_TOKENS;
