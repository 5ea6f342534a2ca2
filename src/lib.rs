//! Campus Match - compatibility ranking for campus hosts and events
//!
//! This library ranks a pool of hosts or events against a free-text
//! preference statement. A hosted LLM ranks the pool when one is configured;
//! otherwise, or when it fails, a deterministic keyword scorer does.

pub mod config;
pub mod core;
pub mod models;
pub mod routes;
pub mod services;

// Re-export commonly used types
pub use core::{ConflictTable, KeywordScorer, MatchError, MatchRules, Matcher};
pub use models::{Candidate, CandidateKind, MatchQuery, RankedResult, ScoredMatch};
pub use services::{CandidateStore, InMemoryStore, LlmOracle, OracleError, RankingOracle};
