// Core algorithm exports
pub mod conflicts;
pub mod extract;
pub mod matcher;
pub mod scoring;

pub use conflicts::ConflictTable;
pub use extract::{extract_json, parse_ranking, ExtractionTier, OracleRanking};
pub use matcher::{MatchError, MatchRules, Matcher};
pub use scoring::{KeywordScorer, QueryTerms, Score};
