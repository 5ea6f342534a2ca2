use serde::{Deserialize, Serialize};
use validator::Validate;

/// Request to match a visitor with available hosts
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct MatchHostsRequest {
    #[validate(length(min = 1, max = 2000))]
    pub visitor_query: String,
    #[validate(length(min = 1))]
    pub date_needed: String,
    #[serde(default = "default_min_capacity")]
    #[validate(range(min = 1))]
    pub min_capacity: u32,
    #[serde(default)]
    pub max_results: Option<usize>,
}

fn default_min_capacity() -> u32 {
    1
}

/// Request for event recommendations
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct RecommendEventsRequest {
    #[validate(length(min = 1, max = 2000))]
    pub user_interests: String,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub date_from: Option<String>,
    #[serde(default)]
    pub date_to: Option<String>,
    #[serde(default)]
    pub free_only: bool,
    /// Comma-separated tags
    #[serde(default)]
    pub tags: Option<String>,
    #[serde(default)]
    pub max_results: Option<usize>,
}
