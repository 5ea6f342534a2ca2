use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use crate::models::domain::{RankedMatchesPayload, RankedResult};

/// Response for the match endpoints
#[derive(Debug, Clone, Serialize)]
pub struct MatchResponse {
    pub success: bool,
    pub ai_enabled: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    pub matches: RankedMatchesPayload,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub highlights: BTreeMap<i64, Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub raw_output: Option<String>,
}

impl From<RankedResult> for MatchResponse {
    fn from(result: RankedResult) -> Self {
        Self {
            success: true,
            ai_enabled: result.ai_enabled,
            matches: result.to_payload(),
            highlights: result.highlights_by_id(),
            summary: result.summary,
            raw_output: result.raw_output,
        }
    }
}

/// Health check response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub oracle_configured: bool,
    pub timestamp: chrono::DateTime<chrono::Utc>,
}

/// Error response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
    pub status_code: u16,
}
