//! Best-effort recovery of the JSON ranking from free-form oracle text.
//!
//! Tiers are tried most specific first:
//! 1. a fenced code block (```json ... ```) holding an object
//! 2. balanced `{...}` objects found by bracket matching, leftmost first
//! 3. everything between the first `{` and the last `}`
//!
//! A tier only wins if its slice parses as a JSON object; otherwise the next
//! tier is tried.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Deserialize;
use serde_json::Value;
use std::collections::HashSet;
use thiserror::Error;

use crate::core::scoring::clamp_score;
use crate::models::{Candidate, CandidateKind, ScoredMatch};

static FENCED_JSON: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?s)```(?:json)?\s*(\{.*?\})\s*```").expect("fenced JSON pattern is valid")
});

/// Score used when the oracle omits one
const DEFAULT_ORACLE_SCORE: f64 = 0.5;

/// Which extraction tier recovered the payload
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExtractionTier {
    Fenced,
    Balanced,
    Span,
}

/// Find the ranking JSON object inside `text`
pub fn extract_json(text: &str) -> Option<(ExtractionTier, Value)> {
    let fenced = FENCED_JSON
        .captures(text)
        .and_then(|caps| caps.get(1))
        .and_then(|m| parse_object(m.as_str()));
    if let Some(value) = fenced {
        return Some((ExtractionTier::Fenced, value));
    }

    if let Some(value) = balanced_objects(text).find_map(parse_object) {
        return Some((ExtractionTier::Balanced, value));
    }

    outer_span(text)
        .and_then(parse_object)
        .map(|value| (ExtractionTier::Span, value))
}

fn parse_object(slice: &str) -> Option<Value> {
    serde_json::from_str::<Value>(slice).ok().filter(Value::is_object)
}

/// Every `{...}` whose braces balance, in order of their opening brace,
/// ignoring braces inside JSON strings. Lazy, so callers stop scanning at the
/// first object they accept.
fn balanced_objects(text: &str) -> impl Iterator<Item = &str> {
    text.match_indices('{').filter_map(move |(open, _)| {
        closing_brace(text.as_bytes(), open).map(|close| &text[open..=close])
    })
}

/// Index of the `}` matching the `{` at `open`
fn closing_brace(bytes: &[u8], open: usize) -> Option<usize> {
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (i, &b) in bytes.iter().enumerate().skip(open) {
        if in_string {
            match b {
                _ if escaped => escaped = false,
                b'\\' => escaped = true,
                b'"' => in_string = false,
                _ => {}
            }
            continue;
        }
        match b {
            b'"' => in_string = true,
            b'{' => depth += 1,
            b'}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(i);
                }
            }
            _ => {}
        }
    }

    None
}

fn outer_span(text: &str) -> Option<&str> {
    let open = text.find('{')?;
    let close = text.rfind('}')?;
    (close > open).then(|| &text[open..=close])
}

#[derive(Debug, Deserialize)]
struct OraclePayload {
    ranked_matches: Vec<Value>,
    #[serde(default)]
    summary: Option<Value>,
}

/// Oracle ranking mapped back onto the candidate pool
#[derive(Debug, Clone, PartialEq)]
pub struct OracleRanking {
    pub matches: Vec<ScoredMatch>,
    pub summary: Option<String>,
    pub tier: ExtractionTier,
}

/// Why oracle text could not be turned into a ranking
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PayloadError {
    #[error("no JSON object found in oracle output")]
    NoJson,

    #[error("oracle output does not match ranking schema: {0}")]
    Schema(String),
}

/// Extract and coerce oracle text into scored matches for `pool`
///
/// Each entry is coerced on its own: ids and scores may arrive as numbers or
/// numeric strings, and an entry that cannot be read, names an id outside the
/// pool, or repeats an earlier id is dropped. Names come from the pool, not
/// from the oracle.
pub fn parse_ranking(
    text: &str,
    kind: CandidateKind,
    pool: &[Candidate],
) -> Result<OracleRanking, PayloadError> {
    let (tier, value) = extract_json(text).ok_or(PayloadError::NoJson)?;
    let payload: OraclePayload =
        serde_json::from_value(value).map_err(|e| PayloadError::Schema(e.to_string()))?;

    let mut seen = HashSet::new();
    let matches: Vec<ScoredMatch> = payload
        .ranked_matches
        .iter()
        .filter_map(|entry| coerce_entry(entry, kind, pool))
        .filter(|m| seen.insert(m.subject.id()))
        .collect();

    if matches.len() < payload.ranked_matches.len() {
        tracing::debug!(
            "Dropped {} of {} oracle entries",
            payload.ranked_matches.len() - matches.len(),
            payload.ranked_matches.len()
        );
    }

    let summary = payload
        .summary
        .as_ref()
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string);

    Ok(OracleRanking { matches, summary, tier })
}

fn coerce_entry(entry: &Value, kind: CandidateKind, pool: &[Candidate]) -> Option<ScoredMatch> {
    let id_field = match kind {
        CandidateKind::Host => "host_id",
        CandidateKind::Event => "event_id",
    };
    let id = entry.get(id_field).and_then(coerce_id)?;
    let candidate = pool.iter().find(|c| c.id() == id)?;

    let score = match entry.get("compatibility_score").or_else(|| entry.get("relevance_score")) {
        None | Some(Value::Null) => DEFAULT_ORACLE_SCORE,
        Some(value) => coerce_score(value)?,
    };

    let highlights = entry
        .get("highlights")
        .and_then(Value::as_array)
        .map(|items| items.iter().filter_map(Value::as_str).map(str::to_string).collect())
        .unwrap_or_default();

    Some(ScoredMatch {
        subject: candidate.subject(),
        compatibility_score: clamp_score(score),
        reasoning: entry
            .get("reasoning")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string(),
        highlights,
    })
}

fn coerce_id(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_f64().filter(|f| f.fract() == 0.0).map(|f| f as i64)),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn coerce_score(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}
