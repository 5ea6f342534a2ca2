use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// A student offering a room for a visit
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Host {
    pub id: i64,
    pub name: String,
    #[serde(default)]
    pub interests: String,
    #[serde(default)]
    pub dorm_vibe: String,
    #[serde(default)]
    pub available_dates: Vec<String>,
    #[serde(default = "default_capacity")]
    pub capacity: u32,
}

fn default_capacity() -> u32 { 1 }

impl Host {
    pub fn is_available_on(&self, date: &str) -> bool {
        self.available_dates.iter().any(|d| d == date)
    }
}

/// A campus event
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    pub id: i64,
    pub title: String,
    #[serde(default)]
    pub description: String,
    /// ISO date, e.g. "2025-11-12"
    pub date: String,
    #[serde(default)]
    pub time: String,
    #[serde(default)]
    pub location: String,
    #[serde(default)]
    pub category: String,
    /// 0.0 means free
    #[serde(default)]
    pub cost: f64,
    #[serde(default)]
    pub tags: Vec<String>,
}

impl Event {
    pub fn is_free(&self) -> bool {
        self.cost == 0.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CandidateKind {
    Host,
    Event,
}

impl fmt::Display for CandidateKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CandidateKind::Host => f.write_str("host"),
            CandidateKind::Event => f.write_str("event"),
        }
    }
}

/// Something that can be ranked against a query
#[derive(Debug, Clone, PartialEq)]
pub enum Candidate {
    Host(Host),
    Event(Event),
}

impl Candidate {
    pub fn kind(&self) -> CandidateKind {
        match self {
            Candidate::Host(_) => CandidateKind::Host,
            Candidate::Event(_) => CandidateKind::Event,
        }
    }

    pub fn id(&self) -> i64 {
        match self {
            Candidate::Host(h) => h.id,
            Candidate::Event(e) => e.id,
        }
    }

    pub fn display_name(&self) -> &str {
        match self {
            Candidate::Host(h) => &h.name,
            Candidate::Event(e) => &e.title,
        }
    }

    pub fn subject(&self) -> MatchSubject {
        match self {
            Candidate::Host(h) => MatchSubject::Host { host_id: h.id, name: h.name.clone() },
            Candidate::Event(e) => MatchSubject::Event { event_id: e.id, title: e.title.clone() },
        }
    }
}

/// A ranking request
#[derive(Debug, Clone)]
pub struct MatchQuery {
    pub kind: CandidateKind,
    /// Free-text preference statement
    pub text: String,
    /// Date the visitor needs a room (host matching only)
    pub date_needed: Option<String>,
    pub max_results: Option<usize>,
}

impl MatchQuery {
    pub fn hosts(text: impl Into<String>, date_needed: impl Into<String>) -> Self {
        Self {
            kind: CandidateKind::Host,
            text: text.into(),
            date_needed: Some(date_needed.into()),
            max_results: None,
        }
    }

    pub fn events(text: impl Into<String>) -> Self {
        Self {
            kind: CandidateKind::Event,
            text: text.into(),
            date_needed: None,
            max_results: None,
        }
    }

    pub fn with_max_results(mut self, max_results: usize) -> Self {
        self.max_results = Some(max_results);
        self
    }
}

/// Identity of a ranked candidate, serialized with the field names downstream
/// callers rely on (`host_id`/`name` or `event_id`/`title`)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MatchSubject {
    Host { host_id: i64, name: String },
    Event { event_id: i64, title: String },
}

impl MatchSubject {
    pub fn id(&self) -> i64 {
        match self {
            MatchSubject::Host { host_id, .. } => *host_id,
            MatchSubject::Event { event_id, .. } => *event_id,
        }
    }
}

/// Scored match result
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScoredMatch {
    pub subject: MatchSubject,
    /// Always within [0.0, 1.0]
    pub compatibility_score: f64,
    pub reasoning: String,
    pub highlights: Vec<String>,
}

/// Ordered output of one ranking call
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RankedResult {
    pub matches: Vec<ScoredMatch>,
    /// True when the oracle produced the ranking
    pub ai_enabled: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    /// Oracle text that could not be parsed, kept for diagnostics
    #[serde(skip_serializing_if = "Option::is_none")]
    pub raw_output: Option<String>,
}

impl RankedResult {
    pub fn empty(ai_enabled: bool) -> Self {
        Self {
            matches: Vec::new(),
            ai_enabled,
            summary: None,
            raw_output: None,
        }
    }

    pub fn len(&self) -> usize {
        self.matches.len()
    }

    pub fn is_empty(&self) -> bool {
        self.matches.is_empty()
    }

    /// Build the `{"ranked_matches": [...]}` wire payload
    pub fn to_payload(&self) -> RankedMatchesPayload {
        RankedMatchesPayload {
            ranked_matches: self
                .matches
                .iter()
                .map(|m| RankedMatchEntry {
                    subject: m.subject.clone(),
                    compatibility_score: m.compatibility_score,
                    reasoning: m.reasoning.clone(),
                })
                .collect(),
        }
    }

    /// Highlights keyed by candidate id, omitting candidates without any
    pub fn highlights_by_id(&self) -> BTreeMap<i64, Vec<String>> {
        self.matches
            .iter()
            .filter(|m| !m.highlights.is_empty())
            .map(|m| (m.subject.id(), m.highlights.clone()))
            .collect()
    }
}

/// Wire contract consumed by calling layers
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankedMatchesPayload {
    pub ranked_matches: Vec<RankedMatchEntry>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankedMatchEntry {
    #[serde(flatten)]
    pub subject: MatchSubject,
    pub compatibility_score: f64,
    pub reasoning: String,
}

/// Host-scale weights (float accumulation, clamped to [0, 1])
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HostWeights {
    pub base: f64,
    pub vibe_match: f64,
    pub vibe_partial: f64,
    pub interest_match: f64,
    pub interest_partial: f64,
    pub conflict_penalty: f64,
}

impl Default for HostWeights {
    fn default() -> Self {
        Self {
            base: 0.3,
            vibe_match: 0.4,
            vibe_partial: 0.2,
            interest_match: 0.3,
            interest_partial: 0.15,
            conflict_penalty: 0.5,
        }
    }
}

/// Event-scale weights (integer points, divided by `divisor` and capped at 1.0)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EventWeights {
    pub title: u32,
    pub tag: u32,
    pub description: u32,
    pub category: u32,
    pub free: u32,
    pub divisor: u32,
}

impl Default for EventWeights {
    fn default() -> Self {
        Self {
            title: 3,
            tag: 4,
            description: 2,
            category: 2,
            free: 2,
            divisor: 10,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_payload_uses_host_field_names() {
        let result = RankedResult {
            matches: vec![ScoredMatch {
                subject: MatchSubject::Host { host_id: 101, name: "Alex".to_string() },
                compatibility_score: 0.7,
                reasoning: "vibe matches: quiet".to_string(),
                highlights: vec!["quiet".to_string()],
            }],
            ai_enabled: false,
            summary: None,
            raw_output: None,
        };

        let json = serde_json::to_string(&result.to_payload()).unwrap();
        assert_eq!(
            json,
            r#"{"ranked_matches":[{"host_id":101,"name":"Alex","compatibility_score":0.7,"reasoning":"vibe matches: quiet"}]}"#
        );
    }

    #[test]
    fn test_payload_uses_event_field_names() {
        let entry = RankedMatchEntry {
            subject: MatchSubject::Event { event_id: 4, title: "Yoga by the Lake".to_string() },
            compatibility_score: 0.4,
            reasoning: "tags match: yoga".to_string(),
        };

        let value = serde_json::to_value(&entry).unwrap();
        assert_eq!(value["event_id"], 4);
        assert_eq!(value["title"], "Yoga by the Lake");
        assert!(value.get("host_id").is_none());
    }

    #[test]
    fn test_host_availability() {
        let host = Host {
            id: 1,
            name: "Alex".to_string(),
            interests: String::new(),
            dorm_vibe: String::new(),
            available_dates: vec!["2025-11-08".to_string()],
            capacity: 1,
        };
        assert!(host.is_available_on("2025-11-08"));
        assert!(!host.is_available_on("2025-11-09"));
    }
}
