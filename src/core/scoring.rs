use std::collections::HashSet;
use std::sync::Arc;

use crate::core::conflicts::ConflictTable;
use crate::models::{Candidate, Event, EventWeights, Host, HostWeights};

/// Reasoning used when no keyword matched or conflicted
pub const BASIC_MATCH_REASONING: &str = "Basic keyword matching (AI unavailable)";

/// Query words shorter than this never earn partial (substring) bonuses
const PARTIAL_MIN_CHARS: usize = 4;

/// Function words ignored by the event scorer
const EVENT_STOPWORDS: &[&str] = &[
    "a", "an", "and", "are", "at", "be", "but", "by", "for", "from", "i", "im", "in", "is", "it",
    "me", "my", "of", "on", "or", "so", "that", "the", "to", "with",
];

/// Score for one (query, candidate) pair
#[derive(Debug, Clone, PartialEq)]
pub struct Score {
    /// Always within [0.0, 1.0]
    pub value: f64,
    pub reasoning: String,
    pub highlights: Vec<String>,
}

/// A tokenized query, reusable across every candidate in a pool
#[derive(Debug, Clone)]
pub struct QueryTerms {
    lowered: String,
    /// Lowercased whitespace tokens in first-seen order, deduplicated
    words: Vec<String>,
    /// Words with surrounding punctuation removed, used on the event scale
    keywords: Vec<String>,
}

impl QueryTerms {
    pub fn parse(query: &str) -> Self {
        let lowered = query.to_lowercase();

        let words: Vec<String> = {
            let mut seen = HashSet::new();
            lowered
                .split_whitespace()
                .filter(|w| seen.insert(*w))
                .map(str::to_string)
                .collect()
        };

        let keywords = {
            let mut seen = HashSet::new();
            words
                .iter()
                .map(|w| trim_punctuation(w))
                .filter(|w| !w.is_empty() && !EVENT_STOPWORDS.contains(w))
                .filter(|w| seen.insert(*w))
                .map(str::to_string)
                .collect()
        };

        Self { lowered, words, keywords }
    }

    pub fn words(&self) -> &[String] {
        &self.words
    }

    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }
}

#[inline]
fn trim_punctuation(word: &str) -> &str {
    word.trim_matches(|c: char| !c.is_alphanumeric())
}

/// Deterministic keyword scorer used when the oracle is unavailable
///
/// Hosts and events are scored on separate scales and must never be compared
/// in one list:
/// - hosts accumulate floats from `HostWeights::base`, with conflict
///   penalties weighing more than any single bonus;
/// - events accumulate integer points, divided by `EventWeights::divisor`
///   and capped at 1.0.
#[derive(Debug, Clone)]
pub struct KeywordScorer {
    conflicts: Arc<ConflictTable>,
    host: HostWeights,
    event: EventWeights,
}

impl KeywordScorer {
    pub fn new(conflicts: Arc<ConflictTable>, host: HostWeights, event: EventWeights) -> Self {
        Self { conflicts, host, event }
    }

    pub fn conflicts(&self) -> &ConflictTable {
        &self.conflicts
    }

    /// Score a single candidate against a raw query string
    pub fn score(&self, query: &str, candidate: &Candidate) -> Score {
        self.score_terms(&QueryTerms::parse(query), candidate)
    }

    pub fn score_terms(&self, terms: &QueryTerms, candidate: &Candidate) -> Score {
        match candidate {
            Candidate::Host(host) => self.score_host(terms, host),
            Candidate::Event(event) => self.score_event(terms, event),
        }
    }

    /// Host scale: vibe and interests overlap, minus lifestyle conflicts
    pub fn score_host(&self, terms: &QueryTerms, host: &Host) -> Score {
        let w = &self.host;
        let mut score = w.base;
        let mut trail = Vec::new();
        let mut highlights = Vec::new();

        let vibe = host.dorm_vibe.to_lowercase();
        if !vibe.is_empty() {
            let exact = exact_matches(terms, &vibe);
            if !exact.is_empty() {
                score += w.vibe_match;
                trail.push(format!("vibe matches: {}", exact.join(", ")));
                push_unique(&mut highlights, &exact);
            }

            for word in terms.words() {
                let Some(opposites) = self.conflicts.opposites(word) else {
                    continue;
                };
                for opposite in opposites {
                    if vibe.contains(opposite.as_str()) {
                        score -= w.conflict_penalty;
                        trail.push(format!("conflict: {} vs {}", word, opposite));
                    }
                }
            }

            for word in partial_matches(terms, &vibe, &exact) {
                score += w.vibe_partial;
                trail.push(format!("partial vibe match: {}", word));
                push_unique(&mut highlights, &[word]);
            }
        }

        let interests = host.interests.to_lowercase();
        if !interests.is_empty() {
            let exact = exact_matches(terms, &interests);
            if !exact.is_empty() {
                score += w.interest_match;
                trail.push(format!("interests match: {}", exact.join(", ")));
                push_unique(&mut highlights, &exact);
            }

            for word in partial_matches(terms, &interests, &exact) {
                score += w.interest_partial;
                trail.push(format!("partial interest match: {}", word));
                push_unique(&mut highlights, &[word]);
            }
        }

        finish(score, trail, highlights)
    }

    /// Event scale: integer points for title, tag, description and category hits
    pub fn score_event(&self, terms: &QueryTerms, event: &Event) -> Score {
        let w = &self.event;

        let title_words = keyword_set(&event.title);
        let description_words = keyword_set(&event.description);
        let tags: Vec<String> = event.tags.iter().map(|t| t.to_lowercase()).collect();
        let category = event.category.to_lowercase();

        let mut title_hits = Vec::new();
        let mut tag_hits = Vec::new();
        let mut description_hits = Vec::new();
        let mut category_hit = None;

        for keyword in &terms.keywords {
            let keyword = keyword.as_str();
            if title_words.contains(keyword) {
                title_hits.push(keyword);
            }
            if tags.iter().any(|t| t == keyword) {
                tag_hits.push(keyword);
            }
            if description_words.contains(keyword) {
                description_hits.push(keyword);
            }
            if category_hit.is_none() && category == keyword {
                category_hit = Some(keyword);
            }
        }

        // multi-word tags ("open mic") match as a phrase anywhere in the query
        for tag in tags.iter().filter(|t| t.contains(' ')) {
            if terms.lowered.contains(tag.as_str()) {
                tag_hits.push(tag.as_str());
            }
        }

        let wants_free = terms.keywords.iter().any(|k| k == "free");
        let free_hit = wants_free && event.is_free();

        let mut points = title_hits.len() as u32 * w.title
            + tag_hits.len() as u32 * w.tag
            + description_hits.len() as u32 * w.description;
        if category_hit.is_some() {
            points += w.category;
        }
        if free_hit {
            points += w.free;
        }

        let mut trail = Vec::new();
        let mut highlights = Vec::new();
        if !title_hits.is_empty() {
            trail.push(format!("title matches: {}", title_hits.join(", ")));
            push_unique(&mut highlights, &title_hits);
        }
        if !tag_hits.is_empty() {
            trail.push(format!("tags match: {}", tag_hits.join(", ")));
            push_unique(&mut highlights, &tag_hits);
        }
        if !description_hits.is_empty() {
            trail.push(format!("description matches: {}", description_hits.join(", ")));
            push_unique(&mut highlights, &description_hits);
        }
        if let Some(category) = category_hit {
            trail.push(format!("category match: {}", category));
            push_unique(&mut highlights, &[category]);
        }
        if free_hit {
            trail.push("free event".to_string());
            push_unique(&mut highlights, &["free"]);
        }

        let divisor = w.divisor.max(1);
        let value = points.min(divisor) as f64 / divisor as f64;

        finish(value, trail, highlights)
    }
}

/// Query words present as whole words in `text`, in query order
fn exact_matches<'a>(terms: &'a QueryTerms, text: &str) -> Vec<&'a str> {
    let text_words: HashSet<&str> = text.split_whitespace().collect();
    terms
        .words()
        .iter()
        .map(String::as_str)
        .filter(|w| text_words.contains(w))
        .collect()
}

/// Longer query words found inside `text` that were not already exact matches
fn partial_matches<'a>(terms: &'a QueryTerms, text: &str, exact: &[&str]) -> Vec<&'a str> {
    terms
        .words()
        .iter()
        .map(String::as_str)
        .filter(|w| w.chars().count() >= PARTIAL_MIN_CHARS)
        .filter(|w| text.contains(w) && !exact.contains(w))
        .collect()
}

fn keyword_set(text: &str) -> HashSet<String> {
    text.to_lowercase()
        .split_whitespace()
        .map(trim_punctuation)
        .filter(|w| !w.is_empty())
        .map(str::to_string)
        .collect()
}

fn push_unique(highlights: &mut Vec<String>, words: &[&str]) {
    for word in words {
        if !highlights.iter().any(|h| h == word) {
            highlights.push((*word).to_string());
        }
    }
}

fn finish(value: f64, trail: Vec<String>, highlights: Vec<String>) -> Score {
    let reasoning = if trail.is_empty() {
        BASIC_MATCH_REASONING.to_string()
    } else {
        trail.join("; ")
    };

    Score {
        value: clamp_score(value),
        reasoning,
        highlights,
    }
}

/// Clamp to [0.0, 1.0]; non-finite values become 0.0
#[inline]
pub fn clamp_score(value: f64) -> f64 {
    if value.is_finite() {
        value.clamp(0.0, 1.0)
    } else {
        0.0
    }
}
