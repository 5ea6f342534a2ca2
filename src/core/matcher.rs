use std::cmp::Ordering;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

use crate::core::conflicts::ConflictTable;
use crate::core::scoring::{KeywordScorer, QueryTerms};
use crate::models::{Candidate, CandidateKind, EventWeights, HostWeights, MatchQuery, RankedResult, ScoredMatch};
use crate::services::oracle::{DisabledOracle, OracleError, OracleRequest, OracleResult, RankingOracle};

/// Summary attached to event rankings produced without the oracle
pub const EVENT_FALLBACK_SUMMARY: &str = "AI recommendations unavailable. Events ranked by keyword overlap.";

/// Errors a ranking call reports to its caller
///
/// Oracle failures never appear here; they are absorbed into the fallback path.
#[derive(Debug, Error)]
pub enum MatchError {
    #[error("Invalid query: {0}")]
    InvalidQuery(String),

    #[error("Candidate pool for {expected} ranking contains a {found}")]
    MalformedPool {
        expected: CandidateKind,
        found: CandidateKind,
    },
}

/// Post-processing rules shared by the oracle and fallback paths
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MatchRules {
    /// Hosts scoring at or below this are dropped
    pub min_host_score: f64,
    /// Host results kept when the query sets no limit
    pub default_max_results: usize,
    /// Event results kept when the query sets no limit
    pub event_top_k: usize,
    /// Bound on one whole oracle consultation
    pub oracle_timeout: Duration,
}

impl Default for MatchRules {
    fn default() -> Self {
        Self {
            min_host_score: 0.2,
            default_max_results: 10,
            event_top_k: 5,
            oracle_timeout: Duration::from_secs(10),
        }
    }
}

/// Main ranking orchestrator
///
/// # Pipeline
/// 1. Validate the query and pool
/// 2. Consult the oracle, unless it has no credential
/// 3. On any oracle failure, score every candidate with the keyword scorer
/// 4. Sort by score (stable, so ties keep pool order), apply the host
///    threshold, truncate
#[derive(Clone)]
pub struct Matcher {
    oracle: Arc<dyn RankingOracle>,
    scorer: KeywordScorer,
    rules: MatchRules,
}

impl Matcher {
    pub fn new(oracle: Arc<dyn RankingOracle>, scorer: KeywordScorer, rules: MatchRules) -> Self {
        Self { oracle, scorer, rules }
    }

    /// Keyword scoring only, with the default table, weights and rules
    pub fn with_defaults() -> Self {
        Self::new(
            Arc::new(DisabledOracle),
            KeywordScorer::new(
                Arc::new(ConflictTable::default()),
                HostWeights::default(),
                EventWeights::default(),
            ),
            MatchRules::default(),
        )
    }

    pub fn rules(&self) -> &MatchRules {
        &self.rules
    }

    pub fn oracle_configured(&self) -> bool {
        self.oracle.is_configured()
    }

    /// Rank `pool` against `query`
    ///
    /// # Arguments
    /// * `query` - The requester's free-text preferences and constraints
    /// * `pool` - Candidates of `query.kind`, in store order
    ///
    /// # Returns
    /// The ranked result; `ai_enabled` records which path produced it
    pub async fn rank(&self, query: &MatchQuery, pool: Vec<Candidate>) -> Result<RankedResult, MatchError> {
        validate(query, &pool)?;

        if pool.is_empty() {
            tracing::info!("Empty {} pool, nothing to rank", query.kind);
            return Ok(RankedResult::empty(false));
        }

        let mut raw_output = None;

        if self.oracle.is_configured() {
            match self.consult_oracle(query, &pool).await {
                Ok(ranking) => {
                    let matches = self.postprocess(query, ranking.matches);
                    tracing::info!(
                        "Oracle ranked {} of {} {} candidates",
                        matches.len(),
                        pool.len(),
                        query.kind
                    );
                    return Ok(RankedResult {
                        matches,
                        ai_enabled: true,
                        summary: ranking.summary,
                        raw_output: None,
                    });
                }
                Err(e) => {
                    tracing::warn!("Oracle ranking failed, using keyword scoring: {}", e);
                    raw_output = e.raw_output().map(str::to_string);
                }
            }
        } else {
            tracing::debug!("No oracle credential configured, using keyword scoring");
        }

        let matches = self.postprocess(query, self.score_pool(query, &pool));
        tracing::info!(
            "Keyword scoring kept {} of {} {} candidates",
            matches.len(),
            pool.len(),
            query.kind
        );

        let summary = match query.kind {
            CandidateKind::Host => None,
            CandidateKind::Event => Some(EVENT_FALLBACK_SUMMARY.to_string()),
        };

        Ok(RankedResult {
            matches,
            ai_enabled: false,
            summary,
            raw_output,
        })
    }

    /// Score every candidate with the keyword scorer, in pool order
    pub fn score_pool(&self, query: &MatchQuery, pool: &[Candidate]) -> Vec<ScoredMatch> {
        let terms = QueryTerms::parse(&query.text);

        pool.iter()
            .map(|candidate| {
                let score = self.scorer.score_terms(&terms, candidate);
                ScoredMatch {
                    subject: candidate.subject(),
                    compatibility_score: score.value,
                    reasoning: score.reasoning,
                    highlights: score.highlights,
                }
            })
            .collect()
    }

    /// One bounded oracle attempt; the oracle future is dropped on timeout
    async fn consult_oracle(&self, query: &MatchQuery, pool: &[Candidate]) -> OracleResult {
        let request = OracleRequest { query, pool };
        let timeout = self.rules.oracle_timeout;

        match tokio::time::timeout(timeout, self.oracle.rank(request)).await {
            Ok(result) => result,
            Err(_) => Err(OracleError::Timeout(timeout)),
        }
    }

    fn postprocess(&self, query: &MatchQuery, mut matches: Vec<ScoredMatch>) -> Vec<ScoredMatch> {
        // sort_by is stable: equal scores keep pool (or oracle) order
        matches.sort_by(|a, b| {
            b.compatibility_score
                .partial_cmp(&a.compatibility_score)
                .unwrap_or(Ordering::Equal)
        });

        let limit = match query.kind {
            CandidateKind::Host => {
                let threshold = self.rules.min_host_score;
                matches.retain(|m| m.compatibility_score > threshold);
                query.max_results.unwrap_or(self.rules.default_max_results)
            }
            CandidateKind::Event => query.max_results.unwrap_or(self.rules.event_top_k),
        };

        matches.truncate(limit);
        matches
    }
}

impl Default for Matcher {
    fn default() -> Self {
        Self::with_defaults()
    }
}

fn validate(query: &MatchQuery, pool: &[Candidate]) -> Result<(), MatchError> {
    if query.text.trim().is_empty() {
        return Err(MatchError::InvalidQuery("query text is required".to_string()));
    }

    if query.max_results == Some(0) {
        return Err(MatchError::InvalidQuery("max_results must be at least 1".to_string()));
    }

    if let Some(stray) = pool.iter().find(|c| c.kind() != query.kind) {
        return Err(MatchError::MalformedPool {
            expected: query.kind,
            found: stray.kind(),
        });
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Event, Host};

    fn create_host(id: i64, vibe: &str, interests: &str) -> Candidate {
        Candidate::Host(Host {
            id,
            name: format!("Host {}", id),
            interests: interests.to_string(),
            dorm_vibe: vibe.to_string(),
            available_dates: vec!["2025-11-08".to_string()],
            capacity: 1,
        })
    }

    fn create_event(id: i64, title: &str, tags: &[&str]) -> Candidate {
        Candidate::Event(Event {
            id,
            title: title.to_string(),
            description: String::new(),
            date: "2025-11-12".to_string(),
            time: "19:00".to_string(),
            location: "Frist".to_string(),
            category: "social".to_string(),
            cost: 5.0,
            tags: tags.iter().map(|t| t.to_string()).collect(),
        })
    }

    #[test]
    fn test_rank_hosts_fallback() {
        let matcher = Matcher::with_defaults();
        let query = MatchQuery::hosts("I need a quiet place, early bedtime", "2025-11-08");
        let pool = vec![
            create_host(102, "Loud, frequent guests, night owl.", "Late-night gaming, heavy sleeper, social."),
            create_host(101, "Quiet space, early bedtime (11 PM).", "Quiet study, loves coffee, early riser."),
        ];

        let result = tokio_test::block_on(matcher.rank(&query, pool)).unwrap();

        assert!(!result.ai_enabled);
        assert_eq!(result.len(), 1);
        assert_eq!(result.matches[0].subject.id(), 101);
        assert!(result.matches[0].compatibility_score >= 0.7);
    }

    #[test]
    fn test_empty_pool_is_not_an_error() {
        let matcher = Matcher::with_defaults();
        let query = MatchQuery::hosts("quiet", "2025-11-08");
        let result = tokio_test::block_on(matcher.rank(&query, vec![])).unwrap();
        assert!(result.is_empty());
        assert!(!result.ai_enabled);
    }

    #[test]
    fn test_blank_query_rejected() {
        let matcher = Matcher::with_defaults();
        let query = MatchQuery::hosts("   ", "2025-11-08");
        let err = tokio_test::block_on(matcher.rank(&query, vec![create_host(1, "quiet", "")])).unwrap_err();
        assert!(matches!(err, MatchError::InvalidQuery(_)));
    }

    #[test]
    fn test_zero_max_results_rejected() {
        let matcher = Matcher::with_defaults();
        let query = MatchQuery::events("music").with_max_results(0);
        let err = tokio_test::block_on(matcher.rank(&query, vec![])).unwrap_err();
        assert!(matches!(err, MatchError::InvalidQuery(_)));
    }

    #[test]
    fn test_mixed_pool_rejected() {
        let matcher = Matcher::with_defaults();
        let query = MatchQuery::hosts("quiet", "2025-11-08");
        let pool = vec![create_host(1, "quiet", ""), create_event(2, "Quiet Reading", &[])];

        let err = tokio_test::block_on(matcher.rank(&query, pool)).unwrap_err();
        assert!(matches!(
            err,
            MatchError::MalformedPool { expected: CandidateKind::Host, found: CandidateKind::Event }
        ));
    }

    #[test]
    fn test_ties_keep_pool_order() {
        let matcher = Matcher::with_defaults();
        // both earn base 0.3 + interests 0.3 = 0.6
        let query = MatchQuery::hosts("chess", "2025-11-08");
        let pool = vec![
            create_host(7, "", "chess"),
            create_host(3, "", "chess"),
            create_host(5, "", "chess"),
        ];

        let result = tokio_test::block_on(matcher.rank(&query, pool)).unwrap();
        let ids: Vec<i64> = result.matches.iter().map(|m| m.subject.id()).collect();
        assert_eq!(ids, vec![7, 3, 5]);
    }

    #[test]
    fn test_host_threshold_is_exclusive() {
        let rules = MatchRules { min_host_score: 0.3, ..MatchRules::default() };
        let matcher = Matcher::new(
            Arc::new(DisabledOracle),
            KeywordScorer::new(Arc::new(ConflictTable::default()), HostWeights::default(), EventWeights::default()),
            rules,
        );
        // no overlap leaves exactly the 0.3 base, which is not above the threshold
        let query = MatchQuery::hosts("chess", "2025-11-08");
        let result = tokio_test::block_on(matcher.rank(&query, vec![create_host(1, "", "tennis")])).unwrap();
        assert!(result.is_empty());
    }

    #[test]
    fn test_events_keep_top_k_without_threshold() {
        let matcher = Matcher::with_defaults();
        let query = MatchQuery::events("poetry");
        let pool: Vec<Candidate> = (1..=8).map(|i| create_event(i, "Board Games", &[])).collect();

        let result = tokio_test::block_on(matcher.rank(&query, pool)).unwrap();

        // nothing matches, yet the top five are still returned
        assert_eq!(result.len(), 5);
        assert!(result.matches.iter().all(|m| m.compatibility_score == 0.0));
        assert_eq!(result.summary.as_deref(), Some(EVENT_FALLBACK_SUMMARY));
    }

    #[test]
    fn test_events_ranked_by_overlap() {
        let matcher = Matcher::with_defaults();
        let query = MatchQuery::events("poetry and music").with_max_results(2);
        let pool = vec![
            create_event(1, "Soccer Match", &["sports"]),
            create_event(2, "Open Mic & Poetry Night", &["poetry", "music"]),
            create_event(3, "A Cappella Jam", &["music"]),
        ];

        let result = tokio_test::block_on(matcher.rank(&query, pool)).unwrap();
        let ids: Vec<i64> = result.matches.iter().map(|m| m.subject.id()).collect();
        assert_eq!(ids, vec![2, 3]);
    }
}
