// Model exports
pub mod domain;
pub mod requests;
pub mod responses;

pub use domain::{
    Candidate, CandidateKind, Event, EventWeights, Host, HostWeights, MatchQuery, MatchSubject,
    RankedMatchEntry, RankedMatchesPayload, RankedResult, ScoredMatch,
};
pub use requests::{MatchHostsRequest, RecommendEventsRequest};
pub use responses::{ErrorResponse, HealthResponse, MatchResponse};
