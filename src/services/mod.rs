// Service exports
pub mod oracle;
pub mod store;

pub use oracle::{DisabledOracle, LlmOracle, OracleError, OracleRequest, OracleResult, RankingOracle};
pub use store::{CandidateQuery, CandidateStore, EventFilter, HostFilter, InMemoryStore, StoreError};
