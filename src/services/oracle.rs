use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

use crate::config::{OracleCredential, OracleSettings};
use crate::core::extract::{parse_ranking, OracleRanking};
use crate::models::{Candidate, CandidateKind, MatchQuery};
use crate::services::store::{CandidateQuery, CandidateStore, EventFilter, HostFilter};

const ANTHROPIC_VERSION: &str = "2023-06-01";
const HOSTS_TOOL: &str = "find_available_hosts";
const EVENTS_TOOL: &str = "list_events";

/// Errors that can occur when consulting the ranking oracle
#[derive(Debug, Error)]
pub enum OracleError {
    #[error("Oracle credential not configured")]
    Unavailable,

    #[error("Oracle did not answer within {0:?}")]
    Timeout(Duration),

    #[error("HTTP request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Oracle returned HTTP {status}: {body}")]
    Api { status: u16, body: String },

    #[error("Invalid oracle output: {reason}")]
    Format { reason: String, raw_output: String },

    #[error("Oracle still calling tools after {0} steps")]
    StepBudgetExhausted(usize),
}

impl OracleError {
    /// Unparseable oracle text, when that is what went wrong
    pub fn raw_output(&self) -> Option<&str> {
        match self {
            OracleError::Format { raw_output, .. } => Some(raw_output),
            _ => None,
        }
    }
}

/// Outcome of one oracle consultation
pub type OracleResult = Result<OracleRanking, OracleError>;

/// Everything the oracle sees for one ranking call
#[derive(Debug, Clone, Copy)]
pub struct OracleRequest<'a> {
    pub query: &'a MatchQuery,
    pub pool: &'a [Candidate],
}

/// An external service that ranks a candidate pool against a query
///
/// Implementations never retry; a failed consultation is reported once and
/// the caller decides what to do.
#[async_trait]
pub trait RankingOracle: Send + Sync {
    /// Whether a credential is present. Unconfigured oracles are never called.
    fn is_configured(&self) -> bool;

    async fn rank(&self, request: OracleRequest<'_>) -> OracleResult;
}

/// Oracle used when no credential is configured
#[derive(Debug, Clone, Copy, Default)]
pub struct DisabledOracle;

#[async_trait]
impl RankingOracle for DisabledOracle {
    fn is_configured(&self) -> bool {
        false
    }

    async fn rank(&self, _request: OracleRequest<'_>) -> OracleResult {
        Err(OracleError::Unavailable)
    }
}

#[derive(Serialize)]
struct MessagesRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    messages: &'a [Value],
    #[serde(skip_serializing_if = "<[Value]>::is_empty")]
    tools: &'a [Value],
}

#[derive(Deserialize)]
struct MessagesResponse {
    #[serde(default)]
    content: Vec<Value>,
}

impl MessagesResponse {
    fn text(&self) -> String {
        self.content
            .iter()
            .filter(|block| block["type"] == "text")
            .filter_map(|block| block["text"].as_str())
            .collect::<Vec<_>>()
            .join("\n")
    }

    fn tool_calls(&self) -> Vec<ToolCall> {
        self.content
            .iter()
            .filter(|block| block["type"] == "tool_use")
            .map(|block| ToolCall {
                id: block["id"].as_str().unwrap_or_default().to_string(),
                name: block["name"].as_str().unwrap_or_default().to_string(),
                input: block["input"].clone(),
            })
            .collect()
    }
}

#[derive(Debug)]
struct ToolCall {
    id: String,
    name: String,
    input: Value,
}

/// Hosted-LLM oracle speaking the Anthropic messages API
///
/// With a candidate store attached the model may look candidates up itself
/// through tools; each model call counts against `max_steps`.
pub struct LlmOracle {
    client: Client,
    endpoint: String,
    model: String,
    credential: Option<OracleCredential>,
    max_steps: usize,
    max_tokens: u32,
    timeout: Duration,
    store: Option<Arc<dyn CandidateStore>>,
}

impl LlmOracle {
    pub fn new(settings: &OracleSettings, credential: Option<OracleCredential>) -> Result<Self, OracleError> {
        let client = Client::builder().timeout(settings.timeout()).build()?;

        Ok(Self {
            client,
            endpoint: settings.endpoint.clone(),
            model: settings.model.clone(),
            credential,
            max_steps: settings.max_steps.max(1),
            max_tokens: settings.max_tokens,
            timeout: settings.timeout(),
            store: None,
        })
    }

    /// Let the model call back into `store` for candidates
    pub fn with_store(mut self, store: Arc<dyn CandidateStore>) -> Self {
        self.store = Some(store);
        self
    }

    async fn send(
        &self,
        credential: &OracleCredential,
        messages: &[Value],
        tools: &[Value],
    ) -> Result<MessagesResponse, OracleError> {
        let url = format!("{}/v1/messages", self.endpoint.trim_end_matches('/'));
        let body = MessagesRequest {
            model: &self.model,
            max_tokens: self.max_tokens,
            messages,
            tools,
        };

        let response = self
            .client
            .post(&url)
            .header("x-api-key", credential.expose())
            .header("anthropic-version", ANTHROPIC_VERSION)
            .json(&body)
            .send()
            .await
            .map_err(|e| self.transport_error(e))?;

        let status = response.status();
        let text = response.text().await.map_err(|e| self.transport_error(e))?;

        if !status.is_success() {
            return Err(OracleError::Api {
                status: status.as_u16(),
                body: text,
            });
        }

        serde_json::from_str(&text).map_err(|e| OracleError::Format {
            reason: format!("unexpected response envelope: {}", e),
            raw_output: text,
        })
    }

    /// Client-side timeouts are reported as timeouts, not transport failures
    fn transport_error(&self, e: reqwest::Error) -> OracleError {
        if e.is_timeout() {
            OracleError::Timeout(self.timeout)
        } else {
            OracleError::Transport(e)
        }
    }

    async fn run_tool(&self, store: &dyn CandidateStore, call: &ToolCall) -> Value {
        let query = match call.name.as_str() {
            HOSTS_TOOL => serde_json::from_value::<HostFilter>(call.input.clone()).map(CandidateQuery::Hosts),
            EVENTS_TOOL => serde_json::from_value::<EventFilter>(call.input.clone()).map(CandidateQuery::Events),
            other => return tool_error(&call.id, format!("unknown tool: {}", other)),
        };

        let query = match query {
            Ok(query) => query,
            Err(e) => return tool_error(&call.id, format!("invalid arguments: {}", e)),
        };

        match store.get_candidates(&query).await {
            Ok(candidates) => {
                tracing::debug!("Oracle tool {} returned {} candidates", call.name, candidates.len());
                json!({
                    "type": "tool_result",
                    "tool_use_id": call.id,
                    "content": serialize_pool(&candidates),
                })
            }
            Err(e) => tool_error(&call.id, e.to_string()),
        }
    }
}

#[async_trait]
impl RankingOracle for LlmOracle {
    fn is_configured(&self) -> bool {
        self.credential.is_some()
    }

    async fn rank(&self, request: OracleRequest<'_>) -> OracleResult {
        let credential = self.credential.as_ref().ok_or(OracleError::Unavailable)?;
        let kind = request.query.kind;

        let tools = match &self.store {
            Some(_) => vec![tool_definition(kind)],
            None => Vec::new(),
        };
        let mut messages = vec![json!({
            "role": "user",
            "content": build_prompt(&request),
        })];

        for step in 1..=self.max_steps {
            let reply = self.send(credential, &messages, &tools).await?;
            let calls = reply.tool_calls();

            let store = match &self.store {
                Some(store) if !calls.is_empty() => store,
                _ => {
                    let text = reply.text();
                    tracing::debug!("Oracle answered after {} step(s)", step);
                    return parse_ranking(&text, kind, request.pool).map_err(|e| OracleError::Format {
                        reason: e.to_string(),
                        raw_output: text,
                    });
                }
            };

            let mut results = Vec::with_capacity(calls.len());
            for call in &calls {
                results.push(self.run_tool(store.as_ref(), call).await);
            }

            messages.push(json!({ "role": "assistant", "content": reply.content }));
            messages.push(json!({ "role": "user", "content": results }));
        }

        Err(OracleError::StepBudgetExhausted(self.max_steps))
    }
}

fn tool_error(tool_use_id: &str, message: String) -> Value {
    json!({
        "type": "tool_result",
        "tool_use_id": tool_use_id,
        "content": message,
        "is_error": true,
    })
}

fn tool_definition(kind: CandidateKind) -> Value {
    match kind {
        CandidateKind::Host => json!({
            "name": HOSTS_TOOL,
            "description": "Find hosts available on a date with at least the given capacity. Returns a JSON list of host profiles.",
            "input_schema": {
                "type": "object",
                "properties": {
                    "visitor_date_range": { "type": "string", "description": "Date the visitor needs a room, e.g. 2025-11-08" },
                    "min_capacity": { "type": "integer", "minimum": 1 }
                },
                "required": ["visitor_date_range"]
            }
        }),
        CandidateKind::Event => json!({
            "name": EVENTS_TOOL,
            "description": "List campus events, optionally filtered. Returns a JSON list of events sorted by date.",
            "input_schema": {
                "type": "object",
                "properties": {
                    "category": { "type": "string" },
                    "date_from": { "type": "string", "description": "Inclusive YYYY-MM-DD" },
                    "date_to": { "type": "string", "description": "Inclusive YYYY-MM-DD" },
                    "free_only": { "type": "boolean" },
                    "tags": { "type": "string", "description": "Comma-separated tags" }
                }
            }
        }),
    }
}

fn serialize_pool(pool: &[Candidate]) -> String {
    let values: Vec<Value> = pool
        .iter()
        .filter_map(|candidate| match candidate {
            Candidate::Host(host) => serde_json::to_value(host).ok(),
            Candidate::Event(event) => serde_json::to_value(event).ok(),
        })
        .collect();

    serde_json::to_string_pretty(&values).unwrap_or_else(|_| "[]".to_string())
}

/// Instruction prompt embedding the query, its constraint and the full pool
pub fn build_prompt(request: &OracleRequest<'_>) -> String {
    let pool = serialize_pool(request.pool);
    let query = &request.query.text;

    match request.query.kind {
        CandidateKind::Host => {
            let date = request.query.date_needed.as_deref().unwrap_or("an unspecified date");
            format!(
                r#"You rank dorm hosts for a college visitor by lifestyle compatibility.

The visitor needs a room on {date}. In their words: "{query}"

Available hosts:
{pool}

Compare each host's dorm_vibe and interests with the visitor's request. Treat a
clear lifestyle clash (for example a quiet visitor and a loud, night-owl host)
as more important than several small overlaps. You may call {tool} to refresh
the host list for the visitor's date.

Reply with a single JSON object and nothing else:
{{"ranked_matches": [{{"host_id": <id>, "name": "<name>", "compatibility_score": <0.0-1.0>, "reasoning": "<one sentence>"}}]}}
Order the list from best to worst match."#,
                tool = HOSTS_TOOL,
            )
        }
        CandidateKind::Event => {
            let limit = request
                .query
                .max_results
                .map(|n| format!("Return at most {} events.", n))
                .unwrap_or_default();
            format!(
                r#"You recommend campus events to a student.

The student's interests: "{query}"

Available events:
{pool}

Rank the events from most to least relevant to these interests and note any
special features such as free entry. {limit}

Reply with a single JSON object and nothing else:
{{"ranked_matches": [{{"event_id": <id>, "title": "<title>", "compatibility_score": <0.0-1.0>, "reasoning": "<one sentence>", "highlights": ["<feature>"]}}], "summary": "<one sentence overview>"}}"#
            )
        }
    }
}
