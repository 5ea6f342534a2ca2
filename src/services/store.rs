use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

use crate::models::{Candidate, Event, Host};

const BUNDLED_HOSTS: &str = include_str!("../../data/hosts.json");
const BUNDLED_EVENTS: &str = include_str!("../../data/events.json");

/// Errors that can occur when loading candidate data
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Failed to read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: serde_json::Error,
    },
}

/// Host pool filter: available on `date` with room for `min_capacity` guests
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HostFilter {
    #[serde(default, alias = "visitor_date_range")]
    pub date: Option<String>,
    #[serde(default = "default_min_capacity")]
    pub min_capacity: u32,
}

fn default_min_capacity() -> u32 { 1 }

impl Default for HostFilter {
    fn default() -> Self {
        Self {
            date: None,
            min_capacity: default_min_capacity(),
        }
    }
}

impl HostFilter {
    pub fn on(date: impl Into<String>) -> Self {
        Self {
            date: Some(date.into()),
            ..Self::default()
        }
    }

    #[inline]
    pub fn matches(&self, host: &Host) -> bool {
        if host.capacity < self.min_capacity {
            return false;
        }

        match &self.date {
            Some(date) => host.is_available_on(date),
            None => true,
        }
    }
}

/// Event pool filter; every set field must match
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventFilter {
    #[serde(default)]
    pub category: Option<String>,
    /// Inclusive, ISO dates compare lexically
    #[serde(default)]
    pub date_from: Option<String>,
    #[serde(default)]
    pub date_to: Option<String>,
    #[serde(default)]
    pub free_only: bool,
    /// Comma-separated; an event matches if it carries any of them
    #[serde(default)]
    pub tags: Option<String>,
}

impl EventFilter {
    #[inline]
    pub fn matches(&self, event: &Event) -> bool {
        if let Some(category) = &self.category {
            if !event.category.eq_ignore_ascii_case(category) {
                return false;
            }
        }

        if let Some(from) = &self.date_from {
            if event.date.as_str() < from.as_str() {
                return false;
            }
        }

        if let Some(to) = &self.date_to {
            if event.date.as_str() > to.as_str() {
                return false;
            }
        }

        if self.free_only && !event.is_free() {
            return false;
        }

        if let Some(tags) = &self.tags {
            let wanted: Vec<String> = tags
                .split(',')
                .map(|t| t.trim().to_lowercase())
                .filter(|t| !t.is_empty())
                .collect();
            if !wanted.is_empty()
                && !event.tags.iter().any(|t| wanted.contains(&t.to_lowercase()))
            {
                return false;
            }
        }

        true
    }
}

/// What to fetch from the store
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CandidateQuery {
    Hosts(HostFilter),
    Events(EventFilter),
}

/// Read-only access to persisted hosts and events
#[async_trait]
pub trait CandidateStore: Send + Sync {
    async fn get_candidates(&self, query: &CandidateQuery) -> Result<Vec<Candidate>, StoreError>;
}

/// Candidate pools held in memory for the life of the process
#[derive(Debug, Clone, Default)]
pub struct InMemoryStore {
    hosts: Vec<Host>,
    events: Vec<Event>,
}

impl InMemoryStore {
    pub fn new(hosts: Vec<Host>, events: Vec<Event>) -> Self {
        Self { hosts, events }
    }

    /// The sample hosts and campus events shipped with the crate
    pub fn bundled() -> Result<Self, StoreError> {
        Ok(Self {
            hosts: parse_json("bundled hosts.json", BUNDLED_HOSTS)?,
            events: parse_json("bundled events.json", BUNDLED_EVENTS)?,
        })
    }

    /// Load pools from JSON files; a missing path falls back to the bundled data
    pub fn load(hosts_path: Option<&Path>, events_path: Option<&Path>) -> Result<Self, StoreError> {
        let hosts = match hosts_path {
            Some(path) => read_json(path)?,
            None => parse_json("bundled hosts.json", BUNDLED_HOSTS)?,
        };
        let events = match events_path {
            Some(path) => read_json(path)?,
            None => parse_json("bundled events.json", BUNDLED_EVENTS)?,
        };

        tracing::debug!("Loaded {} hosts and {} events", hosts.len(), events.len());

        Ok(Self { hosts, events })
    }

    pub fn hosts(&self, filter: &HostFilter) -> Vec<Host> {
        self.hosts.iter().filter(|h| filter.matches(h)).cloned().collect()
    }

    /// Matching events, sorted by date
    pub fn events(&self, filter: &EventFilter) -> Vec<Event> {
        let mut events: Vec<Event> = self.events.iter().filter(|e| filter.matches(e)).cloned().collect();
        events.sort_by(|a, b| a.date.cmp(&b.date));
        events
    }
}

#[async_trait]
impl CandidateStore for InMemoryStore {
    async fn get_candidates(&self, query: &CandidateQuery) -> Result<Vec<Candidate>, StoreError> {
        let candidates = match query {
            CandidateQuery::Hosts(filter) => self.hosts(filter).into_iter().map(Candidate::Host).collect(),
            CandidateQuery::Events(filter) => self.events(filter).into_iter().map(Candidate::Event).collect(),
        };
        Ok(candidates)
    }
}

fn read_json<T: for<'de> Deserialize<'de>>(path: &Path) -> Result<Vec<T>, StoreError> {
    let display = path.display().to_string();
    let contents = std::fs::read_to_string(path).map_err(|source| StoreError::Io {
        path: display.clone(),
        source,
    })?;
    parse_json(&display, &contents)
}

fn parse_json<T: for<'de> Deserialize<'de>>(path: &str, contents: &str) -> Result<Vec<T>, StoreError> {
    serde_json::from_str(contents).map_err(|source| StoreError::Parse {
        path: path.to_string(),
        source,
    })
}
