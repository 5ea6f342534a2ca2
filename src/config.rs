use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use std::collections::HashMap;
use std::fmt;
use std::path::Path;
use std::time::Duration;

use crate::core::{ConflictTable, MatchRules};
use crate::models::{EventWeights, HostWeights};

/// Application configuration
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub server: ServerSettings,
    #[serde(default)]
    pub oracle: OracleSettings,
    #[serde(default)]
    pub matching: MatchingSettings,
    #[serde(default)]
    pub scoring: ScoringSettings,
    #[serde(default)]
    pub store: StoreSettings,
    #[serde(default)]
    pub logging: LoggingSettings,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerSettings {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    pub workers: Option<usize>,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            workers: None,
        }
    }
}

fn default_host() -> String { "127.0.0.1".to_string() }
fn default_port() -> u16 { 5000 }

#[derive(Debug, Clone, Deserialize)]
pub struct OracleSettings {
    #[serde(default = "default_oracle_endpoint")]
    pub endpoint: String,
    #[serde(default = "default_oracle_model")]
    pub model: String,
    /// Usually supplied through ANTHROPIC_API_KEY or CLAUDE_API_KEY
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default = "default_oracle_timeout_secs")]
    pub timeout_secs: u64,
    /// Upper bound on model calls per ranking, tool round-trips included
    #[serde(default = "default_oracle_max_steps")]
    pub max_steps: usize,
    #[serde(default = "default_oracle_max_tokens")]
    pub max_tokens: u32,
    /// Offer candidate-store tools to the model
    #[serde(default = "default_true")]
    pub agentic: bool,
}

impl Default for OracleSettings {
    fn default() -> Self {
        Self {
            endpoint: default_oracle_endpoint(),
            model: default_oracle_model(),
            api_key: None,
            timeout_secs: default_oracle_timeout_secs(),
            max_steps: default_oracle_max_steps(),
            max_tokens: default_oracle_max_tokens(),
            agentic: true,
        }
    }
}

impl OracleSettings {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

fn default_oracle_endpoint() -> String { "https://api.anthropic.com".to_string() }
fn default_oracle_model() -> String { "claude-3-5-sonnet-20241022".to_string() }
fn default_oracle_timeout_secs() -> u64 { 10 }
fn default_oracle_max_steps() -> usize { 5 }
fn default_oracle_max_tokens() -> u32 { 2000 }
fn default_true() -> bool { true }

#[derive(Debug, Clone, Deserialize)]
pub struct MatchingSettings {
    /// Hosts scoring at or below this are dropped
    #[serde(default = "default_min_host_score")]
    pub min_host_score: f64,
    #[serde(default = "default_max_results")]
    pub default_max_results: usize,
    #[serde(default = "default_event_top_k")]
    pub event_top_k: usize,
    /// Replaces the built-in lifestyle conflict table when set
    #[serde(default)]
    pub conflicts: Option<HashMap<String, Vec<String>>>,
}

impl Default for MatchingSettings {
    fn default() -> Self {
        Self {
            min_host_score: default_min_host_score(),
            default_max_results: default_max_results(),
            event_top_k: default_event_top_k(),
            conflicts: None,
        }
    }
}

fn default_min_host_score() -> f64 { 0.2 }
fn default_max_results() -> usize { 10 }
fn default_event_top_k() -> usize { 5 }

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ScoringSettings {
    #[serde(default)]
    pub host: HostWeightsConfig,
    #[serde(default)]
    pub event: EventWeightsConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct HostWeightsConfig {
    #[serde(default = "default_base_weight")]
    pub base: f64,
    #[serde(default = "default_vibe_match_weight")]
    pub vibe_match: f64,
    #[serde(default = "default_vibe_partial_weight")]
    pub vibe_partial: f64,
    #[serde(default = "default_interest_match_weight")]
    pub interest_match: f64,
    #[serde(default = "default_interest_partial_weight")]
    pub interest_partial: f64,
    #[serde(default = "default_conflict_penalty")]
    pub conflict_penalty: f64,
}

impl Default for HostWeightsConfig {
    fn default() -> Self {
        Self {
            base: default_base_weight(),
            vibe_match: default_vibe_match_weight(),
            vibe_partial: default_vibe_partial_weight(),
            interest_match: default_interest_match_weight(),
            interest_partial: default_interest_partial_weight(),
            conflict_penalty: default_conflict_penalty(),
        }
    }
}

fn default_base_weight() -> f64 { 0.3 }
fn default_vibe_match_weight() -> f64 { 0.4 }
fn default_vibe_partial_weight() -> f64 { 0.2 }
fn default_interest_match_weight() -> f64 { 0.3 }
fn default_interest_partial_weight() -> f64 { 0.15 }
fn default_conflict_penalty() -> f64 { 0.5 }

#[derive(Debug, Clone, Deserialize)]
pub struct EventWeightsConfig {
    #[serde(default = "default_title_points")]
    pub title: u32,
    #[serde(default = "default_tag_points")]
    pub tag: u32,
    #[serde(default = "default_description_points")]
    pub description: u32,
    #[serde(default = "default_category_points")]
    pub category: u32,
    #[serde(default = "default_free_points")]
    pub free: u32,
    #[serde(default = "default_divisor")]
    pub divisor: u32,
}

impl Default for EventWeightsConfig {
    fn default() -> Self {
        Self {
            title: default_title_points(),
            tag: default_tag_points(),
            description: default_description_points(),
            category: default_category_points(),
            free: default_free_points(),
            divisor: default_divisor(),
        }
    }
}

fn default_title_points() -> u32 { 3 }
fn default_tag_points() -> u32 { 4 }
fn default_description_points() -> u32 { 2 }
fn default_category_points() -> u32 { 2 }
fn default_free_points() -> u32 { 2 }
fn default_divisor() -> u32 { 10 }

/// Seed files for the read-only candidate store; bundled data when unset
#[derive(Debug, Clone, Default, Deserialize)]
pub struct StoreSettings {
    pub hosts_path: Option<String>,
    pub events_path: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingSettings {
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default = "default_log_format")]
    pub format: String,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

fn default_log_level() -> String { "info".to_string() }
fn default_log_format() -> String { "json".to_string() }

/// Oracle API key; never printed
#[derive(Clone, PartialEq, Eq)]
pub struct OracleCredential(String);

impl OracleCredential {
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for OracleCredential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("OracleCredential(***)")
    }
}

impl Settings {
    /// Load configuration from file and environment variables
    ///
    /// Configuration is loaded in the following order (later overrides earlier):
    /// 1. Default values in the struct
    /// 2. Configuration file (config/default.toml)
    /// 3. Local overrides (config/local.toml)
    /// 4. Environment variables (prefixed with CAMPUS_)
    pub fn load() -> Result<Self, ConfigError> {
        let mut settings = Config::builder()
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name("config/local").required(false))
            // e.g., CAMPUS__ORACLE__TIMEOUT_SECS -> oracle.timeout_secs
            .add_source(
                Environment::with_prefix("CAMPUS")
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        settings = substitute_env_vars(settings)?;

        settings.try_deserialize()
    }

    /// Load configuration from a custom path
    pub fn load_from<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let settings = Config::builder()
            .add_source(File::from(path.as_ref()))
            .add_source(
                Environment::with_prefix("CAMPUS")
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        settings.try_deserialize()
    }

    /// The oracle credential, if one is configured
    ///
    /// Absence is a normal condition and routes every ranking to keyword scoring.
    pub fn oracle_credential(&self) -> Option<OracleCredential> {
        self.oracle
            .api_key
            .as_deref()
            .map(str::trim)
            .filter(|key| !key.is_empty())
            .map(OracleCredential::new)
    }

    pub fn host_weights(&self) -> HostWeights {
        let w = &self.scoring.host;
        HostWeights {
            base: w.base,
            vibe_match: w.vibe_match,
            vibe_partial: w.vibe_partial,
            interest_match: w.interest_match,
            interest_partial: w.interest_partial,
            conflict_penalty: w.conflict_penalty,
        }
    }

    pub fn event_weights(&self) -> EventWeights {
        let w = &self.scoring.event;
        EventWeights {
            title: w.title,
            tag: w.tag,
            description: w.description,
            category: w.category,
            free: w.free,
            divisor: w.divisor,
        }
    }

    pub fn conflict_table(&self) -> ConflictTable {
        match &self.matching.conflicts {
            Some(pairs) => ConflictTable::from_pairs(pairs.iter().map(|(k, v)| (k, v.clone()))),
            None => ConflictTable::default(),
        }
    }

    pub fn match_rules(&self) -> MatchRules {
        MatchRules {
            min_host_score: self.matching.min_host_score,
            default_max_results: self.matching.default_max_results,
            event_top_k: self.matching.event_top_k,
            oracle_timeout: self.oracle.timeout(),
        }
    }
}

/// Pull the oracle key from the conventional variables when the config
/// sources did not set one
fn substitute_env_vars(settings: Config) -> Result<Config, ConfigError> {
    use std::env;

    let has_key = settings
        .get_string("oracle.api_key")
        .map(|key| !key.trim().is_empty())
        .unwrap_or(false);

    if has_key {
        return Ok(settings);
    }

    let api_key = env::var("ANTHROPIC_API_KEY")
        .or_else(|_| env::var("CLAUDE_API_KEY"))
        .ok();

    let mut builder = Config::builder().add_source(settings);
    if let Some(api_key) = api_key {
        builder = builder.set_override("oracle.api_key", api_key)?;
    }

    builder.build()
}
