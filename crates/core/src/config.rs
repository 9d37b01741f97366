use serde::Deserialize;

/// Root application configuration. Loaded from environment variables with
/// the prefix `ADPULSE__`.
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    #[serde(default = "default_node_id")]
    pub node_id: String,
    #[serde(default)]
    pub ranking: RankingConfig,
    #[serde(default)]
    pub overrun: OverrunConfig,
    #[serde(default)]
    pub selection: SelectionConfig,
}

/// Weights of the composite priority score. A weighted sum, deliberately not
/// normalized to 1. The heuristic never fully settled upstream, so the
/// weights are configuration rather than constants; the previous generation
/// of the heuristic (0.5 / 0.25 / 0.15) remains reachable here.
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct RankingConfig {
    #[serde(default = "default_w_profit")]
    pub w_profit: f64,
    #[serde(default = "default_w_ml")]
    pub w_ml: f64,
    #[serde(default = "default_w_capacity")]
    pub w_capacity: f64,
}

/// Soft budget policy: with `probability`, a candidate may exceed its
/// impression limit by `allowance` (a fraction of the limit). Avoids a hard
/// delivery stop exactly at the limit while keeping overspend bounded.
/// Tunable policy, not law. `probability: 0` disables overrun entirely.
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct OverrunConfig {
    #[serde(default = "default_overrun_probability")]
    pub probability: f64,
    #[serde(default = "default_overrun_allowance")]
    pub allowance: f64,
}

#[derive(Debug, Clone, Copy, Deserialize)]
pub struct SelectionConfig {
    /// Cap on candidates fetched per selection request.
    #[serde(default = "default_candidate_limit")]
    pub candidate_limit: usize,
}

fn default_node_id() -> String {
    "node-01".to_string()
}
fn default_w_profit() -> f64 {
    0.8
}
fn default_w_ml() -> f64 {
    0.2
}
fn default_w_capacity() -> f64 {
    0.1
}
fn default_overrun_probability() -> f64 {
    0.25
}
fn default_overrun_allowance() -> f64 {
    0.1
}
fn default_candidate_limit() -> usize {
    512
}

impl Default for RankingConfig {
    fn default() -> Self {
        Self {
            w_profit: default_w_profit(),
            w_ml: default_w_ml(),
            w_capacity: default_w_capacity(),
        }
    }
}

impl Default for OverrunConfig {
    fn default() -> Self {
        Self {
            probability: default_overrun_probability(),
            allowance: default_overrun_allowance(),
        }
    }
}

impl OverrunConfig {
    /// A policy that never grants overrun, for deterministic paths.
    pub fn disabled() -> Self {
        Self {
            probability: 0.0,
            allowance: 0.0,
        }
    }
}

impl Default for SelectionConfig {
    fn default() -> Self {
        Self {
            candidate_limit: default_candidate_limit(),
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            node_id: default_node_id(),
            ranking: RankingConfig::default(),
            overrun: OverrunConfig::default(),
            selection: SelectionConfig::default(),
        }
    }
}

impl AppConfig {
    /// Load configuration from environment variables.
    pub fn load() -> Result<Self, config::ConfigError> {
        let builder = config::Config::builder().add_source(
            config::Environment::with_prefix("ADPULSE")
                .separator("__")
                .try_parsing(true)
                .list_separator(","),
        );

        let config = builder.build()?;
        config.try_deserialize()
    }
}
