//! Serializable scenario configuration.

use serde::{Deserialize, Serialize};

use exitlab_core::strategy::StrategyConfig;

/// Unique identifier for a scenario run (content-addressable hash).
pub type RunId = String;

/// One backtest target: a token on a chain over a candle window.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TargetSpec {
    pub mint: String,
    pub chain: String,
    /// Window bounds, epoch seconds UTC, inclusive.
    pub start_timestamp: i64,
    pub end_timestamp: i64,
}

impl TargetSpec {
    /// Stable human-readable label for logs and reports.
    pub fn label(&self) -> String {
        format!("{}:{}", self.chain, self.mint)
    }
}

/// How the batch reacts to a target failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorMode {
    /// Stop scheduling new targets after the first failure.
    FailFast,
    /// Record every failure and keep going.
    #[default]
    Collect,
}

/// Full scenario: targets, the strategy to run against each, and execution
/// settings for the batch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScenarioConfig {
    pub targets: Vec<TargetSpec>,
    pub strategy: StrategyConfig,
    /// Worker pool bound; 0 means one worker per logical CPU.
    #[serde(default)]
    pub concurrency: usize,
    #[serde(default)]
    pub error_mode: ErrorMode,
}

impl ScenarioConfig {
    /// Deterministic hash ID for this scenario.
    ///
    /// Two runs with identical configs share a RunId, which makes result
    /// artifacts directly comparable across invocations.
    pub fn run_id(&self) -> RunId {
        let json = serde_json::to_string(self).expect("ScenarioConfig serialization failed");
        blake3::hash(json.as_bytes()).to_hex().to_string()
    }

    pub fn from_toml_str(raw: &str) -> anyhow::Result<Self> {
        let config: Self = toml::from_str(raw)?;
        config.strategy.validate()?;
        Ok(config)
    }

    pub fn from_json_str(raw: &str) -> anyhow::Result<Self> {
        let config: Self = serde_json::from_str(raw)?;
        config.strategy.validate()?;
        Ok(config)
    }
}
