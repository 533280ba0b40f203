// ABOUTME: Run configuration for a ring of agents.
// ABOUTME: Loadable from JSON, defaulted per field, and validated before any agent starts.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::delay::RandomDelay;
use crate::error::ConfigError;

/// How an agent goes about taking its two tokens.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AcquisitionPolicy {
    /// Left without waiting, right within the acquire timeout, back off on failure.
    #[default]
    BoundedWait,
    /// Lower-indexed token first, then the higher one, both waiting without bound.
    OrderedPair,
}

impl std::fmt::Display for AcquisitionPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AcquisitionPolicy::BoundedWait => write!(f, "bounded-wait"),
            AcquisitionPolicy::OrderedPair => write!(f, "ordered-pair"),
        }
    }
}

impl std::str::FromStr for AcquisitionPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "bounded-wait" => Ok(AcquisitionPolicy::BoundedWait),
            "ordered-pair" => Ok(AcquisitionPolicy::OrderedPair),
            other => Err(format!(
                "unknown policy '{}' (expected bounded-wait or ordered-pair)",
                other
            )),
        }
    }
}

/// Configuration for one coordinated run.
///
/// Every field has a default, so a JSON file only needs the fields it changes.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TableConfig {
    /// Number of agents, and of tokens in the ring. At least 2.
    pub agents: usize,

    /// Successful cycles each agent must complete.
    pub cycles_per_agent: u32,

    /// Bound on waiting for the right token while holding the left.
    pub acquire_timeout_ms: u64,

    pub think_min_ms: u64,
    pub think_max_ms: u64,
    pub use_min_ms: u64,
    pub use_max_ms: u64,

    /// Seed for think/use durations. Random when absent.
    pub seed: Option<u64>,

    pub policy: AcquisitionPolicy,
}

impl Default for TableConfig {
    fn default() -> Self {
        Self {
            agents: 5,
            cycles_per_agent: 3,
            acquire_timeout_ms: 500,
            think_min_ms: 0,
            think_max_ms: 999,
            use_min_ms: 0,
            use_max_ms: 999,
            seed: None,
            policy: AcquisitionPolicy::BoundedWait,
        }
    }
}

impl TableConfig {
    /// Default configuration with the given agent and cycle counts.
    pub fn new(agents: usize, cycles_per_agent: u32) -> Self {
        Self {
            agents,
            cycles_per_agent,
            ..Default::default()
        }
    }

    /// Parse a configuration from JSON and validate it.
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let config: TableConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse, and validate a JSON configuration file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let config = Self::read(path)?;
        config.validate()?;
        Ok(config)
    }

    /// Read and parse a JSON configuration file without validating it.
    ///
    /// For layering further overrides on a partial file; call
    /// [`validate`](Self::validate) once they are applied.
    pub fn read(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let json = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&json)?)
    }

    /// Check the configuration for values that cannot produce a run.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.agents < 2 {
            return Err(ConfigError::TooFewAgents(self.agents));
        }
        if self.cycles_per_agent == 0 {
            return Err(ConfigError::ZeroCycles);
        }
        if self.acquire_timeout_ms == 0 {
            return Err(ConfigError::ZeroTimeout);
        }
        if self.think_min_ms > self.think_max_ms {
            return Err(ConfigError::InvalidDelayRange {
                name: "think",
                min_ms: self.think_min_ms,
                max_ms: self.think_max_ms,
            });
        }
        if self.use_min_ms > self.use_max_ms {
            return Err(ConfigError::InvalidDelayRange {
                name: "use",
                min_ms: self.use_min_ms,
                max_ms: self.use_max_ms,
            });
        }
        Ok(())
    }

    pub fn acquire_timeout(&self) -> Duration {
        Duration::from_millis(self.acquire_timeout_ms)
    }

    /// Random delay source over the configured ranges.
    ///
    /// Call only on a validated configuration; empty ranges panic.
    pub fn random_delays(&self) -> RandomDelay {
        RandomDelay::new(
            self.think_min_ms..=self.think_max_ms,
            self.use_min_ms..=self.use_max_ms,
            self.seed,
        )
    }
}
