// ABOUTME: Defines all error types for the forkring library using thiserror.
// ABOUTME: Configuration and protocol faults are unified under TableError.

use crate::agent::AgentId;

/// Top-level error type for a coordinated run.
#[derive(Debug, thiserror::Error)]
pub enum TableError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Protocol violation: {0}")]
    Protocol(#[from] ProtocolViolation),

    #[error("Agent {agent} panicked: {message}")]
    AgentPanicked { agent: AgentId, message: String },

    #[error("Run cancelled after {completed} of {expected} agents completed")]
    Cancelled { completed: usize, expected: usize },

    #[error("Run aborted: {0}")]
    RunAborted(String),
}

/// Errors raised while building or validating a run configuration.
///
/// All of these are surfaced before any agent starts.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("A ring needs at least 2 agents, got {0}")]
    TooFewAgents(usize),

    #[error("Cycles per agent must be at least 1")]
    ZeroCycles,

    #[error("Acquire timeout must be greater than zero")]
    ZeroTimeout,

    #[error("Invalid {name} delay range: min {min_ms}ms exceeds max {max_ms}ms")]
    InvalidDelayRange {
        name: &'static str,
        min_ms: u64,
        max_ms: u64,
    },

    #[error("Failed to read config: {0}")]
    Load(#[from] std::io::Error),

    #[error("Failed to parse config: {0}")]
    Parse(#[from] serde_json::Error),
}

/// A token was released by an agent that does not hold it.
///
/// This is a broken invariant, not contention. The token is left untouched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProtocolViolation {
    /// Ring index of the token.
    pub token: usize,
    /// Agent holding the token at the time of the call, if any.
    pub holder: Option<AgentId>,
    /// Agent that attempted the release.
    pub requester: AgentId,
}

impl std::fmt::Display for ProtocolViolation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.holder {
            Some(holder) => write!(
                f,
                "{} released token {} held by {}",
                self.requester, self.token, holder
            ),
            None => write!(
                f,
                "{} released token {} that was not held",
                self.requester, self.token
            ),
        }
    }
}

impl std::error::Error for ProtocolViolation {}
