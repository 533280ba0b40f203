// ABOUTME: Identity, lifecycle states, and counters for a ring agent.
// ABOUTME: AgentState mirrors the think/acquire/use/release cycle.

use serde::Serialize;

/// Index of an agent in its ring, in `[0, n)`.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Debug, Serialize)]
#[serde(transparent)]
pub struct AgentId(pub usize);

impl AgentId {
    pub fn index(self) -> usize {
        self.0
    }
}

impl std::fmt::Display for AgentId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "agent-{}", self.0)
    }
}

/// Where an agent is in its cycle.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum AgentState {
    /// Pausing before the next attempt. Holds nothing.
    Thinking,
    /// Attempting the first token of the pair. Holds nothing.
    AcquiringLeft,
    /// Attempting the second token. Holds the first.
    AcquiringRight,
    /// Performing the exclusive operation. Holds both.
    Using,
    /// Giving both tokens back.
    Releasing,
    /// Target reached and completion signalled.
    Done,
    /// Abandoned on shutdown without signalling.
    Cancelled,
}

impl AgentState {
    /// Returns true for states the agent never leaves.
    pub fn is_terminal(self) -> bool {
        matches!(self, AgentState::Done | AgentState::Cancelled)
    }
}

impl std::fmt::Display for AgentState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AgentState::Thinking => write!(f, "thinking"),
            AgentState::AcquiringLeft => write!(f, "acquiring-left"),
            AgentState::AcquiringRight => write!(f, "acquiring-right"),
            AgentState::Using => write!(f, "using"),
            AgentState::Releasing => write!(f, "releasing"),
            AgentState::Done => write!(f, "done"),
            AgentState::Cancelled => write!(f, "cancelled"),
        }
    }
}

/// Counters accumulated over an agent's run.
#[derive(Clone, Copy, Default, PartialEq, Eq, Debug, Serialize)]
pub struct AgentStats {
    /// Completed `Using` phases.
    pub cycles: u32,
    /// Attempts abandoned because the left token was taken.
    pub left_busy: u32,
    /// Attempts abandoned because the right token did not free up in time.
    pub right_timeouts: u32,
}

impl AgentStats {
    /// Acquisition attempts, successful or not.
    pub fn attempts(&self) -> u32 {
        self.cycles + self.left_busy + self.right_timeouts
    }
}

/// Emitted exactly once by an agent that reached its target cycle count.
#[derive(Clone, Debug, Serialize)]
pub struct CompletionSignal {
    pub agent: AgentId,
    pub cycles: u32,
    pub stats: AgentStats,
}
