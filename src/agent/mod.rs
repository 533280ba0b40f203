// ABOUTME: Agent module - actors competing for adjacent tokens in the ring.
// ABOUTME: Provides the state machine runner, its states, counters, and completion signal.

mod runner;
mod state;

pub use runner::{Agent, DEFAULT_ACQUIRE_TIMEOUT};
pub use state::{AgentId, AgentState, AgentStats, CompletionSignal};
