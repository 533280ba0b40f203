// ABOUTME: Prelude module - convenient imports for common use cases.
// ABOUTME: Use `use forkring::prelude::*;` to get started quickly.

pub use crate::agent::{
    Agent, AgentId, AgentState, AgentStats, CompletionSignal, DEFAULT_ACQUIRE_TIMEOUT,
};
pub use crate::config::{AcquisitionPolicy, TableConfig};
pub use crate::coordinator::{Coordinator, RunHandle, RunReport, RunStatus, run};
pub use crate::delay::{DelaySource, FixedDelay, RandomDelay};
pub use crate::error::{ConfigError, ProtocolViolation, TableError};
pub use crate::hook::{Hook, HookRegistry, NarrationHook, TableEvent};
pub use crate::resource::{ResourceRing, ResourceToken};
