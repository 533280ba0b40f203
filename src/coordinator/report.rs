// ABOUTME: Summary of a completed run.
// ABOUTME: Collects completion signals in arrival order with contention totals.

use serde::Serialize;
use uuid::Uuid;

use crate::agent::{AgentId, CompletionSignal};
use crate::config::AcquisitionPolicy;

/// Result of a run in which every agent reached its target.
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub run_id: Uuid,
    pub agents: usize,
    pub cycles_per_agent: u32,
    pub policy: AcquisitionPolicy,
    /// Completion signals in the order they arrived.
    pub completions: Vec<CompletionSignal>,
    pub elapsed_ms: u64,
}

impl RunReport {
    /// The completion signal sent by `agent`, if any.
    pub fn completion_for(&self, agent: AgentId) -> Option<&CompletionSignal> {
        self.completions.iter().find(|c| c.agent == agent)
    }

    /// Total completed cycles across all agents.
    pub fn total_cycles(&self) -> u64 {
        self.completions.iter().map(|c| u64::from(c.cycles)).sum()
    }

    /// Total abandoned attempts: (left token busy, right token timed out).
    pub fn contention(&self) -> (u64, u64) {
        self.completions.iter().fold((0, 0), |(busy, timeouts), c| {
            (
                busy + u64::from(c.stats.left_busy),
                timeouts + u64::from(c.stats.right_timeouts),
            )
        })
    }
}
