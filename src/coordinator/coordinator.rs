// ABOUTME: Run coordinator - builds the ring, starts every agent, and awaits their completion.
// ABOUTME: Surfaces configuration errors up front and cancels the run on protocol faults.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

use tokio::sync::mpsc;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use super::handle::RunHandle;
use super::report::RunReport;
use crate::agent::{Agent, AgentId};
use crate::config::TableConfig;
use crate::delay::DelaySource;
use crate::error::{ConfigError, TableError};
use crate::hook::{HookRegistry, TableEvent};
use crate::resource::ResourceRing;

/// Run `agents` agents for `cycles_per_agent` cycles each with default settings.
///
/// Returns once every agent has signalled completion.
pub async fn run(agents: usize, cycles_per_agent: u32) -> Result<RunReport, TableError> {
    Coordinator::new(TableConfig::new(agents, cycles_per_agent))?
        .run()
        .await
}

/// Coordinates one ring of agents from start to completion.
///
/// The coordinator owns no mutable state shared with the agents. Tokens live
/// in the ring; completion signals travel over a per-run channel.
///
/// # Termination
///
/// - Every agent signals: `Ok(RunReport)`.
/// - An agent faults: the remaining agents are cancelled and the fault is returned.
/// - The cancellation token fires first: `Err(TableError::Cancelled)`.
pub struct Coordinator {
    config: TableConfig,
    delays: Arc<dyn DelaySource>,
    hooks: Arc<HookRegistry>,
    cancel: CancellationToken,
}

impl Coordinator {
    /// Create a coordinator, validating the configuration.
    pub fn new(config: TableConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        let delays = Arc::new(config.random_delays());

        Ok(Self {
            config,
            delays,
            hooks: Arc::new(HookRegistry::new()),
            cancel: CancellationToken::new(),
        })
    }

    /// Replace the configured random delays.
    pub fn with_delays(mut self, delays: Arc<dyn DelaySource>) -> Self {
        self.delays = delays;
        self
    }

    pub fn with_hooks(mut self, hooks: Arc<HookRegistry>) -> Self {
        self.hooks = hooks;
        self
    }

    /// Use an externally owned cancellation token.
    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn config(&self) -> &TableConfig {
        &self.config
    }

    /// Token that cancels the run when triggered.
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Run every agent to completion.
    pub async fn run(&self) -> Result<RunReport, TableError> {
        let started = Instant::now();
        let run_id = Uuid::new_v4();
        let n = self.config.agents;
        let ring = ResourceRing::build(n)?;

        tracing::info!(
            %run_id,
            agents = n,
            cycles_per_agent = self.config.cycles_per_agent,
            policy = %self.config.policy,
            "starting run"
        );
        self.hooks
            .fire(&TableEvent::RunStart {
                run_id,
                agents: n,
                cycles_per_agent: self.config.cycles_per_agent,
            })
            .await;

        // A fault cancels this run's agents without touching the caller's token.
        let agents_cancel = self.cancel.child_token();
        let (tx, mut rx) = mpsc::channel(n);
        let mut tasks = JoinSet::new();
        let mut task_agents = HashMap::with_capacity(n);

        for i in 0..n {
            let (left, right) = ring.pair(i);
            let agent = Agent::new(AgentId(i), left, right, self.config.cycles_per_agent)
                .policy(self.config.policy)
                .acquire_timeout(self.config.acquire_timeout())
                .delays(self.delays.clone())
                .hooks(self.hooks.clone());

            let handle = tasks.spawn(agent.run(tx.clone(), agents_cancel.clone()));
            task_agents.insert(handle.id(), AgentId(i));
        }
        drop(tx);

        let mut completions = Vec::with_capacity(n);
        let mut fault: Option<TableError> = None;

        loop {
            tokio::select! {
                Some(signal) = rx.recv() => {
                    tracing::debug!(
                        agent = %signal.agent,
                        received = completions.len() + 1,
                        expected = n,
                        "completion signal"
                    );
                    completions.push(signal);
                }
                Some(joined) = tasks.join_next_with_id() => {
                    let err = match joined {
                        Ok((_, Ok(_))) => continue,
                        Ok((_, Err(violation))) => TableError::Protocol(violation),
                        Err(join_err) => TableError::AgentPanicked {
                            agent: task_agents[&join_err.id()],
                            message: join_err.to_string(),
                        },
                    };

                    tracing::error!(%run_id, error = %err, "agent fault, cancelling run");
                    agents_cancel.cancel();
                    if fault.is_none() {
                        fault = Some(err);
                    }
                }
                else => break,
            }
        }

        let completed = completions.len();
        let result = match fault {
            Some(err) => Err(err),
            None if completed < n => Err(TableError::Cancelled {
                completed,
                expected: n,
            }),
            None => Ok(RunReport {
                run_id,
                agents: n,
                cycles_per_agent: self.config.cycles_per_agent,
                policy: self.config.policy,
                completions,
                elapsed_ms: u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX),
            }),
        };

        match &result {
            Ok(report) => tracing::info!(
                %run_id,
                agents = n,
                elapsed_ms = report.elapsed_ms,
                "all agents finished"
            ),
            Err(err) => tracing::warn!(%run_id, completed, error = %err, "run ended early"),
        }
        self.hooks
            .fire(&TableEvent::RunEnd {
                run_id,
                completed,
                error: result.as_ref().err().map(|e| e.to_string()),
            })
            .await;

        result
    }

    /// Start the run in the background.
    pub fn spawn(self) -> RunHandle {
        RunHandle::spawn(self)
    }
}
