// ABOUTME: Agent runner - drives the think/acquire/use/release state machine.
// ABOUTME: Handles bounded-wait backoff, ordered acquisition, cancellation, and completion signalling.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use super::state::{AgentId, AgentState, AgentStats, CompletionSignal};
use crate::config::AcquisitionPolicy;
use crate::delay::{DelaySource, FixedDelay};
use crate::error::ProtocolViolation;
use crate::hook::{HookRegistry, TableEvent};
use crate::resource::ResourceToken;

/// Default bound on waiting for the right token while holding the left.
pub const DEFAULT_ACQUIRE_TIMEOUT: Duration = Duration::from_millis(500);

/// An actor competing for the two tokens on either side of it.
///
/// The agent does not own its tokens. It shares them with its neighbors and
/// takes them transactionally: both or neither by the end of each attempt.
///
/// # Acquisition
///
/// Under [`AcquisitionPolicy::BoundedWait`] the left token is tried without
/// waiting and the right token is waited on for at most the acquire timeout.
/// On either failure the agent holds nothing and goes back to thinking, so no
/// agent can hold one token while waiting forever for the other.
///
/// Under [`AcquisitionPolicy::OrderedPair`] the lower-indexed token of the pair
/// is taken first (in `AcquiringLeft`) and the higher-indexed one second (in
/// `AcquiringRight`), each waiting without bound.
///
/// Neither policy guarantees fairness: under adversarial timing an agent may
/// keep losing its tokens to its neighbors.
pub struct Agent {
    id: AgentId,
    left: Arc<ResourceToken>,
    right: Arc<ResourceToken>,
    target: u32,
    policy: AcquisitionPolicy,
    acquire_timeout: Duration,
    delays: Arc<dyn DelaySource>,
    hooks: Arc<HookRegistry>,
    state: AgentState,
    stats: AgentStats,
}

impl Agent {
    /// Create an agent bound to a token pair, with no think or use delay.
    pub fn new(
        id: AgentId,
        left: Arc<ResourceToken>,
        right: Arc<ResourceToken>,
        target: u32,
    ) -> Self {
        Self {
            id,
            left,
            right,
            target,
            policy: AcquisitionPolicy::default(),
            acquire_timeout: DEFAULT_ACQUIRE_TIMEOUT,
            delays: Arc::new(FixedDelay::zero()),
            hooks: Arc::new(HookRegistry::new()),
            state: AgentState::Thinking,
            stats: AgentStats::default(),
        }
    }

    pub fn policy(mut self, policy: AcquisitionPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn acquire_timeout(mut self, timeout: Duration) -> Self {
        self.acquire_timeout = timeout;
        self
    }

    pub fn delays(mut self, delays: Arc<dyn DelaySource>) -> Self {
        self.delays = delays;
        self
    }

    pub fn hooks(mut self, hooks: Arc<HookRegistry>) -> Self {
        self.hooks = hooks;
        self
    }

    pub fn id(&self) -> AgentId {
        self.id
    }

    pub fn state(&self) -> AgentState {
        self.state
    }

    pub fn stats(&self) -> AgentStats {
        self.stats
    }

    /// Run the agent until it completes its target or is cancelled.
    ///
    /// Sends exactly one [`CompletionSignal`] on `signals` when the target is
    /// reached. A cancelled agent releases what it holds and sends nothing.
    ///
    /// Returns the terminal state, or the fault if a token release failed.
    pub async fn run(
        mut self,
        signals: mpsc::Sender<CompletionSignal>,
        cancel: CancellationToken,
    ) -> Result<AgentState, ProtocolViolation> {
        tracing::debug!(
            agent = %self.id,
            left = self.left.index(),
            right = self.right.index(),
            target = self.target,
            policy = %self.policy,
            "agent starting"
        );

        while !self.state.is_terminal() {
            let next = if cancel.is_cancelled() {
                self.abandon().await?
            } else {
                self.step(&signals, &cancel).await?
            };

            tracing::trace!(agent = %self.id, from = %self.state, to = %next, "transition");
            self.state = next;
        }

        Ok(self.state)
    }

    /// Perform the work of the current state and return the next one.
    async fn step(
        &mut self,
        signals: &mpsc::Sender<CompletionSignal>,
        cancel: &CancellationToken,
    ) -> Result<AgentState, ProtocolViolation> {
        match self.state {
            AgentState::Thinking => {
                let duration = self.delays.think_duration(self.id);
                self.hooks
                    .fire(&TableEvent::Thinking {
                        agent: self.id,
                        duration,
                    })
                    .await;

                if !pause(duration, cancel).await {
                    return self.abandon().await;
                }
                Ok(AgentState::AcquiringLeft)
            }

            AgentState::AcquiringLeft => {
                let (first, _) = self.order();

                let acquired = match self.policy {
                    AcquisitionPolicy::BoundedWait => first.try_acquire(self.id),
                    AcquisitionPolicy::OrderedPair => {
                        tokio::select! {
                            biased;
                            () = cancel.cancelled() => return self.abandon().await,
                            () = first.acquire(self.id) => true,
                        }
                    }
                };

                if acquired {
                    self.hooks
                        .fire(&TableEvent::AcquiredLeft {
                            agent: self.id,
                            token: first.index(),
                        })
                        .await;
                    Ok(AgentState::AcquiringRight)
                } else {
                    self.stats.left_busy += 1;
                    self.hooks
                        .fire(&TableEvent::LeftBusy {
                            agent: self.id,
                            token: first.index(),
                        })
                        .await;
                    Ok(AgentState::Thinking)
                }
            }

            AgentState::AcquiringRight => {
                let (first, second) = self.order();

                let acquired = match self.policy {
                    AcquisitionPolicy::BoundedWait => {
                        tokio::select! {
                            biased;
                            () = cancel.cancelled() => return self.abandon().await,
                            acquired = second.try_acquire_within(self.id, self.acquire_timeout) => acquired,
                        }
                    }
                    AcquisitionPolicy::OrderedPair => {
                        tokio::select! {
                            biased;
                            () = cancel.cancelled() => return self.abandon().await,
                            () = second.acquire(self.id) => true,
                        }
                    }
                };

                if acquired {
                    self.hooks
                        .fire(&TableEvent::AcquiredRight {
                            agent: self.id,
                            token: second.index(),
                        })
                        .await;
                    Ok(AgentState::Using)
                } else {
                    self.stats.right_timeouts += 1;
                    self.hooks
                        .fire(&TableEvent::RightTimedOut {
                            agent: self.id,
                            token: second.index(),
                            left: first.index(),
                        })
                        .await;
                    first.release(self.id)?;
                    Ok(AgentState::Thinking)
                }
            }

            AgentState::Using => {
                let duration = self.delays.use_duration(self.id);
                self.hooks
                    .fire(&TableEvent::Using {
                        agent: self.id,
                        cycle: self.stats.cycles + 1,
                        duration,
                    })
                    .await;

                if !pause(duration, cancel).await {
                    return self.abandon().await;
                }
                Ok(AgentState::Releasing)
            }

            AgentState::Releasing => {
                let (first, second) = self.order();
                self.hooks
                    .fire(&TableEvent::Releasing {
                        agent: self.id,
                        left: first.index(),
                        right: second.index(),
                        cycle: self.stats.cycles + 1,
                    })
                    .await;

                second.release(self.id)?;
                first.release(self.id)?;
                self.stats.cycles += 1;

                if self.stats.cycles < self.target {
                    return Ok(AgentState::Thinking);
                }

                let signal = CompletionSignal {
                    agent: self.id,
                    cycles: self.stats.cycles,
                    stats: self.stats,
                };
                if signals.send(signal.clone()).await.is_err() {
                    tracing::debug!(agent = %self.id, "completion receiver dropped");
                }
                self.hooks.fire(&TableEvent::Completed { signal }).await;
                Ok(AgentState::Done)
            }

            AgentState::Done | AgentState::Cancelled => Ok(self.state),
        }
    }

    /// Release whatever the current state holds and stop without signalling.
    async fn abandon(&mut self) -> Result<AgentState, ProtocolViolation> {
        let (first, second) = self.order();

        tracing::debug!(agent = %self.id, state = %self.state, cycles = self.stats.cycles, "agent cancelled");
        self.hooks
            .fire(&TableEvent::Cancelled {
                agent: self.id,
                cycles: self.stats.cycles,
            })
            .await;

        match self.state {
            AgentState::AcquiringRight => {
                first.release(self.id)?;
            }
            AgentState::Using | AgentState::Releasing => {
                second.release(self.id)?;
                first.release(self.id)?;
            }
            _ => {}
        }

        Ok(AgentState::Cancelled)
    }

    /// The pair in acquisition order: (taken in AcquiringLeft, taken in AcquiringRight).
    fn order(&self) -> (Arc<ResourceToken>, Arc<ResourceToken>) {
        match self.policy {
            AcquisitionPolicy::OrderedPair if self.right.index() < self.left.index() => {
                (self.right.clone(), self.left.clone())
            }
            _ => (self.left.clone(), self.right.clone()),
        }
    }
}

/// Sleep for `duration` unless cancelled first. Returns false on cancellation.
async fn pause(duration: Duration, cancel: &CancellationToken) -> bool {
    if duration.is_zero() {
        // Still yield so a zero-delay agent cannot starve its neighbors.
        tokio::task::yield_now().await;
        return !cancel.is_cancelled();
    }

    tokio::select! {
        biased;
        () = cancel.cancelled() => false,
        () = tokio::time::sleep(duration) => true,
    }
}
