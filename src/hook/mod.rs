// ABOUTME: Hook system for observing agent and run lifecycle.
// ABOUTME: Provides events, a hook trait, a registry, and the narration hook.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::agent::{AgentId, CompletionSignal};

/// Events fired during a run.
///
/// Acquisition events fire after the token is taken and release events
/// fire before it is given back, so a hook that records events in order
/// sees every token with at most one holder at a time.
#[derive(Debug, Clone)]
pub enum TableEvent {
    /// Fired once before any agent starts.
    RunStart {
        run_id: Uuid,
        agents: usize,
        cycles_per_agent: u32,
    },

    /// Fired once after every agent has stopped.
    RunEnd {
        run_id: Uuid,
        completed: usize,
        /// Error message if the run ended with an error.
        error: Option<String>,
    },

    /// An agent begins a think pause.
    Thinking { agent: AgentId, duration: Duration },

    /// An agent took its left token.
    AcquiredLeft { agent: AgentId, token: usize },

    /// An agent found its left token taken and went back to thinking.
    LeftBusy { agent: AgentId, token: usize },

    /// An agent took its right token and now holds both.
    AcquiredRight { agent: AgentId, token: usize },

    /// An agent gave up on its right token and is about to release the left.
    RightTimedOut {
        agent: AgentId,
        token: usize,
        left: usize,
    },

    /// An agent starts its exclusive operation.
    Using {
        agent: AgentId,
        cycle: u32,
        duration: Duration,
    },

    /// An agent is about to release both tokens.
    Releasing {
        agent: AgentId,
        left: usize,
        right: usize,
        cycle: u32,
    },

    /// An agent reached its target and signalled completion.
    Completed { signal: CompletionSignal },

    /// An agent is abandoning its cycle on shutdown and about to release what it holds.
    Cancelled { agent: AgentId, cycles: u32 },
}

impl TableEvent {
    /// The agent this event is about, if it is an agent event.
    pub fn agent(&self) -> Option<AgentId> {
        match self {
            TableEvent::RunStart { .. } | TableEvent::RunEnd { .. } => None,
            TableEvent::Thinking { agent, .. }
            | TableEvent::AcquiredLeft { agent, .. }
            | TableEvent::LeftBusy { agent, .. }
            | TableEvent::AcquiredRight { agent, .. }
            | TableEvent::RightTimedOut { agent, .. }
            | TableEvent::Using { agent, .. }
            | TableEvent::Releasing { agent, .. }
            | TableEvent::Cancelled { agent, .. } => Some(*agent),
            TableEvent::Completed { signal } => Some(signal.agent),
        }
    }
}

/// Trait for implementing hooks.
#[async_trait]
pub trait Hook: Send + Sync {
    /// Called when an event occurs.
    ///
    /// Errors are logged and otherwise ignored; a hook cannot stop a run.
    async fn on_event(&self, event: &TableEvent) -> Result<(), anyhow::Error>;

    /// Optional: Filter which events this hook cares about.
    /// Default returns true for all events.
    fn accepts(&self, event: &TableEvent) -> bool {
        let _ = event;
        true
    }
}

/// Registry for managing and firing hooks.
pub struct HookRegistry {
    hooks: RwLock<Vec<Arc<dyn Hook>>>,
}

impl HookRegistry {
    /// Create a new empty hook registry.
    pub fn new() -> Self {
        Self {
            hooks: RwLock::new(Vec::new()),
        }
    }

    /// Register a hook.
    pub async fn register(&self, hook: impl Hook + 'static) {
        self.hooks.write().await.push(Arc::new(hook));
    }

    /// Register a hook wrapped in Arc.
    pub async fn register_arc(&self, hook: Arc<dyn Hook>) {
        self.hooks.write().await.push(hook);
    }

    /// Fire an event to all registered hooks, in registration order.
    pub async fn fire(&self, event: &TableEvent) {
        let hooks = self.hooks.read().await;

        for hook in hooks.iter() {
            if !hook.accepts(event) {
                continue;
            }

            if let Err(e) = hook.on_event(event).await {
                tracing::warn!(error = %e, event = ?event, "hook failed");
            }
        }
    }

    /// Get the number of registered hooks.
    pub async fn len(&self) -> usize {
        self.hooks.read().await.len()
    }

    /// Check if the registry is empty.
    pub async fn is_empty(&self) -> bool {
        self.hooks.read().await.is_empty()
    }

    /// Register a hook that only handles Completed events.
    pub async fn on_completed<F>(&self, f: F)
    where
        F: Fn(&CompletionSignal) + Send + Sync + 'static,
    {
        self.register(CompletedHook { callback: f }).await;
    }

    /// Register a hook that only handles RunEnd events.
    ///
    /// The callback receives (run_id, completed, error).
    pub async fn on_run_end<F>(&self, f: F)
    where
        F: Fn(Uuid, usize, Option<&str>) + Send + Sync + 'static,
    {
        self.register(RunEndHook { callback: f }).await;
    }
}

impl Default for HookRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// Hook wrapper for Completed events.
struct CompletedHook<F> {
    callback: F,
}

#[async_trait]
impl<F> Hook for CompletedHook<F>
where
    F: Fn(&CompletionSignal) + Send + Sync,
{
    fn accepts(&self, event: &TableEvent) -> bool {
        matches!(event, TableEvent::Completed { .. })
    }

    async fn on_event(&self, event: &TableEvent) -> Result<(), anyhow::Error> {
        if let TableEvent::Completed { signal } = event {
            (self.callback)(signal);
        }
        Ok(())
    }
}

/// Hook wrapper for RunEnd events.
struct RunEndHook<F> {
    callback: F,
}

#[async_trait]
impl<F> Hook for RunEndHook<F>
where
    F: Fn(Uuid, usize, Option<&str>) + Send + Sync,
{
    fn accepts(&self, event: &TableEvent) -> bool {
        matches!(event, TableEvent::RunEnd { .. })
    }

    async fn on_event(&self, event: &TableEvent) -> Result<(), anyhow::Error> {
        if let TableEvent::RunEnd {
            run_id,
            completed,
            error,
        } = event
        {
            (self.callback)(*run_id, *completed, error.as_deref());
        }
        Ok(())
    }
}

/// Narrates every event through `tracing` at info level.
pub struct NarrationHook;

#[async_trait]
impl Hook for NarrationHook {
    async fn on_event(&self, event: &TableEvent) -> Result<(), anyhow::Error> {
        match event {
            TableEvent::RunStart {
                run_id,
                agents,
                cycles_per_agent,
            } => {
                tracing::info!(%run_id, agents, cycles_per_agent, "run starting");
            }
            TableEvent::RunEnd {
                run_id,
                completed,
                error,
            } => match error {
                Some(error) => tracing::info!(%run_id, completed, %error, "run ended"),
                None => tracing::info!(%run_id, completed, "run ended"),
            },
            TableEvent::Thinking { agent, duration } => {
                tracing::info!(%agent, ?duration, "thinking");
            }
            TableEvent::AcquiredLeft { agent, token } => {
                tracing::info!(%agent, token, "took left token");
            }
            TableEvent::LeftBusy { agent, token } => {
                tracing::info!(%agent, token, "left token busy, back to thinking");
            }
            TableEvent::AcquiredRight { agent, token } => {
                tracing::info!(%agent, token, "took right token");
            }
            TableEvent::RightTimedOut { agent, token, left } => {
                tracing::info!(
                    %agent,
                    token,
                    left,
                    "right token not free in time, dropping left and thinking"
                );
            }
            TableEvent::Using {
                agent,
                cycle,
                duration,
            } => {
                tracing::info!(%agent, cycle, ?duration, "using both tokens");
            }
            TableEvent::Releasing {
                agent,
                left,
                right,
                cycle,
            } => {
                tracing::info!(%agent, left, right, cycle, "releasing tokens");
            }
            TableEvent::Completed { signal } => {
                tracing::info!(agent = %signal.agent, cycles = signal.cycles, "finished");
            }
            TableEvent::Cancelled { agent, cycles } => {
                tracing::info!(%agent, cycles, "cancelled");
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;
    use crate::agent::AgentStats;

    struct LoggingHook {
        events: Arc<RwLock<Vec<String>>>,
    }

    impl LoggingHook {
        fn new() -> (Self, Arc<RwLock<Vec<String>>>) {
            let events = Arc::new(RwLock::new(Vec::new()));
            (
                Self {
                    events: events.clone(),
                },
                events,
            )
        }
    }

    #[async_trait]
    impl Hook for LoggingHook {
        async fn on_event(&self, event: &TableEvent) -> Result<(), anyhow::Error> {
            let msg = match event {
                TableEvent::RunStart { agents, .. } => format!("run_start:{}", agents),
                TableEvent::RunEnd { completed, .. } => format!("run_end:{}", completed),
                TableEvent::Thinking { agent, .. } => format!("think:{}", agent.0),
                TableEvent::AcquiredLeft { agent, token } => {
                    format!("left:{}:{}", agent.0, token)
                }
                TableEvent::LeftBusy { agent, .. } => format!("left_busy:{}", agent.0),
                TableEvent::AcquiredRight { agent, token } => {
                    format!("right:{}:{}", agent.0, token)
                }
                TableEvent::RightTimedOut { agent, .. } => format!("timeout:{}", agent.0),
                TableEvent::Using { agent, cycle, .. } => format!("use:{}:{}", agent.0, cycle),
                TableEvent::Releasing { agent, .. } => format!("release:{}", agent.0),
                TableEvent::Completed { signal } => format!("done:{}", signal.agent.0),
                TableEvent::Cancelled { agent, .. } => format!("cancel:{}", agent.0),
            };
            self.events.write().await.push(msg);
            Ok(())
        }
    }

    struct FailingHook;

    #[async_trait]
    impl Hook for FailingHook {
        async fn on_event(&self, _event: &TableEvent) -> Result<(), anyhow::Error> {
            Err(anyhow::anyhow!("hook exploded"))
        }
    }

    fn completed(agent: usize) -> TableEvent {
        TableEvent::Completed {
            signal: CompletionSignal {
                agent: AgentId(agent),
                cycles: 3,
                stats: AgentStats::default(),
            },
        }
    }

    #[tokio::test]
    async fn test_hook_registry_fire() {
        let registry = HookRegistry::new();
        let (hook, events) = LoggingHook::new();
        registry.register(hook).await;

        registry
            .fire(&TableEvent::AcquiredLeft {
                agent: AgentId(2),
                token: 2,
            })
            .await;

        let logged = events.read().await;
        assert_eq!(logged.len(), 1);
        assert_eq!(logged[0], "left:2:2");
    }

    #[tokio::test]
    async fn test_failing_hook_does_not_stop_others() {
        let registry = HookRegistry::new();
        registry.register(FailingHook).await;
        let (hook, events) = LoggingHook::new();
        registry.register(hook).await;

        registry.fire(&completed(1)).await;

        let logged = events.read().await;
        assert_eq!(logged.as_slice(), ["done:1"]);
    }

    #[tokio::test]
    async fn test_registry_len() {
        let registry = HookRegistry::new();
        assert!(registry.is_empty().await);

        registry.register(NarrationHook).await;
        registry.register_arc(Arc::new(NarrationHook)).await;
        assert_eq!(registry.len().await, 2);
    }

    #[tokio::test]
    async fn test_on_completed_filters_events() {
        let registry = HookRegistry::new();
        let count = Arc::new(AtomicUsize::new(0));
        let count_clone = count.clone();

        registry
            .on_completed(move |signal| {
                assert_eq!(signal.cycles, 3);
                count_clone.fetch_add(1, Ordering::SeqCst);
            })
            .await;

        registry
            .fire(&TableEvent::Thinking {
                agent: AgentId(0),
                duration: Duration::ZERO,
            })
            .await;
        registry.fire(&completed(0)).await;
        registry.fire(&completed(1)).await;

        assert_eq!(count.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_on_run_end_receives_error() {
        let registry = HookRegistry::new();
        let seen = Arc::new(parking_lot::Mutex::new(None::<String>));
        let seen_clone = seen.clone();

        registry
            .on_run_end(move |_run_id, completed, error| {
                assert_eq!(completed, 1);
                *seen_clone.lock() = error.map(str::to_string);
            })
            .await;

        registry
            .fire(&TableEvent::RunEnd {
                run_id: Uuid::new_v4(),
                completed: 1,
                error: Some("cancelled".into()),
            })
            .await;

        assert_eq!(seen.lock().as_deref(), Some("cancelled"));
    }

    #[tokio::test]
    async fn test_narration_hook_accepts_everything() {
        let hook = NarrationHook;
        let event = TableEvent::RightTimedOut {
            agent: AgentId(1),
            token: 2,
            left: 1,
        };
        assert!(hook.accepts(&event));
        assert!(hook.on_event(&event).await.is_ok());
    }

    #[test]
    fn test_event_agent() {
        assert_eq!(completed(4).agent(), Some(AgentId(4)));
        let event = TableEvent::RunStart {
            run_id: Uuid::new_v4(),
            agents: 5,
            cycles_per_agent: 3,
        };
        assert_eq!(event.agent(), None);
    }
}
