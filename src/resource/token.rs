// ABOUTME: Binary ownership token for one shared, exclusive resource.
// ABOUTME: Supports non-blocking, bounded-wait, and unbounded acquisition.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use parking_lot::Mutex;
use tokio::sync::Notify;
use tokio::time::Instant;

use crate::agent::AgentId;
use crate::error::ProtocolViolation;

/// A single exclusive resource with capacity 1.
///
/// At any instant the token is either free or held by exactly one agent.
/// The holder is tracked so that a release from anyone else is rejected
/// as a [`ProtocolViolation`] instead of silently freeing the token.
///
/// # Acquisition
///
/// - [`try_acquire`](Self::try_acquire) never waits.
/// - [`try_acquire_within`](Self::try_acquire_within) waits at most the given window.
/// - [`acquire`](Self::acquire) waits without bound; callers race it against cancellation.
#[derive(Debug)]
pub struct ResourceToken {
    index: usize,
    holder: Mutex<Option<AgentId>>,
    released: Notify,
    acquisitions: AtomicU64,
}

impl ResourceToken {
    /// Create a free token at the given ring index.
    pub fn new(index: usize) -> Self {
        Self {
            index,
            holder: Mutex::new(None),
            released: Notify::new(),
            acquisitions: AtomicU64::new(0),
        }
    }

    /// Position of this token in its ring.
    pub fn index(&self) -> usize {
        self.index
    }

    /// The agent currently holding the token, if any.
    pub fn holder(&self) -> Option<AgentId> {
        *self.holder.lock()
    }

    /// Returns true if some agent holds the token.
    pub fn is_held(&self) -> bool {
        self.holder.lock().is_some()
    }

    /// Number of successful acquisitions over the token's lifetime.
    pub fn acquisitions(&self) -> u64 {
        self.acquisitions.load(Ordering::Relaxed)
    }

    /// Take the token if it is free, without waiting.
    ///
    /// Returns `false` if any agent holds it, including `agent` itself:
    /// acquisition is not reentrant.
    pub fn try_acquire(&self, agent: AgentId) -> bool {
        let mut holder = self.holder.lock();
        if holder.is_some() {
            return false;
        }
        *holder = Some(agent);
        self.acquisitions.fetch_add(1, Ordering::Relaxed);
        true
    }

    /// Take the token, waiting at most `window` for it to become free.
    ///
    /// Returns `true` if the token was acquired before the window closed.
    /// A zero window behaves like [`try_acquire`](Self::try_acquire).
    pub async fn try_acquire_within(&self, agent: AgentId, window: Duration) -> bool {
        let deadline = Instant::now() + window;

        loop {
            // Register for the wakeup before checking, so a release between
            // the check and the await is not missed.
            let notified = self.released.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();

            if self.try_acquire(agent) {
                return true;
            }

            if tokio::time::timeout_at(deadline, notified).await.is_err() {
                return false;
            }
        }
    }

    /// Take the token, waiting as long as it takes.
    pub async fn acquire(&self, agent: AgentId) {
        loop {
            let notified = self.released.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();

            if self.try_acquire(agent) {
                return;
            }

            notified.await;
        }
    }

    /// Free the token and wake any waiters.
    ///
    /// Returns `Err(ProtocolViolation)` if `agent` is not the current holder.
    /// The token is not modified in that case.
    pub fn release(&self, agent: AgentId) -> Result<(), ProtocolViolation> {
        {
            let mut holder = self.holder.lock();
            if *holder != Some(agent) {
                return Err(ProtocolViolation {
                    token: self.index,
                    holder: *holder,
                    requester: agent,
                });
            }
            *holder = None;
        }

        self.released.notify_waiters();
        Ok(())
    }
}
