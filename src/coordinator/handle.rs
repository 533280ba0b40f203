// ABOUTME: Implements RunHandle for background runs with status polling.
// ABOUTME: Provides status tracking, waiting, timeout, duration, and cancellation support.

use std::sync::Arc;
use std::sync::atomic::{AtomicU8, Ordering};
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use super::coordinator::Coordinator;
use super::report::RunReport;
use crate::error::TableError;

/// Represents the current state of a background run.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum RunStatus {
    /// The run has not started yet.
    Pending = 0,
    /// Agents are running.
    Running = 1,
    /// Every agent signalled completion.
    Completed = 2,
    /// The run ended with a fault.
    Failed = 3,
    /// The run was cancelled before every agent finished.
    Cancelled = 4,
}

impl RunStatus {
    /// Convert from u8 value to RunStatus.
    fn from_u8(value: u8) -> Self {
        match value {
            0 => RunStatus::Pending,
            1 => RunStatus::Running,
            2 => RunStatus::Completed,
            3 => RunStatus::Failed,
            4 => RunStatus::Cancelled,
            _ => RunStatus::Failed,
        }
    }

    fn of(result: &Result<RunReport, TableError>) -> Self {
        match result {
            Ok(_) => RunStatus::Completed,
            Err(TableError::Cancelled { .. }) => RunStatus::Cancelled,
            Err(_) => RunStatus::Failed,
        }
    }
}

impl std::fmt::Display for RunStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RunStatus::Pending => write!(f, "pending"),
            RunStatus::Running => write!(f, "running"),
            RunStatus::Completed => write!(f, "completed"),
            RunStatus::Failed => write!(f, "failed"),
            RunStatus::Cancelled => write!(f, "cancelled"),
        }
    }
}

/// Handle for a coordinator run executing in the background.
///
/// A RunHandle allows callers to:
/// - Check whether the run is still going (polling)
/// - Wait for its report
/// - Wait with timeout
/// - Get the duration of the run
/// - Cancel it, releasing every held token
pub struct RunHandle {
    /// Atomic status for lock-free reads.
    status: Arc<AtomicU8>,
    /// When the run started.
    start_time: Instant,
    /// When the run ended (if complete).
    end_time: Arc<Mutex<Option<Instant>>>,
    cancel: CancellationToken,
    /// Taken once the run's result has been handed out.
    task: Option<JoinHandle<Result<RunReport, TableError>>>,
}

impl RunHandle {
    pub(crate) fn spawn(coordinator: Coordinator) -> Self {
        let start_time = Instant::now();
        let status = Arc::new(AtomicU8::new(RunStatus::Pending as u8));
        let end_time = Arc::new(Mutex::new(None));
        let cancel = coordinator.cancellation_token();

        let task = {
            let status = status.clone();
            let end_time = end_time.clone();
            tokio::spawn(async move {
                status.store(RunStatus::Running as u8, Ordering::SeqCst);
                let result = coordinator.run().await;
                *end_time.lock() = Some(Instant::now());
                status.store(RunStatus::of(&result) as u8, Ordering::SeqCst);
                result
            })
        };

        Self {
            status,
            start_time,
            end_time,
            cancel,
            task: Some(task),
        }
    }

    /// Get the current run status.
    pub fn status(&self) -> RunStatus {
        RunStatus::from_u8(self.status.load(Ordering::SeqCst))
    }

    /// Returns true if the run has finished (success, failure, or cancelled).
    pub fn is_complete(&self) -> bool {
        matches!(
            self.status(),
            RunStatus::Completed | RunStatus::Failed | RunStatus::Cancelled
        )
    }

    /// Get how long the run has been going (or went for if complete).
    pub fn duration(&self) -> Duration {
        match *self.end_time.lock() {
            Some(end) => end.duration_since(self.start_time),
            None => self.start_time.elapsed(),
        }
    }

    /// Request cancellation.
    ///
    /// Returns true if the run was still going when cancel was called.
    /// The run reports `TableError::Cancelled` unless every agent had
    /// already signalled.
    pub fn cancel(&self) -> bool {
        let running = !self.is_complete();
        self.cancel.cancel();
        running
    }

    /// Wait for the run to finish and return its result.
    pub async fn wait(mut self) -> Result<RunReport, TableError> {
        match self.task.take() {
            Some(task) => join(task).await,
            None => Err(TableError::RunAborted("result already taken".to_string())),
        }
    }

    /// Wait for the run to finish, giving up after `timeout`.
    ///
    /// Returns `None` on timeout; the run keeps going and can be waited on
    /// again. Returns the result exactly once.
    pub async fn wait_with_timeout(
        &mut self,
        timeout: Duration,
    ) -> Option<Result<RunReport, TableError>> {
        let task = self.task.as_mut()?;
        let joined = tokio::time::timeout(timeout, task).await.ok()?;
        self.task = None;
        Some(joined.unwrap_or_else(|e| Err(TableError::RunAborted(e.to_string()))))
    }
}

async fn join(task: JoinHandle<Result<RunReport, TableError>>) -> Result<RunReport, TableError> {
    task.await
        .unwrap_or_else(|e| Err(TableError::RunAborted(e.to_string())))
}
