// ABOUTME: Coordinator module for running a ring of agents to completion.
// ABOUTME: Contains the coordinator, its background run handle, and the run report.

mod coordinator;
mod handle;
mod report;

pub use coordinator::{Coordinator, run};
pub use handle::{RunHandle, RunStatus};
pub use report::RunReport;
