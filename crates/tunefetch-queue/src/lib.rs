/*
[INPUT]:  Public API exports for tunefetch-queue crate
[OUTPUT]: Module declarations and public re-exports
[POS]:    Crate root - library entry point
[UPDATE]: When adding new modules or public exports
*/

pub mod config;
pub mod controller;
pub mod entry;
pub mod error;
pub mod formatter;
pub mod poller;
pub mod state_machine;
pub mod store;

// Re-export main types for convenience
pub use config::QueueConfig;
pub use controller::{EnqueueOptions, QueueController, SHUTDOWN_TIMEOUT};
pub use entry::{EntryMetadata, TaskEntry, TaskId, TaskStatus};
pub use error::{QueueError, Result};
pub use poller::PollingDriver;
pub use state_machine::{MonitorPolicy, QueueStateMachine, TerminalPlan, Transition};
pub use store::{QueueEvent, QueueStore, ReconciledJob, drain_pending};
