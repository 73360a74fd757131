//! The Coordinator (C9/C10, §4.9-§4.10): sequences the five agents and
//! the reasoning engine into one workflow, synchronously or
//! concurrently, and ranks the result (§3).

pub mod async_coordinator;
pub mod context;
pub mod error;
pub mod ranking;
pub mod request;
pub mod similarity;
pub mod stages;
pub mod sync_coordinator;

pub use async_coordinator::{run_workflow_async, ProgressCallback};
pub use context::CoordinatorContext;
pub use error::CoordinatorError;
pub use request::{StageTimings, WorkflowOutcome, WorkflowRequest};
pub use sync_coordinator::{run_workflow, run_workflow_blocking};
