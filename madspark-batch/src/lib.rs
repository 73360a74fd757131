//! Batch Job Runner (C11, §4.11): the outermost collaborator that turns
//! a list of `(topic, context)` items into individually-tracked workflow
//! runs under bounded concurrency. Everything downstream of a single
//! workflow's ranked result — persistence, reporting, CSV/JSON export —
//! is out of scope (§1 Non-goals) and left to external collaborators.

pub mod error;
pub mod runner;

pub use error::BatchError;
pub use runner::{run_batch, BatchJobItem, BatchRunResult, BatchSummary, JobRecord, JobStatus, DEFAULT_MAX_CONCURRENT_ASYNC, DEFAULT_MAX_CONCURRENT_SYNC};
