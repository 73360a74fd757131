//! Batch Job Runner (C11, §4.11): drives the Async Coordinator over a
//! list of `(topic, context)` items with bounded concurrency, capturing
//! per-item status/timing and producing a run summary. Persistence,
//! reporting, and export formatting are delegated to external
//! collaborators (§1 Non-goals) — this crate only runs the workflow and
//! hands back structured results.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use madspark_config::{TemperatureManager, TemperaturePreset};
use madspark_contracts::RequestInputs;
use madspark_coordinator::{run_workflow_async, CoordinatorContext, CoordinatorError, WorkflowOutcome, WorkflowRequest};
use tokio::sync::Semaphore;
use tokio_util::sync::CancellationToken;
use tracing::{info, instrument, warn};

use crate::error::BatchError;

/// Default bound on concurrently in-flight workflows (§4.11
/// `maxConcurrent`, async default 3).
pub const DEFAULT_MAX_CONCURRENT_ASYNC: usize = 3;
/// Sync callers process one item at a time (§4.11 `maxConcurrent`, sync
/// default 1) — there is no sync variant of this runner since nothing
/// downstream of the Coordinator needs one; a caller that wants strictly
/// sequential processing passes `max_concurrent: 1`.
pub const DEFAULT_MAX_CONCURRENT_SYNC: usize = 1;

/// One requested workflow run (§4.11's per-item shape: topic, context,
/// optional per-item temperature preset, optional candidate count,
/// optional tags).
#[derive(Debug, Clone)]
pub struct BatchJobItem {
    pub topic: String,
    pub context: String,
    pub temperature_preset: Option<TemperaturePreset>,
    pub num_candidates: Option<usize>,
    pub tags: Vec<String>,
}

impl BatchJobItem {
    pub fn new(topic: impl Into<String>, context: impl Into<String>) -> Self {
        Self {
            topic: topic.into(),
            context: context.into(),
            temperature_preset: None,
            num_candidates: None,
            tags: Vec::new(),
        }
    }

    pub fn with_temperature_preset(mut self, preset: TemperaturePreset) -> Self {
        self.temperature_preset = Some(preset);
        self
    }

    pub fn with_num_candidates(mut self, num_candidates: usize) -> Self {
        self.num_candidates = Some(num_candidates);
        self
    }

    pub fn with_tags(mut self, tags: Vec<String>) -> Self {
        self.tags = tags;
        self
    }

    fn into_workflow_request(self, default_num_top_candidates: usize, timeout_secs: u64) -> Result<WorkflowRequest, BatchError> {
        let inputs = RequestInputs::new(self.topic, self.context);
        let mut request = WorkflowRequest::new(inputs);
        request.num_top_candidates = self.num_candidates.unwrap_or(default_num_top_candidates).max(1);
        request.timeout_secs = timeout_secs;
        request.tags = self.tags;
        if let Some(preset) = self.temperature_preset {
            request.temperatures = TemperatureManager::from_preset(preset);
        }
        Ok(request)
    }
}

/// A job's lifecycle state (§4.11).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobStatus {
    Pending,
    Processing,
    Completed,
    Failed,
}

/// Per-item outcome captured by the runner (§4.11: "status, startTime,
/// endTime, processingTime, result or error").
#[derive(Debug, Clone)]
pub struct JobRecord {
    pub index: usize,
    pub topic: String,
    pub tags: Vec<String>,
    pub status: JobStatus,
    pub start_time: Option<DateTime<Utc>>,
    pub end_time: Option<DateTime<Utc>>,
    pub processing_time: Option<Duration>,
    pub result: Option<WorkflowOutcome>,
    pub error: Option<String>,
}

impl JobRecord {
    fn pending(index: usize, topic: String, tags: Vec<String>) -> Self {
        Self {
            index,
            topic,
            tags,
            status: JobStatus::Pending,
            start_time: None,
            end_time: None,
            processing_time: None,
            result: None,
            error: None,
        }
    }
}

/// Aggregate counts over a completed run (§4.11 "Produces a summary
/// (totals, per-item dicts)").
#[derive(Debug, Clone, Default)]
pub struct BatchSummary {
    pub total: usize,
    pub completed: usize,
    pub failed: usize,
    pub total_processing_time: Duration,
}

impl BatchSummary {
    fn from_records(records: &[JobRecord]) -> Self {
        let mut summary = BatchSummary {
            total: records.len(),
            ..Default::default()
        };
        for record in records {
            match record.status {
                JobStatus::Completed => summary.completed += 1,
                JobStatus::Failed => summary.failed += 1,
                JobStatus::Pending | JobStatus::Processing => {
                    warn!(index = record.index, "batch run ended with a job still pending/processing; counted as neither completed nor failed");
                }
            }
            if let Some(elapsed) = record.processing_time {
                summary.total_processing_time += elapsed;
            }
        }
        summary
    }
}

/// The full result of a [`run_batch`] call: every item's record plus the
/// aggregate summary.
#[derive(Debug, Clone, Default)]
pub struct BatchRunResult {
    pub records: Vec<JobRecord>,
    pub summary: BatchSummary,
}

/// Runs `items` through the Async Coordinator with at most
/// `max_concurrent` workflows in flight at once (§4.11). Each item gets
/// its own cancellation token and its own workflow deadline (taken from
/// `ctx`'s pipeline settings); one item's failure or timeout never
/// affects another's record.
#[instrument(skip(ctx, items))]
pub async fn run_batch(ctx: Arc<CoordinatorContext>, items: Vec<BatchJobItem>, max_concurrent: usize, default_num_top_candidates: usize) -> Result<BatchRunResult, BatchError> {
    for (index, item) in items.iter().enumerate() {
        if item.topic.trim().is_empty() {
            return Err(BatchError::EmptyTopic { index });
        }
    }

    let timeout_secs = ctx.settings.default_timeout.as_secs();
    let semaphore = Arc::new(Semaphore::new(max_concurrent.max(1)));
    let mut handles = Vec::with_capacity(items.len());

    for (index, item) in items.into_iter().enumerate() {
        let ctx = ctx.clone();
        let semaphore = semaphore.clone();
        let topic = item.topic.clone();
        let tags = item.tags.clone();
        let request = item.into_workflow_request(default_num_top_candidates, timeout_secs)?;

        handles.push(tokio::spawn(async move {
            let _permit = semaphore.acquire_owned().await.expect("semaphore is never closed");
            let mut record = JobRecord::pending(index, topic, tags);
            record.status = JobStatus::Processing;
            record.start_time = Some(Utc::now());
            let started = std::time::Instant::now();

            let outcome = run_workflow_async(&ctx, request, CancellationToken::new(), None).await;

            record.end_time = Some(Utc::now());
            record.processing_time = Some(started.elapsed());
            match outcome {
                Ok(outcome) => {
                    record.status = JobStatus::Completed;
                    record.result = Some(outcome);
                }
                Err(err) => {
                    record.status = JobStatus::Failed;
                    record.error = Some(describe_error(&err));
                }
            }
            record
        }));
    }

    let mut records = Vec::with_capacity(handles.len());
    for (index, handle) in handles.into_iter().enumerate() {
        match handle.await {
            Ok(record) => records.push(record),
            Err(join_err) => {
                warn!(error = %join_err, index, "batch item task panicked; recording as failed");
                records.push(JobRecord {
                    index,
                    topic: String::new(),
                    tags: Vec::new(),
                    status: JobStatus::Failed,
                    start_time: None,
                    end_time: None,
                    processing_time: None,
                    result: None,
                    error: Some(join_err.to_string()),
                });
            }
        }
    }
    records.sort_by_key(|r| r.index);

    info!(total = records.len(), "batch run complete");
    let summary = BatchSummary::from_records(&records);
    Ok(BatchRunResult { records, summary })
}

fn describe_error(err: &CoordinatorError) -> String {
    err.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use madspark_config::PipelineSettings;
    use madspark_providers::MockProvider;
    use madspark_resilience::RetryConfig;
    use madspark_router::Router;

    fn ctx(response_count: usize) -> Arc<CoordinatorContext> {
        let provider: Arc<dyn madspark_providers::LlmProvider> = Arc::new(MockProvider::new(response_count));
        let router = Arc::new(Router::new(Some(provider), None, None, false));
        let retry_config = RetryConfig {
            max_attempts: 1,
            initial_delay_ms: 1,
            max_delay_ms: 1,
            backoff_multiplier: 1.0,
            jitter_factor: 0.0,
            use_exponential_backoff: false,
            use_jitter: false,
        };
        let mut settings = PipelineSettings::from_env();
        settings.default_timeout = Duration::from_secs(60);
        Arc::new(CoordinatorContext::new(router, retry_config, settings))
    }

    #[tokio::test]
    async fn runs_every_item_and_tags_each_record_completed() {
        let ctx = ctx(2);
        let items = vec![
            BatchJobItem::new("urban farming", "apartment balconies").with_num_candidates(1),
            BatchJobItem::new("ocean cleanup", "coastal towns").with_num_candidates(1),
        ];
        let result = run_batch(ctx, items, DEFAULT_MAX_CONCURRENT_ASYNC, 2).await.unwrap();
        assert_eq!(result.summary.total, 2);
        assert_eq!(result.summary.completed, 2);
        assert_eq!(result.summary.failed, 0);
        for record in &result.records {
            assert_eq!(record.status, JobStatus::Completed);
            assert!(record.result.is_some());
            assert!(record.processing_time.is_some());
        }
    }

    #[tokio::test]
    async fn preserves_input_order_in_records_regardless_of_completion_order() {
        let ctx = ctx(2);
        let items = vec![
            BatchJobItem::new("topic a", "context a").with_num_candidates(1),
            BatchJobItem::new("topic b", "context b").with_num_candidates(1),
            BatchJobItem::new("topic c", "context c").with_num_candidates(1),
        ];
        let result = run_batch(ctx, items, 2, 2).await.unwrap();
        let indices: Vec<usize> = result.records.iter().map(|r| r.index).collect();
        assert_eq!(indices, vec![0, 1, 2]);
        assert_eq!(result.records[0].topic, "topic a");
        assert_eq!(result.records[2].topic, "topic c");
    }

    #[tokio::test]
    async fn empty_topic_is_rejected_before_any_workflow_runs() {
        let ctx = ctx(2);
        let items = vec![BatchJobItem::new("", "context")];
        let err = run_batch(ctx, items, 1, 2).await.unwrap_err();
        assert!(matches!(err, BatchError::EmptyTopic { index: 0 }));
    }

    #[tokio::test]
    async fn tags_flow_through_to_candidates_via_the_workflow_request() {
        let ctx = ctx(2);
        let items = vec![BatchJobItem::new("topic", "context").with_num_candidates(1).with_tags(vec!["q1-batch".to_string()])];
        let result = run_batch(ctx, items, 1, 2).await.unwrap();
        let outcome = result.records[0].result.as_ref().unwrap();
        assert!(outcome.candidates.iter().all(|c| c.tags == vec!["q1-batch".to_string()]));
    }
}
