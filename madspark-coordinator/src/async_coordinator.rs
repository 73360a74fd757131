//! Async Coordinator (C10, §4.10): the same 11-step pipeline as the Sync
//! Coordinator, but the four stages that don't depend on each other's
//! output — initial multi-dim eval, Advocate, Skeptic, and logical
//! inference — run concurrently once the top-K shortlist exists, bounded
//! by `MaxConcurrentAgents`. The whole run is bounded by one deadline
//! (`timeout_secs`, clamped to `[60, 3600]` per §5, default 1200s),
//! cancellable mid-flight via a shared [`CancellationToken`], and reports
//! progress at each stage boundary through an optional callback.

use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};

use madspark_agents::{
    critique_batch, generate_ideas, run_batch_with_timeout, update_candidates_with_advocacy_results,
    update_candidates_with_critic_results, update_candidates_with_inference_results,
    update_candidates_with_multi_dim_results, update_candidates_with_skepticism_results, ExecutionMode,
};
use madspark_contracts::InferenceAnalysisType;
use tokio::sync::Semaphore;
use tokio_util::sync::CancellationToken;
use tracing::{error, warn};

use crate::context::CoordinatorContext;
use crate::error::CoordinatorError;
use crate::ranking::{finalize, new_candidate, top_k};
use crate::request::{StageTimings, WorkflowOutcome, WorkflowRequest};
use crate::stages::{apply_improvement, apply_reevaluation, compute_advocacy, compute_inference, compute_multidim, compute_skepticism, BATCH_TIMEOUT_SECS};

const MODE: ExecutionMode = ExecutionMode::Async;
const MIN_TIMEOUT_SECS: u64 = 60;
const MAX_TIMEOUT_SECS: u64 = 3600;

/// Invoked with a short stage name and the fraction of the pipeline
/// completed so far (0.0 before the first stage starts, 1.0 once
/// finalize runs) at every stage boundary.
pub type ProgressCallback = Arc<dyn Fn(&str, f64) + Send + Sync>;

/// Total number of stage boundaries reported, used to compute each
/// callback's completed-fraction. Kept in lockstep with the `report`
/// call sites in `run_inner`, whether or not a given run actually
/// reaches the later ones.
const TOTAL_STAGES: u32 = 7;

fn report(progress: &Option<ProgressCallback>, stage: &str, ordinal: u32) {
    if let Some(callback) = progress {
        callback(stage, ordinal as f64 / TOTAL_STAGES as f64);
    }
}

fn clamp_timeout(timeout_secs: u64) -> u64 {
    timeout_secs.clamp(MIN_TIMEOUT_SECS, MAX_TIMEOUT_SECS)
}

/// Races a future against cancellation, returning [`CoordinatorError::Cancelled`]
/// if the token fires first. Dropping the losing future mid-flight never
/// pollutes the response cache, since `Router` only inserts on a
/// successfully completed call (§5).
async fn cancellable<T>(cancellation: &CancellationToken, future: impl Future<Output = T>) -> Result<T, CoordinatorError> {
    tokio::select! {
        _ = cancellation.cancelled() => Err(CoordinatorError::Cancelled),
        value = future => Ok(value),
    }
}

/// Runs the pipeline with bounded concurrency, a whole-workflow deadline,
/// cooperative cancellation, and stage-boundary progress reporting.
pub async fn run_workflow_async(
    ctx: &CoordinatorContext,
    request: WorkflowRequest,
    cancellation: CancellationToken,
    progress: Option<ProgressCallback>,
) -> Result<WorkflowOutcome, CoordinatorError> {
    request.validate()?;
    let timeout_secs = clamp_timeout(request.timeout_secs);
    match tokio::time::timeout(Duration::from_secs(timeout_secs), run_inner(ctx, &request, &cancellation, &progress)).await {
        Ok(result) => result,
        Err(_) => {
            warn!(timeout_secs, "workflow deadline exceeded");
            Err(CoordinatorError::Timeout { timeout_secs })
        }
    }
}

async fn run_inner(
    ctx: &CoordinatorContext,
    request: &WorkflowRequest,
    cancellation: &CancellationToken,
    progress: &Option<ProgressCallback>,
) -> Result<WorkflowOutcome, CoordinatorError> {
    let mut timings = StageTimings::default();
    let topic = request.inputs.topic.clone();
    let context_text = request.inputs.context.clone();
    let semaphore = Arc::new(Semaphore::new(ctx.settings.max_concurrent_agents.max(1)));

    // Step 2: Idea Generator (fatal on zero parseable outputs, §7).
    report(progress, "idea_generation", 1);
    let stage_start = Instant::now();
    let ideas = match cancellable(cancellation, generate_ideas(ctx.router.clone(), &ctx.retry_executor(), request.temperatures.idea(), &request.inputs)).await? {
        Ok((ideas, _meta)) if !ideas.is_empty() => ideas,
        Ok(_) => {
            warn!("idea generator produced zero ideas; returning an empty result");
            return Ok(WorkflowOutcome::empty());
        }
        Err(err) => {
            error!(error = %err, "idea generator failed; returning an empty result");
            return Ok(WorkflowOutcome::empty());
        }
    };
    timings.record("idea_generation", stage_start.elapsed());

    // Step 3: initial Critic batch (also fatal on zero parseable outputs).
    report(progress, "critic", 2);
    let stage_start = Instant::now();
    let retry = ctx.retry_executor();
    let router = ctx.router.clone();
    let critic_call = run_batch_with_timeout("critic", BATCH_TIMEOUT_SECS, MODE, async {
        critique_batch(router, &retry, request.temperatures.evaluation(), &ideas, &topic, &context_text).await.map(|(evals, _meta)| evals)
    });
    let evaluations = match cancellable(cancellation, critic_call).await? {
        Ok(evaluations) if !evaluations.is_empty() => evaluations,
        Ok(_) => {
            warn!("critic batch produced zero evaluations; returning an empty result");
            return Ok(WorkflowOutcome::empty());
        }
        Err(err) => {
            error!(error = %err, "critic batch failed entirely; returning an empty result");
            return Ok(WorkflowOutcome::empty());
        }
    };
    timings.record("critic", stage_start.elapsed());

    let mut candidates: Vec<_> = ideas.iter().map(|idea| new_candidate(idea, &request.tags)).collect();
    update_candidates_with_critic_results(&mut candidates, &evaluations);
    let mut candidates = top_k(candidates, request.num_top_candidates);

    // Steps 4-7: multi-dim eval, Advocate, Skeptic, and logical inference
    // don't depend on one another's output, so run them concurrently
    // (§4.10), each still bounded by the shared semaphore.
    report(progress, "advocacy_skepticism_reasoning", 3);
    let stage_start = Instant::now();
    let multidim_enabled = request.reasoning_requested() && request.multi_dimensional_eval;
    let inference_enabled = request.reasoning_requested() && request.enable_logical_inference;

    let multidim_future = async {
        if !multidim_enabled {
            return None;
        }
        let _permit = semaphore.acquire().await.expect("semaphore is never closed");
        Some(compute_multidim(ctx, &candidates, &topic, &context_text, request.temperatures.unoverridden_stage(), false).await)
    };
    let advocacy_future = async {
        let _permit = semaphore.acquire().await.expect("semaphore is never closed");
        compute_advocacy(ctx, &candidates, &topic, &context_text, request.temperatures.advocacy(), MODE).await
    };
    let skepticism_future = async {
        let _permit = semaphore.acquire().await.expect("semaphore is never closed");
        compute_skepticism(ctx, &candidates, &topic, &context_text, request.temperatures.skepticism(), MODE).await
    };
    let inference_future = async {
        if !inference_enabled {
            return None;
        }
        let _permit = semaphore.acquire().await.expect("semaphore is never closed");
        Some(compute_inference(ctx, &candidates, &topic, &context_text, InferenceAnalysisType::Full, false).await)
    };

    let (multidim_results, advocacy_results, skepticism_results, inference_results) =
        cancellable(cancellation, async { tokio::join!(multidim_future, advocacy_future, skepticism_future, inference_future) }).await?;
    timings.record("advocacy_skepticism_reasoning", stage_start.elapsed());

    update_candidates_with_advocacy_results(&mut candidates, &advocacy_results);
    update_candidates_with_skepticism_results(&mut candidates, &skepticism_results);
    if let Some(results) = multidim_results {
        update_candidates_with_multi_dim_results(&mut candidates, &results);
    }
    if let Some(results) = inference_results {
        update_candidates_with_inference_results(&mut candidates, &results);
    }

    // Step 8: Improver.
    report(progress, "improvement", 4);
    let stage_start = Instant::now();
    cancellable(cancellation, apply_improvement(ctx, &mut candidates, &topic, &context_text, request.temperatures.unoverridden_stage(), MODE)).await?;
    timings.record("improvement", stage_start.elapsed());

    // Step 9: re-evaluation Critic on the improved ideas.
    report(progress, "critic_reevaluation", 5);
    let stage_start = Instant::now();
    cancellable(cancellation, apply_reevaluation(ctx, &mut candidates, &topic, &context_text, request.temperatures.evaluation(), MODE)).await?;
    timings.record("critic_reevaluation", stage_start.elapsed());

    // Step 10: re-run multi-dim evaluation on the improved ideas.
    if multidim_enabled {
        report(progress, "multi_dim_eval_final", 6);
        let stage_start = Instant::now();
        let results = cancellable(cancellation, compute_multidim(ctx, &candidates, &topic, &context_text, request.temperatures.unoverridden_stage(), true)).await?;
        update_candidates_with_multi_dim_results(&mut candidates, &results);
        timings.record("multi_dim_eval_final", stage_start.elapsed());
    }

    // Step 11: finalize and rank.
    report(progress, "finalize", TOTAL_STAGES);
    let candidates = finalize(candidates);
    Ok(WorkflowOutcome { candidates, stage_timings: timings })
}
