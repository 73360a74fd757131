//! Sync Coordinator (C9, §4.9): runs the full 11-step pipeline strictly
//! in order. Stage timeouts are checked at stage boundaries rather than
//! cancelling an in-flight call (§4.9, §9 "best-effort deadline" open
//! question, resolved here and in the Async Coordinator the same way,
//! just with true cancellation there — see DESIGN.md).
//!
//! This is the entry point small synchronous callers reach for; it also
//! guards against the deadlock of calling it from inside an already-
//! running async runtime (§4.10 "Event-loop safety").

use std::time::Instant;

use madspark_agents::{critique_batch, generate_ideas, run_batch_with_timeout, ExecutionMode};
use madspark_contracts::InferenceAnalysisType;
use tracing::{error, warn};

use crate::context::CoordinatorContext;
use crate::error::CoordinatorError;
use crate::ranking::{finalize, new_candidate, top_k};
use crate::request::{StageTimings, WorkflowOutcome, WorkflowRequest};
use crate::stages::{apply_advocacy, apply_improvement, apply_inference, apply_multidim, apply_reevaluation, apply_skepticism, BATCH_TIMEOUT_SECS};

const MODE: ExecutionMode = ExecutionMode::Sync;

fn check_deadline(started: Instant, timeout_secs: u64) -> Result<(), CoordinatorError> {
    if started.elapsed().as_secs() >= timeout_secs {
        return Err(CoordinatorError::Timeout { timeout_secs });
    }
    Ok(())
}

/// Runs the pipeline to completion and returns the ranked candidates.
/// Must be awaited from within a Tokio runtime — use [`run_workflow_blocking`]
/// from synchronous call sites instead.
pub async fn run_workflow(ctx: &CoordinatorContext, request: WorkflowRequest) -> Result<WorkflowOutcome, CoordinatorError> {
    request.validate()?;
    let started = Instant::now();
    let mut timings = StageTimings::default();
    let topic = request.inputs.topic.clone();
    let context_text = request.inputs.context.clone();

    // Step 2: Idea Generator. Zero parseable outputs (either a hard
    // failure or an empty list) is fatal for the workflow (§7): return an
    // empty outcome rather than propagating an error.
    let stage_start = Instant::now();
    let ideas = match generate_ideas(ctx.router.clone(), &ctx.retry_executor(), request.temperatures.idea(), &request.inputs).await {
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
    check_deadline(started, request.timeout_secs)?;

    // Step 3: initial Critic batch, also fatal on zero parseable outputs.
    let stage_start = Instant::now();
    let retry = ctx.retry_executor();
    let router = ctx.router.clone();
    let critic_result = run_batch_with_timeout("critic", BATCH_TIMEOUT_SECS, MODE, async {
        critique_batch(router, &retry, request.temperatures.evaluation(), &ideas, &topic, &context_text).await.map(|(evals, _meta)| evals)
    })
    .await;
    timings.record("critic", stage_start.elapsed());
    let evaluations = match critic_result {
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
    check_deadline(started, request.timeout_secs)?;

    let mut candidates: Vec<_> = ideas.iter().map(|idea| new_candidate(idea, &request.tags)).collect();
    madspark_agents::update_candidates_with_critic_results(&mut candidates, &evaluations);

    // Step 3 (cont.): shortlist to the top-K candidates by initial score.
    let mut candidates = top_k(candidates, request.num_top_candidates);
    check_deadline(started, request.timeout_secs)?;

    // Step 4: initial multi-dim evaluation, if requested.
    if request.reasoning_requested() && request.multi_dimensional_eval {
        let stage_start = Instant::now();
        apply_multidim(ctx, &mut candidates, &topic, &context_text, request.temperatures.unoverridden_stage(), false).await;
        timings.record("multi_dim_eval_initial", stage_start.elapsed());
        check_deadline(started, request.timeout_secs)?;
    }

    // Step 5: Advocate.
    let stage_start = Instant::now();
    apply_advocacy(ctx, &mut candidates, &topic, &context_text, request.temperatures.advocacy(), MODE).await;
    timings.record("advocacy", stage_start.elapsed());
    check_deadline(started, request.timeout_secs)?;

    // Step 6: Skeptic.
    let stage_start = Instant::now();
    apply_skepticism(ctx, &mut candidates, &topic, &context_text, request.temperatures.skepticism(), MODE).await;
    timings.record("skepticism", stage_start.elapsed());
    check_deadline(started, request.timeout_secs)?;

    // Step 7: logical inference, if requested.
    if request.reasoning_requested() && request.enable_logical_inference {
        let stage_start = Instant::now();
        apply_inference(ctx, &mut candidates, &topic, &context_text, InferenceAnalysisType::Full, false).await;
        timings.record("logical_inference", stage_start.elapsed());
        check_deadline(started, request.timeout_secs)?;
    }

    // Step 8: Improver.
    let stage_start = Instant::now();
    apply_improvement(ctx, &mut candidates, &topic, &context_text, request.temperatures.unoverridden_stage(), MODE).await;
    timings.record("improvement", stage_start.elapsed());
    check_deadline(started, request.timeout_secs)?;

    // Step 9: re-evaluation Critic on the improved ideas.
    let stage_start = Instant::now();
    apply_reevaluation(ctx, &mut candidates, &topic, &context_text, request.temperatures.evaluation(), MODE).await;
    timings.record("critic_reevaluation", stage_start.elapsed());
    check_deadline(started, request.timeout_secs)?;

    // Step 10: re-run multi-dim evaluation on the improved ideas.
    if request.reasoning_requested() && request.multi_dimensional_eval {
        let stage_start = Instant::now();
        apply_multidim(ctx, &mut candidates, &topic, &context_text, request.temperatures.unoverridden_stage(), true).await;
        timings.record("multi_dim_eval_final", stage_start.elapsed());
    }

    // Step 11: finalize and rank.
    let candidates = finalize(candidates);
    Ok(WorkflowOutcome { candidates, stage_timings: timings })
}

/// Synchronous entry point for non-async callers (§4.10 "Event-loop
/// safety"): builds a dedicated current-thread runtime to drive
/// [`run_workflow`]. Returns [`CoordinatorError::Configuration`] if
/// called from inside an already-running Tokio runtime, where blocking
/// on a fresh runtime would deadlock.
pub fn run_workflow_blocking(ctx: &CoordinatorContext, request: WorkflowRequest) -> Result<WorkflowOutcome, CoordinatorError> {
    if tokio::runtime::Handle::try_current().is_ok() {
        return Err(CoordinatorError::Configuration(
            "run_workflow_blocking was called from inside an active Tokio runtime; call run_workflow directly instead".to_string(),
        ));
    }
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .map_err(|e| CoordinatorError::Configuration(format!("failed to start a runtime: {e}")))?;
    runtime.block_on(run_workflow(ctx, request))
}
