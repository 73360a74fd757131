//! Stage-calling helpers shared by the Sync (C9) and Async (C10)
//! coordinators (§4.9, §4.10): each wraps one C6/C8 batch call under the
//! per-batch timeout of §5 and applies the stage-level resilience policy
//! of §7 — a stage that fails entirely (not merely a partial batch)
//! leaves every affected candidate with the same documented placeholder
//! a partial batch's missing index would get, rather than failing the
//! workflow.
//!
//! The Idea Generator and the *initial* Critic call are the two
//! exceptions (§7: "zero parseable outputs are fatal for the workflow")
//! and are called directly by each coordinator rather than through here,
//! since a fatal stage short-circuits the whole run instead of
//! substituting a placeholder.

use std::time::Duration;

use madspark_agents::{
    advocate_batch, improve_batch, prepare_advocacy_input, prepare_improvement_input,
    prepare_skepticism_input, run_batch_with_timeout, skeptic_batch,
    update_candidates_with_advocacy_results, update_candidates_with_improvement_results,
    update_candidates_with_inference_results, update_candidates_with_multi_dim_results,
    update_candidates_with_reevaluation_results, update_candidates_with_skepticism_results,
    ExecutionMode,
};
use madspark_contracts::{Advocacy, Candidate, Evaluation, Idea, ImprovedIdea, InferenceAnalysisType, LogicalInference, MultiDimEvaluation, Skepticism};
use madspark_reasoning::{LogicalInferenceEngine, MultiDimEvaluator};
use tracing::warn;

use crate::context::CoordinatorContext;

/// Per-batch wall-clock bound (§5 "Per-batch operation timeout defaults
/// to 60 s"), independent of the overall per-workflow deadline each
/// coordinator enforces separately.
pub const BATCH_TIMEOUT_SECS: u64 = 60;

fn ideas_of(candidates: &[Candidate], use_improved: bool) -> Vec<Idea> {
    if use_improved {
        candidates.iter().map(|c| c.improved_idea.clone()).collect()
    } else {
        candidates.iter().map(|c| c.original_idea.clone()).collect()
    }
}

/// Bounds a reasoning-engine call (differing error type from the C6
/// agent batch calls, so it can't reuse [`run_batch_with_timeout`]
/// directly) by the same per-batch timeout, logging and returning `None`
/// on either a timeout or a call failure.
async fn with_batch_timeout<T, E, F>(name: &'static str, future: F) -> Option<T>
where
    E: std::fmt::Display,
    F: std::future::Future<Output = Result<T, E>>,
{
    match tokio::time::timeout(Duration::from_secs(BATCH_TIMEOUT_SECS), future).await {
        Ok(Ok(value)) => Some(value),
        Ok(Err(err)) => {
            warn!(batch = name, error = %err, "stage batch call failed entirely; candidates keep a placeholder");
            None
        }
        Err(_) => {
            warn!(batch = name, timeout_secs = BATCH_TIMEOUT_SECS, "stage batch call timed out; candidates keep a placeholder");
            None
        }
    }
}

/// Advocate batch (§4.9 step 5), read-only over `candidates` so the
/// Async Coordinator can run it concurrently with the other independent
/// stages. An entirely-failed batch comes back as an empty vec, which
/// [`madspark_agents::update_candidates_with_advocacy_results`] turns into
/// a per-candidate placeholder when merged.
pub async fn compute_advocacy(ctx: &CoordinatorContext, candidates: &[Candidate], topic: &str, context: &str, temperature: f64, mode: ExecutionMode) -> Vec<Advocacy> {
    let inputs = prepare_advocacy_input(candidates);
    let retry = ctx.retry_executor();
    let router = ctx.router.clone();
    let result = run_batch_with_timeout("advocate", BATCH_TIMEOUT_SECS, mode, async {
        advocate_batch(router, &retry, temperature, &inputs, topic, context).await.map(|(records, _meta)| records)
    })
    .await;
    result.unwrap_or_else(|err| {
        warn!(error = %err, "advocate batch failed entirely; candidates keep a placeholder");
        Vec::new()
    })
}

/// Applies [`compute_advocacy`]'s result onto `candidates`.
pub async fn apply_advocacy(ctx: &CoordinatorContext, candidates: &mut [Candidate], topic: &str, context: &str, temperature: f64, mode: ExecutionMode) {
    let records = compute_advocacy(ctx, candidates, topic, context, temperature, mode).await;
    update_candidates_with_advocacy_results(candidates, &records);
}

/// Skeptic batch (§4.9 step 6), read-only — see [`compute_advocacy`].
pub async fn compute_skepticism(ctx: &CoordinatorContext, candidates: &[Candidate], topic: &str, context: &str, temperature: f64, mode: ExecutionMode) -> Vec<Skepticism> {
    let inputs = prepare_skepticism_input(candidates);
    let retry = ctx.retry_executor();
    let router = ctx.router.clone();
    let result = run_batch_with_timeout("skeptic", BATCH_TIMEOUT_SECS, mode, async {
        skeptic_batch(router, &retry, temperature, &inputs, topic, context).await.map(|(records, _meta)| records)
    })
    .await;
    result.unwrap_or_else(|err| {
        warn!(error = %err, "skeptic batch failed entirely; candidates keep a placeholder");
        Vec::new()
    })
}

pub async fn apply_skepticism(ctx: &CoordinatorContext, candidates: &mut [Candidate], topic: &str, context: &str, temperature: f64, mode: ExecutionMode) {
    let records = compute_skepticism(ctx, candidates, topic, context, temperature, mode).await;
    update_candidates_with_skepticism_results(candidates, &records);
}

/// Multi-dimensional evaluation (§4.8, §4.9 steps 4 and 10), read-only —
/// see [`compute_advocacy`]. `use_improved` selects scoring the original
/// ideas (initial pass) or the improved ones (re-evaluation pass).
pub async fn compute_multidim(ctx: &CoordinatorContext, candidates: &[Candidate], topic: &str, context: &str, temperature: f64, use_improved: bool) -> Vec<MultiDimEvaluation> {
    let ideas = ideas_of(candidates, use_improved);
    let evaluator = MultiDimEvaluator::new(ctx.router.clone(), ctx.retry_executor()).with_weights(ctx.dimension_weights);
    with_batch_timeout("multi_dim_eval", evaluator.evaluate_batch(&ideas, topic, context, temperature)).await.unwrap_or_default()
}

pub async fn apply_multidim(ctx: &CoordinatorContext, candidates: &mut [Candidate], topic: &str, context: &str, temperature: f64, use_improved: bool) {
    let results = compute_multidim(ctx, candidates, topic, context, temperature, use_improved).await;
    update_candidates_with_multi_dim_results(candidates, &results);
}

/// Logical inference (§4.8, §4.9 step 7), read-only — see
/// [`compute_advocacy`]. [`LogicalInferenceEngine`] never fails outright
/// (it falls back to a rule-based result per idea internally), so the
/// only failure mode here is the batch timing out.
pub async fn compute_inference(ctx: &CoordinatorContext, candidates: &[Candidate], topic: &str, context: &str, analysis_type: InferenceAnalysisType, use_improved: bool) -> Vec<LogicalInference> {
    let ideas = ideas_of(candidates, use_improved);
    let engine = LogicalInferenceEngine::with_llm(ctx.router.clone(), ctx.retry_executor());
    let future = async { Ok::<_, std::convert::Infallible>(engine.analyze_batch(&ideas, topic, context, analysis_type).await) };
    with_batch_timeout("logical_inference", future).await.unwrap_or_default()
}

pub async fn apply_inference(ctx: &CoordinatorContext, candidates: &mut [Candidate], topic: &str, context: &str, analysis_type: InferenceAnalysisType, use_improved: bool) {
    let results = compute_inference(ctx, candidates, topic, context, analysis_type, use_improved).await;
    update_candidates_with_inference_results(candidates, &results);
}

/// Improver batch (§4.9 step 8).
pub async fn apply_improvement(ctx: &CoordinatorContext, candidates: &mut [Candidate], topic: &str, context: &str, temperature: f64, mode: ExecutionMode) {
    let inputs = prepare_improvement_input(candidates);
    let retry = ctx.retry_executor();
    let router = ctx.router.clone();
    let result = run_batch_with_timeout("improve", BATCH_TIMEOUT_SECS, mode, async {
        improve_batch(router, &retry, temperature, &inputs, topic, context).await.map(|(records, _meta)| records)
    })
    .await;
    let records: Vec<ImprovedIdea> = result.unwrap_or_else(|err| {
        warn!(error = %err, "improver batch failed entirely; candidates keep the original idea");
        Vec::new()
    });
    update_candidates_with_improvement_results(candidates, &records);
}

/// Re-evaluation Critic batch on the improved ideas (§4.9 step 9). Unlike
/// the *initial* Critic call, a total failure here is stage-level
/// resilience (placeholder), not a fatal workflow outcome — see
/// DESIGN.md's resolution of this §7 ambiguity.
pub async fn apply_reevaluation(ctx: &CoordinatorContext, candidates: &mut [Candidate], topic: &str, context: &str, temperature: f64, mode: ExecutionMode) {
    let improved_ideas = ideas_of(candidates, true);
    let retry = ctx.retry_executor();
    let router = ctx.router.clone();
    let result = run_batch_with_timeout("critic_reevaluation", BATCH_TIMEOUT_SECS, mode, async {
        madspark_agents::critique_batch(router, &retry, temperature, &improved_ideas, topic, context).await.map(|(evals, _meta)| evals)
    })
    .await;
    let evaluations: Vec<Evaluation> = result.unwrap_or_else(|err| {
        warn!(error = %err, "re-evaluation critic batch failed entirely; candidates keep a placeholder");
        Vec::new()
    });
    update_candidates_with_reevaluation_results(candidates, &evaluations);
}
