//! The five agent functions (C6, §4.6): pure calls from
//! (inputs, topic, context, temperature) to a validated record, each
//! routed through the Router and wrapped by the retry executor.
//!
//! Batch variants that fan one call out over N inputs (Critic is
//! already batch-shaped; Advocate/Skeptic/Improver gain array schemas
//! for their batch form, §4.7) live alongside the single-item calls
//! they share a prompt style with.

use std::sync::Arc;

use madspark_contracts::schema::{
    advocacy_batch_schema, critic_evaluation_schema, generated_ideas_schema,
    improvement_batch_schema, skepticism_batch_schema, validate_advocacy,
    validate_critic_evaluations, validate_generated_ideas, validate_improvement,
    validate_skepticism, SchemaDescriptor,
};
use madspark_contracts::{Advocacy, Evaluation, Idea, ImprovedIdea, LlmResponseMeta, RequestInputs, Skepticism};
use madspark_providers::GenerateRequest;
use madspark_resilience::RetryExecutor;
use madspark_router::{RouteOptions, Router};
use serde_json::Value;
use tracing::instrument;

use crate::error::AgentError;
use crate::prompts::{
    with_language_consistency, ADVOCATE_SYSTEM_INSTRUCTION, CRITIC_SYSTEM_INSTRUCTION,
    IDEA_GENERATOR_SYSTEM_INSTRUCTION, IMPROVER_SYSTEM_INSTRUCTION, SKEPTIC_SYSTEM_INSTRUCTION,
};

/// Routes one structured-generation call through the retry executor,
/// cloning owned copies of every argument into each attempt so the
/// boxed future required by [`RetryExecutor::execute`] is `'static`.
async fn call_with_retry(
    router: Arc<Router>,
    retry: &RetryExecutor,
    prompt: &str,
    system_instruction: &str,
    schema: &SchemaDescriptor,
    temperature: f64,
    options: RouteOptions,
) -> Result<(Value, LlmResponseMeta), AgentError> {
    call_with_retry_multimodal(router, retry, prompt, system_instruction, schema, temperature, options, &[], &[]).await
}

/// Same as [`call_with_retry`] but threads multimodal files/URLs into the
/// request so the Router's §4.4 rule 2 (multimodal content forces the
/// cloud provider) can apply. Only the Idea Generator currently carries
/// these (§4.6's input table).
#[allow(clippy::too_many_arguments)]
async fn call_with_retry_multimodal(
    router: Arc<Router>,
    retry: &RetryExecutor,
    prompt: &str,
    system_instruction: &str,
    schema: &SchemaDescriptor,
    temperature: f64,
    options: RouteOptions,
    files: &[String],
    urls: &[String],
) -> Result<(Value, LlmResponseMeta), AgentError> {
    // Caller input validation runs once, before the retry loop, so an
    // out-of-range temperature is never retried (it can't succeed on a
    // later attempt).
    madspark_contracts::validate_temperature(temperature)?;

    retry
        .execute(move || {
            let router = router.clone();
            let prompt = prompt.to_string();
            let system_instruction = system_instruction.to_string();
            let schema = schema.clone();
            let options = options.clone();
            let files = files.to_vec();
            let urls = urls.to_vec();
            Box::pin(async move {
                let request = GenerateRequest::new(&prompt, &system_instruction, &schema, temperature)?.with_multimodal(&files, &urls);
                router.generate_structured(request, options).await
            })
        })
        .await
        .map_err(|err| AgentError::RetriesExhausted(err.to_string()))
}

fn routed(cache_enabled: bool) -> RouteOptions {
    RouteOptions {
        force_provider: None,
        cache_enabled,
    }
}

/// Idea Generator: topic/context (plus optional files/URLs, §4.2) to
/// 1..20 distinct ideas.
#[instrument(skip(router, retry, inputs))]
pub async fn generate_ideas(
    router: Arc<Router>,
    retry: &RetryExecutor,
    temperature: f64,
    inputs: &RequestInputs,
) -> Result<(Vec<Idea>, LlmResponseMeta), AgentError> {
    inputs.validate()?;

    let schema = generated_ideas_schema();
    let prompt = format!(
        "Topic: {}\nContext: {}\n\nGenerate between 1 and 20 distinct, concrete ideas. \
         Respond with a JSON array matching the GeneratedIdeas schema, one object per idea.",
        inputs.topic, inputs.context
    );
    let system_instruction = with_language_consistency(IDEA_GENERATOR_SYSTEM_INSTRUCTION);

    let (value, meta) = call_with_retry_multimodal(
        router,
        retry,
        &prompt,
        &system_instruction,
        &schema,
        temperature,
        routed(true),
        &inputs.multimodal_files,
        &inputs.multimodal_urls,
    )
    .await?;

    let ideas: Vec<Idea> = serde_json::from_value(value).map_err(|e| AgentError::ResponseParsing(format!("GeneratedIdeas: {e}")))?;
    validate_generated_ideas(&ideas)?;
    Ok((ideas, meta))
}

/// Critic batch: one `Evaluation` per idea, same order as the input
/// list (the table entry in §4.6 is already a batch call).
#[instrument(skip(router, retry, ideas))]
pub async fn critique_batch(
    router: Arc<Router>,
    retry: &RetryExecutor,
    temperature: f64,
    ideas: &[Idea],
    topic: &str,
    context: &str,
) -> Result<(Vec<Evaluation>, LlmResponseMeta), AgentError> {
    let schema = critic_evaluation_schema();
    let numbered: Vec<String> = ideas
        .iter()
        .map(|idea| format!("[{}] {}: {}", idea.index, idea.title, idea.description))
        .collect();
    let prompt = format!(
        "Topic: {topic}\nContext: {context}\n\nEvaluate each of the following ideas, returning exactly one \
         evaluation per idea in the same order, indexed by idea_index:\n{}",
        numbered.join("\n")
    );
    let system_instruction = with_language_consistency(CRITIC_SYSTEM_INSTRUCTION);

    let (value, meta) = call_with_retry(router, retry, &prompt, &system_instruction, &schema, temperature, routed(true)).await?;

    let evaluations: Vec<Evaluation> = serde_json::from_value(value).map_err(|e| AgentError::ResponseParsing(format!("CriticEvaluations: {e}")))?;
    validate_critic_evaluations(&evaluations)?;
    if evaluations.len() != ideas.len() {
        tracing::warn!(expected = ideas.len(), actual = evaluations.len(), "critic batch returned fewer evaluations than ideas; missing indices fall back to a placeholder downstream");
    }
    Ok((evaluations, meta))
}

/// One (idea, evaluation, context) pair fed to the Advocate/Skeptic/
/// Improver batch calls (§4.7's `prepareXInput` shapes, assembled by the
/// caller in `madspark-agents::batch`).
pub struct AdvocacyInput<'a> {
    pub idea: &'a Idea,
    pub evaluation_comment: String,
}

/// Advocate batch: strengths/opportunities/addressed-concerns per idea.
#[instrument(skip(router, retry, inputs))]
pub async fn advocate_batch(
    router: Arc<Router>,
    retry: &RetryExecutor,
    temperature: f64,
    inputs: &[AdvocacyInput<'_>],
    topic: &str,
    context: &str,
) -> Result<(Vec<Advocacy>, LlmResponseMeta), AgentError> {
    let schema = advocacy_batch_schema();
    let numbered: Vec<String> = inputs
        .iter()
        .map(|input| format!("[{}] Idea: {}\nEvaluation: {}", input.idea.index, input.idea.description, input.evaluation_comment))
        .collect();
    let prompt = format!(
        "Topic: {topic}\nContext: {context}\n\nFor each idea below, make the case for it: its strengths, \
         opportunities, and how it addresses the evaluator's concerns. Return exactly one advocacy record per \
         idea, indexed by idea_index:\n{}",
        numbered.join("\n")
    );
    let system_instruction = with_language_consistency(ADVOCATE_SYSTEM_INSTRUCTION);

    let (value, meta) = call_with_retry(router, retry, &prompt, &system_instruction, &schema, temperature, routed(true)).await?;

    let records: Vec<Advocacy> = serde_json::from_value(value).map_err(|e| AgentError::ResponseParsing(format!("AdvocacyBatch: {e}")))?;
    for record in &records {
        validate_advocacy(record)?;
    }
    if records.len() != inputs.len() {
        tracing::warn!(expected = inputs.len(), actual = records.len(), "advocacy batch returned fewer records than inputs; missing indices fall back to a placeholder downstream");
    }
    Ok((records, meta))
}

/// One (idea, advocacy) pair fed to the Skeptic batch call.
pub struct SkepticismInput<'a> {
    pub idea: &'a Idea,
    pub advocacy_summary: String,
}

/// Skeptic batch: critical flaws/risks/assumptions/missing considerations.
#[instrument(skip(router, retry, inputs))]
pub async fn skeptic_batch(
    router: Arc<Router>,
    retry: &RetryExecutor,
    temperature: f64,
    inputs: &[SkepticismInput<'_>],
    topic: &str,
    context: &str,
) -> Result<(Vec<Skepticism>, LlmResponseMeta), AgentError> {
    let schema = skepticism_batch_schema();
    let numbered: Vec<String> = inputs
        .iter()
        .map(|input| format!("[{}] Idea: {}\nAdvocacy: {}", input.idea.index, input.idea.description, input.advocacy_summary))
        .collect();
    let prompt = format!(
        "Topic: {topic}\nContext: {context}\n\nFor each idea below, challenge the case made for it: critical \
         flaws, risks and challenges, questionable assumptions, and missing considerations. Return exactly one \
         skepticism record per idea, indexed by idea_index:\n{}",
        numbered.join("\n")
    );
    let system_instruction = with_language_consistency(SKEPTIC_SYSTEM_INSTRUCTION);

    let (value, meta) = call_with_retry(router, retry, &prompt, &system_instruction, &schema, temperature, routed(true)).await?;

    let records: Vec<Skepticism> = serde_json::from_value(value).map_err(|e| AgentError::ResponseParsing(format!("SkepticismBatch: {e}")))?;
    for record in &records {
        validate_skepticism(record)?;
    }
    if records.len() != inputs.len() {
        tracing::warn!(expected = inputs.len(), actual = records.len(), "skepticism batch returned fewer records than inputs; missing indices fall back to a placeholder downstream");
    }
    Ok((records, meta))
}

/// Every prior-stage signal the Improver sees for one idea (§4.6's
/// `originalIdea, critique, advocacyPoints, skepticPoints` input row).
/// Absent signals are represented as `"N/A"` by the caller (§4.7).
pub struct ImprovementInput<'a> {
    pub idea: &'a Idea,
    pub critique: String,
    pub advocacy_summary: String,
    pub skepticism_summary: String,
}

/// Improver batch: one revised idea per input, addressing prior critique.
#[instrument(skip(router, retry, inputs))]
pub async fn improve_batch(
    router: Arc<Router>,
    retry: &RetryExecutor,
    temperature: f64,
    inputs: &[ImprovementInput<'_>],
    topic: &str,
    context: &str,
) -> Result<(Vec<ImprovedIdea>, LlmResponseMeta), AgentError> {
    let schema = improvement_batch_schema();
    let numbered: Vec<String> = inputs
        .iter()
        .map(|input| {
            format!(
                "[{}] Idea: {}\nCritique: {}\nAdvocacy: {}\nSkepticism: {}",
                input.idea.index, input.idea.description, input.critique, input.advocacy_summary, input.skepticism_summary
            )
        })
        .collect();
    let prompt = format!(
        "Topic: {topic}\nContext: {context}\n\nFor each idea below, produce a revised version that addresses \
         the critique, advocacy, and skepticism recorded for it. Return exactly one improved idea per input, \
         indexed by idea_index:\n{}",
        numbered.join("\n")
    );
    let system_instruction = with_language_consistency(IMPROVER_SYSTEM_INSTRUCTION);

    let (value, meta) = call_with_retry(router, retry, &prompt, &system_instruction, &schema, temperature, routed(true)).await?;

    let records: Vec<ImprovedIdea> = serde_json::from_value(value).map_err(|e| AgentError::ResponseParsing(format!("ImprovementBatch: {e}")))?;
    for record in &records {
        validate_improvement(record)?;
    }
    if records.len() != inputs.len() {
        tracing::warn!(expected = inputs.len(), actual = records.len(), "improvement batch returned fewer records than inputs; missing indices fall back to a placeholder downstream");
    }
    Ok((records, meta))
}

#[cfg(test)]
mod tests {
    use super::*;
    use madspark_providers::MockProvider;
    use madspark_resilience::RetryConfig;

    fn router_with_mock(response_count: usize) -> Arc<Router> {
        let provider: Arc<dyn madspark_providers::LlmProvider> = Arc::new(MockProvider::new(response_count));
        Arc::new(Router::new(Some(provider), None, None, false))
    }

    fn retry_executor() -> RetryExecutor {
        RetryExecutor::with_default_policy(RetryConfig {
            max_attempts: 2,
            initial_delay_ms: 1,
            max_delay_ms: 2,
            backoff_multiplier: 1.0,
            jitter_factor: 0.0,
            use_exponential_backoff: false,
            use_jitter: false,
        })
    }

    fn sample_ideas(count: usize) -> Vec<Idea> {
        (0..count as u32)
            .map(|i| Idea {
                index: i,
                title: format!("Idea {i}"),
                description: format!("Description of idea {i}"),
                key_features: vec![],
                category: "x".into(),
            })
            .collect()
    }

    #[tokio::test]
    async fn generate_ideas_returns_mock_configured_count() {
        let router = router_with_mock(3);
        let retry = retry_executor();
        let inputs = RequestInputs::new("urban farming", "apartment balconies");
        let (ideas, meta) = generate_ideas(router, &retry, 0.7, &inputs).await.unwrap();
        assert_eq!(ideas.len(), 3);
        assert_eq!(meta.provider, "mock");
    }

    #[tokio::test]
    async fn generate_ideas_rejects_empty_topic_without_calling_provider() {
        let router = router_with_mock(3);
        let retry = retry_executor();
        let inputs = RequestInputs::new("", "some context");
        let err = generate_ideas(router, &retry, 0.7, &inputs).await.unwrap_err();
        assert!(matches!(err, AgentError::Validation(_)));
    }

    #[tokio::test]
    async fn critique_batch_returns_one_evaluation_per_idea() {
        let ideas = sample_ideas(2);
        let router = router_with_mock(ideas.len());
        let retry = retry_executor();
        let (evaluations, _) = critique_batch(router, &retry, 0.5, &ideas, "topic", "context").await.unwrap();
        assert_eq!(evaluations.len(), ideas.len());
        assert_eq!(evaluations[0].score, madspark_providers::MOCK_CONSTANT_SCORE);
    }

    #[tokio::test]
    async fn advocate_batch_returns_one_record_per_input() {
        let ideas = sample_ideas(2);
        let router = router_with_mock(ideas.len());
        let retry = retry_executor();
        let inputs: Vec<AdvocacyInput<'_>> = ideas
            .iter()
            .map(|idea| AdvocacyInput {
                idea,
                evaluation_comment: "solid evaluation".to_string(),
            })
            .collect();
        let (records, _) = advocate_batch(router, &retry, 0.7, &inputs, "topic", "context").await.unwrap();
        assert_eq!(records.len(), inputs.len());
    }

    #[tokio::test]
    async fn skeptic_batch_returns_one_record_per_input() {
        let ideas = sample_ideas(2);
        let router = router_with_mock(ideas.len());
        let retry = retry_executor();
        let inputs: Vec<SkepticismInput<'_>> = ideas
            .iter()
            .map(|idea| SkepticismInput {
                idea,
                advocacy_summary: "strong case".to_string(),
            })
            .collect();
        let (records, _) = skeptic_batch(router, &retry, 0.7, &inputs, "topic", "context").await.unwrap();
        assert_eq!(records.len(), inputs.len());
    }

    #[tokio::test]
    async fn improve_batch_returns_one_record_per_input() {
        let ideas = sample_ideas(2);
        let router = router_with_mock(ideas.len());
        let retry = retry_executor();
        let inputs: Vec<ImprovementInput<'_>> = ideas
            .iter()
            .map(|idea| ImprovementInput {
                idea,
                critique: "N/A".to_string(),
                advocacy_summary: "N/A".to_string(),
                skepticism_summary: "N/A".to_string(),
            })
            .collect();
        let (records, _) = improve_batch(router, &retry, 0.9, &inputs, "topic", "context").await.unwrap();
        assert_eq!(records.len(), inputs.len());
    }

    #[tokio::test]
    async fn batch_length_mismatch_returns_the_partial_results_for_the_caller_to_merge() {
        let ideas = sample_ideas(3);
        // Mock configured for only 2 records while 3 ideas are submitted; the
        // coordinator's merge-by-idea_index step (madspark-agents::batch) is
        // responsible for placeholdering the missing index, not this call.
        let router = router_with_mock(2);
        let retry = retry_executor();
        let (evaluations, _) = critique_batch(router, &retry, 0.5, &ideas, "topic", "context").await.unwrap();
        assert_eq!(evaluations.len(), 2);
    }
}
