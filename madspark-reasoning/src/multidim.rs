//! Multi-dimensional evaluation (C8, §4.8 "Multi-dimensional evaluation").
//!
//! `MultiDimEvaluator` has no keyword-based fallback path: it is
//! constructed with a live [`Router`] and always scores ideas through a
//! real (or mock) provider call. Callers that want to skip multi-dim
//! evaluation entirely simply don't construct one — the coordinator
//! treats it as optional per-workflow, not optional per-call.

use std::sync::Arc;

use madspark_contracts::schema::{multi_dim_batch_schema, multi_dim_summary_batch_schema};
use madspark_contracts::{DimensionScores, DimensionWeights, Idea, MultiDimEvaluation};
use madspark_providers::GenerateRequest;
use madspark_resilience::RetryExecutor;
use madspark_router::{RouteOptions, Router};
use serde::Deserialize;
use serde_json::Value;
use tracing::{instrument, warn};

use crate::error::ReasoningError;

#[derive(Debug, Deserialize)]
struct RawDimensions {
    feasibility: f64,
    innovation: f64,
    impact: f64,
    cost_effectiveness: f64,
    scalability: f64,
    risk_assessment: f64,
    timeline: f64,
}

impl From<RawDimensions> for DimensionScores {
    fn from(raw: RawDimensions) -> Self {
        DimensionScores {
            feasibility: raw.feasibility,
            innovation: raw.innovation,
            impact: raw.impact,
            cost_effectiveness: raw.cost_effectiveness,
            scalability: raw.scalability,
            risk_assessment: raw.risk_assessment,
            timeline: raw.timeline,
        }
    }
}

pub struct MultiDimEvaluator {
    router: Arc<Router>,
    retry: RetryExecutor,
    weights: DimensionWeights,
}

impl MultiDimEvaluator {
    pub fn new(router: Arc<Router>, retry: RetryExecutor) -> Self {
        Self {
            router,
            retry,
            weights: DimensionWeights::default(),
        }
    }

    pub fn with_weights(mut self, weights: DimensionWeights) -> Self {
        self.weights = weights;
        self
    }

    async fn call(&self, prompt: String, system_instruction: &str, schema: &madspark_contracts::schema::SchemaDescriptor, temperature: f64) -> Result<Value, ReasoningError> {
        // Validated once, before the retry loop, so an out-of-range
        // temperature is never retried.
        madspark_contracts::validate_temperature(temperature)?;

        let router = self.router.clone();
        let prompt = prompt;
        let system_instruction = system_instruction.to_string();
        let schema = schema.clone();
        self.retry
            .execute(move || {
                let router = router.clone();
                let prompt = prompt.clone();
                let system_instruction = system_instruction.clone();
                let schema = schema.clone();
                Box::pin(async move {
                    let request = GenerateRequest::new(&prompt, &system_instruction, &schema, temperature)?;
                    router
                        .generate_structured(request, RouteOptions { force_provider: None, cache_enabled: true })
                        .await
                })
            })
            .await
            .map(|(value, _meta)| value)
            .map_err(|err| ReasoningError::RetriesExhausted(err.to_string()))
    }

    /// Scores every idea across the seven dimensions (§4.8 steps 1-3),
    /// then attaches a human-readable summary (step 4). A row with one or
    /// more missing dimensions fails the whole batch; a row the provider
    /// simply omitted is left for the caller to merge with a placeholder,
    /// matching every other batch agent's missing-index policy (§4.7).
    #[instrument(skip(self, ideas))]
    pub async fn evaluate_batch(&self, ideas: &[Idea], topic: &str, context: &str, temperature: f64) -> Result<Vec<MultiDimEvaluation>, ReasoningError> {
        let numbered: Vec<String> = ideas.iter().map(|idea| format!("[{}] {}: {}", idea.index, idea.title, idea.description)).collect();
        let prompt = format!(
            "Topic: {topic}\nContext: {context}\n\nScore each idea below across seven dimensions (feasibility, \
             innovation, impact, cost_effectiveness, scalability, risk_assessment, timeline), each from 0 to 10. \
             Return exactly one scored record per idea, indexed by idea_index:\n{}",
            numbered.join("\n")
        );
        let value = self
            .call(
                prompt,
                "You are a multi-dimensional evaluation agent scoring ideas across seven weighted dimensions.",
                &multi_dim_batch_schema(),
                temperature,
            )
            .await?;

        let rows = value.as_array().ok_or_else(|| ReasoningError::ResponseParsing("MultiDimBatch: expected a JSON array".to_string()))?;

        let mut scored = Vec::with_capacity(rows.len());
        for row in rows {
            let idea_index = row
                .get("idea_index")
                .and_then(Value::as_u64)
                .ok_or_else(|| ReasoningError::ResponseParsing("MultiDimBatch row missing idea_index".to_string()))? as u32;
            let raw_scores = row
                .get("scores")
                .cloned()
                .ok_or_else(|| ReasoningError::MissingDimension {
                    idea_index,
                    reason: "response row has no scores object".to_string(),
                })?;
            let dims: RawDimensions = serde_json::from_value(raw_scores).map_err(|err| ReasoningError::MissingDimension {
                idea_index,
                reason: err.to_string(),
            })?;
            scored.push((idea_index, DimensionScores::from(dims).clamped()));
        }

        let summaries = self.summaries_for(&scored, topic, context, temperature).await;

        Ok(scored
            .into_iter()
            .map(|(idea_index, scores)| {
                let summary = summaries.get(&idea_index).cloned().unwrap_or_else(|| Self::programmatic_summary(&scores));
                MultiDimEvaluation::from_scores(idea_index, scores, &self.weights, summary)
            })
            .collect())
    }

    /// A second, best-effort call producing prose summaries (§4.8 step
    /// 4). Any failure here — schema mismatch, provider error, retries
    /// exhausted — falls back to [`Self::programmatic_summary`] per idea
    /// rather than failing the evaluation.
    async fn summaries_for(&self, scored: &[(u32, DimensionScores)], topic: &str, context: &str, temperature: f64) -> std::collections::HashMap<u32, String> {
        let numbered: Vec<String> = scored
            .iter()
            .map(|(idx, scores)| format!("[{idx}] overall {:.1}/10 across the seven dimensions", scores.overall_score()))
            .collect();
        let prompt = format!(
            "Topic: {topic}\nContext: {context}\n\nWrite a one- or two-sentence summary of each idea's multi-dimensional \
             evaluation below, indexed by idea_index:\n{}",
            numbered.join("\n")
        );

        let result = self
            .call(
                prompt,
                "You write brief, specific summaries of a multi-dimensional evaluation.",
                &multi_dim_summary_batch_schema(),
                temperature,
            )
            .await;

        match result {
            Ok(value) => match value.as_array() {
                Some(rows) => rows
                    .iter()
                    .filter_map(|row| {
                        let idx = row.get("idea_index").and_then(Value::as_u64)? as u32;
                        let summary = row.get("summary").and_then(Value::as_str)?.to_string();
                        Some((idx, summary))
                    })
                    .collect(),
                None => {
                    warn!("MultiDimSummaryBatch response was not an array, falling back to programmatic summaries");
                    Default::default()
                }
            },
            Err(err) => {
                warn!(error = %err, "multi-dim summary call failed, falling back to programmatic summaries");
                Default::default()
            }
        }
    }

    /// Names the strongest and weakest of the seven dimensions without
    /// another provider round-trip (§4.8 step 4 fallback).
    fn programmatic_summary(scores: &DimensionScores) -> String {
        let dims = [
            ("feasibility", scores.feasibility),
            ("innovation", scores.innovation),
            ("impact", scores.impact),
            ("cost effectiveness", scores.cost_effectiveness),
            ("scalability", scores.scalability),
            ("risk assessment", scores.risk_assessment),
            ("timeline", scores.timeline),
        ];
        let strongest = dims.iter().max_by(|a, b| a.1.partial_cmp(&b.1).unwrap()).unwrap();
        let weakest = dims.iter().min_by(|a, b| a.1.partial_cmp(&b.1).unwrap()).unwrap();
        format!(
            "Scores {:.1}/10 overall; strongest in {} ({:.1}), weakest in {} ({:.1}).",
            scores.overall_score(),
            strongest.0,
            strongest.1,
            weakest.0,
            weakest.1
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use madspark_providers::MockProvider;
    use madspark_resilience::RetryConfig;

    fn evaluator(response_count: usize) -> MultiDimEvaluator {
        let provider: Arc<dyn madspark_providers::LlmProvider> = Arc::new(MockProvider::new(response_count));
        let router = Arc::new(Router::new(Some(provider), None, None, false));
        let retry = RetryExecutor::with_default_policy(RetryConfig {
            max_attempts: 1,
            initial_delay_ms: 1,
            max_delay_ms: 1,
            backoff_multiplier: 1.0,
            jitter_factor: 0.0,
            use_exponential_backoff: false,
            use_jitter: false,
        });
        MultiDimEvaluator::new(router, retry)
    }

    fn sample_ideas(count: usize) -> Vec<Idea> {
        (0..count as u32)
            .map(|i| Idea {
                index: i,
                title: format!("Idea {i}"),
                description: "desc".into(),
                key_features: vec![],
                category: "x".into(),
            })
            .collect()
    }

    #[tokio::test]
    async fn evaluate_batch_scores_every_idea_with_clamped_dimensions() {
        let evaluator = evaluator(2);
        let ideas = sample_ideas(2);
        let results = evaluator.evaluate_batch(&ideas, "topic", "context", 0.5).await.unwrap();
        assert_eq!(results.len(), 2);
        for result in &results {
            assert!((0.0..=10.0).contains(&result.overall_score));
            assert!((0.0..=1.0).contains(&result.confidence_interval));
        }
    }

    #[tokio::test]
    async fn evaluate_batch_uses_mock_summary_when_available() {
        let evaluator = evaluator(1);
        let ideas = sample_ideas(1);
        let results = evaluator.evaluate_batch(&ideas, "topic", "context", 0.5).await.unwrap();
        assert!(results[0].summary.contains("mock summary"));
    }

    #[test]
    fn programmatic_summary_names_strongest_and_weakest_dimension() {
        let scores = DimensionScores {
            feasibility: 9.0,
            innovation: 2.0,
            impact: 5.0,
            cost_effectiveness: 5.0,
            scalability: 5.0,
            risk_assessment: 5.0,
            timeline: 5.0,
        };
        let summary = MultiDimEvaluator::programmatic_summary(&scores);
        assert!(summary.contains("feasibility"));
        assert!(summary.contains("innovation"));
    }
}
