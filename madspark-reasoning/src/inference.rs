//! Logical inference (C8, §4.8 "Logical inference").
//!
//! Unlike [`crate::multidim::MultiDimEvaluator`], the inference engine
//! does have a keyword/rule-based path: construct it with
//! [`LogicalInferenceEngine::rule_based`] when no LLM client is
//! available, or [`LogicalInferenceEngine::with_llm`] to prefer a real
//! call and fall back per-idea on failure.

use std::collections::HashMap;
use std::sync::Arc;

use madspark_contracts::schema::inference_batch_schema;
use madspark_contracts::{Idea, InferenceAnalysisType, LogicalInference};
use madspark_providers::GenerateRequest;
use madspark_resilience::RetryExecutor;
use madspark_router::{RouteOptions, Router};
use serde_json::Value;
use tracing::{instrument, warn};

const FALLBACK_CONFIDENCE: f64 = 0.5;
const FALLBACK_IMPROVEMENT: &str = "Configure a live LLM client for a deeper inference chain.";

pub struct LogicalInferenceEngine {
    client: Option<(Arc<Router>, RetryExecutor)>,
}

impl LogicalInferenceEngine {
    pub fn with_llm(router: Arc<Router>, retry: RetryExecutor) -> Self {
        Self { client: Some((router, retry)) }
    }

    pub fn rule_based() -> Self {
        Self { client: None }
    }

    /// One result per idea, aligned by index (§4.8). Never fails: a
    /// missing LLM client, an unparseable response, or a missing index
    /// in the batch all fall back to [`Self::fallback_for`] per-idea
    /// rather than failing the batch, since an inference result always
    /// has a minimal valid form.
    #[instrument(skip(self, ideas))]
    pub async fn analyze_batch(&self, ideas: &[Idea], topic: &str, context: &str, analysis_type: InferenceAnalysisType) -> Vec<LogicalInference> {
        let Some((router, retry)) = &self.client else {
            return ideas.iter().map(|idea| Self::fallback_for(idea, analysis_type)).collect();
        };

        match Self::call_llm(router.clone(), retry, ideas, topic, context, analysis_type).await {
            Ok(by_index) => ideas
                .iter()
                .map(|idea| by_index.get(&idea.index).cloned().unwrap_or_else(|| Self::fallback_for(idea, analysis_type)))
                .collect(),
            Err(err) => {
                warn!(error = %err, ?analysis_type, "logical inference batch call failed, using rule-based fallback for every idea");
                ideas.iter().map(|idea| Self::fallback_for(idea, analysis_type)).collect()
            }
        }
    }

    /// One result for a single idea (non-batch convenience used by
    /// callers that only need a single analysis outside a workflow run).
    pub async fn analyze_one(&self, idea: &Idea, topic: &str, context: &str, analysis_type: InferenceAnalysisType) -> LogicalInference {
        self.analyze_batch(std::slice::from_ref(idea), topic, context, analysis_type)
            .await
            .into_iter()
            .next()
            .unwrap_or_else(|| Self::fallback_for(idea, analysis_type))
    }

    async fn call_llm(
        router: Arc<Router>,
        retry: &RetryExecutor,
        ideas: &[Idea],
        topic: &str,
        context: &str,
        analysis_type: InferenceAnalysisType,
    ) -> anyhow::Result<HashMap<u32, LogicalInference>> {
        let schema = inference_batch_schema(analysis_type);
        let numbered: Vec<String> = ideas.iter().map(|idea| format!("[{}] {}: {}", idea.index, idea.title, idea.description)).collect();
        let instruction = Self::system_instruction(analysis_type);
        let prompt = format!(
            "Topic: {topic}\nContext: {context}\n\n{instruction} Return exactly one result per idea, indexed by \
             idea_index:\n{}",
            numbered.join("\n")
        );

        let value = retry
            .execute(move || {
                let router = router.clone();
                let prompt = prompt.clone();
                let schema = schema.clone();
                Box::pin(async move {
                    let request = GenerateRequest::new(&prompt, instruction, &schema, 0.3)?;
                    router
                        .generate_structured(request, RouteOptions { force_provider: None, cache_enabled: true })
                        .await
                })
            })
            .await
            .map(|(value, _meta)| value)
            .map_err(|err| anyhow::anyhow!(err.to_string()))?;

        let rows = value.as_array().ok_or_else(|| anyhow::anyhow!("InferenceBatch: expected a JSON array"))?;
        let mut by_index = HashMap::new();
        for row in rows {
            let parsed: LogicalInference = serde_json::from_value(row.clone())?;
            by_index.insert(parsed.idea_index, Self::fill_analysis_fields(parsed, analysis_type, row));
        }
        Ok(by_index)
    }

    fn system_instruction(analysis_type: InferenceAnalysisType) -> &'static str {
        match analysis_type {
            InferenceAnalysisType::Full => "Analyze the logical chain of reasoning behind each idea and state a conclusion.",
            InferenceAnalysisType::Causal => "Trace the causal chain of each idea from premise to outcome.",
            InferenceAnalysisType::Constraint => "Assess how well each idea satisfies its implied constraints.",
            InferenceAnalysisType::Contradiction => "Identify any internal contradictions in each idea.",
            InferenceAnalysisType::Implications => "Surface the forward-looking implications of each idea.",
        }
    }

    /// The shared `inference_result_schema` envelope leaves analysis-type
    /// specific arrays empty when the model doesn't fill them in (subtype
    /// schemas only narrow `required`, §4.1); this re-parses the raw row
    /// for the type-specific field so it is never silently dropped.
    fn fill_analysis_fields(mut parsed: LogicalInference, analysis_type: InferenceAnalysisType, raw: &Value) -> LogicalInference {
        let as_strings = |field: &str| -> Vec<String> {
            raw.get(field)
                .and_then(Value::as_array)
                .map(|items| items.iter().filter_map(Value::as_str).map(str::to_string).collect())
                .unwrap_or_default()
        };
        match analysis_type {
            InferenceAnalysisType::Causal => parsed.causal_chain = as_strings("causal_chain"),
            InferenceAnalysisType::Constraint => parsed.constraint_satisfaction = as_strings("constraint_satisfaction"),
            InferenceAnalysisType::Contradiction => parsed.contradictions = as_strings("contradictions"),
            InferenceAnalysisType::Implications => parsed.implications = as_strings("implications"),
            InferenceAnalysisType::Full => {}
        }
        parsed
    }

    /// A minimal valid [`LogicalInference`]: one-step chain, confidence
    /// 0.5, and an improvement hint suggesting a live LLM client (§4.8).
    fn fallback_for(idea: &Idea, analysis_type: InferenceAnalysisType) -> LogicalInference {
        let conclusion = format!("\"{}\" has not been analyzed by a live inference model.", idea.title);
        let mut result = LogicalInference {
            idea_index: idea.index,
            inference_chain: vec![format!("Rule-based fallback: {} has no supporting premises evaluated.", idea.title)],
            conclusion,
            confidence: FALLBACK_CONFIDENCE,
            improvements: vec![FALLBACK_IMPROVEMENT.to_string()],
            ..Default::default()
        };
        match analysis_type {
            InferenceAnalysisType::Causal => result.causal_chain = vec!["No causal chain available without a live LLM client.".to_string()],
            InferenceAnalysisType::Constraint => result.constraint_satisfaction = vec!["Constraint satisfaction not assessed.".to_string()],
            InferenceAnalysisType::Contradiction => result.contradictions = vec![],
            InferenceAnalysisType::Implications => result.implications = vec!["Implications not assessed.".to_string()],
            InferenceAnalysisType::Full => {}
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use madspark_providers::MockProvider;
    use madspark_resilience::RetryConfig;

    fn sample_idea(index: u32) -> Idea {
        Idea {
            index,
            title: format!("Idea {index}"),
            description: "desc".into(),
            key_features: vec![],
            category: "x".into(),
        }
    }

    fn retry_executor() -> RetryExecutor {
        RetryExecutor::with_default_policy(RetryConfig {
            max_attempts: 1,
            initial_delay_ms: 1,
            max_delay_ms: 1,
            backoff_multiplier: 1.0,
            jitter_factor: 0.0,
            use_exponential_backoff: false,
            use_jitter: false,
        })
    }

    #[tokio::test]
    async fn rule_based_engine_produces_minimal_valid_result() {
        let engine = LogicalInferenceEngine::rule_based();
        let idea = sample_idea(0);
        let results = engine.analyze_batch(&[idea], "topic", "context", InferenceAnalysisType::Full).await;
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].confidence, FALLBACK_CONFIDENCE);
        assert_eq!(results[0].inference_chain.len(), 1);
    }

    #[tokio::test]
    async fn llm_backed_engine_uses_mock_provider_results() {
        let provider: Arc<dyn madspark_providers::LlmProvider> = Arc::new(MockProvider::new(2));
        let router = Arc::new(Router::new(Some(provider), None, None, false));
        let engine = LogicalInferenceEngine::with_llm(router, retry_executor());
        let ideas = vec![sample_idea(0), sample_idea(1)];
        let results = engine.analyze_batch(&ideas, "topic", "context", InferenceAnalysisType::Full).await;
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].conclusion, "Mock conclusion.");
    }

    #[tokio::test]
    async fn analyze_one_returns_single_result() {
        let engine = LogicalInferenceEngine::rule_based();
        let idea = sample_idea(3);
        let result = engine.analyze_one(&idea, "topic", "context", InferenceAnalysisType::Causal).await;
        assert_eq!(result.idea_index, 3);
        assert!(!result.causal_chain.is_empty());
    }
}
