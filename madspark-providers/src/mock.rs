//! Deterministic provider used when `MADSPARK_MODE=mock` and in tests
//! (§6, §8 end-to-end scenario 1).
//!
//! Returns schema-shaped canned records instead of calling anything over
//! the network, and counts invocations per schema name so call-count
//! assertions (§8 scenario 2) can be made without a live provider.

use async_trait::async_trait;
use chrono::Utc;
use madspark_contracts::LlmResponseMeta;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::Mutex;

use crate::{error::ProviderError, GenerateRequest, LlmProvider};

/// The fixed initial score every mock Critic evaluation reports (§8
/// scenario 1: "result[0].initialScore == 8 (mock constant)").
pub const MOCK_CONSTANT_SCORE: f64 = 8.0;

pub struct MockProvider {
    /// Number of items to synthesize for array-shaped schemas
    /// (GeneratedIdeas, CriticEvaluations, MultiDimBatch).
    pub response_count: usize,
    call_counts: Mutex<HashMap<String, u32>>,
}

impl MockProvider {
    pub fn new(response_count: usize) -> Self {
        Self {
            response_count,
            call_counts: Mutex::new(HashMap::new()),
        }
    }

    pub fn call_count(&self, schema_name: &str) -> u32 {
        self.call_counts.lock().expect("mutex poisoned").get(schema_name).copied().unwrap_or(0)
    }

    fn record_call(&self, schema_name: &str) {
        *self.call_counts.lock().expect("mutex poisoned").entry(schema_name.to_string()).or_insert(0) += 1;
    }

    fn synthesize(&self, schema_name: &str) -> Value {
        match schema_name {
            "GeneratedIdeas" => {
                let ideas: Vec<Value> = (0..self.response_count)
                    .map(|i| {
                        json!({
                            "index": i,
                            "title": format!("Mock idea {i}"),
                            "description": "A mock idea generated without calling a real provider.",
                            "key_features": ["feature a", "feature b"],
                            "category": "general",
                        })
                    })
                    .collect();
                json!(ideas)
            }
            "CriticEvaluations" => {
                let evals: Vec<Value> = (0..self.response_count)
                    .map(|i| {
                        json!({
                            "idea_index": i,
                            "score": MOCK_CONSTANT_SCORE,
                            "comment": "Solid mock evaluation with sufficient detail to pass validation.",
                            "strengths": ["clear scope"],
                            "weaknesses": ["unproven market"],
                        })
                    })
                    .collect();
                json!(evals)
            }
            "AdvocacyResponse" => Self::mock_advocacy(0),
            "SkepticismResponse" => Self::mock_skepticism(0),
            "ImprovementResponse" => Self::mock_improvement(0),
            "AdvocacyBatch" => json!((0..self.response_count).map(Self::mock_advocacy).collect::<Vec<_>>()),
            "SkepticismBatch" => json!((0..self.response_count).map(Self::mock_skepticism).collect::<Vec<_>>()),
            "ImprovementBatch" => json!((0..self.response_count).map(Self::mock_improvement).collect::<Vec<_>>()),
            "MultiDimBatch" => {
                let scores: Vec<Value> = (0..self.response_count)
                    .map(|i| {
                        json!({
                            "idea_index": i,
                            "scores": {
                                "feasibility": 7.0,
                                "innovation": 6.5,
                                "impact": 7.5,
                                "cost_effectiveness": 7.0,
                                "scalability": 6.0,
                                "risk_assessment": 6.5,
                                "timeline": 7.0,
                            },
                        })
                    })
                    .collect();
                json!(scores)
            }
            "MultiDimSummaryBatch" => {
                let summaries: Vec<Value> = (0..self.response_count)
                    .map(|i| {
                        json!({
                            "idea_index": i,
                            "summary": "A mock summary synthesizing the seven scored dimensions.",
                        })
                    })
                    .collect();
                json!(summaries)
            }
            name if name.starts_with("InferenceBatch") => {
                let results: Vec<Value> = (0..self.response_count)
                    .map(|i| {
                        json!({
                            "idea_index": i,
                            "inference_chain": ["mock reasoning step"],
                            "conclusion": "Mock conclusion.",
                            "confidence": 0.5,
                        })
                    })
                    .collect();
                json!(results)
            }
            _ => json!({
                "idea_index": 0,
                "inference_chain": ["mock reasoning step"],
                "conclusion": "Mock conclusion.",
                "confidence": 0.5,
            }),
        }
    }

    fn mock_advocacy(idea_index: usize) -> Value {
        json!({
            "idea_index": idea_index,
            "strengths": [{"title": "Low cost", "description": "Minimal upfront investment."}],
            "opportunities": [{"title": "Early mover", "description": "Few competitors yet."}],
            "addressing_concerns": [{"concern": "Scalability", "response": "Modular design supports growth."}],
        })
    }

    fn mock_skepticism(idea_index: usize) -> Value {
        json!({
            "idea_index": idea_index,
            "critical_flaws": [{"title": "Unclear demand", "description": "No validated customer segment."}],
            "risks_challenges": [{"title": "Regulatory", "description": "Local permits may be required."}],
            "questionable_assumptions": [{"assumption": "Customers will pay a premium", "concern": "Unvalidated willingness to pay."}],
            "missing_considerations": [{"aspect": "Supply chain", "importance": "Affects unit economics."}],
        })
    }

    fn mock_improvement(idea_index: usize) -> Value {
        json!({
            "idea_index": idea_index,
            "title": format!("Mock idea {idea_index}, improved"),
            "description": "A refined mock idea addressing the raised concerns.",
            "key_improvements": ["addressed scalability concern"],
            "implementation_steps": ["pilot with 10 customers"],
            "differentiators": ["lower cost structure"],
        })
    }
}

impl Default for MockProvider {
    fn default() -> Self {
        Self::new(3)
    }
}

#[async_trait]
impl LlmProvider for MockProvider {
    async fn generate_structured(&self, request: GenerateRequest<'_>) -> Result<(Value, LlmResponseMeta), ProviderError> {
        self.record_call(request.schema.name);
        let record = self.synthesize(request.schema.name);
        let meta = LlmResponseMeta {
            provider: self.provider_name().to_string(),
            model: self.model_name().to_string(),
            tokens_used: 0,
            latency_millis: 0,
            cost: 0.0,
            cached: false,
            timestamp: Utc::now(),
        };
        Ok((record, meta))
    }

    async fn health_check(&self) -> Result<(), ProviderError> {
        Ok(())
    }

    fn provider_name(&self) -> &str {
        "mock"
    }

    fn model_name(&self) -> &str {
        "mock-model"
    }

    fn supports_multimodal(&self) -> bool {
        true
    }

    fn get_cost_per_token(&self) -> (f64, f64) {
        (0.0, 0.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use madspark_contracts::schema::generated_ideas_schema;

    #[tokio::test]
    async fn records_call_count_per_schema() {
        let provider = MockProvider::new(2);
        let schema = generated_ideas_schema();
        let request = GenerateRequest::new("prompt", "system", &schema, 0.7).unwrap();
        provider.generate_structured(request.clone()).await.unwrap();
        provider.generate_structured(request).await.unwrap();
        assert_eq!(provider.call_count("GeneratedIdeas"), 2);
    }

    #[tokio::test]
    async fn generated_ideas_has_configured_count() {
        let provider = MockProvider::new(5);
        let schema = generated_ideas_schema();
        let request = GenerateRequest::new("prompt", "system", &schema, 0.7).unwrap();
        let (record, _) = provider.generate_structured(request).await.unwrap();
        assert_eq!(record.as_array().unwrap().len(), 5);
    }
}
