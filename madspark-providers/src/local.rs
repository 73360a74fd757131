//! Local inference-server provider (§4.2 `LocalProvider`).
//!
//! A `reqwest`-based HTTP client (JSON request/response, a bounded
//! request timeout from config); this provider is entirely free.

use async_trait::async_trait;
use chrono::Utc;
use madspark_contracts::{schema::FieldSchema, LlmResponseMeta};
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, warn};

use crate::{error::ProviderError, GenerateRequest, LlmProvider};

const BASELINE_TOKEN_BUDGET: u64 = 1000;
const PER_FIELD_TOKEN_BUDGET: u64 = 400;

fn field_count(schema: &FieldSchema) -> usize {
    if !schema.properties.is_empty() {
        schema.properties.len()
    } else if let Some(items) = &schema.items {
        field_count(items).max(1)
    } else {
        1
    }
}

/// Name-prefix test used to decide whether a configured model advertises
/// multimodal support (§4.2: "name-prefix test").
fn model_supports_multimodal(model_name: &str) -> bool {
    const MULTIMODAL_PREFIXES: &[&str] = &["llava", "vision", "multimodal", "gemma-vision"];
    let lowered = model_name.to_ascii_lowercase();
    MULTIMODAL_PREFIXES.iter().any(|prefix| lowered.starts_with(prefix))
}

pub struct LocalProvider {
    client: reqwest::Client,
    host: String,
    model: String,
}

impl LocalProvider {
    pub fn new(host: impl Into<String>, model: impl Into<String>, request_timeout: Duration) -> Self {
        let client = reqwest::Client::builder()
            .timeout(request_timeout)
            .build()
            .expect("reqwest client configuration is static and always valid");
        Self {
            client,
            host: host.into(),
            model: model.into(),
        }
    }

    fn estimated_token_budget(&self, schema: &FieldSchema) -> u64 {
        BASELINE_TOKEN_BUDGET + PER_FIELD_TOKEN_BUDGET * field_count(schema) as u64
    }
}

#[async_trait]
impl LlmProvider for LocalProvider {
    async fn generate_structured(&self, request: GenerateRequest<'_>) -> Result<(Value, LlmResponseMeta), ProviderError> {
        if !self.supports_multimodal() && request.carries_multimodal_content() {
            return Err(ProviderError::ProviderUnavailable {
                provider: self.provider_name().to_string(),
                reason: format!("model {} does not advertise multimodal support", self.model),
            });
        }

        let started = std::time::Instant::now();
        let body = serde_json::json!({
            "model": self.model,
            "prompt": request.prompt,
            "system": request.system_instruction,
            "temperature": request.temperature,
            "schema": request.schema.root,
            "max_tokens": self.estimated_token_budget(&request.schema.root),
        });

        let response = self
            .client
            .post(format!("{}/v1/generate", self.host))
            .json(&body)
            .send()
            .await
            .map_err(|err| ProviderError::ProviderUnavailable {
                provider: self.provider_name().to_string(),
                reason: err.to_string(),
            })?;

        if !response.status().is_success() {
            return Err(ProviderError::ProviderUnavailable {
                provider: self.provider_name().to_string(),
                reason: format!("local server returned status {}", response.status()),
            });
        }

        let parsed: Value = response.json().await.map_err(|err| ProviderError::ProviderUnavailable {
            provider: self.provider_name().to_string(),
            reason: format!("response was not valid JSON: {err}"),
        })?;

        let record = parsed.get("record").cloned().unwrap_or(parsed);
        let tokens_used = record
            .get("_tokens_used")
            .and_then(Value::as_u64)
            .unwrap_or(0);

        let meta = LlmResponseMeta {
            provider: self.provider_name().to_string(),
            model: self.model.clone(),
            tokens_used,
            latency_millis: started.elapsed().as_millis() as u64,
            cost: 0.0,
            cached: false,
            timestamp: Utc::now(),
        };

        debug!(model = %self.model, latency_ms = meta.latency_millis, "local provider responded");
        Ok((record, meta))
    }

    async fn health_check(&self) -> Result<(), ProviderError> {
        let response = self
            .client
            .get(format!("{}/v1/models", self.host))
            .send()
            .await
            .map_err(|err| ProviderError::ProviderUnavailable {
                provider: self.provider_name().to_string(),
                reason: err.to_string(),
            })?;

        if !response.status().is_success() {
            return Err(ProviderError::ProviderUnavailable {
                provider: self.provider_name().to_string(),
                reason: format!("model listing returned status {}", response.status()),
            });
        }

        let body: Value = response.json().await.map_err(|err| ProviderError::ProviderUnavailable {
            provider: self.provider_name().to_string(),
            reason: format!("model listing was not valid JSON: {err}"),
        })?;

        let models = body
            .get("models")
            .and_then(Value::as_array)
            .cloned()
            .unwrap_or_default();
        let configured_present = models
            .iter()
            .filter_map(Value::as_str)
            .any(|name| name == self.model);

        if configured_present {
            Ok(())
        } else {
            warn!(model = %self.model, "configured local model not present in server's model list");
            Err(ProviderError::ProviderUnavailable {
                provider: self.provider_name().to_string(),
                reason: format!("model {} not present on local server", self.model),
            })
        }
    }

    fn provider_name(&self) -> &str {
        "local"
    }

    fn model_name(&self) -> &str {
        &self.model
    }

    fn supports_multimodal(&self) -> bool {
        model_supports_multimodal(&self.model)
    }

    fn get_cost_per_token(&self) -> (f64, f64) {
        (0.0, 0.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn multimodal_prefix_test_matches_known_vision_models() {
        assert!(model_supports_multimodal("llava-13b"));
        assert!(model_supports_multimodal("Vision-Pro"));
        assert!(!model_supports_multimodal("llama-3-8b"));
    }

    #[test]
    fn token_budget_scales_with_field_count() {
        let provider = LocalProvider::new("http://localhost:11434", "llama-3-8b", Duration::from_secs(600));
        let small = FieldSchema::object(vec![("a", FieldSchema::string())], vec!["a"]);
        let large = FieldSchema::object(
            vec![
                ("a", FieldSchema::string()),
                ("b", FieldSchema::string()),
                ("c", FieldSchema::string()),
            ],
            vec!["a"],
        );
        assert!(provider.estimated_token_budget(&large) > provider.estimated_token_budget(&small));
    }
}
