//! Hosted-API provider (§4.2 `CloudProvider`).

use async_trait::async_trait;
use chrono::Utc;
use madspark_contracts::LlmResponseMeta;
use serde_json::Value;
use tracing::debug;

use crate::{error::ProviderError, GenerateRequest, LlmProvider};

/// Cost-per-token table: `(input_cost, output_cost)` per token, in USD.
/// Weighted 70/30 input/output per §4.2.
const PRICING_TABLE: &[(&str, f64, f64)] = &[
    ("gpt-4o", 0.0000025, 0.00001),
    ("gpt-4o-mini", 0.00000015, 0.0000006),
    ("claude-3-5-sonnet", 0.000003, 0.000015),
    ("claude-3-haiku", 0.00000025, 0.00000125),
];

const DEFAULT_INPUT_COST: f64 = 0.000003;
const DEFAULT_OUTPUT_COST: f64 = 0.000015;

fn pricing_for(model: &str) -> (f64, f64) {
    PRICING_TABLE
        .iter()
        .find(|(name, _, _)| *name == model)
        .map(|(_, input, output)| (*input, *output))
        .unwrap_or((DEFAULT_INPUT_COST, DEFAULT_OUTPUT_COST))
}

/// Rejects empty keys and common placeholder patterns left over from an
/// unconfigured `.env` file (§4.2, §6 `CLOUD_API_KEY`).
pub fn validate_api_key(key: &str) -> Result<(), ProviderError> {
    const PLACEHOLDER_PATTERNS: &[&str] = &["your-api-key", "changeme", "xxx", "todo", "replace-me"];
    let trimmed = key.trim();
    if trimmed.is_empty() {
        return Err(ProviderError::Configuration("CLOUD_API_KEY is empty".into()));
    }
    let lowered = trimmed.to_ascii_lowercase();
    if PLACEHOLDER_PATTERNS.iter().any(|pattern| lowered.contains(pattern)) {
        return Err(ProviderError::Configuration(
            "CLOUD_API_KEY looks like a placeholder value".into(),
        ));
    }
    Ok(())
}

pub struct CloudProvider {
    client: reqwest::Client,
    endpoint: String,
    api_key: String,
    model: String,
}

impl CloudProvider {
    pub fn new(endpoint: impl Into<String>, api_key: impl Into<String>, model: impl Into<String>) -> Result<Self, ProviderError> {
        let api_key = api_key.into();
        validate_api_key(&api_key)?;
        Ok(Self {
            client: reqwest::Client::new(),
            endpoint: endpoint.into(),
            api_key,
            model: model.into(),
        })
    }
}

#[async_trait]
impl LlmProvider for CloudProvider {
    async fn generate_structured(&self, request: GenerateRequest<'_>) -> Result<(Value, LlmResponseMeta), ProviderError> {
        let started = std::time::Instant::now();
        let body = serde_json::json!({
            "model": self.model,
            "prompt": request.prompt,
            "system": request.system_instruction,
            "temperature": request.temperature,
            "schema": request.schema.root,
            "images": request.images,
            "files": request.files,
            "urls": request.urls,
        });

        let response = self
            .client
            .post(format!("{}/v1/structured-generate", self.endpoint))
            .bearer_auth(&self.api_key)
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
                reason: format!("cloud API returned status {}", response.status()),
            });
        }

        let parsed: Value = response.json().await.map_err(|err| ProviderError::ProviderUnavailable {
            provider: self.provider_name().to_string(),
            reason: format!("response was not valid JSON: {err}"),
        })?;

        let record = parsed.get("record").cloned().unwrap_or(parsed.clone());
        let input_tokens = parsed.get("usage").and_then(|u| u.get("input_tokens")).and_then(Value::as_u64).unwrap_or(0);
        let output_tokens = parsed.get("usage").and_then(|u| u.get("output_tokens")).and_then(Value::as_u64).unwrap_or(0);
        let (input_cost, output_cost) = self.get_cost_per_token();

        let meta = LlmResponseMeta {
            provider: self.provider_name().to_string(),
            model: self.model.clone(),
            tokens_used: input_tokens + output_tokens,
            latency_millis: started.elapsed().as_millis() as u64,
            cost: input_tokens as f64 * input_cost + output_tokens as f64 * output_cost,
            cached: false,
            timestamp: Utc::now(),
        };

        debug!(model = %self.model, cost = meta.cost, "cloud provider responded");
        Ok((record, meta))
    }

    async fn health_check(&self) -> Result<(), ProviderError> {
        let response = self
            .client
            .get(format!("{}/v1/health", self.endpoint))
            .bearer_auth(&self.api_key)
            .send()
            .await
            .map_err(|err| ProviderError::ProviderUnavailable {
                provider: self.provider_name().to_string(),
                reason: err.to_string(),
            })?;

        if response.status().is_success() {
            Ok(())
        } else {
            Err(ProviderError::ProviderUnavailable {
                provider: self.provider_name().to_string(),
                reason: format!("health check returned status {}", response.status()),
            })
        }
    }

    fn provider_name(&self) -> &str {
        "cloud"
    }

    fn model_name(&self) -> &str {
        &self.model
    }

    fn supports_multimodal(&self) -> bool {
        true
    }

    fn get_cost_per_token(&self) -> (f64, f64) {
        pricing_for(&self.model)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_api_key_is_rejected() {
        assert!(validate_api_key("").is_err());
    }

    #[test]
    fn placeholder_api_key_is_rejected() {
        assert!(validate_api_key("your-api-key-here").is_err());
        assert!(validate_api_key("CHANGEME").is_err());
    }

    #[test]
    fn real_looking_key_is_accepted() {
        assert!(validate_api_key("sk-live-9f8a7b6c5d4e3f2a1b0c").is_ok());
    }

    #[test]
    fn unknown_model_falls_back_to_default_pricing() {
        assert_eq!(pricing_for("some-new-model"), (DEFAULT_INPUT_COST, DEFAULT_OUTPUT_COST));
    }

    #[test]
    fn known_model_uses_table_pricing() {
        assert_eq!(pricing_for("gpt-4o-mini"), (0.00000015, 0.0000006));
    }
}
