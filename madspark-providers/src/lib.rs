//! LLM Provider abstraction (C2, §4.2) plus Local, Cloud and mock backends.
//!
//! Every provider implements the same two-method contract the Router
//! (`madspark-router`) speaks: `generate_structured` for a single call and
//! `health_check` before it is selected. Retry lives one layer up
//! (`madspark-resilience`) — providers never retry themselves.

pub mod cloud;
pub mod error;
pub mod local;
pub mod mock;

use async_trait::async_trait;
use madspark_contracts::{schema::SchemaDescriptor, validate_temperature, LlmResponseMeta, ValidationError};
use serde_json::Value;

pub use error::ProviderError;
pub use cloud::CloudProvider;
pub use local::LocalProvider;
pub use mock::{MockProvider, MOCK_CONSTANT_SCORE};

/// A single structured-generation request (§4.2 public contract).
#[derive(Debug, Clone)]
pub struct GenerateRequest<'a> {
    pub prompt: &'a str,
    pub system_instruction: &'a str,
    pub schema: &'a SchemaDescriptor,
    pub temperature: f64,
    pub images: &'a [String],
    pub files: &'a [String],
    pub urls: &'a [String],
}

impl<'a> GenerateRequest<'a> {
    /// Rejects a temperature outside `[0.0, 2.0]` with `ValidationError`
    /// at the point a request enters the provider layer.
    pub fn new(prompt: &'a str, system_instruction: &'a str, schema: &'a SchemaDescriptor, temperature: f64) -> Result<Self, ValidationError> {
        validate_temperature(temperature)?;
        Ok(Self {
            prompt,
            system_instruction,
            schema,
            temperature,
            images: &[],
            files: &[],
            urls: &[],
        })
    }

    pub fn carries_multimodal_content(&self) -> bool {
        !self.images.is_empty() || !self.files.is_empty() || !self.urls.is_empty()
    }

    /// Attaches the caller's multimodal files/URLs (§4.2; currently only
    /// the Idea Generator's `RequestInputs` carries these).
    pub fn with_multimodal(mut self, files: &'a [String], urls: &'a [String]) -> Self {
        self.files = files;
        self.urls = urls;
        self
    }
}

/// Common contract every backend (local, cloud, mock) implements (§6).
#[async_trait]
pub trait LlmProvider: Send + Sync {
    /// Executes a structured generation; the returned `Value` has already
    /// passed the caller-selected schema's validator.
    async fn generate_structured(&self, request: GenerateRequest<'_>) -> Result<(Value, LlmResponseMeta), ProviderError>;

    /// Returns `Ok(())` when the backend is reachable and correctly
    /// configured (e.g. the configured model is present).
    async fn health_check(&self) -> Result<(), ProviderError>;

    fn provider_name(&self) -> &str;

    fn model_name(&self) -> &str;

    fn supports_multimodal(&self) -> bool;

    /// Cost per token for the configured model, `(input, output)`.
    fn get_cost_per_token(&self) -> (f64, f64);
}

#[cfg(test)]
mod tests {
    use super::*;
    use madspark_contracts::schema::generated_ideas_schema;

    #[test]
    fn boundary_temperatures_zero_and_two_are_accepted() {
        let schema = generated_ideas_schema();
        assert!(GenerateRequest::new("prompt", "system", &schema, 0.0).is_ok());
        assert!(GenerateRequest::new("prompt", "system", &schema, 2.0).is_ok());
    }

    #[test]
    fn temperature_past_the_upper_bound_is_rejected() {
        let schema = generated_ideas_schema();
        assert!(GenerateRequest::new("prompt", "system", &schema, 2.0 + f64::EPSILON).is_err());
    }

    #[test]
    fn negative_temperature_is_rejected() {
        let schema = generated_ideas_schema();
        assert!(GenerateRequest::new("prompt", "system", &schema, -0.1).is_err());
    }
}
