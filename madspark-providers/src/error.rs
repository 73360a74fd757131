//! Provider error kinds (§4.2, §7).

use madspark_contracts::SchemaValidationError;

#[derive(Debug, thiserror::Error)]
pub enum ProviderError {
    #[error("provider {provider} is unavailable: {reason}")]
    ProviderUnavailable { provider: String, reason: String },

    #[error(transparent)]
    SchemaValidation(#[from] SchemaValidationError),

    #[error("configuration error: {0}")]
    Configuration(String),
}
