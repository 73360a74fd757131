//! Router error kinds (§4.4, §7).

use madspark_cache::CacheError;
use madspark_contracts::ValidationError;
use madspark_providers::ProviderError;

#[derive(Debug, thiserror::Error)]
pub enum RouterError {
    #[error(transparent)]
    Provider(#[from] ProviderError),

    #[error("all providers failed: {0:?}")]
    AllProvidersFailed(Vec<(String, String)>),

    #[error("configuration error: {0}")]
    Configuration(String),

    #[error(transparent)]
    Cache(#[from] CacheError),

    #[error(transparent)]
    Validation(#[from] ValidationError),
}
