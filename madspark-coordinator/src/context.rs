//! Explicit dependency-injection context carried through both
//! coordinators (§9 "global singletons" redesign note): the Router,
//! retry policy, and process settings are constructed once by the
//! caller and threaded down, rather than pulled from a global.

use std::sync::Arc;

use madspark_config::PipelineSettings;
use madspark_contracts::DimensionWeights;
use madspark_resilience::{RetryConfig, RetryExecutor};
use madspark_router::Router;

#[derive(Clone)]
pub struct CoordinatorContext {
    pub router: Arc<Router>,
    pub retry_config: RetryConfig,
    pub settings: PipelineSettings,
    pub dimension_weights: DimensionWeights,
}

impl CoordinatorContext {
    pub fn new(router: Arc<Router>, retry_config: RetryConfig, settings: PipelineSettings) -> Self {
        Self {
            router,
            retry_config,
            settings,
            dimension_weights: DimensionWeights::default(),
        }
    }

    pub fn with_dimension_weights(mut self, weights: DimensionWeights) -> Self {
        self.dimension_weights = weights;
        self
    }

    /// A fresh [`RetryExecutor`] built from the shared [`RetryConfig`]
    /// (§4.5). Executors aren't `Clone` and are cheap to construct, so
    /// each stage call gets its own rather than the context owning one
    /// that every call would need to borrow mutably.
    pub fn retry_executor(&self) -> RetryExecutor {
        RetryExecutor::with_default_policy(self.retry_config.clone())
    }
}
