//! Router (C4, §4.4): the single entry point for all LLM usage.

use std::sync::Arc;

use madspark_cache::{CacheKeyInput, InMemoryResponseCache};
use madspark_config::PipelineSettings;
use madspark_contracts::{LlmResponseMeta, ProviderChoice};
use madspark_providers::{GenerateRequest, LlmProvider, ProviderError};
use serde_json::Value;
use tokio::sync::OnceCell;
use tracing::{info, warn};

use crate::error::RouterError;
use crate::metrics::{RouterMetrics, RouterMetricsSnapshot};

/// A single call's worth of routing instructions, separate from the
/// provider-agnostic [`GenerateRequest`] payload.
#[derive(Debug, Clone, Default)]
pub struct RouteOptions {
    pub force_provider: Option<ProviderChoice>,
    pub cache_enabled: bool,
}

pub struct Router {
    local: Option<Arc<dyn LlmProvider>>,
    cloud: Option<Arc<dyn LlmProvider>>,
    cache: Option<Arc<InMemoryResponseCache>>,
    fallback_enabled: bool,
    metrics: RouterMetrics,
}

static GLOBAL_ROUTER: OnceCell<Arc<Router>> = OnceCell::const_new();

impl Router {
    pub fn new(
        local: Option<Arc<dyn LlmProvider>>,
        cloud: Option<Arc<dyn LlmProvider>>,
        cache: Option<Arc<InMemoryResponseCache>>,
        fallback_enabled: bool,
    ) -> Self {
        Self {
            local,
            cloud,
            cache,
            fallback_enabled,
            metrics: RouterMetrics::new(),
        }
    }

    /// Process-scoped singleton, lazily constructed on first use and
    /// guarded by `tokio::sync::OnceCell`'s double-checked-locking
    /// semantics (§3, §4.4, §5).
    pub async fn global(build: impl FnOnce() -> Router) -> Arc<Router> {
        GLOBAL_ROUTER.get_or_init(|| async { Arc::new(build()) }).await.clone()
    }

    pub async fn metrics(&self) -> RouterMetricsSnapshot {
        self.metrics.snapshot().await
    }

    /// Selects a provider per §4.4's three rules, without invoking it.
    async fn select_provider(&self, request: &GenerateRequest<'_>, options: &RouteOptions) -> Result<Arc<dyn LlmProvider>, RouterError> {
        if let Some(forced) = options.force_provider {
            return self.provider_for_choice(forced);
        }

        if request.carries_multimodal_content() {
            return self.cloud.clone().ok_or_else(|| {
                RouterError::Provider(ProviderError::ProviderUnavailable {
                    provider: "cloud".into(),
                    reason: "no cloud provider configured to serve multimodal content".into(),
                })
            });
        }

        if let Some(local) = &self.local {
            if local.health_check().await.is_ok() {
                return Ok(local.clone());
            }
            warn!("local provider failed health check, falling through to cloud");
        }

        self.cloud.clone().ok_or_else(|| {
            RouterError::Provider(ProviderError::ProviderUnavailable {
                provider: "local".into(),
                reason: "local provider unhealthy and no cloud provider configured".into(),
            })
        })
    }

    fn provider_for_choice(&self, choice: ProviderChoice) -> Result<Arc<dyn LlmProvider>, RouterError> {
        match choice {
            ProviderChoice::Local => self.local.clone().ok_or_else(|| {
                RouterError::Provider(ProviderError::ProviderUnavailable {
                    provider: "local".into(),
                    reason: "forced local provider is not configured".into(),
                })
            }),
            ProviderChoice::Cloud => self.cloud.clone().ok_or_else(|| {
                RouterError::Provider(ProviderError::ProviderUnavailable {
                    provider: "cloud".into(),
                    reason: "forced cloud provider is not configured".into(),
                })
            }),
        }
    }

    fn other_provider(&self, used: &str) -> Option<Arc<dyn LlmProvider>> {
        match used {
            "local" => self.cloud.clone(),
            "cloud" => self.local.clone(),
            _ => None,
        }
    }

    async fn invoke(&self, provider: &Arc<dyn LlmProvider>, request: GenerateRequest<'_>) -> Result<(Value, LlmResponseMeta), ProviderError> {
        let (record, meta) = provider.generate_structured(request).await?;
        self.metrics.record_provider_call(provider.provider_name(), meta.tokens_used, meta.cost, meta.latency_millis).await;
        Ok((record, meta))
    }

    /// Invokes `provider`, routed through the cache's single-flight
    /// get-or-compute (§5: "at most one in-flight fill per key") when
    /// caching is enabled. A concurrent caller racing on the same key
    /// waits on this call's result instead of invoking the provider a
    /// second time.
    async fn invoke_cached(
        &self,
        provider: &Arc<dyn LlmProvider>,
        request: GenerateRequest<'_>,
        cache_key: &Option<String>,
    ) -> Result<(Value, LlmResponseMeta), ProviderError> {
        if let (Some(cache), Some(key)) = (&self.cache, cache_key) {
            let entry = cache.get_or_insert_with(key, || self.invoke(provider, request)).await?;
            if entry.meta.cached {
                self.metrics.record_cache_hit();
            }
            Ok((entry.record, entry.meta))
        } else {
            self.invoke(provider, request).await
        }
    }

    /// Reads and hashes each referenced file's content into the cache
    /// key input (§3, §4.3): "resolved paths + hashes of any referenced
    /// files". File descriptors are closed as soon as `tokio::fs::read`
    /// returns, well before the request completes (§5).
    async fn cache_key_input(request: &GenerateRequest<'_>, options: &RouteOptions) -> Result<CacheKeyInput, RouterError> {
        let mut input = CacheKeyInput {
            prompt: request.prompt.to_string(),
            schema_identity: request.schema.name.to_string(),
            temperature: request.temperature,
            provider_forced: options.force_provider.map(|p| p.to_string()),
            system_instruction: request.system_instruction.to_string(),
            files: Vec::new(),
            urls: request.urls.to_vec(),
            extra: Vec::new(),
        };
        for path in request.files {
            let content = tokio::fs::read(path).await.map_err(|err| {
                madspark_cache::CacheError::FileReadFailed {
                    path: path.clone(),
                    message: err.to_string(),
                }
            })?;
            input.add_file(path, content)?;
        }
        Ok(input)
    }

    /// Runs the full Router flow of §4.4: cache check, provider
    /// selection, invocation, fallback-once on failure, metrics.
    pub async fn generate_structured(
        &self,
        request: GenerateRequest<'_>,
        options: RouteOptions,
    ) -> Result<(Value, LlmResponseMeta), RouterError> {
        self.metrics.record_request();

        let cache_key = if options.cache_enabled {
            Some(Self::cache_key_input(&request, &options).await?.compute_key())
        } else {
            None
        };

        if let (Some(cache), Some(key)) = (&self.cache, &cache_key) {
            if let Some(hit) = cache.get(key).await {
                self.metrics.record_cache_hit();
                return Ok((hit.record, hit.meta));
            }
        }

        let provider = self.select_provider(&request, &options).await?;
        let provider_name = provider.provider_name().to_string();

        let mut attempts: Vec<(String, String)> = Vec::new();
        let primary_request = request.clone();
        match self.invoke_cached(&provider, primary_request, &cache_key).await {
            Ok((record, meta)) => return Ok((record, meta)),
            Err(err) => attempts.push((provider_name.clone(), err.to_string())),
        }

        let can_fall_back = self.fallback_enabled && options.force_provider.is_none();
        if can_fall_back {
            if let Some(fallback) = self.other_provider(&provider_name) {
                if fallback.health_check().await.is_ok() {
                    self.metrics.record_fallback_trigger();
                    let fallback_name = fallback.provider_name().to_string();
                    match self.invoke_cached(&fallback, request, &cache_key).await {
                        Ok((record, meta)) => {
                            info!(from = %provider_name, to = %fallback_name, "router fell back after provider failure");
                            return Ok((record, meta));
                        }
                        Err(err) => attempts.push((fallback_name, err.to_string())),
                    }
                }
            }
        }

        Err(RouterError::AllProvidersFailed(attempts))
    }
}

/// Builds process-scoped providers/cache from `PipelineSettings`. Kept
/// separate from `Router::new` so callers can inject mocks in tests.
pub fn providers_from_settings(
    local: Option<Arc<dyn LlmProvider>>,
    cloud: Option<Arc<dyn LlmProvider>>,
    settings: &PipelineSettings,
) -> Router {
    let cache = settings.cache_enabled.then(|| Arc::new(InMemoryResponseCache::new(settings.cache_ttl, madspark_cache::DEFAULT_CAPACITY)));
    Router::new(local, cloud, cache, settings.fallback_enabled)
}

#[cfg(test)]
mod tests {
    use super::*;
    use madspark_contracts::schema::generated_ideas_schema;
    use madspark_providers::MockProvider;

    fn router_with_mocks(local_ok: bool, cloud_ok: bool) -> Router {
        let local: Arc<dyn LlmProvider> = Arc::new(MaybeHealthyMock::new("local", local_ok));
        let cloud: Arc<dyn LlmProvider> = Arc::new(MaybeHealthyMock::new("cloud", cloud_ok));
        Router::new(Some(local), Some(cloud), None, true)
    }

    struct MaybeHealthyMock {
        inner: MockProvider,
        name: &'static str,
        healthy: bool,
    }

    impl MaybeHealthyMock {
        fn new(name: &'static str, healthy: bool) -> Self {
            Self {
                inner: MockProvider::new(1),
                name,
                healthy,
            }
        }
    }

    #[async_trait::async_trait]
    impl LlmProvider for MaybeHealthyMock {
        async fn generate_structured(&self, request: GenerateRequest<'_>) -> Result<(Value, LlmResponseMeta), ProviderError> {
            if !self.healthy {
                return Err(ProviderError::ProviderUnavailable {
                    provider: self.name.to_string(),
                    reason: "forced unhealthy in test".into(),
                });
            }
            self.inner.generate_structured(request).await
        }

        async fn health_check(&self) -> Result<(), ProviderError> {
            if self.healthy {
                Ok(())
            } else {
                Err(ProviderError::ProviderUnavailable {
                    provider: self.name.to_string(),
                    reason: "forced unhealthy in test".into(),
                })
            }
        }

        fn provider_name(&self) -> &str {
            self.name
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

    #[tokio::test]
    async fn prefers_healthy_local_provider() {
        let router = router_with_mocks(true, true);
        let schema = generated_ideas_schema();
        let request = GenerateRequest::new("prompt", "system", &schema, 0.7).unwrap();
        let (_, meta) = router.generate_structured(request, RouteOptions::default()).await.unwrap();
        assert_eq!(meta.provider, "local");
    }

    #[tokio::test]
    async fn falls_back_to_cloud_when_local_unhealthy() {
        let router = router_with_mocks(false, true);
        let schema = generated_ideas_schema();
        let request = GenerateRequest::new("prompt", "system", &schema, 0.7).unwrap();
        let (_, meta) = router.generate_structured(request, RouteOptions::default()).await.unwrap();
        assert_eq!(meta.provider, "cloud");
        assert_eq!(router.metrics().await.fallback_triggers, 0, "health-checked selection, not a post-failure fallback");
    }

    #[tokio::test]
    async fn all_providers_failing_raises_all_providers_failed() {
        let router = router_with_mocks(false, false);
        let schema = generated_ideas_schema();
        let request = GenerateRequest::new("prompt", "system", &schema, 0.7).unwrap();
        let err = router.generate_structured(request, RouteOptions::default()).await.unwrap_err();
        assert!(matches!(err, RouterError::AllProvidersFailed(_) | RouterError::Provider(_)));
    }

    #[tokio::test]
    async fn forced_provider_choice_is_honored() {
        let router = router_with_mocks(true, true);
        let schema = generated_ideas_schema();
        let request = GenerateRequest::new("prompt", "system", &schema, 0.7).unwrap();
        let options = RouteOptions {
            force_provider: Some(ProviderChoice::Cloud),
            cache_enabled: false,
        };
        let (_, meta) = router.generate_structured(request, options).await.unwrap();
        assert_eq!(meta.provider, "cloud");
    }

    #[tokio::test]
    async fn cache_key_changes_when_referenced_file_content_changes() {
        let cache = Arc::new(madspark_cache::InMemoryResponseCache::new(3600, 100));
        let local: Arc<dyn LlmProvider> = Arc::new(MockProvider::new(2));
        let router = Router::new(Some(local), None, Some(cache), false);

        let path = std::env::temp_dir().join(format!("madspark-router-test-{}.txt", std::process::id()));
        tokio::fs::write(&path, b"version one").await.unwrap();
        let path_str = path.to_string_lossy().to_string();

        let schema = generated_ideas_schema();
        let files = vec![path_str.clone()];
        let forced = RouteOptions { force_provider: Some(ProviderChoice::Local), cache_enabled: true };
        let request_a = GenerateRequest::new("prompt", "system", &schema, 0.7).unwrap().with_multimodal(&files, &[]);
        let (_, meta_a) = router.generate_structured(request_a, forced.clone()).await.unwrap();
        assert!(!meta_a.cached);

        tokio::fs::write(&path, b"version two, different content").await.unwrap();
        let request_b = GenerateRequest::new("prompt", "system", &schema, 0.7).unwrap().with_multimodal(&files, &[]);
        let (_, meta_b) = router.generate_structured(request_b, forced).await.unwrap();
        assert!(!meta_b.cached, "changed file content must miss the cache, not reuse the prior entry");

        tokio::fs::remove_file(&path).await.ok();
    }
}
