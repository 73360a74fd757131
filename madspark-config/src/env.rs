//! Environment variable table (§6) parsed with a warn-and-default idiom:
//! an invalid value never panics, it logs and falls back to a
//! documented default.

use std::time::Duration;
use tracing::warn;
use validator::Validate;

fn parse_or_warn<T: std::str::FromStr>(var: &str, default: T) -> T {
    match std::env::var(var) {
        Ok(raw) => raw.parse().unwrap_or_else(|_| {
            warn!(var, raw, "invalid value, falling back to default");
            default
        }),
        Err(_) => default,
    }
}

fn bool_flag(var: &str, default: bool) -> bool {
    match std::env::var(var) {
        Ok(raw) => match raw.to_ascii_lowercase().as_str() {
            "true" | "1" | "yes" => true,
            "false" | "0" | "no" => false,
            _ => {
                warn!(var, raw, "invalid boolean value, falling back to default");
                default
            }
        },
        Err(_) => default,
    }
}

/// `MADSPARK_MODE`: `mock` disables all real provider calls.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunMode {
    Mock,
    Api,
}

impl RunMode {
    pub fn from_env() -> Self {
        match std::env::var("MADSPARK_MODE").unwrap_or_default().to_ascii_lowercase().as_str() {
            "mock" => RunMode::Mock,
            _ => RunMode::Api,
        }
    }
}

/// `MADSPARK_LLM_PROVIDER`: `auto`|`local`|`cloud` provider selection hint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderHint {
    Auto,
    Local,
    Cloud,
}

impl ProviderHint {
    pub fn from_env() -> Self {
        match std::env::var("MADSPARK_LLM_PROVIDER").unwrap_or_default().to_ascii_lowercase().as_str() {
            "local" => ProviderHint::Local,
            "cloud" => ProviderHint::Cloud,
            _ => ProviderHint::Auto,
        }
    }
}

/// `MADSPARK_MODEL_TIER`: `fast`|`balanced`|`quality` model-size hint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModelTier {
    Fast,
    Balanced,
    Quality,
}

impl ModelTier {
    pub fn from_env() -> Self {
        match std::env::var("MADSPARK_MODEL_TIER").unwrap_or_default().to_ascii_lowercase().as_str() {
            "fast" => ModelTier::Fast,
            "quality" => ModelTier::Quality,
            _ => ModelTier::Balanced,
        }
    }
}

const DEFAULT_LOCAL_REQUEST_TIMEOUT_SECS: u64 = 600;
const DEFAULT_CACHE_TTL_SECS: u64 = 24 * 60 * 60;
const DEFAULT_MAX_CONCURRENT_AGENTS: usize = 10;
const DEFAULT_WORKFLOW_TIMEOUT_SECS: u64 = 1200;
const MIN_WORKFLOW_TIMEOUT_SECS: u64 = 60;
const MAX_WORKFLOW_TIMEOUT_SECS: u64 = 3600;
const DEFAULT_NOVELTY_THRESHOLD: f64 = 0.75;
const DEFAULT_TOP_CANDIDATES: usize = 2;

/// Every environment-driven setting of §6, read once at process
/// construction (mirrors the Router/Cache/Provider "process-scoped
/// singleton" lifetime of §3).
#[derive(Debug, Clone)]
pub struct PipelineSettings {
    pub mode: RunMode,
    pub provider_hint: ProviderHint,
    pub model_tier: ModelTier,
    pub router_disabled: bool,
    pub fallback_enabled: bool,
    pub cache_enabled: bool,
    pub cache_ttl: Duration,
    pub local_llm_host: String,
    pub local_request_timeout: Duration,
    pub cloud_api_key: Option<String>,
    pub max_concurrent_agents: usize,
    pub default_timeout: Duration,
    pub min_timeout: Duration,
    pub max_timeout: Duration,
    pub novelty_threshold: f64,
    pub top_candidates: usize,
}

/// Numeric bounds checked after parsing via a `validator`-derive
/// config-validation struct. Out-of-bounds values are logged and
/// clamped rather than rejected, matching the warn-and-default policy
/// applied to parse failures above.
#[derive(Debug, Validate)]
struct PipelineSettingsBounds {
    #[validate(range(min = 60, max = 3600))]
    default_timeout_secs: u64,
    #[validate(range(min = 0.0, max = 1.0))]
    novelty_threshold: f64,
    #[validate(range(min = 1))]
    top_candidates: u64,
}

impl PipelineSettings {
    pub fn from_env() -> Self {
        let default_timeout = parse_or_warn("MADSPARK_DEFAULT_TIMEOUT", DEFAULT_WORKFLOW_TIMEOUT_SECS);
        let min_timeout = parse_or_warn("MIN_TIMEOUT", MIN_WORKFLOW_TIMEOUT_SECS);
        let max_timeout = parse_or_warn("MAX_TIMEOUT", MAX_WORKFLOW_TIMEOUT_SECS);
        let clamped_default_timeout = default_timeout.clamp(min_timeout, max_timeout);
        let novelty_threshold = parse_or_warn("MADSPARK_NOVELTY_THRESHOLD", DEFAULT_NOVELTY_THRESHOLD).clamp(0.0, 1.0);
        let top_candidates = parse_or_warn("MADSPARK_TOP_CANDIDATES", DEFAULT_TOP_CANDIDATES).max(1);

        let bounds = PipelineSettingsBounds {
            default_timeout_secs: clamped_default_timeout,
            novelty_threshold,
            top_candidates: top_candidates as u64,
        };
        if let Err(errors) = bounds.validate() {
            warn!(?errors, "pipeline settings failed bounds validation after clamping");
        }

        Self {
            mode: RunMode::from_env(),
            provider_hint: ProviderHint::from_env(),
            model_tier: ModelTier::from_env(),
            router_disabled: bool_flag("MADSPARK_NO_ROUTER", false),
            fallback_enabled: bool_flag("MADSPARK_FALLBACK_ENABLED", true),
            cache_enabled: bool_flag("MADSPARK_CACHE_ENABLED", true),
            cache_ttl: Duration::from_secs(parse_or_warn("MADSPARK_CACHE_TTL", DEFAULT_CACHE_TTL_SECS)),
            local_llm_host: std::env::var("LOCAL_LLM_HOST").unwrap_or_else(|_| "http://localhost:11434".to_string()),
            local_request_timeout: Duration::from_secs(parse_or_warn(
                "LOCAL_REQUEST_TIMEOUT",
                DEFAULT_LOCAL_REQUEST_TIMEOUT_SECS,
            )),
            cloud_api_key: std::env::var("CLOUD_API_KEY").ok(),
            max_concurrent_agents: parse_or_warn("MAX_CONCURRENT_AGENTS", DEFAULT_MAX_CONCURRENT_AGENTS),
            default_timeout: Duration::from_secs(clamped_default_timeout),
            min_timeout: Duration::from_secs(min_timeout),
            max_timeout: Duration::from_secs(max_timeout),
            novelty_threshold,
            top_candidates,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    // Environment variables are process-global; serialize tests that touch them.
    static ENV_LOCK: Mutex<()> = Mutex::new(());

    #[test]
    fn run_mode_defaults_to_api() {
        let _guard = ENV_LOCK.lock().unwrap();
        std::env::remove_var("MADSPARK_MODE");
        assert_eq!(RunMode::from_env(), RunMode::Api);
    }

    #[test]
    fn run_mode_reads_mock() {
        let _guard = ENV_LOCK.lock().unwrap();
        std::env::set_var("MADSPARK_MODE", "mock");
        assert_eq!(RunMode::from_env(), RunMode::Mock);
        std::env::remove_var("MADSPARK_MODE");
    }

    #[test]
    fn invalid_cache_ttl_falls_back_to_default() {
        let _guard = ENV_LOCK.lock().unwrap();
        std::env::set_var("MADSPARK_CACHE_TTL", "not-a-number");
        let settings = PipelineSettings::from_env();
        assert_eq!(settings.cache_ttl, Duration::from_secs(DEFAULT_CACHE_TTL_SECS));
        std::env::remove_var("MADSPARK_CACHE_TTL");
    }

    #[test]
    fn default_timeout_is_clamped_between_min_and_max() {
        let _guard = ENV_LOCK.lock().unwrap();
        std::env::set_var("MADSPARK_DEFAULT_TIMEOUT", "99999");
        std::env::set_var("MAX_TIMEOUT", "3600");
        let settings = PipelineSettings::from_env();
        assert_eq!(settings.default_timeout, Duration::from_secs(3600));
        std::env::remove_var("MADSPARK_DEFAULT_TIMEOUT");
        std::env::remove_var("MAX_TIMEOUT");
    }
}

