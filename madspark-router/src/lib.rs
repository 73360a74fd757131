//! Router (C4, §4.4): provider selection, fallback, caching, metrics —
//! the single entry point every agent call passes through.

pub mod error;
pub mod metrics;
pub mod router;

pub use error::RouterError;
pub use metrics::{RouterMetrics, RouterMetricsSnapshot};
pub use router::{providers_from_settings, RouteOptions, Router};
