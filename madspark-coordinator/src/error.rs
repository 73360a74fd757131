//! Coordinator error kinds (§7, §4.10 "Event-loop safety").

use madspark_contracts::ValidationError;

#[derive(Debug, thiserror::Error)]
pub enum CoordinatorError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("workflow timed out after {timeout_secs}s")]
    Timeout { timeout_secs: u64 },

    #[error("configuration error: {0}")]
    Configuration(String),

    #[error("workflow was cancelled")]
    Cancelled,
}
