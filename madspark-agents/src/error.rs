//! Agent-layer error kinds (§7).

use madspark_contracts::{SchemaValidationError, ValidationError};
use madspark_router::RouterError;

#[derive(Debug, thiserror::Error)]
pub enum AgentError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Schema(#[from] SchemaValidationError),

    #[error(transparent)]
    Router(#[from] RouterError),

    #[error("malformed response: {0}")]
    ResponseParsing(String),

    #[error("retries exhausted: {0}")]
    RetriesExhausted(String),

    #[error("batch response had {actual} entries, expected {expected}")]
    BatchLengthMismatch { expected: usize, actual: usize },

    #[error("batch call timed out after {timeout_secs}s")]
    Timeout { timeout_secs: u64 },
}
