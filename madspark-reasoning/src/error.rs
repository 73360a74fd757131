//! Reasoning-engine error kinds (§4.8, §7).

use madspark_contracts::{SchemaValidationError, ValidationError};
use madspark_router::RouterError;

#[derive(Debug, thiserror::Error)]
pub enum ReasoningError {
    #[error(transparent)]
    Router(#[from] RouterError),

    #[error(transparent)]
    Schema(#[from] SchemaValidationError),

    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("malformed response: {0}")]
    ResponseParsing(String),

    #[error("batch response had {actual} entries, expected {expected}")]
    BatchLengthMismatch { expected: usize, actual: usize },

    #[error("idea {idea_index} is missing one or more of the seven scoring dimensions: {reason}")]
    MissingDimension { idea_index: u32, reason: String },

    #[error("retries exhausted: {0}")]
    RetriesExhausted(String),
}
