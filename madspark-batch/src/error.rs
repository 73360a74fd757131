//! Batch Job Runner error kinds (§7, §4.11).

#[derive(Debug, thiserror::Error)]
pub enum BatchError {
    #[error("batch item {index} has an empty topic")]
    EmptyTopic { index: usize },
}
