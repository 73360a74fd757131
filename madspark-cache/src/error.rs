//! Cache error types (§4.3, §7).

#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    #[error("file {path} is {size_bytes} bytes, over the {limit_bytes}-byte cache-key limit")]
    FileTooLarge {
        path: String,
        size_bytes: u64,
        limit_bytes: u64,
    },

    #[error("failed to read file {path} for cache key computation: {message}")]
    FileReadFailed { path: String, message: String },
}
