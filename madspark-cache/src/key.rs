//! Cache key computation (§3, §4.3).
//!
//! The key is the 16-hex-character SHA-256 prefix of the canonical
//! serialization of every input that can change what a provider would
//! return: prompt text, schema identity, temperature, forced provider,
//! system instruction, the resolved paths and content hashes of any
//! referenced files (sorted), sorted URLs, and any additional keyword
//! inputs. Two calls differing in any of these produce different keys.

use sha2::{Digest, Sha256};
use std::path::Path;

use crate::error::CacheError;

/// Per-file limit enforced before a file contributes to a cache key
/// (§4.3, §5): larger files are rejected rather than hashed.
pub const MAX_CACHE_KEY_FILE_BYTES: u64 = 50 * 1024 * 1024;

/// Everything that determines a provider response, gathered for hashing.
#[derive(Debug, Clone, Default)]
pub struct CacheKeyInput {
    pub prompt: String,
    pub schema_identity: String,
    pub temperature: f64,
    pub provider_forced: Option<String>,
    pub system_instruction: String,
    /// (path, content) pairs; content is hashed here, not the caller's
    /// responsibility, so a file's on-disk mtime cannot desync the key.
    pub files: Vec<(String, Vec<u8>)>,
    pub urls: Vec<String>,
    pub extra: Vec<(String, String)>,
}

impl CacheKeyInput {
    /// Hashes file contents and checks the §4.3/§5 50 MB limit. File
    /// descriptors are closed as soon as this returns (the caller passes
    /// owned bytes read via `tokio::fs`, never a held handle).
    pub fn add_file(&mut self, path: impl AsRef<Path>, content: Vec<u8>) -> Result<(), CacheError> {
        if content.len() as u64 > MAX_CACHE_KEY_FILE_BYTES {
            return Err(CacheError::FileTooLarge {
                path: path.as_ref().display().to_string(),
                size_bytes: content.len() as u64,
                limit_bytes: MAX_CACHE_KEY_FILE_BYTES,
            });
        }
        self.files.push((path.as_ref().display().to_string(), content));
        Ok(())
    }

    /// Computes the 16-hex-character cache key.
    pub fn compute_key(&self) -> String {
        let mut hasher = Sha256::new();

        hasher.update(self.prompt.as_bytes());
        hasher.update(b"\0");
        hasher.update(self.schema_identity.as_bytes());
        hasher.update(b"\0");
        hasher.update(self.temperature.to_bits().to_le_bytes());
        hasher.update(b"\0");
        hasher.update(self.provider_forced.as_deref().unwrap_or("").as_bytes());
        hasher.update(b"\0");
        hasher.update(self.system_instruction.as_bytes());
        hasher.update(b"\0");

        let mut files_by_content_hash: Vec<(String, String)> = self
            .files
            .iter()
            .map(|(path, content)| {
                let mut file_hasher = Sha256::new();
                file_hasher.update(content);
                (path.clone(), hex::encode(file_hasher.finalize()))
            })
            .collect();
        files_by_content_hash.sort();
        for (path, content_hash) in &files_by_content_hash {
            hasher.update(path.as_bytes());
            hasher.update(b":");
            hasher.update(content_hash.as_bytes());
            hasher.update(b"\0");
        }

        let mut urls = self.urls.clone();
        urls.sort();
        for url in &urls {
            hasher.update(url.as_bytes());
            hasher.update(b"\0");
        }

        let mut extra = self.extra.clone();
        extra.sort();
        for (k, v) in &extra {
            hasher.update(k.as_bytes());
            hasher.update(b"=");
            hasher.update(v.as_bytes());
            hasher.update(b"\0");
        }

        let digest = hasher.finalize();
        hex::encode(digest)[..16].to_string()
    }
}
