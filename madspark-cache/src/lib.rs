//! Content-addressed response cache for the Router (C3, §4.3).
//!
//! Every cacheable provider call is keyed off everything that can affect
//! its result (see [`key`]) and stored with a TTL and LRU eviction (see
//! [`store`]) so identical calls within the TTL window never reach a
//! provider twice.

pub mod error;
pub mod key;
pub mod store;

pub use error::CacheError;
pub use key::{CacheKeyInput, MAX_CACHE_KEY_FILE_BYTES};
pub use store::{CacheEntry, CacheStats, InMemoryResponseCache, DEFAULT_CAPACITY, DEFAULT_TTL};
