//! In-memory response caching for the portal client.
//!
//! This module provides a transport-agnostic caching mechanism that:
//! - Stores response payloads under hashed query keys
//! - Treats entries older than the time-to-live as absent
//! - Can be switched off by swapping in a no-op storage backend

mod layer;
mod storage;
mod traits;

pub use layer::{CacheLayer, CacheStats};
pub use storage::{CacheEntry, CacheStorage, MemoryStorage, NoopStorage};
pub use traits::{CacheResult, CacheSource, Clock, QueryKey, SystemClock};

#[cfg(test)]
pub(crate) use layer::test_support;
