//! Local key-value cache.
//!
//! # Responsibilities
//! - Warm-start and fallback storage for the merged visual config
//! - String values under string keys, nothing more
//!
//! # Design Decisions
//! - Synchronous interface: reads and writes are local and small
//! - File-backed variant rewrites the whole file on every set
//! - A corrupt cache file is treated as empty, never as fatal

pub mod file;

use dashmap::DashMap;
use thiserror::Error;

pub use file::FileCache;

/// Well-known key holding the serialized merged `VisualConfig`.
pub const VISUAL_CONFIG_KEY: &str = "visual-config";

/// Errors raised when persisting the cache.
#[derive(Debug, Error)]
pub enum CacheError {
    #[error("Cache IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Cache serialization error: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Process-wide key-value persistence.
pub trait LocalCache: Send + Sync {
    fn get(&self, key: &str) -> Option<String>;
    fn set(&self, key: &str, value: &str) -> Result<(), CacheError>;
    fn remove(&self, key: &str) -> Result<(), CacheError>;
}

/// Cache that lives as long as the process.
#[derive(Debug, Default)]
pub struct MemoryCache {
    inner: DashMap<String, String>,
}

impl MemoryCache {
    pub fn new() -> Self {
        Self::default()
    }
}

impl LocalCache for MemoryCache {
    fn get(&self, key: &str) -> Option<String> {
        self.inner.get(key).map(|v| v.value().clone())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), CacheError> {
        self.inner.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), CacheError> {
        self.inner.remove(key);
        Ok(())
    }
}
