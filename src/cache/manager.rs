//! Cache manager.

use async_trait::async_trait;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use super::backend::CacheBackend;
use super::key::CacheKey;
use crate::Result;

/// The key/value interface the completion client consumes.
///
/// Implementations own their concurrency guarantees; the client never locks
/// around them.
#[async_trait]
pub trait ResponseCache: Send + Sync {
    async fn get(&self, key: &CacheKey) -> Result<Option<String>>;
    async fn set(&self, key: &CacheKey, value: &str) -> Result<()>;
    /// Short stable identifier of `key`, for traces only.
    fn fingerprint(&self, key: &CacheKey) -> String {
        key.hash.clone()
    }
}

#[derive(Debug, Clone)]
pub struct CacheConfig {
    pub enabled: bool,
    /// Entries larger than this are silently not stored.
    pub max_entry_size: usize,
    pub key_prefix: Option<String>,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            max_entry_size: 10 * 1024 * 1024,
            key_prefix: None,
        }
    }
}

impl CacheConfig {
    pub fn new() -> Self {
        Self::default()
    }
    pub fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }
    pub fn with_max_entry_size(mut self, size: usize) -> Self {
        self.max_entry_size = size;
        self
    }
    pub fn with_key_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.key_prefix = Some(prefix.into());
        self
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub sets: u64,
    pub errors: u64,
}

impl CacheStats {
    pub fn hit_ratio(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}

#[derive(Default)]
struct AtomicStats {
    hits: AtomicU64,
    misses: AtomicU64,
    sets: AtomicU64,
    errors: AtomicU64,
}

impl AtomicStats {
    fn to_stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            sets: self.sets.load(Ordering::Relaxed),
            errors: self.errors.load(Ordering::Relaxed),
        }
    }
}

/// A [`ResponseCache`] over a pluggable [`CacheBackend`], with hit/miss stats.
pub struct CacheManager {
    config: CacheConfig,
    backend: Box<dyn CacheBackend>,
    stats: Arc<AtomicStats>,
}

impl CacheManager {
    pub fn new(config: CacheConfig, backend: Box<dyn CacheBackend>) -> Self {
        Self {
            config,
            backend,
            stats: Arc::new(AtomicStats::default()),
        }
    }

    pub fn memory(max_entries: usize) -> Self {
        Self::new(
            CacheConfig::default(),
            Box::new(super::MemoryCache::new(max_entries)),
        )
    }

    pub fn stats(&self) -> CacheStats {
        self.stats.to_stats()
    }

    pub fn backend_name(&self) -> &'static str {
        self.backend.name()
    }

    pub async fn delete(&self, key: &CacheKey) -> Result<bool> {
        if !self.config.enabled {
            return Ok(false);
        }
        self.backend.delete(&self.prefix_key(key)).await
    }

    pub async fn clear(&self) -> Result<()> {
        self.backend.clear().await
    }

    fn prefix_key(&self, key: &CacheKey) -> CacheKey {
        match &self.config.key_prefix {
            Some(p) => CacheKey {
                hash: format!("{}:{}", p, key.hash),
                ..key.clone()
            },
            None => key.clone(),
        }
    }
}

#[async_trait]
impl ResponseCache for CacheManager {
    async fn get(&self, key: &CacheKey) -> Result<Option<String>> {
        if !self.config.enabled {
            return Ok(None);
        }
        match self.backend.get(&self.prefix_key(key)).await {
            Ok(Some(value)) => {
                self.stats.hits.fetch_add(1, Ordering::Relaxed);
                tracing::debug!(key = %key, backend = self.backend.name(), "cache hit");
                Ok(Some(value))
            }
            Ok(None) => {
                self.stats.misses.fetch_add(1, Ordering::Relaxed);
                tracing::debug!(key = %key, backend = self.backend.name(), "cache miss");
                Ok(None)
            }
            Err(e) => {
                self.stats.errors.fetch_add(1, Ordering::Relaxed);
                Err(e)
            }
        }
    }

    async fn set(&self, key: &CacheKey, value: &str) -> Result<()> {
        if !self.config.enabled || value.len() > self.config.max_entry_size {
            return Ok(());
        }
        match self.backend.set(&self.prefix_key(key), value).await {
            Ok(()) => {
                self.stats.sets.fetch_add(1, Ordering::Relaxed);
                Ok(())
            }
            Err(e) => {
                self.stats.errors.fetch_add(1, Ordering::Relaxed);
                Err(e)
            }
        }
    }
}
