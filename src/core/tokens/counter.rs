//! Token counter implementation

use super::types::{CacheStats, TokenError};
use crate::config::TokenCounterConfig;
use lru::LruCache;
use parking_lot::Mutex;
use std::num::NonZeroUsize;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tiktoken_rs::CoreBPE;
use tracing::{debug, info};

/// Lock-free cache counters
#[derive(Debug, Default)]
struct AtomicCacheStats {
    hits: AtomicU64,
    misses: AtomicU64,
    evictions: AtomicU64,
}

/// Token counter with an LRU cache of encoding tables
///
/// The cache lock is held only to look up, promote, or insert a table; the
/// table itself is shared through an `Arc`, so encoding runs outside the lock
/// and concurrent counts on cached models do not serialize on each other.
pub struct TokenCounter {
    /// Model name -> loaded encoding; `None` when `cache_size` is 0
    encodings: Option<Mutex<LruCache<String, Arc<CoreBPE>>>>,
    /// Configured capacity
    cache_size: usize,
    /// Cache statistics (lock-free atomics for hot path)
    stats: AtomicCacheStats,
}

impl std::fmt::Debug for TokenCounter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenCounter")
            .field("cache_size", &self.cache_size)
            .field("cached_encodings", &self.cached_len())
            .finish()
    }
}

impl TokenCounter {
    /// Create a token counter caching at most `cache_size` encodings
    ///
    /// A `cache_size` of 0 disables caching: every call loads its table.
    pub fn new(cache_size: usize) -> Self {
        let encodings =
            NonZeroUsize::new(cache_size).map(|capacity| Mutex::new(LruCache::new(capacity)));

        Self {
            encodings,
            cache_size,
            stats: AtomicCacheStats::default(),
        }
    }

    /// Create a token counter from configuration
    pub fn from_config(config: &TokenCounterConfig) -> Self {
        Self::new(config.cache_size)
    }

    /// Count tokens in `text` as encoded for `model`
    pub fn count_tokens(&self, text: &str, model: &str) -> Result<usize, TokenError> {
        let bpe = self.encoding_for(model)?;
        Ok(bpe.encode_with_special_tokens(text).len())
    }

    /// Count tokens for each text, preserving input order
    ///
    /// Equivalent to calling [`count_tokens`](Self::count_tokens) once per
    /// element; the table is resolved once for the whole batch. An empty batch
    /// returns an empty list without touching the cache.
    pub fn count_tokens_batch<S: AsRef<str>>(
        &self,
        texts: &[S],
        model: &str,
    ) -> Result<Vec<usize>, TokenError> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        debug!("Counting tokens for batch of {} texts", texts.len());
        let bpe = self.encoding_for(model)?;

        Ok(texts
            .iter()
            .map(|text| bpe.encode_with_special_tokens(text.as_ref()).len())
            .collect())
    }

    /// Get cache statistics
    pub fn get_cache_stats(&self) -> CacheStats {
        CacheStats {
            cached_encodings: self.cached_len(),
            max_cache_size: self.cache_size,
            hits: self.stats.hits.load(Ordering::Relaxed),
            misses: self.stats.misses.load(Ordering::Relaxed),
            evictions: self.stats.evictions.load(Ordering::Relaxed),
        }
    }

    /// Cached model names, most recently used first
    pub fn cached_models(&self) -> Vec<String> {
        match &self.encodings {
            Some(cache) => cache.lock().iter().map(|(model, _)| model.clone()).collect(),
            None => Vec::new(),
        }
    }

    /// Drop every cached encoding
    pub fn clear_cache(&self) {
        if let Some(cache) = &self.encodings {
            cache.lock().clear();
            info!("Token encoding cache cleared");
        }
    }

    /// Configured capacity
    pub fn cache_size(&self) -> usize {
        self.cache_size
    }

    /// Verify the counter can serve requests
    ///
    /// Checks the cache bound and that the default table encodes a sample string.
    pub fn health_check(&self) -> bool {
        if self.cached_len() > self.cache_size {
            return false;
        }
        tiktoken_rs::cl100k_base()
            .map(|bpe| !bpe.encode_with_special_tokens("health").is_empty())
            .unwrap_or(false)
    }

    fn cached_len(&self) -> usize {
        self.encodings
            .as_ref()
            .map(|cache| cache.lock().len())
            .unwrap_or(0)
    }

    /// Resolve the encoding for a model, loading and caching it on a miss
    pub(super) fn encoding_for(&self, model: &str) -> Result<Arc<CoreBPE>, TokenError> {
        let Some(cache) = &self.encodings else {
            self.stats.misses.fetch_add(1, Ordering::Relaxed);
            return load_encoding(model).map(Arc::new);
        };

        // `get` promotes the entry to most recently used
        if let Some(bpe) = cache.lock().get(model) {
            self.stats.hits.fetch_add(1, Ordering::Relaxed);
            debug!("Encoding cache hit for model: {}", model);
            return Ok(Arc::clone(bpe));
        }

        self.stats.misses.fetch_add(1, Ordering::Relaxed);
        debug!("Encoding cache miss for model: {}", model);

        // Load outside the lock; a concurrent loader may win the insert
        let loaded = Arc::new(load_encoding(model)?);

        let mut cache = cache.lock();
        if let Some(existing) = cache.get(model) {
            return Ok(Arc::clone(existing));
        }
        if let Some((evicted, _)) = cache.push(model.to_string(), Arc::clone(&loaded)) {
            self.stats.evictions.fetch_add(1, Ordering::Relaxed);
            debug!("Evicted encoding for model: {}", evicted);
        }
        info!("Loaded encoding for model: {}", model);

        Ok(loaded)
    }
}

impl Default for TokenCounter {
    fn default() -> Self {
        Self::from_config(&TokenCounterConfig::default())
    }
}

/// Load the BPE table for a model
///
/// Provider-prefixed names (`openai/gpt-4`) fall back to the bare model name
/// when the full name is unknown.
fn load_encoding(model: &str) -> Result<CoreBPE, TokenError> {
    if let Ok(bpe) = tiktoken_rs::get_bpe_from_model(model) {
        return Ok(bpe);
    }

    if let Some((_, bare)) = model.rsplit_once('/') {
        if let Ok(bpe) = tiktoken_rs::get_bpe_from_model(bare) {
            return Ok(bpe);
        }
    }

    Err(TokenError::ModelNotSupported(model.to_string()))
}

/// Health check for the token counting component
pub fn token_health_check() -> bool {
    info!("Token counting health check called");
    TokenCounter::new(1).health_check()
}
