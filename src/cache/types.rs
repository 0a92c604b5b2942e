//! Core types for the cache module.

use thiserror::Error;

/// Default active-tier capacity.
pub const DEFAULT_CACHE_CAPACITY: usize = 16;

/// Multiplier applied to the active capacity to derive the default demoted
/// bound. The demoted tier stands in for GC-reclaimable references, so it is
/// deliberately larger than the strongly retained tier.
const DEFAULT_DEMOTED_MULTIPLIER: usize = 4;

/// Cache-related errors.
#[derive(Debug, Error)]
pub enum CacheError {
    /// Invalid cache configuration
    #[error("invalid cache configuration: {0}")]
    InvalidConfig(String),
}

/// Configuration for a [`RecencyCache`](crate::cache::RecencyCache).
#[derive(Debug, Clone)]
pub struct CacheConfig {
    /// Maximum number of entries in the active (strongly retained) tier.
    ///
    /// Keep this modest: everything in the active tier stays in memory until
    /// demoted. Must be at least 2.
    pub capacity: usize,

    /// Maximum number of entries in the demoted (best-effort) tier.
    ///
    /// Once exceeded, the oldest demoted entry is evicted outright. Must be at
    /// least `capacity`, so that a full [`release`](crate::cache::RecencyCache::release)
    /// never has to discard entries mid-pass.
    pub demoted_capacity: usize,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self::with_capacity(DEFAULT_CACHE_CAPACITY)
    }
}

impl CacheConfig {
    /// Create a configuration with the given active capacity and the default
    /// demoted bound derived from it.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            capacity,
            demoted_capacity: capacity.saturating_mul(DEFAULT_DEMOTED_MULTIPLIER),
        }
    }

    /// Validate the configuration.
    ///
    /// # Errors
    ///
    /// Returns [`CacheError::InvalidConfig`] if `capacity` is below 2 or the
    /// demoted bound is smaller than the active capacity.
    pub fn validate(&self) -> Result<(), CacheError> {
        if self.capacity < 2 {
            return Err(CacheError::InvalidConfig(format!(
                "capacity must be at least 2, got {}",
                self.capacity
            )));
        }
        if self.demoted_capacity < self.capacity {
            return Err(CacheError::InvalidConfig(format!(
                "demoted_capacity ({}) must not be smaller than capacity ({})",
                self.demoted_capacity, self.capacity
            )));
        }
        Ok(())
    }
}

/// Counters for monitoring cache effectiveness.
///
/// Snapshot via [`RecencyCache::stats`](crate::cache::RecencyCache::stats).
#[derive(Debug, Default, Clone)]
pub struct CacheStats {
    /// Lookups that found a value in either tier.
    pub hits: u64,
    /// Lookups that found nothing.
    pub misses: u64,
    /// Demoted entries re-promoted to the active tier by a lookup.
    pub promotions: u64,
    /// Active entries pushed down to the demoted tier (capacity overflow or
    /// an explicit release).
    pub demotions: u64,
    /// Demoted entries evicted outright when the demoted bound was exceeded.
    ///
    /// This is the deterministic analogue of "reclaimed under memory
    /// pressure" and is never surfaced as an error.
    pub reclaimed: u64,
    /// Values inserted via `put` or `put_weak`.
    pub insertions: u64,
}

impl CacheStats {
    /// Returns the hit ratio (0.0 to 1.0).
    pub fn hit_ratio(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}
