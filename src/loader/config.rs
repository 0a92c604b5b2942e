//! Configuration for the async loader.

use crate::loader::types::LoaderError;

/// Default admission-queue capacity.
pub const DEFAULT_LOADER_CAPACITY: usize = 20;

/// Default maximum number of worker threads.
pub const DEFAULT_LOADER_WORKERS: usize = 3;

/// Configuration for an [`AsyncLoader`](crate::loader::AsyncLoader).
#[derive(Debug, Clone)]
pub struct LoaderConfig {
    /// Maximum number of tracked task entries (queued plus in flight).
    ///
    /// When a new submission would exceed this, the least-recently-requested
    /// queued entry is silently dropped. Must be strictly greater than
    /// `max_workers` so eviction always has a queued entry to drop.
    pub capacity: usize,

    /// Maximum number of worker threads.
    ///
    /// Workers are started lazily as submissions arrive and never shrink.
    /// Must be at least 1.
    pub max_workers: usize,
}

impl Default for LoaderConfig {
    fn default() -> Self {
        Self {
            capacity: DEFAULT_LOADER_CAPACITY,
            max_workers: DEFAULT_LOADER_WORKERS,
        }
    }
}

impl LoaderConfig {
    /// Create a configuration with explicit bounds.
    pub fn new(capacity: usize, max_workers: usize) -> Self {
        Self {
            capacity,
            max_workers,
        }
    }

    /// Validate the configuration.
    ///
    /// # Errors
    ///
    /// Returns [`LoaderError::InvalidConfig`] if `max_workers` is zero or
    /// `capacity` does not exceed `max_workers`.
    pub fn validate(&self) -> Result<(), LoaderError> {
        if self.max_workers < 1 {
            return Err(LoaderError::InvalidConfig(
                "max_workers must be at least 1".to_string(),
            ));
        }
        if self.capacity <= self.max_workers {
            return Err(LoaderError::InvalidConfig(format!(
                "capacity ({}) must be strictly greater than max_workers ({})",
                self.capacity, self.max_workers
            )));
        }
        Ok(())
    }
}
