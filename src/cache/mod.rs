//! Two-tier recency cache.
//!
//! The cache keeps the most recently used N values in an *active* tier that is
//! strongly retained, and degrades older values to a *demoted* tier with its
//! own, larger bound. Demoted entries are best-effort: they may be evicted at
//! any time and their presence must never be required for correctness — a miss
//! on a demoted entry is functionally identical to a cold miss.
//!
//! The cache is **not** synchronized. It is meant to be driven from a single
//! consumer context (typically the UI/event thread); `&mut self` receivers
//! enforce the single-writer rule through ownership rather than locks.

mod recency;
mod types;

pub use recency::RecencyCache;
pub use types::{CacheConfig, CacheError, CacheStats, DEFAULT_CACHE_CAPACITY};
