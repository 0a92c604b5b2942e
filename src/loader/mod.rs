//! Bounded worker-pool loader with coalescing and soft cancellation.
//!
//! [`AsyncLoader`] runs caller-supplied, key-addressed load functions off the
//! calling thread with bounded concurrency. Repeated submissions for the same
//! key coalesce onto one pending task, the backlog is a recency-ordered queue
//! bounded by a configured capacity (the oldest pending request is dropped on
//! overflow), and [`AsyncLoader::invalidate`] orphans everything in flight via
//! a generation tag rather than interrupting worker threads.
//!
//! Results are marshalled back to the single consumer context that owns the
//! loader handle; the consumer drains them with [`AsyncLoader::drain`] from
//! its event loop. A result is only honored if its generation tag still
//! matches and its task entry is still tracked — everything else is dropped
//! silently, which is the intended "soft" cancellation.

mod config;
mod core;
mod queue;
mod types;

pub use config::{LoaderConfig, DEFAULT_LOADER_CAPACITY, DEFAULT_LOADER_WORKERS};
pub use core::AsyncLoader;
pub use types::{Delivered, LoadDelegate, LoaderError, LoaderStats};
