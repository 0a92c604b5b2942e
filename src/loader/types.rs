//! Core types and traits for the loader module.

use thiserror::Error;

/// Loader-related errors.
#[derive(Debug, Error)]
pub enum LoaderError {
    /// The loader has been stopped; it accepts no further work.
    #[error("loader is stopped")]
    Stopped,

    /// Invalid loader configuration
    #[error("invalid loader configuration: {0}")]
    InvalidConfig(String),
}

/// A load function run on worker threads.
///
/// Implementations must be safe to call concurrently from several workers.
/// Returning `None` is a valid negative outcome, not an error; panics are
/// caught per load and treated the same way, so one failing key can never
/// stall the pool.
pub trait LoadDelegate<K, P, X>: Send + Sync + 'static {
    /// The loaded value type.
    type Output: Send + 'static;

    /// Perform the load for `key`. May block (e.g. on network I/O).
    fn load(&self, key: &K, param: &P, extra: &X) -> Option<Self::Output>;
}

/// A result honored by the delivery point and handed to the consumer.
///
/// `target` and `extra` are the entry's *current* bindings: a re-submission
/// while the load was in flight rebinds them, and the late delivery goes to
/// the newest target.
#[derive(Debug)]
pub struct Delivered<K, P, X, T, R> {
    /// Key the load was submitted under.
    pub key: K,
    /// Load parameter captured at submission.
    pub param: P,
    /// Extra context, as most recently bound.
    pub extra: X,
    /// Consumer-side target, as most recently bound.
    pub target: T,
    /// The load outcome; `None` is a valid negative result.
    pub result: Option<R>,
}

/// Worker-to-consumer message carrying a finished load.
///
/// The target/extra are deliberately *not* carried here: they are looked up
/// from the task index at delivery time so that late rebinds win.
#[derive(Debug)]
pub(crate) struct Completion<K, P, R> {
    pub(crate) key: K,
    pub(crate) param: P,
    pub(crate) result: Option<R>,
    /// Generation captured when the worker took this task from the queue.
    pub(crate) generation: u64,
}

/// Counters for monitoring loader behaviour.
///
/// Snapshot via [`AsyncLoader::stats`](crate::loader::AsyncLoader::stats).
#[derive(Debug, Default, Clone)]
pub struct LoaderStats {
    /// Total submissions received.
    pub total_requests: u64,
    /// Submissions that created a new task entry.
    pub new_requests: u64,
    /// Submissions coalesced onto an existing entry (target/extra rebound).
    pub coalesced_requests: u64,
    /// Queued entries dropped because the admission queue was over capacity.
    pub evicted: u64,
    /// Results honored and handed to the consumer callback.
    pub delivered: u64,
    /// Results dropped at the delivery point (stale generation, invalidated
    /// entry, or stopped loader).
    pub stale_dropped: u64,
    /// Calls to `invalidate` that bumped the generation.
    pub invalidations: u64,
}

impl LoaderStats {
    /// Returns the coalescing ratio (0.0 to 1.0).
    pub fn coalescing_ratio(&self) -> f64 {
        if self.total_requests == 0 {
            0.0
        } else {
            self.coalesced_requests as f64 / self.total_requests as f64
        }
    }
}
