//! The binder: per-slot orchestration of cache, local load, and loader.

use std::hash::Hash;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tracing::debug;

use crate::binding::config::BinderConfig;
use crate::binding::source::ResourceSource;
use crate::binding::target::BindTarget;
use crate::binding::types::{BindError, Placeholder};
use crate::cache::{CacheStats, RecencyCache};
use crate::loader::{AsyncLoader, Delivered, LoadDelegate, LoaderStats};

/// Post-bind hook, invoked at the end of every terminal bind/delivery path
/// with `(key, url, target, extra, value)`.
type BoundHook<K, X, T, V> =
    Box<dyn FnMut(Option<&K>, &str, &T, &X, Option<&V>) + 'static>;

/// Worker-side load delegate assembled from a [`ResourceSource`].
///
/// Mirrors the binder's decision tree off-thread: optionally the local path
/// first, then the remote path gated on the current network flag.
struct SourceDelegate<S> {
    source: Arc<S>,
    network_up: Arc<AtomicBool>,
    local_async: bool,
}

impl<K, X, S> LoadDelegate<K, String, X> for SourceDelegate<S>
where
    S: ResourceSource<K, X>,
{
    type Output = S::Value;

    fn load(&self, key: &K, url: &String, extra: &X) -> Option<S::Value> {
        let mut value = None;
        if self.local_async {
            value = self.source.load_local(key, url, extra);
        }
        if value.is_none() && self.network_up.load(Ordering::Relaxed) {
            value = self.source.load_remote(key, url, extra);
        }
        value
    }
}

/// Per-slot binding orchestrator for a recycling list consumer.
///
/// Owns a [`RecencyCache`] and an [`AsyncLoader`] wired to the caller's
/// [`ResourceSource`]. Drive it from a single consumer context only; call
/// [`pump`](Self::pump) from that context's event loop to apply finished
/// loads.
///
/// The binder starts *inactive*: values loaded before [`on_activate`]
/// (Self::on_activate) are cached in the best-effort tier only, so a consumer
/// that never comes to the foreground does not pin memory.
pub struct Binder<K, X, T, S>
where
    K: Eq + Hash + Clone + Send + 'static,
    X: Clone + Send + 'static,
    S: ResourceSource<K, X>,
    T: BindTarget<K, S::Value> + Send + 'static,
{
    source: Arc<S>,
    cache: RecencyCache<K, S::Value>,
    loader: AsyncLoader<K, String, X, T, SourceDelegate<S>>,
    /// Push-updated by the external connectivity observer; read by workers.
    network_up: Arc<AtomicBool>,
    active: bool,
    local_async: bool,
    loading_placeholder: bool,
    bound_hook: Option<BoundHook<K, X, T, S::Value>>,
}

impl<K, X, T, S> Binder<K, X, T, S>
where
    K: Eq + Hash + Clone + Send + 'static,
    X: Clone + Send + 'static,
    S: ResourceSource<K, X>,
    T: BindTarget<K, S::Value> + Send + 'static,
{
    /// Create a binder over `source` with the given configuration.
    ///
    /// # Errors
    ///
    /// Returns a [`BindError`] wrapping the cache or loader configuration
    /// error if either set of bounds is invalid.
    pub fn new(config: BinderConfig, source: S) -> Result<Self, BindError> {
        let source = Arc::new(source);
        let network_up = Arc::new(AtomicBool::new(true));
        let cache = RecencyCache::new(config.cache)?;
        let delegate = SourceDelegate {
            source: Arc::clone(&source),
            network_up: Arc::clone(&network_up),
            local_async: config.local_async,
        };
        let loader = AsyncLoader::new(config.loader, delegate)?;
        Ok(Self {
            source,
            cache,
            loader,
            network_up,
            active: false,
            local_async: config.local_async,
            loading_placeholder: config.loading_placeholder,
            bound_hook: None,
        })
    }

    /// Register a hook invoked at the end of every terminal bind/delivery
    /// path, mirroring the terminal paint.
    pub fn set_bound_hook<F>(&mut self, hook: F)
    where
        F: FnMut(Option<&K>, &str, &T, &X, Option<&S::Value>) + 'static,
    {
        self.bound_hook = Some(Box::new(hook));
    }

    /// Bind `key` to a visual slot.
    ///
    /// Tags the target with the key, then paints the first of: the cached
    /// value, a synchronous local load (unless `local_async`), a loading
    /// placeholder with an async load dispatched behind it, or the default
    /// placeholder when the key is absent or the network path is closed.
    ///
    /// # Errors
    ///
    /// Returns [`BindError::Loader`] if the underlying loader was stopped by
    /// [`on_teardown`](Self::on_teardown).
    pub fn bind(
        &mut self,
        key: Option<K>,
        url: &str,
        mut target: T,
        extra: X,
    ) -> Result<(), BindError> {
        target.set_tag(key.clone());

        let Some(key) = key else {
            target.show_placeholder(Placeholder::Default);
            if let Some(hook) = self.bound_hook.as_mut() {
                hook(None, url, &target, &extra, None);
            }
            return Ok(());
        };

        if let Some(value) = self.cache.get(&key) {
            target.show_value(value);
            if let Some(hook) = self.bound_hook.as_mut() {
                hook(Some(&key), url, &target, &extra, Some(value));
            }
            return Ok(());
        }

        if !self.local_async {
            if let Some(value) = self.source.load_local(&key, url, &extra) {
                target.show_value(&value);
                if let Some(hook) = self.bound_hook.as_mut() {
                    hook(Some(&key), url, &target, &extra, Some(&value));
                }
                return Ok(());
            }
        }

        if self.network_up.load(Ordering::Relaxed) && !url.is_empty() {
            target.show_placeholder(if self.loading_placeholder {
                Placeholder::Loading
            } else {
                Placeholder::Default
            });
            self.loader.submit(key, url.to_string(), extra, target)?;
        } else {
            target.show_placeholder(Placeholder::Default);
            if let Some(hook) = self.bound_hook.as_mut() {
                hook(Some(&key), url, &target, &extra, None);
            }
        }
        Ok(())
    }

    /// Apply every finished load currently awaiting delivery.
    ///
    /// Call from the consumer's event loop. Returns the number of results
    /// applied (painted and/or cached).
    pub fn pump(&mut self) -> usize {
        let Self {
            cache,
            loader,
            bound_hook,
            active,
            ..
        } = self;
        let active = *active;
        loader.drain(|d| Self::deliver(cache, bound_hook, active, d))
    }

    /// Like [`pump`](Self::pump), but blocks up to `timeout` for the first
    /// result. Intended for tests and headless consumers.
    pub fn pump_timeout(&mut self, timeout: Duration) -> usize {
        let Self {
            cache,
            loader,
            bound_hook,
            active,
            ..
        } = self;
        let active = *active;
        loader.drain_timeout(timeout, |d| Self::deliver(cache, bound_hook, active, d))
    }

    /// Consumer-context completion: verify the slot still belongs to the
    /// key, paint, and promote the value into the cache.
    fn deliver(
        cache: &mut RecencyCache<K, S::Value>,
        bound_hook: &mut Option<BoundHook<K, X, T, S::Value>>,
        active: bool,
        delivered: Delivered<K, String, X, T, S::Value>,
    ) {
        let Delivered {
            key,
            param: url,
            extra,
            mut target,
            result,
        } = delivered;
        let matched = target.tag().is_some_and(|tag| tag == key);

        match result {
            Some(value) => {
                if matched {
                    target.show_value(&value);
                }
                if let Some(hook) = bound_hook.as_mut() {
                    hook(Some(&key), &url, &target, &extra, Some(&value));
                }
                // Cache regardless of the slot match so the value still
                // benefits future lookups; only pressure the strong tier
                // while the consumer is active.
                if active {
                    cache.put(key, value);
                } else {
                    cache.put_weak(key, value);
                }
            }
            None => {
                if matched {
                    target.show_placeholder(Placeholder::Default);
                }
                if let Some(hook) = bound_hook.as_mut() {
                    hook(Some(&key), &url, &target, &extra, None);
                }
            }
        }
    }

    /// The consumer came to the foreground: resume loading and start caching
    /// into the strong tier.
    ///
    /// # Errors
    ///
    /// Returns [`BindError::Loader`] after [`on_teardown`](Self::on_teardown).
    pub fn on_activate(&mut self) -> Result<(), BindError> {
        self.active = true;
        self.loader.resume()?;
        debug!("binder activated");
        Ok(())
    }

    /// The consumer left the foreground: pause loading and demote the strong
    /// cache tier.
    pub fn on_deactivate(&mut self) {
        self.active = false;
        self.cache.release();
        self.loader.pause();
        debug!("binder deactivated");
    }

    /// The consumer is going away for good: clear the cache and stop the
    /// loader. Subsequent `bind` calls fail.
    pub fn on_teardown(&mut self) {
        self.cache.clear();
        self.loader.stop();
        debug!("binder torn down");
    }

    /// The dataset changed: pending loads are for rows that may no longer
    /// exist, so discard them all.
    pub fn on_dataset_invalidated(&mut self) {
        self.loader.invalidate();
    }

    /// Update the network-availability flag (push-updated by an external
    /// connectivity observer). Read at bind time and by workers before the
    /// remote path.
    pub fn set_network_available(&self, available: bool) {
        self.network_up.store(available, Ordering::Relaxed);
    }

    /// Current network-availability flag.
    pub fn is_network_available(&self) -> bool {
        self.network_up.load(Ordering::Relaxed)
    }

    /// Whether the consumer is currently active.
    pub fn is_active(&self) -> bool {
        self.active
    }

    /// Demote all strongly cached values without forgetting them.
    pub fn release_cache(&mut self) {
        self.cache.release();
    }

    /// Drop every cached value.
    pub fn clear_cache(&mut self) {
        self.cache.clear();
    }

    /// Snapshot of the cache counters.
    pub fn cache_stats(&self) -> CacheStats {
        self.cache.stats()
    }

    /// Snapshot of the loader counters.
    pub fn loader_stats(&self) -> LoaderStats {
        self.loader.stats()
    }
}
