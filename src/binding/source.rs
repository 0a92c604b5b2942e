//! The caller-supplied load routines.

/// Supplier of values for keys, split into a local and a remote path.
///
/// The binder decides which path runs where: `load_local` may run inline on
/// the consumer context or inside a worker depending on
/// [`BinderConfig::local_async`](crate::binding::BinderConfig::local_async),
/// while `load_remote` only ever runs inside a loader worker and is the only
/// place that may block on the network.
///
/// Both routines return `None` for "no value here" — that is a normal
/// negative outcome, not an error, and the binder responds by showing the
/// default placeholder. No retry is attempted; a retry is simply another
/// `bind` call.
pub trait ResourceSource<K, X>: Send + Sync + 'static {
    /// The loaded value type (a decoded bitmap, typically).
    type Value: Send + 'static;

    /// Load from fast local storage. Must not block on the network.
    fn load_local(&self, key: &K, url: &str, extra: &X) -> Option<Self::Value>;

    /// Load from the remote origin. May block; called concurrently by
    /// several workers.
    fn load_remote(&self, key: &K, url: &str, extra: &X) -> Option<Self::Value>;
}
