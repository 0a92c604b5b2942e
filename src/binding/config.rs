//! Configuration for the binder.

use crate::cache::CacheConfig;
use crate::loader::LoaderConfig;

/// Configuration for a [`Binder`](crate::binding::Binder).
#[derive(Debug, Clone)]
pub struct BinderConfig {
    /// Run the local load inside workers instead of inline on the consumer
    /// context.
    ///
    /// Off by default: local loads are assumed fast enough to run
    /// synchronously during `bind`. Turn this on when local loads hit slow
    /// storage.
    pub local_async: bool,

    /// Show the dedicated loading placeholder while an async load is
    /// pending. When off, the default placeholder is shown instead.
    pub loading_placeholder: bool,

    /// Cache tiers and bounds.
    pub cache: CacheConfig,

    /// Admission capacity and worker count.
    pub loader: LoaderConfig,
}

impl Default for BinderConfig {
    fn default() -> Self {
        Self {
            local_async: false,
            loading_placeholder: true,
            cache: CacheConfig::default(),
            loader: LoaderConfig::default(),
        }
    }
}
