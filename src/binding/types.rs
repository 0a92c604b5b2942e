//! Core types for the binding module.

use thiserror::Error;

use crate::cache::CacheError;
use crate::loader::LoaderError;

/// Errors surfaced by the binding layer.
#[derive(Debug, Error)]
pub enum BindError {
    /// Cache construction failed
    #[error(transparent)]
    Cache(#[from] CacheError),

    /// Loader construction or submission failed
    #[error(transparent)]
    Loader(#[from] LoaderError),
}

/// Which placeholder a slot should display instead of a value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Placeholder {
    /// The configured default, shown on absent keys and failed loads.
    Default,
    /// The "still loading" indicator, shown while an async load is pending.
    Loading,
}
