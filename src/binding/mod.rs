//! Per-slot binding contract composing the cache and the loader.
//!
//! A [`Binder`] is what a recycling list UI talks to: for every visible slot
//! it calls [`Binder::bind`], which paints from the cache when possible,
//! falls back to a synchronous local load, and otherwise dispatches an
//! asynchronous load and paints a placeholder. Results come back through
//! [`Binder::pump`], driven from the consumer's event loop, where the slot's
//! current tag is re-verified before any UI state is touched — a slot that
//! was recycled to a different key in the meantime is left alone, but the
//! loaded value is still promoted into the cache for future lookups.
//!
//! The caller supplies two trait implementations: [`ResourceSource`] for the
//! actual local/remote load routines, and [`BindTarget`] for the visual slot
//! (tag storage plus painting). Everything else — coalescing, capacity
//! bounds, staleness, tier management — is handled here.

mod binder;
mod config;
mod source;
mod target;
mod types;

pub use binder::Binder;
pub use config::BinderConfig;
pub use source::ResourceSource;
pub use target::BindTarget;
pub use types::{BindError, Placeholder};
