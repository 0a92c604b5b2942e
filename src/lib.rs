//! IconFlow - asynchronous keyed resource loading for scrolling lists
//!
//! This library provides the plumbing needed to show keyed resources (icons,
//! thumbnails, any small value addressed by a key) in a recycling list UI
//! without duplicated work or unbounded memory growth:
//!
//! - [`loader`] — a bounded worker-pool loader that coalesces repeated
//!   requests for the same key, keeps a recency-ordered admission backlog,
//!   and discards stale in-flight results after invalidation.
//! - [`cache`] — a two-tier recency cache: the most recently used entries are
//!   strongly retained, older ones degrade to a best-effort tier that may be
//!   evicted silently.
//! - [`binding`] — the per-slot contract that composes both: check the cache,
//!   fall back to a synchronous local load, else dispatch to the loader and
//!   reconcile the result back onto the consumer context.
//!
//! # High-Level API
//!
//! For most use cases, the [`binding`] module provides the composed facade:
//!
//! ```ignore
//! use iconflow::binding::{Binder, BinderConfig};
//!
//! let mut binder = Binder::new(BinderConfig::default(), MySource)?;
//! binder.set_network_available(true);
//!
//! // On the consumer (UI) thread, for each visible row:
//! binder.bind(Some(row.key.clone()), &row.url, slot_handle, row.meta.clone())?;
//!
//! // Once per event-loop turn:
//! binder.pump();
//! ```
//!
//! All consumer-side types (`Binder`, `RecencyCache`) are single-threaded by
//! design and must only be driven from one context; only the loader's worker
//! pool runs in parallel.

pub mod binding;
pub mod cache;
pub mod loader;

/// Version of the IconFlow library.
///
/// The version is defined in `Cargo.toml` and injected at compile time.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
