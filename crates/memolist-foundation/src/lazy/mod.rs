//! Windowed rendering with memoized per-item derived values.
//!
//! This module renders only the items that intersect the viewport (plus a
//! small overscan margin) and caches each item's expensive derived value so
//! that it is recomputed only when the fields it depends on change.
//!
//! # Architecture
//!
//! - [`ViewportState`] - Scroll position and extents of the list
//! - [`compute_range`] - Pure range calculator producing a [`RenderWindow`]
//! - [`DerivedValueCache`] - Bounded LRU keyed by identity, validated by fingerprint
//! - [`ItemStore`] - Canonical collection and its filtered, stably sorted [`DerivedView`]
//! - [`RenderCoordinator`] - Drives passes and hands cells to a [`CellRenderer`]
//! - [`OffloadDispatcher`] / [`OffloadWorker`] - Message-passing offload of expensive computations
//!
//! # Example
//!
//! ```rust,ignore
//! let mut coordinator =
//!     RenderCoordinator::new(products(), compute_metrics, CoordinatorConfig::default());
//! coordinator.set_collection(load_products())?;
//! coordinator.set_filter(|p| p.in_stock);
//! let pass = coordinator.render(&mut table)?;
//! ```

mod coordinator;
mod item_store;
mod memo_cache;
mod offload;
mod prefetch;
mod range;
mod viewport;
mod worker;

pub use coordinator::*;
pub use item_store::*;
pub use memo_cache::*;
pub use offload::*;
pub use prefetch::*;
pub use range::*;
pub use viewport::*;
pub use worker::*;
