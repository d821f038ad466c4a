//! Virtualized list rendering with per-item memoized derived values.

pub mod lazy;

mod error;

pub use error::*;
