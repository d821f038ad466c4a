//! Hash map aliases shared across the workspace.
//!
//! Identities are usually small integers or short strings, so the Fx hasher is
//! used by default. Enable the `std-hash` feature to fall back to SipHash when
//! identities come from untrusted input.

#[cfg(feature = "std-hash")]
pub mod map {
    pub use std::collections::hash_map::Entry;
    pub use std::collections::{HashMap, HashSet};

    pub type BuildHasher = std::collections::hash_map::RandomState;
}

#[cfg(not(feature = "std-hash"))]
pub mod map {
    pub use rustc_hash::{FxHashMap as HashMap, FxHashSet as HashSet};
    pub use std::collections::hash_map::Entry;

    pub type BuildHasher = rustc_hash::FxBuildHasher;
}
