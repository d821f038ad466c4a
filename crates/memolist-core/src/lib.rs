//! Core primitives for memolist: stable item identities and input
//! fingerprints shared by the store, the derived-value cache and the render
//! coordinator.

pub mod collections;
mod descriptor;
mod fingerprint;

pub use descriptor::{descriptor, FnDescriptor, ItemDescriptor};
pub use fingerprint::{Fingerprint, FingerprintBuilder};
