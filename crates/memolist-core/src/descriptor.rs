//! Item descriptor trait for windowed collections.
//!
//! This module defines the [`ItemDescriptor`] trait which tells the store and
//! the derived-value cache how to identify an item and which of its fields
//! feed memoized computations.

use std::fmt::Debug;
use std::hash::Hash;
use std::marker::PhantomData;

use crate::Fingerprint;

/// Describes how items of type `T` are keyed and fingerprinted.
///
/// Implementations should be pure: the same item must always produce the same
/// key and the same fingerprint.
pub trait ItemDescriptor<T> {
    /// Stable identity type.
    type Key: Clone + Eq + Hash + Debug;

    /// Returns the identity of `item`.
    ///
    /// Identities are used to:
    /// - Key memoized values in the derived-value cache
    /// - Key rendered cells so they survive sorting and filtering
    /// - Coalesce offloaded computations
    ///
    /// The positional index of an item must never be used here, since it
    /// changes whenever the derived view is filtered or sorted.
    fn key(&self, item: &T) -> Self::Key;

    /// Returns the fingerprint of the fields that influence derived values.
    ///
    /// Fields that do not affect the computation must be left out so that
    /// unrelated edits keep cached values alive.
    fn fingerprint(&self, item: &T) -> Fingerprint;
}

/// [`ItemDescriptor`] assembled from two closures.
pub struct FnDescriptor<T, K, KF, FF> {
    key_fn: KF,
    fingerprint_fn: FF,
    _marker: PhantomData<fn(&T) -> K>,
}

impl<T, K, KF, FF> FnDescriptor<T, K, KF, FF>
where
    KF: Fn(&T) -> K,
    FF: Fn(&T) -> Fingerprint,
{
    pub fn new(key_fn: KF, fingerprint_fn: FF) -> Self {
        Self {
            key_fn,
            fingerprint_fn,
            _marker: PhantomData,
        }
    }
}

impl<T, K, KF, FF> ItemDescriptor<T> for FnDescriptor<T, K, KF, FF>
where
    K: Clone + Eq + Hash + Debug,
    KF: Fn(&T) -> K,
    FF: Fn(&T) -> Fingerprint,
{
    type Key = K;

    fn key(&self, item: &T) -> K {
        (self.key_fn)(item)
    }

    fn fingerprint(&self, item: &T) -> Fingerprint {
        (self.fingerprint_fn)(item)
    }
}

/// Shorthand for [`FnDescriptor::new`].
///
/// ```
/// use memolist_core::{descriptor, Fingerprint, ItemDescriptor};
///
/// struct Row { id: u64, price: u32, label: String }
///
/// let rows = descriptor(|r: &Row| r.id, |r: &Row| Fingerprint::of(&r.price));
/// let row = Row { id: 7, price: 120, label: "Item 7".into() };
/// assert_eq!(rows.key(&row), 7);
/// # let _ = row.label;
/// ```
pub fn descriptor<T, K, KF, FF>(key_fn: KF, fingerprint_fn: FF) -> FnDescriptor<T, K, KF, FF>
where
    KF: Fn(&T) -> K,
    FF: Fn(&T) -> Fingerprint,
{
    FnDescriptor::new(key_fn, fingerprint_fn)
}
