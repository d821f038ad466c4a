//! Canonical item collection and its filtered/sorted projection.
//!
//! [`ItemStore`] owns the collection as loaded and recomputes a
//! [`DerivedView`] whenever the collection, the filter or the sort changes.
//! The canonical order is never mutated; the view is a list of identities.

use std::cmp::Ordering;
use std::fmt;

use memolist_core::collections::map::HashMap;
use memolist_core::ItemDescriptor;

use crate::error::{OutOfRangeIndex, StoreError};

type FilterFn<T> = Box<dyn Fn(&T) -> bool>;
type SortFn<T> = Box<dyn Fn(&T, &T) -> Ordering>;

/// Ordered identities produced by filtering and sorting the collection.
#[derive(Clone, Debug, PartialEq)]
pub struct DerivedView<K> {
    keys: Vec<K>,
    /// Canonical position of each entry in `keys`.
    positions: Vec<usize>,
    revision: u64,
}

impl<K> DerivedView<K> {
    fn empty() -> Self {
        Self {
            keys: Vec::new(),
            positions: Vec::new(),
            revision: 0,
        }
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    pub fn keys(&self) -> &[K] {
        &self.keys
    }

    /// Resolves a view index to an identity. Never clamps.
    pub fn key_at(&self, index: usize) -> Result<&K, OutOfRangeIndex> {
        self.keys.get(index).ok_or(OutOfRangeIndex {
            index,
            item_count: self.keys.len(),
        })
    }

    /// Revision of the store when this view was derived.
    pub fn revision(&self) -> u64 {
        self.revision
    }
}

impl<K: PartialEq> DerivedView<K> {
    /// Current view index of `key`. Linear in the view length.
    pub fn index_of(&self, key: &K) -> Option<usize> {
        self.keys.iter().position(|k| k == key)
    }
}

/// Sort direction for column-style sorting.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum SortDirection {
    #[default]
    Ascending,
    Descending,
}

impl SortDirection {
    pub fn reversed(self) -> Self {
        match self {
            SortDirection::Ascending => SortDirection::Descending,
            SortDirection::Descending => SortDirection::Ascending,
        }
    }

    fn apply(self, ordering: Ordering) -> Ordering {
        match self {
            SortDirection::Ascending => ordering,
            SortDirection::Descending => ordering.reverse(),
        }
    }
}

/// Active sort column plus direction.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct SortOrder<C> {
    pub column: C,
    pub direction: SortDirection,
}

impl<C: PartialEq + Copy> SortOrder<C> {
    /// Sort order after the user activates `column`.
    ///
    /// Activating the column that is already sorted ascending flips it to
    /// descending; anything else starts ascending.
    pub fn toggle(current: Option<&SortOrder<C>>, column: C) -> SortOrder<C> {
        let direction = match current {
            Some(order)
                if order.column == column && order.direction == SortDirection::Ascending =>
            {
                SortDirection::Descending
            }
            _ => SortDirection::Ascending,
        };
        SortOrder { column, direction }
    }
}

/// Builds a comparator from a field accessor.
///
/// Values that are not comparable with themselves (float NaN) sort after
/// every other value in both directions and keep their relative order among
/// each other. All remaining values must be totally ordered.
pub fn sort_by_key<T, O, F>(field: F, direction: SortDirection) -> impl Fn(&T, &T) -> Ordering
where
    O: PartialOrd,
    F: Fn(&T) -> O,
{
    move |a: &T, b: &T| {
        let (a, b) = (field(a), field(b));
        match a.partial_cmp(&b) {
            Some(ordering) => direction.apply(ordering),
            None => is_unordered(&a).cmp(&is_unordered(&b)),
        }
    }
}

fn is_unordered<O: PartialOrd>(value: &O) -> bool {
    value.partial_cmp(value).is_none()
}

/// Canonical collection plus its derived view.
///
/// # Example
///
/// ```
/// use memolist_core::{descriptor, Fingerprint};
/// use memolist_foundation::lazy::{sort_by_key, ItemStore, SortDirection};
///
/// let mut store = ItemStore::new(descriptor(
///     |n: &(u32, u32)| n.0,
///     |n: &(u32, u32)| Fingerprint::of(&n.1),
/// ));
/// store.set_collection(vec![(1, 30), (2, 10), (3, 20)]).unwrap();
/// store.set_sort(sort_by_key(|n: &(u32, u32)| n.1, SortDirection::Ascending));
/// assert_eq!(store.view().keys(), &[2, 3, 1]);
/// ```
pub struct ItemStore<T, D: ItemDescriptor<T>> {
    descriptor: D,
    items: Vec<T>,
    index_by_key: HashMap<D::Key, usize>,
    filter: Option<FilterFn<T>>,
    sort: Option<SortFn<T>>,
    view: DerivedView<D::Key>,
    revision: u64,
}

impl<T, D: ItemDescriptor<T>> ItemStore<T, D> {
    /// Creates an empty store.
    pub fn new(descriptor: D) -> Self {
        Self {
            descriptor,
            items: Vec::new(),
            index_by_key: HashMap::default(),
            filter: None,
            sort: None,
            view: DerivedView::empty(),
            revision: 0,
        }
    }

    /// Creates a store loaded with `items`.
    pub fn with_items(descriptor: D, items: Vec<T>) -> Result<Self, StoreError<D::Key>> {
        let mut store = Self::new(descriptor);
        store.set_collection(items)?;
        Ok(store)
    }

    pub fn descriptor(&self) -> &D {
        &self.descriptor
    }

    /// Replaces the whole collection, keeping the active filter and sort.
    ///
    /// # Errors
    /// Returns [`StoreError::DuplicateKey`] if two items share an identity;
    /// the store is left unchanged.
    pub fn set_collection(&mut self, items: Vec<T>) -> Result<(), StoreError<D::Key>> {
        let mut index_by_key = HashMap::default();
        index_by_key.reserve(items.len());
        for (position, item) in items.iter().enumerate() {
            let key = self.descriptor.key(item);
            if index_by_key.insert(key.clone(), position).is_some() {
                return Err(StoreError::DuplicateKey(key));
            }
        }
        self.items = items;
        self.index_by_key = index_by_key;
        log::debug!("loaded collection of {} items", self.items.len());
        self.rederive();
        Ok(())
    }

    /// Replaces the item sharing `item`'s identity, returning the old one.
    pub fn replace_item(&mut self, item: T) -> Result<T, StoreError<D::Key>> {
        let key = self.descriptor.key(&item);
        let Some(&position) = self.index_by_key.get(&key) else {
            return Err(StoreError::UnknownKey(key));
        };
        let previous = std::mem::replace(&mut self.items[position], item);
        self.rederive();
        Ok(previous)
    }

    /// Mutates the item with identity `key` in place and re-derives the view.
    ///
    /// # Errors
    /// [`StoreError::UnknownKey`] if no such item exists, and
    /// [`StoreError::IdentityChanged`] if `update` alters the identity. In
    /// both cases the store is left unchanged.
    pub fn update_item(
        &mut self,
        key: &D::Key,
        update: impl FnOnce(&mut T),
    ) -> Result<(), StoreError<D::Key>>
    where
        T: Clone,
    {
        let Some(&position) = self.index_by_key.get(key) else {
            return Err(StoreError::UnknownKey(key.clone()));
        };
        let mut item = self.items[position].clone();
        update(&mut item);
        if self.descriptor.key(&item) != *key {
            return Err(StoreError::IdentityChanged(key.clone()));
        }
        self.items[position] = item;
        self.rederive();
        Ok(())
    }

    pub fn set_filter(&mut self, predicate: impl Fn(&T) -> bool + 'static) {
        self.filter = Some(Box::new(predicate));
        self.rederive();
    }

    pub fn clear_filter(&mut self) {
        if self.filter.take().is_some() {
            self.rederive();
        }
    }

    /// Sets the comparator. It must be a strict weak ordering; ties keep the
    /// canonical order.
    pub fn set_sort(&mut self, comparator: impl Fn(&T, &T) -> Ordering + 'static) {
        self.sort = Some(Box::new(comparator));
        self.rederive();
    }

    pub fn clear_sort(&mut self) {
        if self.sort.take().is_some() {
            self.rederive();
        }
    }

    pub fn view(&self) -> &DerivedView<D::Key> {
        &self.view
    }

    /// Increases every time the derived view is recomputed.
    pub fn revision(&self) -> u64 {
        self.revision
    }

    /// Items in canonical order.
    pub fn items(&self) -> &[T] {
        &self.items
    }

    /// Number of items in the canonical collection.
    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn get(&self, key: &D::Key) -> Option<&T> {
        self.index_by_key.get(key).map(|&position| &self.items[position])
    }

    /// Resolves a view index to its identity and item. Never clamps.
    pub fn entry_at(&self, index: usize) -> Result<(&D::Key, &T), OutOfRangeIndex> {
        let key = self.view.key_at(index)?;
        let position = self.view.positions[index];
        Ok((key, &self.items[position]))
    }

    pub fn item_at(&self, index: usize) -> Result<&T, OutOfRangeIndex> {
        self.entry_at(index).map(|(_, item)| item)
    }

    fn rederive(&mut self) {
        let mut positions: Vec<usize> = match &self.filter {
            Some(filter) => (0..self.items.len())
                .filter(|&position| filter(&self.items[position]))
                .collect(),
            None => (0..self.items.len()).collect(),
        };

        if let Some(sort) = &self.sort {
            // `sort_by` is stable and positions start in canonical order.
            positions.sort_by(|&a, &b| sort(&self.items[a], &self.items[b]));
        }

        let keys = positions
            .iter()
            .map(|&position| self.descriptor.key(&self.items[position]))
            .collect();

        self.revision += 1;
        self.view = DerivedView {
            keys,
            positions,
            revision: self.revision,
        };
        log::trace!(
            "derived view revision {} has {} of {} items",
            self.revision,
            self.view.len(),
            self.items.len()
        );
    }
}

impl<T, D> fmt::Debug for ItemStore<T, D>
where
    D: ItemDescriptor<T>,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ItemStore")
            .field("items", &self.items.len())
            .field("view", &self.view.len())
            .field("filtered", &self.filter.is_some())
            .field("sorted", &self.sort.is_some())
            .field("revision", &self.revision)
            .finish()
    }
}
