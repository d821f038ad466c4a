//! Property-based invariant tests for the range calculator, the item store
//! and the derived-value cache.
//!
//! 1. Window indices stay within `[0, item_count)` and are contiguous.
//! 2. Window size is bounded by the viewport plus overscan.
//! 3. `compute_range` is deterministic.
//! 4. The visible range lies inside the rendered range and is empty only
//!    for a zero-extent viewport.
//! 5. Slot offsets are `index * item_extent`.
//! 6. Filtering keeps canonical relative order.
//! 7. Sorting is stable and repeatable; float NaN keys sort last.
//! 8. Unchanged inputs are computed at most once while they fit the cache.

use std::cell::Cell;
use std::rc::Rc;

use memolist_core::{descriptor, Fingerprint};
use memolist_foundation::lazy::{
    compute_range, sort_by_key, DerivedValueCache, ItemStore, SortDirection, ViewportState,
};
use memolist_foundation::ComputeError;
use proptest::prelude::*;

// ── Helpers ─────────────────────────────────────────────────────────────

fn viewport_strategy() -> impl Strategy<Value = ViewportState> {
    (0.0f64..100_000.0, 0.0f32..2_000.0, 1.0f32..200.0, 0usize..=10).prop_map(
        |(scroll_offset, viewport_extent, item_extent, overscan)| {
            ViewportState::new(viewport_extent, item_extent)
                .with_scroll_offset(scroll_offset)
                .with_overscan(overscan)
        },
    )
}

fn rows_strategy() -> impl Strategy<Value = Vec<(u32, u8)>> {
    proptest::collection::vec(0u8..8, 0..200).prop_map(|groups| {
        groups
            .into_iter()
            .enumerate()
            .map(|(id, group)| (id as u32, group))
            .collect()
    })
}

fn row_store(
    rows: Vec<(u32, u8)>,
) -> ItemStore<(u32, u8), impl memolist_core::ItemDescriptor<(u32, u8), Key = u32>> {
    ItemStore::with_items(
        descriptor(|r: &(u32, u8)| r.0, |r: &(u32, u8)| Fingerprint::of(&r.1)),
        rows,
    )
    .unwrap()
}

// ═════════════════════════════════════════════════════════════════════════
// Range calculator
// ═════════════════════════════════════════════════════════════════════════

proptest! {
    #[test]
    fn window_indices_are_in_bounds_and_contiguous(
        viewport in viewport_strategy(),
        item_count in 0usize..5_000,
    ) {
        let window = compute_range(&viewport, item_count).unwrap();
        let indices: Vec<usize> = window.indices().collect();

        prop_assert!(indices.iter().all(|&index| index < item_count));
        prop_assert!(indices.windows(2).all(|pair| pair[1] == pair[0] + 1));
        let nothing_to_show =
            viewport.viewport_extent == 0.0 && viewport.overscan_count == 0;
        prop_assert_eq!(indices.is_empty(), item_count == 0 || nothing_to_show);
    }

    #[test]
    fn window_size_is_bounded(
        viewport in viewport_strategy(),
        item_count in 0usize..5_000,
    ) {
        let window = compute_range(&viewport, item_count).unwrap();
        let bound = viewport.viewport_extent / viewport.item_extent
            + 2.0 * viewport.overscan_count as f32
            + 2.0;
        prop_assert!(window.len() as f32 <= bound, "{} > {}", window.len(), bound);
    }

    #[test]
    fn compute_range_is_deterministic(
        viewport in viewport_strategy(),
        item_count in 0usize..5_000,
    ) {
        let first = compute_range(&viewport, item_count).unwrap();
        let second = compute_range(&viewport, item_count).unwrap();
        prop_assert_eq!(first, second);
    }

    #[test]
    fn visible_range_is_inside_window(
        viewport in viewport_strategy(),
        item_count in 1usize..5_000,
    ) {
        let window = compute_range(&viewport, item_count).unwrap();
        let visible = window.visible_range();
        prop_assert_eq!(visible.is_empty(), viewport.viewport_extent == 0.0);
        if !visible.is_empty() {
            let range = window.range();
            prop_assert!(range.start <= visible.start);
            prop_assert!(visible.end <= range.end);
        }
    }

    #[test]
    fn slot_offsets_follow_item_extent(
        viewport in viewport_strategy(),
        item_count in 0usize..5_000,
    ) {
        let window = compute_range(&viewport, item_count).unwrap();
        for slot in &window {
            prop_assert_eq!(slot.offset, slot.index as f64 * f64::from(viewport.item_extent));
        }
    }
}

// ═════════════════════════════════════════════════════════════════════════
// Item store
// ═════════════════════════════════════════════════════════════════════════

proptest! {
    #[test]
    fn filter_keeps_canonical_order(rows in rows_strategy(), keep in 0u8..8) {
        let mut store = row_store(rows.clone());
        store.set_filter(move |r| r.1 <= keep);

        let expected: Vec<u32> = rows.iter().filter(|r| r.1 <= keep).map(|r| r.0).collect();
        prop_assert_eq!(store.view().keys(), expected.as_slice());
    }

    #[test]
    fn sort_is_stable_and_repeatable(rows in rows_strategy(), descending in any::<bool>()) {
        let direction = if descending {
            SortDirection::Descending
        } else {
            SortDirection::Ascending
        };
        let mut store = row_store(rows.clone());
        store.set_sort(sort_by_key(|r: &(u32, u8)| r.1, direction));
        let first = store.view().keys().to_vec();

        // Equal groups keep ascending identity, i.e. canonical order.
        for pair in first.windows(2) {
            let (a, b) = (rows[pair[0] as usize], rows[pair[1] as usize]);
            if a.1 == b.1 {
                prop_assert!(a.0 < b.0);
            } else if descending {
                prop_assert!(a.1 > b.1);
            } else {
                prop_assert!(a.1 < b.1);
            }
        }

        store.set_sort(sort_by_key(|r: &(u32, u8)| r.1, direction));
        prop_assert_eq!(store.view().keys(), first.as_slice());
    }

    #[test]
    fn float_sort_orders_numbers_and_puts_nan_last(
        values in proptest::collection::vec(
            prop_oneof![Just(f32::NAN), -1_000.0f32..1_000.0],
            0..300,
        ),
    ) {
        let rows: Vec<(u32, f32)> =
            values.iter().enumerate().map(|(id, value)| (id as u32, *value)).collect();
        let mut store = ItemStore::with_items(
            descriptor(
                |r: &(u32, f32)| r.0,
                |r: &(u32, f32)| Fingerprint::builder().f32(r.1).finish(),
            ),
            rows.clone(),
        )
        .unwrap();
        store.set_sort(sort_by_key(|r: &(u32, f32)| r.1, SortDirection::Ascending));

        let sorted: Vec<f32> = store.view().keys().iter().map(|&id| rows[id as usize].1).collect();
        let numbers = sorted.iter().take_while(|v| !v.is_nan()).count();
        prop_assert!(sorted[numbers..].iter().all(|v| v.is_nan()));
        prop_assert!(sorted[..numbers].windows(2).all(|pair| pair[0] <= pair[1]));
    }
}

// ═════════════════════════════════════════════════════════════════════════
// Derived-value cache
// ═════════════════════════════════════════════════════════════════════════

proptest! {
    #[test]
    fn unchanged_inputs_compute_once(
        accesses in proptest::collection::vec(0u32..32, 1..200),
    ) {
        let calls = Rc::new(Cell::new(0usize));
        let mut cache = DerivedValueCache::new(32);

        for key in &accesses {
            let counter = calls.clone();
            let value = cache
                .get_with(key, Fingerprint::of(key), || {
                    counter.set(counter.get() + 1);
                    Ok::<_, ComputeError>(key * 2)
                })
                .unwrap();
            prop_assert_eq!(value, key * 2);
        }

        let mut distinct = accesses.clone();
        distinct.sort_unstable();
        distinct.dedup();
        prop_assert_eq!(calls.get(), distinct.len());
    }

    #[test]
    fn cache_never_exceeds_capacity(
        capacity in 1usize..16,
        accesses in proptest::collection::vec(0u32..64, 1..200),
    ) {
        let mut cache = DerivedValueCache::new(capacity);
        for key in &accesses {
            cache
                .get_with(key, Fingerprint::of(key), || Ok::<_, ComputeError>(*key))
                .unwrap();
            prop_assert!(cache.len() <= capacity);
        }
    }
}
