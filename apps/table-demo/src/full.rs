//! Whole-table rendering without virtualization, kept for comparison with
//! the coordinator.

use std::time::Duration;

use memolist_core::ItemDescriptor;
use memolist_foundation::lazy::{CellRenderer, DerivedValueCache, ItemStore};
use memolist_foundation::ComputationFailed;
use web_time::Instant;

use crate::metrics::{calculate_metrics, ProductMetrics};
use crate::products::Product;
use crate::table::TableRenderer;

/// Where a full pass gets its row metrics from.
pub enum MetricSource {
    /// Recomputed for every row on every pass.
    Recompute,
    /// Memoized across passes, sized to hold the whole view.
    Memoized(DerivedValueCache<u64, ProductMetrics>),
}

#[derive(Debug)]
pub struct FullPass {
    /// One line per row of the view.
    pub lines: Vec<String>,
    pub computations: u64,
    pub failed: usize,
    pub duration: Duration,
}

/// Renders every row of the current view.
pub fn render_all<D>(
    store: &ItemStore<Product, D>,
    source: &mut MetricSource,
    renderer: &mut TableRenderer,
    row_height: f32,
) -> FullPass
where
    D: ItemDescriptor<Product, Key = u64>,
{
    let started = Instant::now();
    let view = store.view();
    if let MetricSource::Memoized(cache) = source {
        cache.set_capacity(view.len());
    }
    let cached_before = match source {
        MetricSource::Memoized(cache) => Some(cache.stats()),
        MetricSource::Recompute => None,
    };

    let mut recomputed = 0;
    let mut failed = 0;
    let mut lines = Vec::with_capacity(view.len());
    for (index, key) in view.keys().iter().enumerate() {
        let Some(product) = store.get(key) else {
            continue;
        };
        let offset = index as f64 * f64::from(row_height);
        let metrics = match source {
            MetricSource::Recompute => {
                recomputed += 1;
                calculate_metrics(product)
                    .map_err(|cause| ComputationFailed { key: *key, cause })
            }
            MetricSource::Memoized(cache) => {
                cache.get(store.descriptor(), product, calculate_metrics)
            }
        };
        lines.push(match metrics {
            Ok(metrics) => renderer.render(index, key, &metrics, offset),
            Err(error) => {
                failed += 1;
                renderer.render_failed(index, key, &error, offset)
            }
        });
    }

    let computations = match (source, cached_before) {
        (MetricSource::Memoized(cache), Some(before)) => {
            let delta = cache.stats().since(&before);
            delta.computations + delta.failures
        }
        _ => recomputed,
    };
    FullPass {
        lines,
        computations,
        failed,
        duration: started.elapsed(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::products::{generate_products, product_descriptor};
    use std::rc::Rc;

    type Catalogue = Rc<[Product]>;

    fn store(
        rows: usize,
    ) -> (ItemStore<Product, impl ItemDescriptor<Product, Key = u64>>, Catalogue) {
        let catalogue: Rc<[Product]> = generate_products(rows, 7).into();
        let store = ItemStore::with_items(product_descriptor(), catalogue.to_vec()).unwrap();
        (store, catalogue)
    }

    #[test]
    fn test_recompute_computes_every_row_each_pass() {
        let (store, catalogue) = store(50);
        let mut renderer = TableRenderer::new(catalogue);
        let mut source = MetricSource::Recompute;

        let first = render_all(&store, &mut source, &mut renderer, 40.0);
        let second = render_all(&store, &mut source, &mut renderer, 40.0);
        assert_eq!(first.lines.len(), 50);
        assert_eq!(first.computations, 50);
        assert_eq!(second.computations, 50);
        assert_eq!(first.lines, second.lines);
    }

    #[test]
    fn test_memoized_computes_each_row_once() {
        let (mut store, catalogue) = store(50);
        let mut renderer = TableRenderer::new(catalogue);
        let mut source = MetricSource::Memoized(DerivedValueCache::new(1));

        let first = render_all(&store, &mut source, &mut renderer, 40.0);
        let second = render_all(&store, &mut source, &mut renderer, 40.0);
        assert_eq!(first.computations, 50);
        assert_eq!(second.computations, 0);

        // Reordering rows reuses every memoized value.
        store.set_sort(|a: &Product, b: &Product| b.id.cmp(&a.id));
        let reversed = render_all(&store, &mut source, &mut renderer, 40.0);
        assert_eq!(reversed.computations, 0);
        assert_eq!(reversed.lines.len(), 50);
    }
}
