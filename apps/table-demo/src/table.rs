//! Text rendering of table rows.

use std::rc::Rc;

use memolist_foundation::lazy::CellRenderer;
use memolist_foundation::ComputationFailed;

use crate::metrics::ProductMetrics;
use crate::products::Product;

pub const HEADER: &str = concat!(
    "     # | name           | category    |  price | qty | rating ",
    "|  total value | score    | margin",
);

/// Formats one line per row. Rows are looked up by id in the shared catalogue.
pub struct TableRenderer {
    catalogue: Rc<[Product]>,
}

impl TableRenderer {
    pub fn new(catalogue: Rc<[Product]>) -> Self {
        Self { catalogue }
    }

    fn prefix(&self, index: usize, key: u64) -> String {
        match self.catalogue.get(key as usize) {
            Some(p) => format!(
                "{:>6} | {:<14} | {:<11} | {:>6} | {:>3} | {:>6.1}",
                index, p.name, p.category, p.price, p.quantity, p.rating
            ),
            None => format!("{index:>6} | <unknown product {key}>"),
        }
    }
}

impl CellRenderer<u64, ProductMetrics> for TableRenderer {
    type Element = String;

    fn render(&mut self, index: usize, key: &u64, value: &ProductMetrics, _offset: f64) -> String {
        format!(
            "{} | {:>12.0} | {:>8.2} | {:>5.1}%",
            self.prefix(index, *key),
            value.total_value,
            value.complex_score,
            value.profit_margin
        )
    }

    fn render_failed(
        &mut self,
        index: usize,
        key: &u64,
        error: &ComputationFailed<u64>,
        _offset: f64,
    ) -> String {
        format!("{} | error: {}", self.prefix(index, *key), error.cause)
    }

    fn render_pending(
        &mut self,
        index: usize,
        key: &u64,
        progress: Option<f32>,
        _offset: f64,
    ) -> String {
        match progress {
            Some(percent) => format!("{} | computing {percent:.0}%", self.prefix(index, *key)),
            None => format!("{} | computing", self.prefix(index, *key)),
        }
    }
}
