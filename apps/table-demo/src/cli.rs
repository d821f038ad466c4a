use clap::{Parser, ValueEnum};
use memolist_foundation::lazy::{CoordinatorConfig, PrefetchStrategy, SortDirection, SortOrder};

use crate::products::{Category, ProductFilter, SortColumn};

/// How the table is rendered.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, ValueEnum)]
pub enum Mode {
    /// Every row rendered, metrics recomputed on each pass.
    Slow,
    /// Every row rendered, metrics memoized.
    Optimized,
    /// Only the rows around the viewport, through the render coordinator.
    #[default]
    Virtualized,
}

/// Renders a large product table through a windowed, memoizing coordinator
/// and reports how little of it is ever computed.
#[derive(Debug, Clone, Parser)]
#[command(name = "table-demo", version)]
pub struct Cli {
    #[arg(long, value_enum, default_value_t = Mode::Virtualized)]
    pub mode: Mode,

    /// Number of generated products.
    #[arg(long, default_value_t = 10_000)]
    pub rows: usize,

    /// Visible height of the table.
    #[arg(long, default_value_t = 400.0)]
    pub viewport: f32,

    #[arg(long = "row-height", default_value_t = 40.0)]
    pub row_height: f32,

    /// Rows rendered beyond each visible edge.
    #[arg(long, default_value_t = 2)]
    pub overscan: usize,

    /// Number of memoized row metrics kept alive.
    #[arg(long = "cache-capacity", default_value_t = 256)]
    pub cache_capacity: usize,

    /// Rows prefetched past the window in the scroll direction (0 disables).
    #[arg(long, default_value_t = 2)]
    pub prefetch: usize,

    #[arg(long, value_enum)]
    pub category: Option<Category>,

    #[arg(long = "min-price")]
    pub min_price: Option<u32>,

    #[arg(long = "max-price")]
    pub max_price: Option<u32>,

    /// Hide products that are out of stock.
    #[arg(long = "in-stock")]
    pub in_stock: bool,

    #[arg(long, value_enum)]
    pub sort: Option<SortColumn>,

    /// Sort descending instead of ascending.
    #[arg(long, requires = "sort")]
    pub desc: bool,

    /// Compute row metrics on a background worker thread.
    #[arg(long)]
    pub offload: bool,

    /// Seed for the generated catalogue.
    #[arg(long, default_value_t = 42)]
    pub seed: u64,

    /// Number of simulated scroll steps, each half a viewport long.
    #[arg(long = "scroll-steps", default_value_t = 20)]
    pub scroll_steps: usize,
}

impl Cli {
    pub fn coordinator_config(&self) -> CoordinatorConfig {
        let prefetch = if self.prefetch == 0 {
            PrefetchStrategy::disabled()
        } else {
            PrefetchStrategy::new(self.prefetch)
        };
        CoordinatorConfig::default()
            .with_cache_capacity(self.cache_capacity)
            .with_overscan(self.overscan)
            .with_item_extent(self.row_height)
            .with_viewport_extent(self.viewport)
            .with_prefetch(prefetch)
    }

    pub fn filter(&self) -> ProductFilter {
        ProductFilter {
            category: self.category,
            min_price: self.min_price,
            max_price: self.max_price,
            in_stock_only: self.in_stock,
        }
    }

    pub fn sort_order(&self) -> Option<SortOrder<SortColumn>> {
        self.sort.map(|column| SortOrder {
            column,
            direction: if self.desc {
                SortDirection::Descending
            } else {
                SortDirection::Ascending
            },
        })
    }
}
