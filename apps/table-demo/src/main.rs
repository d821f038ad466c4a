mod cli;
mod full;
mod metrics;
mod products;
mod table;

use std::rc::Rc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use memolist_core::ItemDescriptor;
use memolist_foundation::lazy::{
    CoordinatorPhase, DerivedValueCache, ItemStore, RenderCoordinator, RenderPass, SortOrder,
};
use web_time::Instant;

use cli::{Cli, Mode};
use full::{render_all, FullPass, MetricSource};
use metrics::{calculate_metrics, ProductMetrics};
use products::{comparator, generate_products, product_descriptor, Product, SortColumn};
use table::{TableRenderer, HEADER};

/// Upper bound on waiting for offloaded rows after a scroll step.
const OFFLOAD_SETTLE_TIMEOUT: Duration = Duration::from_secs(5);

fn main() -> Result<()> {
    #[cfg(feature = "logging")]
    let _ = env_logger::try_init();

    let cli = Cli::parse();
    let catalogue: Rc<[Product]> = generate_products(cli.rows, cli.seed).into();
    log::info!("generated {} products with seed {}", catalogue.len(), cli.seed);

    match cli.mode {
        Mode::Virtualized => run_virtualized(&cli, catalogue),
        Mode::Slow => run_full(&cli, catalogue, MetricSource::Recompute),
        Mode::Optimized => {
            run_full(&cli, catalogue, MetricSource::Memoized(DerivedValueCache::new(1)))
        }
    }
}

fn run_virtualized(cli: &Cli, catalogue: Rc<[Product]>) -> Result<()> {
    let mut coordinator =
        RenderCoordinator::new(product_descriptor(), calculate_metrics, cli.coordinator_config());
    coordinator
        .set_collection(catalogue.to_vec())
        .context("loading the product catalogue")?;

    let filter = cli.filter();
    if !filter.is_empty() {
        coordinator.set_filter(move |product| filter.matches(product));
    }
    let mut sort = cli.sort_order();
    if let Some(order) = sort {
        coordinator.set_sort(comparator(order));
    }
    if cli.offload {
        let worker = metrics::spawn_worker().context("starting the metrics worker")?;
        coordinator.attach_offload(metrics::offload_binding(worker));
    }

    let mut renderer = TableRenderer::new(Rc::clone(&catalogue));
    println!(
        "{} products, {} after filtering",
        catalogue.len(),
        coordinator.view().len()
    );

    let first = settle(&mut coordinator, &mut renderer)?;
    print_pass(&first);

    let step = cli.viewport / 2.0;
    for _ in 0..cli.scroll_steps {
        if coordinator.scroll_by(step) == 0.0 {
            log::info!("reached the end of the table");
            break;
        }
        settle(&mut coordinator, &mut renderer)?;
    }

    // Clicking the sorted column header again flips the direction.
    if let Some(order) = flipped(sort.as_ref()) {
        log::info!("sorting by {} {:?}", order.column, order.direction);
        coordinator.set_sort(comparator(order));
        sort = Some(order);
    }
    coordinator.scroll_to(0.0);
    let last = settle(&mut coordinator, &mut renderer)?;
    print_pass(&last);

    let stats = coordinator.cache().stats();
    print_sort(sort);
    println!(
        "{} passes, {} metric computations for {} rows, cache hit rate {:.1}%, {} evictions",
        coordinator.generation(),
        stats.computations,
        coordinator.view().len(),
        stats.hit_rate() * 100.0,
        stats.evictions
    );
    Ok(())
}

/// Renders the whole filtered view on every pass, the way a table without
/// virtualization does. Scrolling re-renders nothing since every row is
/// already materialized; only the sort change triggers a second pass.
fn run_full(cli: &Cli, catalogue: Rc<[Product]>, mut source: MetricSource) -> Result<()> {
    let mut store = ItemStore::with_items(product_descriptor(), catalogue.to_vec())
        .context("loading the product catalogue")?;
    let filter = cli.filter();
    if !filter.is_empty() {
        store.set_filter(move |product| filter.matches(product));
    }
    let mut sort = cli.sort_order();
    if let Some(order) = sort {
        store.set_sort(comparator(order));
    }

    let mut renderer = TableRenderer::new(Rc::clone(&catalogue));
    println!("{} products, {} after filtering", catalogue.len(), store.view().len());

    let page = (cli.viewport / cli.row_height).ceil().max(0.0) as usize;
    let first = render_all(&store, &mut source, &mut renderer, cli.row_height);
    log_full_pass(1, &first, cli.mode);
    print_full_pass(&first, page);

    let mut passes = vec![first];
    if let Some(order) = flipped(sort.as_ref()) {
        log::info!("sorting by {} {:?}", order.column, order.direction);
        store.set_sort(comparator(order));
        sort = Some(order);
        let resorted = render_all(&store, &mut source, &mut renderer, cli.row_height);
        log_full_pass(2, &resorted, cli.mode);
        print_full_pass(&resorted, page);
        passes.push(resorted);
    }

    print_sort(sort);
    let total: Duration = passes.iter().map(|pass| pass.duration).sum();
    println!(
        "{} passes, {} metric computations for {} rows, {} rows rendered, {:?} in total",
        passes.len(),
        passes.iter().map(|pass| pass.computations).sum::<u64>(),
        store.view().len(),
        passes.iter().map(|pass| pass.lines.len()).sum::<usize>(),
        total
    );
    Ok(())
}

fn flipped(sort: Option<&SortOrder<SortColumn>>) -> Option<SortOrder<SortColumn>> {
    sort.map(|order| SortOrder::toggle(Some(order), order.column))
}

/// Renders if needed and, with a worker attached, waits until the window is
/// fully computed.
fn settle<D>(
    coordinator: &mut RenderCoordinator<Product, D, ProductMetrics>,
    renderer: &mut TableRenderer,
) -> Result<RenderPass<u64, String>>
where
    D: ItemDescriptor<Product, Key = u64>,
{
    let mut pass = coordinator.render(renderer)?;
    log_pass(&pass, coordinator.view().len());

    let deadline = Instant::now() + OFFLOAD_SETTLE_TIMEOUT;
    while coordinator.phase() == CoordinatorPhase::Computing {
        let remaining = deadline.saturating_duration_since(Instant::now());
        if remaining.is_zero() {
            log::warn!("{} rows still computing after {:?}", pass.pending, OFFLOAD_SETTLE_TIMEOUT);
            break;
        }
        if let Some(next) = coordinator.wait_offload(renderer, remaining)? {
            log_pass(&next, coordinator.view().len());
            pass = next;
        }
    }
    Ok(pass)
}

fn log_pass(pass: &RenderPass<u64, String>, view_len: usize) {
    let range = pass.window.range();
    log::info!(
        "pass {}: rows {}..{} of {} ({} rendered, {} pending, {} failed), \
         {} hits / {} misses, {} prefetched, {:?}",
        pass.generation,
        range.start,
        range.end,
        view_len,
        pass.rendered,
        pass.pending,
        pass.failed,
        pass.cache.hits,
        pass.cache.misses,
        pass.prefetched,
        pass.duration
    );
}

fn log_full_pass(generation: usize, pass: &FullPass, mode: Mode) {
    log::info!(
        "{:?} pass {}: {} rows rendered ({} failed), {} metric computations, {:?}",
        mode,
        generation,
        pass.lines.len(),
        pass.failed,
        pass.computations,
        pass.duration
    );
}

fn print_pass(pass: &RenderPass<u64, String>) {
    println!("{HEADER}");
    for line in pass.elements() {
        println!("{line}");
    }
    println!(
        "-- {} of {} rows materialized --",
        pass.cells.len(),
        pass.window.item_count()
    );
}

/// Prints the first `page` rows; the rest were rendered but are off-screen.
fn print_full_pass(pass: &FullPass, page: usize) {
    println!("{HEADER}");
    for line in pass.lines.iter().take(page) {
        println!("{line}");
    }
    let rows = pass.lines.len();
    println!("-- {rows} of {rows} rows materialized --");
}

fn print_sort(sort: Option<SortOrder<SortColumn>>) {
    println!(
        "sort: {}",
        sort.map_or("none".to_string(), |order| format!("{} {:?}", order.column, order.direction))
    );
}
