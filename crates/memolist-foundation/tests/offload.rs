//! Render coordinator driving derived values through an offload dispatcher.

use std::time::Duration;

use memolist_core::ItemDescriptor;
use memolist_foundation::lazy::{
    ComputationKind, ComputeResponse, CoordinatorConfig, CoordinatorPhase, OffloadBinding,
    OffloadDispatcher, PrefetchStrategy, ProgressReporter, RenderCoordinator, WorkerBuilder,
};
use memolist_foundation::ComputeError;
use memolist_testing::{
    product_descriptor, product_fixture, product_metrics, ManualChannel, ManualChannelHandle,
    Product, ProductMetrics, RecordingRenderer, RenderCall,
};

const METRICS: ComputationKind = ComputationKind::new("product-metrics");

type Handle = ManualChannelHandle<u64, Product, ProductMetrics>;

fn config() -> CoordinatorConfig {
    CoordinatorConfig::default()
        .with_item_extent(40.0)
        .with_viewport_extent(120.0)
        .with_overscan(0)
        .with_prefetch(PrefetchStrategy::disabled())
}

fn offloaded(
    count: usize,
) -> (
    RenderCoordinator<Product, impl ItemDescriptor<Product, Key = u64>, ProductMetrics>,
    Handle,
) {
    let channel = ManualChannel::new();
    let handle = channel.handle();
    let mut coordinator = RenderCoordinator::new(product_descriptor(), product_metrics, config());
    coordinator.set_collection(product_fixture(count)).unwrap();
    coordinator.attach_offload(OffloadBinding::new(
        OffloadDispatcher::new(channel),
        METRICS,
        |product: &Product| product.clone(),
    ));
    (coordinator, handle)
}

fn metrics_of(handle: &Handle, n: usize) -> ProductMetrics {
    product_metrics(&handle.submitted()[n].payload).unwrap()
}

#[test]
fn test_misses_are_dispatched_and_rendered_pending() {
    let (mut coordinator, handle) = offloaded(10);
    let mut renderer = RecordingRenderer::new();

    let pass = coordinator.render(&mut renderer).unwrap();
    assert_eq!(pass.pending, 3);
    assert_eq!(handle.submitted_keys(), vec![0, 1, 2]);
    assert!(renderer
        .calls()
        .iter()
        .all(|call| matches!(call, RenderCall::Pending { .. })));
    assert_eq!(coordinator.phase(), CoordinatorPhase::Computing);
    assert_eq!(coordinator.pending_len(), 3);
}

#[test]
fn test_repeated_passes_coalesce_requests() {
    let (mut coordinator, handle) = offloaded(10);
    let mut renderer = RecordingRenderer::new();

    coordinator.render(&mut renderer).unwrap();
    coordinator.render(&mut renderer).unwrap();
    coordinator.render(&mut renderer).unwrap();
    assert_eq!(handle.submitted_len(), 3);
}

#[test]
fn test_out_of_order_results_are_matched_by_identity() {
    let (mut coordinator, handle) = offloaded(10);
    let mut renderer = RecordingRenderer::new();
    coordinator.render(&mut renderer).unwrap();

    handle.complete_all_reversed(|request| product_metrics(&request.payload).unwrap());
    renderer.clear();
    let pass = coordinator.poll_offload(&mut renderer).unwrap().unwrap();

    assert!(pass.is_complete());
    assert_eq!(renderer.rendered_keys(), vec![0, 1, 2]);
    assert_eq!(renderer.calls()[2].value(), Some(&metrics_of(&handle, 2)));
    assert_eq!(coordinator.phase(), CoordinatorPhase::Rendered);
}

#[test]
fn test_result_after_scrolling_away_is_cached_not_rendered() {
    let (mut coordinator, handle) = offloaded(100);
    let mut renderer = RecordingRenderer::new();
    coordinator.render(&mut renderer).unwrap();

    coordinator.scroll_to_item(50).unwrap();
    coordinator.render(&mut renderer).unwrap();
    renderer.clear();

    handle.complete_nth(0, metrics_of(&handle, 0));
    assert!(coordinator.poll_offload(&mut renderer).unwrap().is_none());
    assert!(renderer.calls().is_empty());

    // Scrolling back finds the value ready.
    coordinator.scroll_to_item(0).unwrap();
    coordinator.render(&mut renderer).unwrap();
    assert!(renderer.calls()[0].is_ready());
}

#[test]
fn test_superseded_result_is_dropped() {
    let (mut coordinator, handle) = offloaded(10);
    let mut renderer = RecordingRenderer::new();
    coordinator.render(&mut renderer).unwrap();
    let stale = metrics_of(&handle, 0);

    coordinator.update_item(&0, |p| p.price += 1.0).unwrap();
    coordinator.render(&mut renderer).unwrap();
    assert_eq!(handle.submitted_keys(), vec![0, 1, 2, 0]);

    handle.complete_nth(0, stale);
    assert!(coordinator.poll_offload(&mut renderer).unwrap().is_none());

    handle.complete_nth(3, metrics_of(&handle, 3));
    renderer.clear();
    coordinator.poll_offload(&mut renderer).unwrap().unwrap();
    assert_eq!(renderer.calls()[0].value(), Some(&metrics_of(&handle, 3)));
}

#[test]
fn test_worker_error_renders_placeholder() {
    let (mut coordinator, handle) = offloaded(10);
    let mut renderer = RecordingRenderer::new();
    coordinator.render(&mut renderer).unwrap();

    handle.fail_nth(1, "worker crashed");
    renderer.clear();
    let pass = coordinator.poll_offload(&mut renderer).unwrap().unwrap();

    assert_eq!(pass.failed, 1);
    assert!(matches!(
        &renderer.calls()[1],
        RenderCall::Failed { key: 1, message, .. } if message == "worker crashed"
    ));
}

#[test]
fn test_progress_is_passed_to_pending_cells() {
    let (mut coordinator, handle) = offloaded(10);
    let mut renderer = RecordingRenderer::new();
    coordinator.render(&mut renderer).unwrap();

    let submitted = handle.submitted();
    let request = &submitted[2];
    handle.respond(ComputeResponse::Progress {
        key: request.key,
        fingerprint: request.fingerprint,
        percent: 40.0,
    });
    assert!(coordinator.poll_offload(&mut renderer).unwrap().is_none());

    renderer.clear();
    coordinator.render(&mut renderer).unwrap();
    assert!(matches!(
        renderer.calls()[2],
        RenderCall::Pending { progress: Some(p), .. } if p == 40.0
    ));
}

#[test]
fn test_disconnected_worker_fails_cells() {
    let (mut coordinator, handle) = offloaded(10);
    handle.disconnect();
    let mut renderer = RecordingRenderer::new();

    let pass = coordinator.render(&mut renderer).unwrap();
    assert_eq!(pass.failed, 3);
    assert_eq!(pass.pending, 0);
}

#[test]
fn test_background_worker_end_to_end() {
    let worker = WorkerBuilder::new()
        .name("metrics-test")
        .handler(
            METRICS,
            |product: &Product, progress: &ProgressReporter<'_, u64, ProductMetrics>| {
                progress.report(50.0);
                product_metrics(product)
            },
        )
        .spawn()
        .unwrap();

    let mut coordinator = RenderCoordinator::new(
        product_descriptor(),
        |_: &Product| Err::<ProductMetrics, _>(ComputeError::new("inline compute disabled")),
        config(),
    );
    coordinator.set_collection(product_fixture(50)).unwrap();
    coordinator.attach_offload(OffloadBinding::new(
        OffloadDispatcher::new(worker),
        METRICS,
        |product: &Product| product.clone(),
    ));

    let mut renderer = RecordingRenderer::new();
    coordinator.render(&mut renderer).unwrap();

    let mut attempts = 0;
    while coordinator.phase() != CoordinatorPhase::Rendered && attempts < 50 {
        renderer.clear();
        coordinator
            .wait_offload(&mut renderer, Duration::from_millis(100))
            .unwrap();
        attempts += 1;
    }

    assert_eq!(coordinator.phase(), CoordinatorPhase::Rendered);
    assert_eq!(renderer.rendered_keys(), vec![0, 1, 2]);
    assert!(renderer.calls().iter().all(RenderCall::is_ready));
}
