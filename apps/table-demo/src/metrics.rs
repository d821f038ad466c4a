//! The expensive per-row computation and its offload worker.

use memolist_foundation::lazy::{
    ComputationKind, OffloadBinding, OffloadDispatcher, OffloadWorker, ProgressReporter,
    WorkerBuilder,
};
use memolist_foundation::{ComputeError, OffloadError};

use crate::products::Product;

pub const METRICS: ComputationKind = ComputationKind::new("complex-metrics");

const SCORE_ITERATIONS: u32 = 1000;

/// Figures shown in the derived table columns.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ProductMetrics {
    pub total_value: f64,
    pub complex_score: f64,
    pub profit_margin: f64,
    pub efficiency: f64,
}

/// The product fields the metrics depend on. Sent to the worker instead of
/// the whole row.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct MetricInputs {
    pub price: u32,
    pub quantity: u32,
    pub rating: f32,
}

impl From<&Product> for MetricInputs {
    fn from(product: &Product) -> Self {
        Self {
            price: product.price,
            quantity: product.quantity,
            rating: product.rating,
        }
    }
}

pub fn calculate_metrics(product: &Product) -> Result<ProductMetrics, ComputeError> {
    calculate(&MetricInputs::from(product), |_| {})
}

/// Computes the metrics, calling `progress` with a percentage every 250
/// iterations.
pub fn calculate(
    inputs: &MetricInputs,
    progress: impl Fn(f32),
) -> Result<ProductMetrics, ComputeError> {
    if inputs.price == 0 {
        return Err(ComputeError::new("price must be positive"));
    }
    let price = f64::from(inputs.price);
    let quantity = f64::from(inputs.quantity);

    let mut score = 0.0;
    for i in 0..SCORE_ITERATIONS {
        score += (price * quantity * f64::from(i + 1)).sqrt();
        if (i + 1) % 250 == 0 {
            progress((i + 1) as f32 / SCORE_ITERATIONS as f32 * 100.0);
        }
    }

    Ok(ProductMetrics {
        total_value: price * quantity,
        complex_score: score / f64::from(SCORE_ITERATIONS),
        profit_margin: (price - price * 0.7) / price * 100.0,
        efficiency: f64::from(inputs.rating) * quantity / price,
    })
}

pub type MetricsWorker = OffloadWorker<u64, MetricInputs, ProductMetrics>;

pub fn spawn_worker() -> Result<MetricsWorker, OffloadError> {
    WorkerBuilder::new()
        .name("table-demo-metrics")
        .handler(
            METRICS,
            |inputs: &MetricInputs, reporter: &ProgressReporter<'_, u64, ProductMetrics>| {
                calculate(inputs, |percent| reporter.report(percent))
            },
        )
        .spawn()
}

pub fn offload_binding(
    worker: MetricsWorker,
) -> OffloadBinding<Product, u64, MetricInputs, ProductMetrics, MetricsWorker> {
    OffloadBinding::new(OffloadDispatcher::new(worker), METRICS, |product: &Product| {
        MetricInputs::from(product)
    })
}
