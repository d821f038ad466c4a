use memolist_core::{descriptor, Fingerprint, ItemDescriptor};
use memolist_foundation::ComputeError;

pub const CATEGORIES: [&str; 5] = ["Electronics", "Books", "Clothing", "Home", "Sports"];

/// Product row used across tests.
#[derive(Clone, Debug, PartialEq)]
pub struct Product {
    pub id: u64,
    pub name: String,
    pub category: &'static str,
    pub price: f64,
    pub quantity: u32,
    pub in_stock: bool,
}

/// Per-row figures derived from a [`Product`].
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ProductMetrics {
    pub total_value: f64,
    pub score: f64,
}

/// `count` products with deterministic contents.
///
/// Categories cycle through [`CATEGORIES`], every fifth product is out of
/// stock, and prices repeat every 7 items so that sorting by price produces
/// ties.
pub fn product_fixture(count: usize) -> Vec<Product> {
    (0..count)
        .map(|i| Product {
            id: i as u64,
            name: format!("Product {i}"),
            category: CATEGORIES[i % CATEGORIES.len()],
            price: 10.0 + (i % 7) as f64 * 25.0,
            quantity: 1 + (i % 13) as u32,
            in_stock: i % 5 != 4,
        })
        .collect()
}

/// Identity is the id; only price and quantity feed the metrics.
pub fn product_descriptor() -> impl ItemDescriptor<Product, Key = u64> {
    descriptor(
        |p: &Product| p.id,
        |p: &Product| {
            Fingerprint::builder()
                .f64(p.price)
                .field(&p.quantity)
                .finish()
        },
    )
}

/// Metrics for `product`. Products priced at zero are rejected.
pub fn product_metrics(product: &Product) -> Result<ProductMetrics, ComputeError> {
    if product.price <= 0.0 {
        return Err(ComputeError::new(format!("{} has no price", product.name)));
    }
    let total_value = product.price * f64::from(product.quantity);
    Ok(ProductMetrics {
        total_value,
        score: total_value.sqrt(),
    })
}
