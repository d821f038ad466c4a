//! Generated product catalogue, its filters and its sortable columns.

use std::fmt;

use clap::ValueEnum;
use memolist_core::{descriptor, Fingerprint, ItemDescriptor};
use memolist_foundation::lazy::{sort_by_key, SortDirection, SortOrder};
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, ValueEnum)]
pub enum Category {
    Electronics,
    Books,
    Clothing,
    Home,
    Sports,
}

impl Category {
    pub const ALL: [Category; 5] = [
        Category::Electronics,
        Category::Books,
        Category::Clothing,
        Category::Home,
        Category::Sports,
    ];
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Category::Electronics => "Electronics",
            Category::Books => "Books",
            Category::Clothing => "Clothing",
            Category::Home => "Home",
            Category::Sports => "Sports",
        })
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Product {
    pub id: u64,
    pub name: String,
    pub category: Category,
    pub price: u32,
    pub quantity: u32,
    /// Rounded to one decimal.
    pub rating: f32,
    pub in_stock: bool,
    pub discount: u32,
}

/// Generates `rows` products. The same seed always yields the same catalogue.
pub fn generate_products(rows: usize, seed: u64) -> Vec<Product> {
    let mut rng = SmallRng::seed_from_u64(seed);
    (0..rows)
        .map(|index| Product {
            id: index as u64,
            name: format!("Product {index}"),
            category: Category::ALL[index % Category::ALL.len()],
            price: rng.random_range(10..1010),
            quantity: rng.random_range(1..101),
            rating: (rng.random_range(0.0f32..5.0) * 10.0).round() / 10.0,
            in_stock: rng.random_bool(0.8),
            discount: rng.random_range(0..50),
        })
        .collect()
}

/// Identity is the id; the fingerprint covers every field the metrics read.
pub fn product_descriptor() -> impl ItemDescriptor<Product, Key = u64> {
    descriptor(
        |p: &Product| p.id,
        |p: &Product| {
            Fingerprint::builder()
                .field(&p.price)
                .field(&p.quantity)
                .f32(p.rating)
                .finish()
        },
    )
}

/// Row filters; every set bound must hold.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ProductFilter {
    pub category: Option<Category>,
    pub min_price: Option<u32>,
    pub max_price: Option<u32>,
    pub in_stock_only: bool,
}

impl ProductFilter {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    pub fn matches(&self, product: &Product) -> bool {
        self.category.is_none_or(|category| product.category == category)
            && self.min_price.is_none_or(|min| product.price >= min)
            && self.max_price.is_none_or(|max| product.price <= max)
            && (!self.in_stock_only || product.in_stock)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, ValueEnum)]
pub enum SortColumn {
    Name,
    Category,
    Price,
    Quantity,
    Rating,
    Discount,
}

impl fmt::Display for SortColumn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            SortColumn::Name => "name",
            SortColumn::Category => "category",
            SortColumn::Price => "price",
            SortColumn::Quantity => "quantity",
            SortColumn::Rating => "rating",
            SortColumn::Discount => "discount",
        })
    }
}

/// Comparator for `order`, as produced by clicking a column header.
pub fn comparator(
    order: SortOrder<SortColumn>,
) -> Box<dyn Fn(&Product, &Product) -> std::cmp::Ordering> {
    let direction: SortDirection = order.direction;
    match order.column {
        SortColumn::Name => Box::new(sort_by_key(|p: &Product| p.name.clone(), direction)),
        SortColumn::Category => Box::new(sort_by_key(|p: &Product| p.category, direction)),
        SortColumn::Price => Box::new(sort_by_key(|p: &Product| p.price, direction)),
        SortColumn::Quantity => Box::new(sort_by_key(|p: &Product| p.quantity, direction)),
        SortColumn::Rating => Box::new(sort_by_key(|p: &Product| p.rating, direction)),
        SortColumn::Discount => Box::new(sort_by_key(|p: &Product| p.discount, direction)),
    }
}
