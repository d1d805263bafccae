//! Catalog normalization: feed fetching, parsing, cross-market merging and
//! price comparison.

pub mod client;
pub mod merge;
pub mod models;
pub mod parser;

use crate::config::FeedConfig;
use serde::Serialize;
use std::collections::BTreeSet;
use thiserror::Error;
use tracing::{info, warn};

pub use client::{FeedClient, FeedSource};
pub use merge::merge;
pub use models::{BestPrice, MarketPrice, Product, DEFAULT_CATEGORY};
pub use parser::parse_feed;

/// Category sentinel that matches every product.
pub const ALL_CATEGORIES: &str = "All";

/// Errors raised while loading the catalog.
#[derive(Debug, Error)]
pub enum CatalogError {
    /// Network, status or decoding failure for one feed.
    #[error("Failed to load {market} price file: {reason}")]
    FeedFetch { market: String, reason: String },
}

/// Outcome of loading all configured feeds.
#[derive(Debug, Default)]
pub struct LoadReport {
    /// Markets that loaded, with the number of products each contributed
    pub loaded: Vec<(String, usize)>,
    /// Feeds that failed to load
    pub failures: Vec<CatalogError>,
}

impl LoadReport {
    /// Returns true when feeds were configured and none of them loaded.
    pub fn all_failed(&self) -> bool {
        self.loaded.is_empty() && !self.failures.is_empty()
    }
}

/// The merged product table across all configured markets.
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    markets: Vec<String>,
    products: Vec<Product>,
}

impl Catalog {
    /// Creates an empty catalog for the given markets.
    pub fn new(markets: Vec<String>) -> Self {
        Self { markets, products: Vec::new() }
    }

    /// Loads every feed in order and merges them into one catalog.
    ///
    /// A failing feed is logged and reported; the remaining feeds still load.
    pub async fn load(source: &impl FeedSource, feeds: &[FeedConfig]) -> (Self, LoadReport) {
        let mut catalog = Self::new(feeds.iter().map(|f| f.market.clone()).collect());
        let mut report = LoadReport::default();

        for feed in feeds {
            match source.fetch(feed).await {
                Ok(xml) => {
                    let count = catalog.ingest(&xml, &feed.market);
                    report.loaded.push((feed.market.clone(), count));
                }
                Err(e) => {
                    warn!("Failed to load {} price file: {:#}", feed.market, e);
                    report.failures.push(CatalogError::FeedFetch {
                        market: feed.market.clone(),
                        reason: format!("{:#}", e),
                    });
                }
            }
        }

        info!(
            "Catalog loaded: {} products from {} of {} feeds",
            catalog.len(),
            report.loaded.len(),
            feeds.len()
        );

        (catalog, report)
    }

    /// Parses one feed and merges it in. Returns the number of records parsed.
    pub fn ingest(&mut self, xml: &str, market: &str) -> usize {
        let incoming = parse_feed(xml, market);
        let count = incoming.len();

        if !self.markets.iter().any(|m| m == market) {
            self.markets.push(market.to_string());
        }

        self.products = merge(std::mem::take(&mut self.products), incoming);
        count
    }

    /// Returns the merged products.
    pub fn products(&self) -> &[Product] {
        &self.products
    }

    /// Returns the configured market names in load order.
    pub fn markets(&self) -> &[String] {
        &self.markets
    }

    /// Returns `"All"` followed by each category in first-seen order.
    pub fn categories(&self) -> Vec<String> {
        let mut categories = vec![ALL_CATEGORIES.to_string()];
        for product in &self.products {
            if !categories.contains(&product.category) {
                categories.push(product.category.clone());
            }
        }
        categories
    }

    /// Finds a product by matching key, falling back to item code.
    pub fn find(&self, key_or_code: &str) -> Option<&Product> {
        self.products
            .iter()
            .find(|p| p.id == key_or_code)
            .or_else(|| self.products.iter().find(|p| p.item_code == key_or_code))
    }

    /// Returns the number of products.
    pub fn len(&self) -> usize {
        self.products.len()
    }

    /// Returns true if no products were loaded.
    pub fn is_empty(&self) -> bool {
        self.products.is_empty()
    }
}

/// One market's entry in a product comparison.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ComparisonRow {
    /// Market name
    pub market: String,
    /// Price at that market
    pub price: f64,
    /// Whether this is the cheapest active market
    pub is_best: bool,
}

/// Lists a product's price at each active market, flagging the cheapest.
///
/// Returns an empty list when no active market prices the product.
pub fn compare_product(product: &Product, active: &BTreeSet<String>) -> Vec<ComparisonRow> {
    let best = product.best_price(active);

    product
        .prices
        .iter()
        .filter(|p| active.contains(&p.market))
        .map(|p| ComparisonRow {
            market: p.market.clone(),
            price: p.price,
            is_best: best.source.as_deref() == Some(p.market.as_str()),
        })
        .collect()
}
