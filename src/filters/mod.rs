//! Product filtering driven by an immutable filter state.

pub mod category;
pub mod price;
pub mod query;

use crate::catalog::{Product, ALL_CATEGORIES};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

pub use category::CategoryFilter;
pub use price::MaxPriceFilter;
pub use query::QueryFilter;

/// Trait for filtering products.
pub trait Filter: Send + Sync {
    /// Returns true if the product passes the filter.
    fn matches(&self, product: &Product) -> bool;

    /// Returns a description of this filter.
    fn description(&self) -> String;
}

/// A chain of filters that must all pass.
pub struct FilterChain {
    filters: Vec<Box<dyn Filter>>,
}

impl FilterChain {
    /// Creates an empty filter chain.
    pub fn new() -> Self {
        Self { filters: Vec::new() }
    }

    /// Adds a filter to the chain.
    pub fn add(&mut self, filter: impl Filter + 'static) -> &mut Self {
        self.filters.push(Box::new(filter));
        self
    }

    /// Checks if a product passes all filters.
    pub fn matches(&self, product: &Product) -> bool {
        self.filters.iter().all(|f| f.matches(product))
    }

    /// Filters a slice of products, cloning the ones that pass.
    pub fn apply(&self, products: &[Product]) -> Vec<Product> {
        products.iter().filter(|p| self.matches(p)).cloned().collect()
    }

    /// Returns true if no filters are configured.
    pub fn is_empty(&self) -> bool {
        self.filters.is_empty()
    }

    /// Returns the number of filters.
    pub fn len(&self) -> usize {
        self.filters.len()
    }

    /// Returns descriptions of all filters.
    pub fn descriptions(&self) -> Vec<String> {
        self.filters.iter().map(|f| f.description()).collect()
    }
}

impl Default for FilterChain {
    fn default() -> Self {
        Self::new()
    }
}

/// Everything the comparison view filters on.
///
/// Values are never mutated in place: every change returns a new state and
/// the product list is re-derived from it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterState {
    /// Free-text search against the display name
    pub query: String,
    /// Category, or `"All"`
    pub category: String,
    /// Maximum price as typed by the user; non-numeric text disables it
    pub max_price: String,
    /// Markets whose prices count
    pub active_sources: BTreeSet<String>,
}

impl FilterState {
    /// Creates the initial state: every market active, no other filters.
    pub fn new(markets: &[String]) -> Self {
        Self {
            query: String::new(),
            category: ALL_CATEGORIES.to_string(),
            max_price: String::new(),
            active_sources: markets.iter().cloned().collect(),
        }
    }

    /// Returns a copy with a different search query.
    pub fn with_query(self, query: impl Into<String>) -> Self {
        Self { query: query.into(), ..self }
    }

    /// Returns a copy with a different category.
    pub fn with_category(self, category: impl Into<String>) -> Self {
        Self { category: category.into(), ..self }
    }

    /// Returns a copy with a different max-price input.
    pub fn with_max_price(self, max_price: impl Into<String>) -> Self {
        Self { max_price: max_price.into(), ..self }
    }

    /// Returns a copy restricted to the given markets.
    pub fn with_sources(self, sources: impl IntoIterator<Item = String>) -> Self {
        Self { active_sources: sources.into_iter().collect(), ..self }
    }

    /// Toggles one market on or off.
    ///
    /// Turning off the last active market is refused and returns the state
    /// unchanged.
    pub fn toggle_source(self, market: &str) -> Self {
        let mut active = self.active_sources.clone();
        if active.contains(market) {
            if active.len() == 1 {
                return self;
            }
            active.remove(market);
        } else {
            active.insert(market.to_string());
        }
        Self { active_sources: active, ..self }
    }

    /// Returns the initial state for the given markets.
    pub fn reset(markets: &[String]) -> Self {
        Self::new(markets)
    }

    /// Builds the filter chain this state describes.
    pub fn chain(&self) -> FilterChain {
        let mut chain = FilterChain::new();

        if !self.query.trim().is_empty() {
            chain.add(QueryFilter::new(&self.query));
        }

        if self.category != ALL_CATEGORIES {
            chain.add(CategoryFilter::new(&self.category));
        }

        if let Some(filter) = MaxPriceFilter::parse(&self.max_price, self.active_sources.clone()) {
            chain.add(filter);
        }

        chain
    }
}

/// Returns the products that pass every filter in `state`.
pub fn filter_products(products: &[Product], state: &FilterState) -> Vec<Product> {
    state.chain().apply(products)
}
