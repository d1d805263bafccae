//! Maximum best-price filter.

use super::Filter;
use crate::catalog::parser::parse_leading_float;
use crate::catalog::Product;
use std::collections::BTreeSet;

/// Keeps products whose cheapest price among the active markets is at most
/// `max`. Products no active market prices are dropped.
pub struct MaxPriceFilter {
    max: f64,
    active: BTreeSet<String>,
}

impl MaxPriceFilter {
    /// Creates a filter with a numeric bound.
    pub fn new(max: f64, active: BTreeSet<String>) -> Self {
        Self { max, active }
    }

    /// Creates a filter from raw user input.
    ///
    /// Returns `None` when the input is not a number, which means "no price
    /// filter" rather than an error.
    pub fn parse(input: &str, active: BTreeSet<String>) -> Option<Self> {
        parse_leading_float(input).map(|max| Self::new(max, active))
    }
}

impl Filter for MaxPriceFilter {
    fn matches(&self, product: &Product) -> bool {
        let best = product.best_price(&self.active);
        !best.is_none() && best.price <= self.max
    }

    fn description(&self) -> String {
        format!("Best price: <= {:.2}", self.max)
    }
}
