//! Data models for merged catalog products and per-market prices.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Category assigned to every product until feeds carry one.
pub const DEFAULT_CATEGORY: &str = "Uncategorized";

/// A product as it appears across one or more supermarket feeds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
    /// Matching key (`barcode:<code>` or `name:<normalized name>`)
    pub id: String,
    /// Item code as published by the first feed that listed it
    pub item_code: String,
    /// Display name
    pub name: String,
    /// Lowercased, punctuation-free name used for matching
    pub normalized_name: String,
    /// Product category
    pub category: String,
    /// Quantity and unit of measure, e.g. "1 liter"
    pub unit: String,
    /// Manufacturer name if the feed publishes it
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub brand: Option<String>,
    /// Prices per market, in the order the markets were first seen
    pub prices: Vec<MarketPrice>,
}

/// A single market's price for a product.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarketPrice {
    /// Market (supermarket chain) name
    pub market: String,
    /// Shelf price, currency-agnostic
    pub price: f64,
}

impl Product {
    /// Returns the price a market charges, if it lists this product.
    pub fn price_in(&self, market: &str) -> Option<f64> {
        self.prices.iter().find(|p| p.market == market).map(|p| p.price)
    }

    /// Sets a market's price, overwriting any previous price for that market.
    pub fn set_price(&mut self, market: impl Into<String>, price: f64) {
        let market = market.into();
        match self.prices.iter_mut().find(|p| p.market == market) {
            Some(existing) => existing.price = price,
            None => self.prices.push(MarketPrice { market, price }),
        }
    }

    /// Folds another record of the same product into this one.
    ///
    /// Incoming prices overwrite prices for the same market. Unit and brand
    /// are only backfilled when this record has none.
    pub fn absorb(&mut self, other: Product) {
        for MarketPrice { market, price } in other.prices {
            self.set_price(market, price);
        }

        if self.unit.is_empty() && !other.unit.is_empty() {
            self.unit = other.unit;
        }

        if self.brand.is_none() {
            self.brand = other.brand;
        }
    }

    /// Returns the cheapest price among the active markets.
    ///
    /// Only a strictly lower price replaces the current best, so on a tie the
    /// market listed first wins.
    pub fn best_price(&self, active: &BTreeSet<String>) -> BestPrice {
        self.prices
            .iter()
            .filter(|p| active.contains(&p.market))
            .fold(BestPrice::none(), |best, p| {
                if p.price < best.price {
                    BestPrice { source: Some(p.market.clone()), price: p.price }
                } else {
                    best
                }
            })
    }

    /// Returns true if every given market lists this product.
    pub fn is_in_all(&self, markets: &[String]) -> bool {
        markets.iter().all(|m| self.price_in(m).is_some())
    }
}

/// Result of a cheapest-market lookup.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BestPrice {
    /// Cheapest market, or `None` when no active market has a price
    pub source: Option<String>,
    /// Cheapest price, `f64::INFINITY` when there is none
    pub price: f64,
}

impl BestPrice {
    /// The "no price" sentinel.
    pub fn none() -> Self {
        Self { source: None, price: f64::INFINITY }
    }

    /// Returns true if no active market had a price.
    pub fn is_none(&self) -> bool {
        self.source.is_none()
    }
}
