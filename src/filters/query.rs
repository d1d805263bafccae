//! Free-text name search.

use super::Filter;
use crate::catalog::Product;

/// Keeps products whose display name contains the query, ignoring case.
pub struct QueryFilter {
    query: String,
}

impl QueryFilter {
    /// Creates a new query filter. The query is trimmed and lowercased.
    pub fn new(query: &str) -> Self {
        Self { query: query.trim().to_lowercase() }
    }
}

impl Filter for QueryFilter {
    fn matches(&self, product: &Product) -> bool {
        self.query.is_empty() || product.name.to_lowercase().contains(&self.query)
    }

    fn description(&self) -> String {
        format!("Name contains: {}", self.query)
    }
}
