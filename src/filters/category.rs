//! Category filter.

use super::Filter;
use crate::catalog::{Product, ALL_CATEGORIES};

/// Keeps products in one category; `"All"` keeps everything.
pub struct CategoryFilter {
    category: String,
}

impl CategoryFilter {
    pub fn new(category: &str) -> Self {
        Self { category: category.to_string() }
    }
}

impl Filter for CategoryFilter {
    fn matches(&self, product: &Product) -> bool {
        self.category == ALL_CATEGORIES || product.category == self.category
    }

    fn description(&self) -> String {
        format!("Category: {}", self.category)
    }
}
