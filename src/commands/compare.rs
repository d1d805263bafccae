//! Compare command: the filtered product table.

use super::{active_markets, load_catalog, LOAD_FAILED};
use crate::catalog::{FeedClient, FeedSource};
use crate::config::Config;
use crate::filters::{filter_products, FilterState};
use crate::format::Formatter;
use crate::playback::{export, now_millis, BasketItem, ExportRequest, FileSessionStore, SessionStore};
use anyhow::{Context, Result};
use tracing::{debug, info, warn};

/// Filter options for the product table.
#[derive(Debug, Clone, Default)]
pub struct CompareQuery {
    /// Name search
    pub query: Option<String>,
    /// Exact category
    pub category: Option<String>,
    /// Maximum best price, as typed
    pub max_price: Option<String>,
    /// Markets to compare; empty means the configured default
    pub markets: Vec<String>,
    /// Retailer to export the matching products to
    pub export_to: Option<String>,
}

/// Loads all feeds and prints the filtered comparison table.
pub struct CompareCommand {
    config: Config,
}

impl CompareCommand {
    pub fn new(config: Config) -> Self {
        Self { config }
    }

    pub async fn execute(&self, query: &CompareQuery) -> Result<String> {
        let client = FeedClient::new(&self.config).context("Failed to create HTTP client")?;
        let store = FileSessionStore::new(self.config.session_file());

        self.execute_with(&client, &store, query).await
    }

    /// Executes against a provided feed source and session store (for testing).
    pub async fn execute_with(
        &self,
        source: &impl FeedSource,
        store: &dyn SessionStore,
        query: &CompareQuery,
    ) -> Result<String> {
        let Some(catalog) = load_catalog(source, &self.config).await else {
            return Ok(LOAD_FAILED.to_string());
        };

        let active = active_markets(&catalog, &query.markets, &self.config.markets);

        let mut state = FilterState::new(catalog.markets()).with_sources(active);
        if let Some(q) = &query.query {
            state = state.with_query(q.as_str());
        }
        if let Some(category) = &query.category {
            if !catalog.categories().contains(category) {
                warn!("Unknown category '{}'", category);
            }
            state = state.with_category(category.as_str());
        }
        if let Some(max_price) = &query.max_price {
            state = state.with_max_price(max_price.as_str());
        }

        let chain = state.chain();
        if !chain.is_empty() {
            debug!("Active filters: {}", chain.descriptions().join(", "));
        }

        let products = filter_products(catalog.products(), &state);
        info!("{} of {} products match", products.len(), catalog.len());

        let formatter = Formatter::new(self.config.format);
        let mut output = formatter.format_products(&products, catalog.markets(), &state.active_sources);

        if let Some(target) = &query.export_to {
            let request = ExportRequest {
                target: target.clone(),
                items: products.iter().map(BasketItem::from).collect(),
            };
            let receipt = export(request, store, now_millis())?;
            output.push_str("\n\n");
            output.push_str(&formatter.format_receipt(&receipt));
        }

        Ok(output)
    }
}
