//! Show command: one product's price at each market.

use super::{active_markets, load_catalog, LOAD_FAILED};
use crate::catalog::{FeedClient, FeedSource};
use crate::config::Config;
use crate::format::Formatter;
use anyhow::{Context, Result};

pub struct ShowCommand {
    config: Config,
}

impl ShowCommand {
    pub fn new(config: Config) -> Self {
        Self { config }
    }

    /// Looks up a product by matching key or item code and prints its
    /// comparison panel.
    pub async fn execute(&self, key: &str, markets: &[String]) -> Result<String> {
        let client = FeedClient::new(&self.config).context("Failed to create HTTP client")?;
        self.execute_with_source(&client, key, markets).await
    }

    /// Executes against a provided feed source (for testing).
    pub async fn execute_with_source(
        &self,
        source: &impl FeedSource,
        key: &str,
        markets: &[String],
    ) -> Result<String> {
        let Some(catalog) = load_catalog(source, &self.config).await else {
            return Ok(LOAD_FAILED.to_string());
        };

        let product = catalog
            .find(key.trim())
            .with_context(|| format!("No product matching '{}'", key))?;

        let active = active_markets(&catalog, markets, &self.config.markets);
        Ok(Formatter::new(self.config.format).format_comparison(product, &active))
    }
}
