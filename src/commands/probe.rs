//! Probe command: checks a retailer's selectors against a page.

use crate::catalog::FeedClient;
use crate::config::Config;
use crate::format::Formatter;
use crate::retailers::selectors::probe_html;
use crate::retailers::Retailer;
use anyhow::{Context, Result};
use std::path::Path;

pub struct ProbeCommand {
    config: Config,
}

impl ProbeCommand {
    pub fn new(config: Config) -> Self {
        Self { config }
    }

    /// Probes a saved page when `html` is given, otherwise fetches the
    /// retailer's shop page.
    ///
    /// Pages that build their search box with JavaScript will show no
    /// matches when fetched directly; save the rendered page and pass it
    /// with `--html` instead.
    pub async fn execute(&self, retailer: Retailer, html: Option<&Path>) -> Result<String> {
        let page = match html {
            Some(path) => tokio::fs::read_to_string(path)
                .await
                .with_context(|| format!("Failed to read page snapshot: {}", path.display()))?,
            None => {
                let client =
                    FeedClient::new(&self.config).context("Failed to create HTTP client")?;
                client.fetch_page(retailer.shop_url()).await?
            }
        };

        self.execute_with_html(retailer, &page)
    }

    /// Probes the given page text.
    pub fn execute_with_html(&self, retailer: Retailer, html: &str) -> Result<String> {
        let profile = retailer
            .automation()
            .with_context(|| format!("Automatic cart filling is not available for {}", retailer))?;

        let probes = probe_html(html, profile)?;
        Ok(Formatter::new(self.config.format).format_probes(retailer, &probes))
    }
}
