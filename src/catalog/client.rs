//! Feed fetching over HTTP (wreq) or from local files.

use crate::config::{Config, FeedConfig};
use anyhow::{Context, Result};
use async_trait::async_trait;
use flate2::read::GzDecoder;
use rand::Rng;
use std::io::Read;
use std::time::Duration;
use tracing::{debug, info, warn};
use wreq::Client;
use wreq_util::Emulation;

const GZIP_MAGIC: [u8; 2] = [0x1f, 0x8b];
const FEED_ACCEPT: &str = "application/xml,text/xml,application/gzip,*/*;q=0.8";
const PAGE_ACCEPT: &str = "text/html,application/xhtml+xml,*/*;q=0.8";

/// Trait for retrieving raw feed text - enables mocking for tests.
#[async_trait]
pub trait FeedSource: Send + Sync {
    /// Fetches a feed and returns its decoded XML text.
    async fn fetch(&self, feed: &FeedConfig) -> Result<String>;
}

/// Fetches price feeds from chain portals or the local filesystem.
pub struct FeedClient {
    client: Client,
    delay_ms: u64,
    delay_jitter_ms: u64,
}

impl FeedClient {
    /// Creates a new feed client with the given configuration.
    pub fn new(config: &Config) -> Result<Self> {
        let mut builder = Client::builder()
            .cookie_store(true)
            .gzip(true)
            .brotli(true)
            .timeout(Duration::from_secs(30))
            .connect_timeout(Duration::from_secs(10));

        if let Some(proxy_url) = &config.proxy {
            debug!("Configuring proxy: {}", proxy_url);
            let proxy = wreq::Proxy::all(proxy_url).context("Failed to configure proxy")?;
            builder = builder.proxy(proxy);
        }

        let client = builder.build()?;

        Ok(Self { client, delay_ms: config.delay_ms, delay_jitter_ms: config.delay_jitter_ms })
    }

    /// Fetches a retailer web page as text.
    pub async fn fetch_page(&self, url: &str) -> Result<String> {
        info!("Fetching page {}", url);
        let bytes = self.get(url, PAGE_ACCEPT, "page").await?;
        Ok(String::from_utf8_lossy(&bytes).into_owned())
    }

    /// Performs a GET request and returns the raw body. `what` names the
    /// resource in error messages.
    async fn get(&self, url: &str, accept: &str, what: &str) -> Result<Vec<u8>> {
        self.delay().await;

        debug!("GET {}", url);

        let response = self
            .client
            .get(url)
            .emulation(Emulation::Chrome131)
            .header("Accept", accept)
            .header("Accept-Language", "he-IL,he;q=0.9,en;q=0.8")
            .header("Cache-Control", "no-store")
            .header("Pragma", "no-cache")
            .send()
            .await
            .context("Failed to send request")?;

        let status = response.status();
        debug!("Response status: {}", status);

        if !status.is_success() {
            anyhow::bail!("Failed to load {} ({})", what, status);
        }

        let body = response.bytes().await.context("Failed to read response body")?;
        Ok(body.to_vec())
    }

    /// Adds a random delay between requests to the chain portals.
    async fn delay(&self) {
        if self.delay_ms == 0 {
            return;
        }

        let jitter = if self.delay_jitter_ms > 0 {
            rand::rng().random_range(0..=self.delay_jitter_ms)
        } else {
            0
        };

        let total_delay = self.delay_ms + jitter;
        debug!("Delaying {}ms", total_delay);
        tokio::time::sleep(Duration::from_millis(total_delay)).await;
    }
}

#[async_trait]
impl FeedSource for FeedClient {
    async fn fetch(&self, feed: &FeedConfig) -> Result<String> {
        info!("Loading {} feed from {}", feed.market, feed.location);

        let bytes = if feed.is_remote() {
            self.get(&feed.location, FEED_ACCEPT, "price file").await?
        } else {
            tokio::fs::read(&feed.location)
                .await
                .with_context(|| format!("Failed to read price file: {}", feed.location))?
        };

        decode_feed(&bytes, &feed.location)
    }
}

/// Decompresses gzip payloads and decodes the XML as UTF-8.
///
/// Only the gzip magic bytes trigger decompression: a `.gz` feed served
/// with `Content-Encoding: gzip` has already been inflated by the client.
pub fn decode_feed(bytes: &[u8], location: &str) -> Result<String> {
    if bytes.starts_with(&GZIP_MAGIC) {
        let mut decoded = Vec::new();
        GzDecoder::new(bytes)
            .read_to_end(&mut decoded)
            .with_context(|| format!("Failed to decompress price file: {}", location))?;
        return Ok(String::from_utf8_lossy(&decoded).into_owned());
    }

    let text = String::from_utf8_lossy(bytes);
    if text.contains('\u{FFFD}') {
        warn!("Price file {} is not valid UTF-8; replaced invalid bytes", location);
    }
    Ok(text.into_owned())
}
