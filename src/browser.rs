//! Chromium page driver for live cart playback.

use crate::playback::{Affordance, Dom, PlaybackError};
use anyhow::{Context, Result};
use async_trait::async_trait;
use chromiumoxide::browser::{Browser, BrowserConfig};
use chromiumoxide::element::Element;
use chromiumoxide::page::Page;
use futures::StreamExt;
use std::path::Path;
use tokio::task::JoinHandle;
use tracing::{debug, trace};

/// A visible Chromium instance the user can log in with.
pub struct ChromiumSession {
    browser: Browser,
    handler: JoinHandle<()>,
}

/// Launches Chromium with a visible window.
///
/// Uses `chrome` when given, otherwise lets chromiumoxide locate a local
/// Chrome or Chromium install.
pub async fn launch(chrome: Option<&Path>) -> Result<ChromiumSession> {
    let mut builder = BrowserConfig::builder()
        .with_head()
        .arg("--disable-extensions")
        .arg("--no-first-run");

    if let Some(path) = chrome {
        builder = builder.chrome_executable(path);
    }

    let config = builder
        .build()
        .map_err(|e| anyhow::anyhow!("Failed to build browser config: {e}"))?;

    let (browser, mut handler) = Browser::launch(config)
        .await
        .context("Failed to launch Chromium")?;

    let handler = tokio::spawn(async move {
        while let Some(event) = handler.next().await {
            if let Err(e) = event {
                trace!("Browser handler event error: {}", e);
            }
        }
    });

    Ok(ChromiumSession { browser, handler })
}

impl ChromiumSession {
    /// Opens `url` in a new tab and waits for it to load.
    pub async fn open(&self, url: &str) -> Result<ChromiumDom> {
        let page = self
            .browser
            .new_page(url)
            .await
            .with_context(|| format!("Failed to open {}", url))?;

        page.wait_for_navigation()
            .await
            .with_context(|| format!("Failed to load {}", url))?;

        debug!("Opened {}", url);
        Ok(ChromiumDom { page })
    }

    /// Closes the browser and waits for its event loop to finish.
    pub async fn close(mut self) -> Result<()> {
        self.browser.close().await.context("Failed to close Chromium")?;
        let _ = self.handler.await;
        Ok(())
    }
}

/// [`Dom`] over a live Chromium tab.
pub struct ChromiumDom {
    page: Page,
}

#[async_trait]
impl Dom for ChromiumDom {
    async fn query(&self, selector: &str) -> Result<Option<Box<dyn Affordance>>, PlaybackError> {
        let mut elements = self
            .page
            .find_elements(selector)
            .await
            .map_err(|e| PlaybackError::Page(e.to_string()))?;

        if elements.is_empty() {
            return Ok(None);
        }

        Ok(Some(Box::new(ChromiumElement { element: elements.swap_remove(0) })))
    }
}

struct ChromiumElement {
    element: Element,
}

/// Body of the function run against the element to set its value the way
/// a user typing would.
fn fill_script(text: &str) -> String {
    let value = serde_json::Value::String(text.to_string()).to_string();
    format!(
        "function() {{ \
            this.focus(); \
            this.value = {value}; \
            this.dispatchEvent(new Event('input', {{ bubbles: true }})); \
            this.dispatchEvent(new Event('change', {{ bubbles: true }})); \
        }}"
    )
}

#[async_trait]
impl Affordance for ChromiumElement {
    async fn fill(&self, text: &str) -> Result<(), PlaybackError> {
        self.element
            .call_js_fn(fill_script(text), false)
            .await
            .map_err(|e| PlaybackError::Page(e.to_string()))?;
        Ok(())
    }

    async fn press_enter(&self) -> Result<(), PlaybackError> {
        self.element
            .press_key("Enter")
            .await
            .map_err(|e| PlaybackError::Page(e.to_string()))?;
        Ok(())
    }

    async fn click(&self) -> Result<(), PlaybackError> {
        self.element
            .click()
            .await
            .map_err(|e| PlaybackError::Page(e.to_string()))?;
        Ok(())
    }
}
