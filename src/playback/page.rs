//! Page capability interfaces used by cart actions.
//!
//! Actions never touch a concrete browser; they ask a [`StorePage`] for the
//! search box, the search button and the "add to cart" control and drive
//! them through [`Affordance`].

use super::PlaybackError;
use crate::retailers::SiteProfile;
use async_trait::async_trait;
use tracing::trace;

/// An interactive element on a store page.
#[async_trait]
pub trait Affordance: Send + Sync {
    /// Focuses the element, replaces its value and dispatches `input` and
    /// `change` events.
    async fn fill(&self, text: &str) -> Result<(), PlaybackError>;

    /// Sends an Enter key press to the element.
    async fn press_enter(&self) -> Result<(), PlaybackError>;

    /// Clicks the element.
    async fn click(&self) -> Result<(), PlaybackError>;
}

/// The elements cart playback needs from a store page.
#[async_trait]
pub trait StorePage: Send + Sync {
    async fn find_search_input(&self) -> Result<Option<Box<dyn Affordance>>, PlaybackError>;
    async fn find_search_submit(&self) -> Result<Option<Box<dyn Affordance>>, PlaybackError>;
    async fn find_add_affordance(&self) -> Result<Option<Box<dyn Affordance>>, PlaybackError>;
}

/// Minimal DOM access: the first element matching a CSS selector.
#[async_trait]
pub trait Dom: Send + Sync {
    async fn query(&self, selector: &str) -> Result<Option<Box<dyn Affordance>>, PlaybackError>;
}

/// A [`StorePage`] that resolves elements from a retailer's prioritized
/// selector lists.
pub struct SelectorPage<D> {
    dom: D,
    profile: &'static SiteProfile,
}

impl<D: Dom> SelectorPage<D> {
    pub fn new(dom: D, profile: &'static SiteProfile) -> Self {
        Self { dom, profile }
    }

    pub fn profile(&self) -> &'static SiteProfile {
        self.profile
    }

    async fn first_match(
        &self,
        selectors: &[&str],
    ) -> Result<Option<Box<dyn Affordance>>, PlaybackError> {
        for selector in selectors {
            if let Some(element) = self.dom.query(selector).await? {
                trace!("Matched selector {}", selector);
                return Ok(Some(element));
            }
        }
        Ok(None)
    }
}

#[async_trait]
impl<D: Dom> StorePage for SelectorPage<D> {
    async fn find_search_input(&self) -> Result<Option<Box<dyn Affordance>>, PlaybackError> {
        self.first_match(self.profile.search_inputs).await
    }

    async fn find_search_submit(&self) -> Result<Option<Box<dyn Affordance>>, PlaybackError> {
        self.first_match(self.profile.search_submits).await
    }

    async fn find_add_affordance(&self) -> Result<Option<Box<dyn Affordance>>, PlaybackError> {
        self.first_match(self.profile.add_buttons).await
    }
}
