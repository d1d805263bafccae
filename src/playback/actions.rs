//! Per-item cart actions.

use super::page::{Dom, SelectorPage, StorePage};
use super::{BasketItem, PlaybackError};
use crate::retailers::{Retailer, SiteProfile};
use async_trait::async_trait;
use std::time::Duration;
use tracing::debug;

/// Adds a single basket item to the retailer's cart.
#[async_trait]
pub trait CartAction: Send + Sync {
    async fn add_item(&self, item: &BasketItem) -> Result<(), PlaybackError>;
}

/// Adds items by driving the storefront: search for the item, then click
/// the first "add to cart" control.
pub struct UiCartAction<P> {
    page: P,
    profile: &'static SiteProfile,
}

impl<P: StorePage> UiCartAction<P> {
    pub fn new(page: P, profile: &'static SiteProfile) -> Self {
        Self { page, profile }
    }
}

#[async_trait]
impl<P: StorePage> CartAction for UiCartAction<P> {
    async fn add_item(&self, item: &BasketItem) -> Result<(), PlaybackError> {
        let text = item.search_text().ok_or(PlaybackError::EmptyItem)?;

        let input = self
            .page
            .find_search_input()
            .await?
            .ok_or(PlaybackError::InputNotFound)?;
        input.fill(text).await?;

        if self.profile.submit_search {
            match self.page.find_search_submit().await? {
                Some(button) => button.click().await?,
                None => input.press_enter().await?,
            }
        }

        tokio::time::sleep(Duration::from_millis(self.profile.settle_ms)).await;

        let add = self
            .page
            .find_add_affordance()
            .await?
            .ok_or(PlaybackError::AffordanceNotFound)?;
        add.click().await?;

        tokio::time::sleep(Duration::from_millis(self.profile.after_click_ms)).await;

        debug!("Added {} via storefront", item.label());
        Ok(())
    }
}

/// Submits an item to the retailer's cart without going through the page.
#[async_trait]
pub trait DirectSubmit: Send + Sync {
    async fn submit(&self, item: &BasketItem) -> Result<(), PlaybackError>;
}

/// Placeholder for a retailer cart API that has not been mapped yet.
pub struct UnimplementedCartApi;

#[async_trait]
impl DirectSubmit for UnimplementedCartApi {
    async fn submit(&self, _item: &BasketItem) -> Result<(), PlaybackError> {
        Err(PlaybackError::DirectSubmitUnavailable)
    }
}

/// Tries direct submission first and falls back to another action.
pub struct ApiFirstAction<S, F> {
    direct: S,
    fallback: F,
}

impl<S: DirectSubmit, F: CartAction> ApiFirstAction<S, F> {
    pub fn new(direct: S, fallback: F) -> Self {
        Self { direct, fallback }
    }
}

#[async_trait]
impl<S: DirectSubmit, F: CartAction> CartAction for ApiFirstAction<S, F> {
    async fn add_item(&self, item: &BasketItem) -> Result<(), PlaybackError> {
        match self.direct.submit(item).await {
            Ok(()) => Ok(()),
            Err(e) => {
                debug!("Direct submission failed for {} ({}), using storefront", item.label(), e);
                self.fallback.add_item(item).await
            }
        }
    }
}

/// Builds the cart action for a retailer over the given DOM.
///
/// Returns `None` for retailers without cart automation.
pub fn action_for<D: Dom + 'static>(retailer: Retailer, dom: D) -> Option<Box<dyn CartAction>> {
    let profile = retailer.automation()?;
    let ui = UiCartAction::new(SelectorPage::new(dom, profile), profile);

    if profile.direct_submit_first {
        Some(Box::new(ApiFirstAction::new(UnimplementedCartApi, ui)))
    } else {
        Some(Box::new(ui))
    }
}
