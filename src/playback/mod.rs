//! Basket playback: exporting a basket to a retailer and replaying it
//! against the retailer's storefront, one item at a time.

pub mod actions;
pub mod driver;
pub mod export;
pub mod page;
pub mod session;

use crate::catalog::Product;
use crate::retailers::Retailer;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use actions::{action_for, ApiFirstAction, CartAction, DirectSubmit, UiCartAction, UnimplementedCartApi};
pub use driver::{LogProgress, Player, ProgressObserver};
pub use export::{export, ExportError, ExportReceipt, ExportRequest};
pub use page::{Affordance, Dom, SelectorPage, StorePage};
pub use session::{FileSessionStore, MemorySessionStore, SessionStore};

/// One line of an exported basket.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BasketItem {
    #[serde(default, alias = "itemCode", skip_serializing_if = "Option::is_none")]
    pub item_code: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quantity: Option<u32>,
}

impl BasketItem {
    pub fn new(item_code: Option<&str>, name: Option<&str>) -> Self {
        Self {
            item_code: item_code.map(str::to_string),
            name: name.map(str::to_string),
            quantity: None,
        }
    }

    /// Text typed into the store's search box: the item code when present,
    /// otherwise the name.
    pub fn search_text(&self) -> Option<&str> {
        non_empty(&self.item_code).or_else(|| non_empty(&self.name))
    }

    /// Human-readable label: the name when present, otherwise the code.
    pub fn label(&self) -> &str {
        non_empty(&self.name)
            .or_else(|| non_empty(&self.item_code))
            .unwrap_or("(unnamed item)")
    }
}

impl From<&Product> for BasketItem {
    fn from(product: &Product) -> Self {
        Self {
            item_code: Some(product.item_code.clone()),
            name: Some(product.name.clone()),
            quantity: None,
        }
    }
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|s| !s.is_empty())
}

/// Lifecycle of a playback session.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlaybackState {
    #[default]
    Idle,
    Running,
    Completed,
    Cancelled,
}

/// A basket waiting to be, or being, replayed against a retailer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlaybackSession {
    pub target: Retailer,
    pub items: Vec<BasketItem>,
    /// Unix time of the export, in milliseconds
    pub exported_at: u64,
    #[serde(default)]
    pub state: PlaybackState,
    #[serde(default)]
    pub success_count: usize,
    #[serde(default)]
    pub fail_count: usize,
    #[serde(default)]
    pub current_index: usize,
}

impl PlaybackSession {
    pub fn new(target: Retailer, items: Vec<BasketItem>, exported_at: u64) -> Self {
        Self {
            target,
            items,
            exported_at,
            state: PlaybackState::Idle,
            success_count: 0,
            fail_count: 0,
            current_index: 0,
        }
    }

    /// Whole minutes elapsed since the export, rounded to nearest.
    pub fn minutes_since_export(&self, now_ms: u64) -> u64 {
        (now_ms.saturating_sub(self.exported_at) + 30_000) / 60_000
    }
}

/// Aggregate result of one playback run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct PlaybackOutcome {
    pub success_count: usize,
    pub fail_count: usize,
    /// Items the action was invoked for
    pub attempted: usize,
    pub cancelled: bool,
}

/// Why adding one basket item failed.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum PlaybackError {
    #[error("Search input not found")]
    InputNotFound,

    #[error("Add to cart button not found")]
    AffordanceNotFound,

    #[error("Item has neither an item code nor a name")]
    EmptyItem,

    #[error("Direct cart submission is not available")]
    DirectSubmitUnavailable,

    #[error("Page interaction failed: {0}")]
    Page(String),
}

/// Current Unix time in milliseconds.
pub fn now_millis() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or_default()
}
