//! cart-filler - Supermarket price comparison and basket-to-cart playback
//!
//! Loads Israeli supermarket price-transparency feeds, merges the same
//! product across chains, and replays a chosen basket against a
//! retailer's online store.

pub mod catalog;
pub mod commands;
pub mod config;
pub mod filters;
pub mod format;
pub mod playback;
pub mod retailers;

#[cfg(feature = "browser")]
pub mod browser;

pub use catalog::{BestPrice, Catalog, Product};
pub use config::Config;
pub use filters::FilterState;
pub use playback::{BasketItem, PlaybackOutcome, PlaybackSession};
pub use retailers::Retailer;
