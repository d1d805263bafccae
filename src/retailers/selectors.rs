//! CSS selectors for retailer cart automation.
//!
//! Each list is tried in order; the first selector that matches wins.
//! Update this file when a retailer changes its storefront markup.
//!
//! **Update process**: run `cart-filler probe <retailer>` against the live
//! site (or a saved page), adjust the lists, and extend the probe fixtures.

use super::SiteProfile;
use scraper::{Html, Selector};
use serde::Serialize;

/// Selectors for shufersal.co.il.
pub mod shufersal {
    /// Product search box.
    pub static SEARCH_INPUT: &[&str] =
        &["input[type='search']", "input[placeholder*='חיפוש']", "input[name='search']"];

    /// Search submit button; Enter is pressed when none matches.
    pub static SEARCH_SUBMIT: &[&str] =
        &["button[type='submit']", "button[class*='search']", "button[aria-label*='חיפוש']"];

    /// "Add to cart" button on the first search result.
    pub static ADD_TO_CART: &[&str] = &[
        "button[class*='add']",
        "button[class*='cart']",
        "button[aria-label*='הוספה לסל']",
    ];
}

/// Selectors for rami-levy.co.il.
pub mod rami_levy {
    /// Product search box. Results update as the user types.
    pub static SEARCH_INPUT: &[&str] = &["input[type='search']", "input[name='q']"];

    /// "Add to cart" button on the first search result.
    pub static ADD_TO_CART: &[&str] = &["button[title*='הוסף']", "button[class*='add-to-cart']"];
}

/// Compiles a selector list, failing on the first invalid entry.
pub fn compile(selectors: &[&'static str]) -> anyhow::Result<Vec<(&'static str, Selector)>> {
    selectors
        .iter()
        .map(|s| {
            Selector::parse(s)
                .map(|compiled| (*s, compiled))
                .map_err(|e| anyhow::anyhow!("Invalid selector {:?}: {}", s, e))
        })
        .collect()
}

/// How many elements of a page one selector matches.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SelectorProbe {
    /// "search input", "search submit" or "add to cart"
    pub role: &'static str,
    pub selector: &'static str,
    pub matches: usize,
}

/// Runs every selector of `profile` against a page snapshot.
pub fn probe_html(html: &str, profile: &SiteProfile) -> anyhow::Result<Vec<SelectorProbe>> {
    let document = Html::parse_document(html);
    let groups = [
        ("search input", profile.search_inputs),
        ("search submit", profile.search_submits),
        ("add to cart", profile.add_buttons),
    ];

    let mut probes = Vec::new();
    for (role, selectors) in groups {
        for (selector, compiled) in compile(selectors)? {
            probes.push(SelectorProbe {
                role,
                selector,
                matches: document.select(&compiled).count(),
            });
        }
    }
    Ok(probes)
}
