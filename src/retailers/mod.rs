//! Target retailers: shop URLs and cart automation profiles.

pub mod selectors;

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Retailers a basket can be exported to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Retailer {
    Shufersal,
    #[serde(rename = "Rami Levy")]
    RamiLevy,
    #[serde(rename = "Mahsanei Hashuk")]
    MahsaneiHashuk,
    Victory,
    #[serde(rename = "Yenot Bitan")]
    YenotBitan,
}

/// How playback drives one retailer's storefront.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SiteProfile {
    /// Search box selectors, highest priority first
    pub search_inputs: &'static [&'static str],
    /// Search button selectors; empty when the site searches as you type
    pub search_submits: &'static [&'static str],
    /// "Add to cart" selectors, highest priority first
    pub add_buttons: &'static [&'static str],
    /// Whether the search has to be submitted explicitly
    pub submit_search: bool,
    /// Wait after searching before looking for results
    pub settle_ms: u64,
    /// Wait after clicking "add to cart"
    pub after_click_ms: u64,
    /// Whether the direct cart submission path is tried before the UI
    pub direct_submit_first: bool,
}

static SHUFERSAL_PROFILE: SiteProfile = SiteProfile {
    search_inputs: selectors::shufersal::SEARCH_INPUT,
    search_submits: selectors::shufersal::SEARCH_SUBMIT,
    add_buttons: selectors::shufersal::ADD_TO_CART,
    submit_search: true,
    settle_ms: 2000,
    after_click_ms: 500,
    direct_submit_first: true,
};

static RAMI_LEVY_PROFILE: SiteProfile = SiteProfile {
    search_inputs: selectors::rami_levy::SEARCH_INPUT,
    search_submits: &[],
    add_buttons: selectors::rami_levy::ADD_TO_CART,
    submit_search: false,
    settle_ms: 1000,
    after_click_ms: 500,
    direct_submit_first: false,
};

impl Retailer {
    /// Returns the display name, which is also the wire name in exports.
    pub fn name(&self) -> &'static str {
        match self {
            Retailer::Shufersal => "Shufersal",
            Retailer::RamiLevy => "Rami Levy",
            Retailer::MahsaneiHashuk => "Mahsanei Hashuk",
            Retailer::Victory => "Victory",
            Retailer::YenotBitan => "Yenot Bitan",
        }
    }

    /// Returns the page the user lands on to shop online.
    pub fn shop_url(&self) -> &'static str {
        match self {
            Retailer::Shufersal => "https://www.shufersal.co.il/online/he/shop",
            Retailer::RamiLevy => "https://www.rami-levy.co.il/he/online/market",
            Retailer::MahsaneiHashuk => "https://www.mahsaneihashuk.co.il",
            Retailer::Victory => "https://www.victory.co.il",
            Retailer::YenotBitan => "https://www.ybitan.co.il/online",
        }
    }

    /// Returns the automation profile, if cart filling is supported.
    pub fn automation(&self) -> Option<&'static SiteProfile> {
        match self {
            Retailer::Shufersal => Some(&SHUFERSAL_PROFILE),
            Retailer::RamiLevy => Some(&RAMI_LEVY_PROFILE),
            Retailer::MahsaneiHashuk | Retailer::Victory | Retailer::YenotBitan => None,
        }
    }

    /// Returns all known retailers.
    pub fn all() -> &'static [Retailer] {
        &[
            Retailer::Shufersal,
            Retailer::RamiLevy,
            Retailer::MahsaneiHashuk,
            Retailer::Victory,
            Retailer::YenotBitan,
        ]
    }
}

impl fmt::Display for Retailer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl FromStr for Retailer {
    type Err = RetailerParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let key: String = s
            .trim()
            .to_lowercase()
            .chars()
            .filter(|c| !matches!(c, ' ' | '-' | '_'))
            .collect();

        match key.as_str() {
            "shufersal" => Ok(Retailer::Shufersal),
            "ramilevy" | "rami" => Ok(Retailer::RamiLevy),
            "mahsaneihashuk" | "hashuk" => Ok(Retailer::MahsaneiHashuk),
            "victory" => Ok(Retailer::Victory),
            "yenotbitan" | "ybitan" | "bitan" => Ok(Retailer::YenotBitan),
            _ => Err(RetailerParseError(s.to_string())),
        }
    }
}

#[derive(Debug, Clone)]
pub struct RetailerParseError(String);

impl fmt::Display for RetailerParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Unknown retailer '{}'. Valid retailers: Shufersal, Rami Levy, Mahsanei Hashuk, Victory, Yenot Bitan",
            self.0
        )
    }
}

impl std::error::Error for RetailerParseError {}
