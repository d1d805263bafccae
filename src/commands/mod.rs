//! CLI command implementations.

pub mod compare;
pub mod export;
pub mod fill;
pub mod probe;
pub mod show;

pub use compare::{CompareCommand, CompareQuery};
pub use export::ExportCommand;
pub use fill::FillCommand;
pub use probe::ProbeCommand;
pub use show::ShowCommand;

use crate::catalog::{Catalog, FeedSource};
use crate::config::Config;
use std::collections::BTreeSet;
use tracing::{debug, warn};

/// Status line shown when no feed could be loaded.
pub const LOAD_FAILED: &str = "Failed to load price file.";

/// Loads every configured feed. Returns `None` when all of them failed.
pub(crate) async fn load_catalog(source: &impl FeedSource, config: &Config) -> Option<Catalog> {
    let (catalog, report) = Catalog::load(source, &config.feeds).await;

    if report.all_failed() {
        return None;
    }

    for (market, count) in &report.loaded {
        debug!("{}: {} records", market, count);
    }

    Some(catalog)
}

/// Resolves which markets count for price comparison.
///
/// Uses `requested` if given, else the configured default, else every
/// market in the catalog. Unknown names are ignored; if nothing valid
/// remains, every market is active.
pub(crate) fn active_markets(
    catalog: &Catalog,
    requested: &[String],
    configured: &[String],
) -> BTreeSet<String> {
    let wanted = if !requested.is_empty() { requested } else { configured };
    let all: BTreeSet<String> = catalog.markets().iter().cloned().collect();

    if wanted.is_empty() {
        return all;
    }

    let mut active = BTreeSet::new();
    for name in wanted {
        match catalog.markets().iter().find(|m| m.eq_ignore_ascii_case(name)) {
            Some(market) => {
                active.insert(market.clone());
            }
            None => warn!("Unknown market '{}', ignoring", name),
        }
    }

    if active.is_empty() {
        warn!("No known market selected, comparing all markets");
        return all;
    }

    active
}

#[cfg(test)]
mod tests {
    use super::*;

    fn catalog() -> Catalog {
        Catalog::new(vec!["Shufersal".to_string(), "Mahsanei Hashuk".to_string()])
    }

    fn names(values: &[&str]) -> Vec<String> {
        values.iter().map(|v| v.to_string()).collect()
    }

    #[test]
    fn test_active_markets_defaults_to_all() {
        let active = active_markets(&catalog(), &[], &[]);
        assert_eq!(active.len(), 2);
    }

    #[test]
    fn test_active_markets_request_beats_config() {
        let active = active_markets(&catalog(), &names(&["shufersal"]), &names(&["Mahsanei Hashuk"]));
        assert_eq!(active.into_iter().collect::<Vec<_>>(), names(&["Shufersal"]));

        let active = active_markets(&catalog(), &[], &names(&["Mahsanei Hashuk"]));
        assert_eq!(active.into_iter().collect::<Vec<_>>(), names(&["Mahsanei Hashuk"]));
    }

    #[test]
    fn test_active_markets_ignores_unknown() {
        let active = active_markets(&catalog(), &names(&["Victory", "Shufersal"]), &[]);
        assert_eq!(active.len(), 1);

        let active = active_markets(&catalog(), &names(&["Victory"]), &[]);
        assert_eq!(active.len(), 2);
    }
}
