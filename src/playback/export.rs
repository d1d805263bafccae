//! Export handoff: turns a basket request into a stored playback session.

use super::session::SessionStore;
use super::{BasketItem, PlaybackSession};
use crate::retailers::Retailer;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{error, info};

/// A basket to send to a retailer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExportRequest {
    /// Retailer display name, e.g. "Rami Levy"
    #[serde(alias = "retailer")]
    pub target: String,
    pub items: Vec<BasketItem>,
}

/// What a successful export hands back to the caller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExportReceipt {
    pub target: Retailer,
    pub shop_url: &'static str,
    pub item_count: usize,
    pub exported_at: u64,
    /// Whether `fill` can replay this basket automatically
    pub automated: bool,
}

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("Unknown retailer: {0}")]
    UnknownTargetSite(String),

    #[error("Failed to store session: {0}")]
    Storage(String),
}

/// Stores `request` as the pending session for its target retailer.
///
/// An unknown target is logged and nothing is stored.
pub fn export(
    request: ExportRequest,
    store: &dyn SessionStore,
    now_ms: u64,
) -> Result<ExportReceipt, ExportError> {
    let target: Retailer = match request.target.parse() {
        Ok(retailer) => retailer,
        Err(_) => {
            error!("Unknown retailer: {}", request.target);
            return Err(ExportError::UnknownTargetSite(request.target));
        }
    };

    let item_count = request.items.len();
    let session = PlaybackSession::new(target, request.items, now_ms);
    store
        .put(&session)
        .map_err(|e| ExportError::Storage(format!("{:#}", e)))?;

    info!("Exported {} items to {}", item_count, target);

    Ok(ExportReceipt {
        target,
        shop_url: target.shop_url(),
        item_count,
        exported_at: now_ms,
        automated: target.automation().is_some(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::playback::session::MemorySessionStore;

    fn request(target: &str) -> ExportRequest {
        ExportRequest {
            target: target.to_string(),
            items: vec![
                BasketItem::new(Some("7290000000001"), Some("Milk")),
                BasketItem::new(None, Some("Bread")),
            ],
        }
    }

    #[test]
    fn test_export_stores_session() {
        let store = MemorySessionStore::new();
        let receipt = export(request("Shufersal"), &store, 42).unwrap();

        assert_eq!(receipt.target, Retailer::Shufersal);
        assert_eq!(receipt.shop_url, "https://www.shufersal.co.il/online/he/shop");
        assert_eq!(receipt.item_count, 2);
        assert!(receipt.automated);

        let session = store.get().unwrap().unwrap();
        assert_eq!(session.exported_at, 42);
        assert_eq!(session.items.len(), 2);
        assert_eq!(session.items[1].name.as_deref(), Some("Bread"));
    }

    #[test]
    fn test_export_without_automation() {
        let store = MemorySessionStore::new();
        let receipt = export(request("Victory"), &store, 1).unwrap();

        assert!(!receipt.automated);
        assert!(store.get().unwrap().is_some());
    }

    #[test]
    fn test_unknown_target_stores_nothing() {
        let store = MemorySessionStore::new();
        let err = export(request("Walmart"), &store, 1).unwrap_err();

        assert!(matches!(err, ExportError::UnknownTargetSite(ref name) if name == "Walmart"));
        assert!(store.get().unwrap().is_none());
    }

    #[test]
    fn test_unknown_target_keeps_previous_session() {
        let store = MemorySessionStore::new();
        export(request("Rami Levy"), &store, 1).unwrap();
        export(request("Walmart"), &store, 2).unwrap_err();

        assert_eq!(store.get().unwrap().unwrap().target, Retailer::RamiLevy);
    }

    #[test]
    fn test_request_accepts_retailer_field() {
        let json = r#"{"retailer": "Rami Levy", "items": [{"itemCode": "1"}]}"#;
        let request: ExportRequest = serde_json::from_str(json).unwrap();
        assert_eq!(request.target, "Rami Levy");
        assert_eq!(request.items[0].item_code.as_deref(), Some("1"));
    }
}
