//! Export and status commands.

use crate::config::Config;
use crate::format::Formatter;
use crate::playback::{export, now_millis, ExportRequest, FileSessionStore, SessionStore};
use anyhow::{Context, Result};
use std::io::Read;
use tracing::debug;

/// Hands a basket to a retailer and reports on the pending export.
pub struct ExportCommand {
    config: Config,
}

impl ExportCommand {
    pub fn new(config: Config) -> Self {
        Self { config }
    }

    fn store(&self) -> FileSessionStore {
        FileSessionStore::new(self.config.session_file())
    }

    /// Reads an export request from `input` (a file path, or `-` for stdin)
    /// and stores it as the pending session.
    pub fn execute(&self, input: &str) -> Result<String> {
        let json = if input == "-" {
            let mut buffer = String::new();
            std::io::stdin()
                .read_to_string(&mut buffer)
                .context("Failed to read export request from stdin")?;
            buffer
        } else {
            std::fs::read_to_string(input)
                .with_context(|| format!("Failed to read export request: {}", input))?
        };

        let request = parse_request(&json)?;
        self.execute_with_store(request, &self.store(), now_millis())
    }

    /// Stores `request` in `store` (for testing).
    pub fn execute_with_store(
        &self,
        request: ExportRequest,
        store: &dyn SessionStore,
        now_ms: u64,
    ) -> Result<String> {
        debug!("Exporting {} items to {}", request.items.len(), request.target);
        let receipt = export(request, store, now_ms)?;
        Ok(Formatter::new(self.config.format).format_receipt(&receipt))
    }

    /// Shows the pending export.
    pub fn status(&self) -> Result<String> {
        self.status_with_store(&self.store(), now_millis())
    }

    pub fn status_with_store(&self, store: &dyn SessionStore, now_ms: u64) -> Result<String> {
        let session = store.get()?;
        Ok(Formatter::new(self.config.format).format_session(session.as_ref(), now_ms))
    }

    /// Drops the pending export.
    pub fn clear(&self) -> Result<String> {
        self.store().clear()?;
        Ok("No active export".to_string())
    }
}

/// Parses an export request from JSON.
pub fn parse_request(json: &str) -> Result<ExportRequest> {
    serde_json::from_str(json).context("Invalid export request")
}
