//! Storage for the pending playback session.
//!
//! Holds at most one session: the most recent export.

use super::PlaybackSession;
use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing::debug;

/// Where an exported basket waits until playback picks it up.
pub trait SessionStore: Send + Sync {
    /// Stores the session, replacing any previous one.
    fn put(&self, session: &PlaybackSession) -> Result<()>;

    /// Returns the stored session, if any.
    fn get(&self) -> Result<Option<PlaybackSession>>;

    /// Removes the stored session. Clearing an empty store is not an error.
    fn clear(&self) -> Result<()>;
}

/// Session store living in process memory.
#[derive(Debug, Default)]
pub struct MemorySessionStore {
    slot: Mutex<Option<PlaybackSession>>,
}

impl MemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SessionStore for MemorySessionStore {
    fn put(&self, session: &PlaybackSession) -> Result<()> {
        *self.slot.lock().map_err(|_| anyhow::anyhow!("Session store poisoned"))? = Some(session.clone());
        Ok(())
    }

    fn get(&self) -> Result<Option<PlaybackSession>> {
        Ok(self.slot.lock().map_err(|_| anyhow::anyhow!("Session store poisoned"))?.clone())
    }

    fn clear(&self) -> Result<()> {
        *self.slot.lock().map_err(|_| anyhow::anyhow!("Session store poisoned"))? = None;
        Ok(())
    }
}

/// Session store backed by a JSON file, so an export survives between CLI
/// invocations.
#[derive(Debug, Clone)]
pub struct FileSessionStore {
    path: PathBuf,
}

impl FileSessionStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl SessionStore for FileSessionStore {
    fn put(&self, session: &PlaybackSession) -> Result<()> {
        let json = serde_json::to_string_pretty(session)?;
        std::fs::write(&self.path, json)
            .with_context(|| format!("Failed to write session file: {}", self.path.display()))?;
        debug!("Stored session at {}", self.path.display());
        Ok(())
    }

    fn get(&self) -> Result<Option<PlaybackSession>> {
        if !self.path.exists() {
            return Ok(None);
        }

        let content = std::fs::read_to_string(&self.path)
            .with_context(|| format!("Failed to read session file: {}", self.path.display()))?;

        let session = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse session file: {}", self.path.display()))?;

        Ok(Some(session))
    }

    fn clear(&self) -> Result<()> {
        match std::fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e).with_context(|| {
                format!("Failed to remove session file: {}", self.path.display())
            }),
        }
    }
}
