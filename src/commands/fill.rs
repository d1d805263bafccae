//! Fill command: replays the pending export against the retailer's site.

use crate::config::Config;
use crate::format::Formatter;
use crate::playback::{
    action_for, BasketItem, Dom, FileSessionStore, PlaybackError, PlaybackOutcome, PlaybackState,
    Player, ProgressObserver, SessionStore,
};
use anyhow::{Context, Result};
use std::io::Write;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::warn;

/// Prints playback progress on a single terminal line.
#[derive(Default)]
pub struct ConsoleProgress {
    added: AtomicUsize,
}

impl ConsoleProgress {
    /// Items added so far, the CLI's stand-in for a badge count.
    pub fn added(&self) -> usize {
        self.added.load(Ordering::SeqCst)
    }
}

impl ProgressObserver for ConsoleProgress {
    fn on_item_started(&self, index: usize, total: usize) {
        eprint!("\rProcessing {}/{}... [{} added]", index, total, self.added());
        let _ = std::io::stderr().flush();
    }

    fn on_progress(&self, done: usize, _total: usize) {
        self.added.store(done, Ordering::SeqCst);
    }

    fn on_item_failed(&self, _index: usize, item: &BasketItem, error: &PlaybackError) {
        eprintln!("\rFailed to add {}: {}", item.label(), error);
    }

    fn on_complete(&self, _outcome: &PlaybackOutcome) {
        eprintln!();
    }

    fn clear(&self) {
        self.added.store(0, Ordering::SeqCst);
    }
}

/// Status line returned when a playback is already in progress.
pub const ALREADY_RUNNING: &str =
    "Playback already running (use `cart-filler status --clear` to reset a stuck export)";

/// Replays the pending export. One command owns one player, so overlapping
/// fills through the same command run once.
pub struct FillCommand {
    config: Config,
    store: Arc<dyn SessionStore>,
    player: Player,
}

impl FillCommand {
    /// Uses the session file from `config`.
    pub fn new(config: Config) -> Self {
        let store: Arc<dyn SessionStore> = Arc::new(FileSessionStore::new(config.session_file()));
        Self::with_store(config, store)
    }

    pub fn with_store(config: Config, store: Arc<dyn SessionStore>) -> Self {
        let player = Player::new(Duration::from_millis(config.inter_item_delay_ms))
            .with_store(Arc::clone(&store));
        Self { config, store, player }
    }

    /// Token that stops playback after the current item.
    pub fn cancellation_token(&self) -> CancellationToken {
        self.player.cancellation_token()
    }

    /// Replays the stored session over `dom` (for testing and custom drivers).
    ///
    /// The session is marked running in the store before the first item, and
    /// a session already marked running is left alone. The store is cleared
    /// once playback finishes or is cancelled.
    pub async fn fill_with_dom<D: Dom + 'static>(
        &self,
        dom: D,
        progress: &dyn ProgressObserver,
    ) -> Result<String> {
        let Some(mut session) = self.store.get()? else {
            return Ok("No active export".to_string());
        };

        if session.state == PlaybackState::Running || self.player.is_running() {
            warn!("Playback already running for {}", session.target);
            return Ok(ALREADY_RUNNING.to_string());
        }

        let action = action_for(session.target, dom).with_context(|| {
            format!("Automatic cart filling is not available for {}", session.target)
        })?;

        session.state = PlaybackState::Running;
        self.store.put(&session).context("Failed to mark playback as running")?;

        match self.player.run(&mut session, action.as_ref(), progress).await {
            Some(outcome) => Ok(Formatter::new(self.config.format).format_outcome(&outcome)),
            None => {
                warn!("Playback already running");
                Ok(ALREADY_RUNNING.to_string())
            }
        }
    }

    /// Opens the retailer in Chromium, waits for the user to log in, then
    /// fills the cart. Ctrl-C stops after the current item.
    #[cfg(feature = "browser")]
    pub async fn execute(
        &self,
        url: Option<&str>,
        chrome: Option<&std::path::Path>,
    ) -> Result<String> {
        use tokio::io::AsyncBufReadExt;

        let Some(session) = self.store.get()? else {
            return Ok("No active export".to_string());
        };
        if session.target.automation().is_none() {
            anyhow::bail!("Automatic cart filling is not available for {}", session.target);
        }
        if session.state == PlaybackState::Running {
            return Ok(ALREADY_RUNNING.to_string());
        }

        let browser = crate::browser::launch(chrome).await?;
        let dom = browser.open(url.unwrap_or(session.target.shop_url())).await?;

        eprintln!(
            "Ready to fill cart with {} items. Log in if needed, then press Enter to start.",
            session.items.len()
        );
        let mut line = String::new();
        tokio::io::BufReader::new(tokio::io::stdin())
            .read_line(&mut line)
            .await
            .context("Failed to read from stdin")?;

        let on_ctrl_c = self.cancellation_token();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                eprintln!("\nCancelling after the current item...");
                on_ctrl_c.cancel();
            }
        });

        let output = self.fill_with_dom(dom, &ConsoleProgress::default()).await;

        if let Err(e) = browser.close().await {
            warn!("{:#}", e);
        }
        output
    }

    #[cfg(not(feature = "browser"))]
    pub async fn execute(
        &self,
        _url: Option<&str>,
        _chrome: Option<&std::path::Path>,
    ) -> Result<String> {
        anyhow::bail!("cart-filler was built without the `browser` feature; rebuild with --features browser")
    }
}
