//! Sequential playback loop.

use super::actions::CartAction;
use super::session::SessionStore;
use super::{BasketItem, PlaybackError, PlaybackOutcome, PlaybackSession, PlaybackState};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Default pause between basket items.
pub const DEFAULT_INTER_ITEM_DELAY: Duration = Duration::from_millis(1500);

/// Receives playback progress.
pub trait ProgressObserver: Send + Sync {
    /// Item `index` (1-based) of `total` is about to be attempted.
    fn on_item_started(&self, _index: usize, _total: usize) {}

    /// Item `done` (1-based) of `total` was added.
    fn on_progress(&self, done: usize, total: usize);

    /// Item `index` (0-based) could not be added.
    fn on_item_failed(&self, _index: usize, _item: &BasketItem, _error: &PlaybackError) {}

    fn on_complete(&self, outcome: &PlaybackOutcome);

    /// Resets any progress indicator.
    fn clear(&self);
}

/// Reports progress through tracing.
pub struct LogProgress;

impl ProgressObserver for LogProgress {
    fn on_item_started(&self, index: usize, total: usize) {
        info!("Processing {}/{}...", index, total);
    }

    fn on_progress(&self, done: usize, total: usize) {
        debug!("Added item {}/{}", done, total);
    }

    fn on_complete(&self, outcome: &PlaybackOutcome) {
        info!(
            "Complete! Added {} items ({} failed)",
            outcome.success_count, outcome.fail_count
        );
    }

    fn clear(&self) {}
}

/// Replays baskets one item at a time.
///
/// Only one run is active per player; a second call while a run is in
/// progress returns `None` without doing anything.
pub struct Player {
    running: AtomicBool,
    inter_item_delay: Duration,
    cancel: CancellationToken,
    store: Option<Arc<dyn SessionStore>>,
}

/// Resets the running flag when a run ends, including when its future is
/// dropped mid-run.
struct RunningGuard<'a>(&'a AtomicBool);

impl Drop for RunningGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

impl Player {
    pub fn new(inter_item_delay: Duration) -> Self {
        Self {
            running: AtomicBool::new(false),
            inter_item_delay,
            cancel: CancellationToken::new(),
            store: None,
        }
    }

    /// Clears `store` once a run finishes.
    pub fn with_store(mut self, store: Arc<dyn SessionStore>) -> Self {
        self.store = Some(store);
        self
    }

    /// Uses an externally owned cancellation token.
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    /// Token that cancels playback between items. Once cancelled it stays
    /// cancelled for the lifetime of the player.
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Runs `action` for every item of `session`, in order.
    ///
    /// Item failures are logged and counted; the loop always moves on to
    /// the next item. Cancellation is honoured before each item and during
    /// the pause between items, never in the middle of one.
    pub async fn run(
        &self,
        session: &mut PlaybackSession,
        action: &dyn CartAction,
        progress: &dyn ProgressObserver,
    ) -> Option<PlaybackOutcome> {
        if self
            .running
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            debug!("Playback already running, ignoring request");
            return None;
        }
        let _guard = RunningGuard(&self.running);

        session.state = PlaybackState::Running;
        session.success_count = 0;
        session.fail_count = 0;
        session.current_index = 0;

        let total = session.items.len();
        let mut attempted = 0;
        let mut cancelled = false;

        info!("Filling {} cart with {} items", session.target, total);

        for index in 0..total {
            if self.cancel.is_cancelled() {
                cancelled = true;
                break;
            }

            session.current_index = index;
            let item = session.items[index].clone();
            progress.on_item_started(index + 1, total);
            attempted += 1;

            match action.add_item(&item).await {
                Ok(()) => {
                    session.success_count += 1;
                    progress.on_progress(index + 1, total);
                }
                Err(e) => {
                    warn!("Failed to add item {}: {}", item.label(), e);
                    session.fail_count += 1;
                    progress.on_item_failed(index, &item, &e);
                }
            }

            tokio::select! {
                _ = self.cancel.cancelled() => {
                    cancelled = true;
                    break;
                }
                _ = tokio::time::sleep(self.inter_item_delay) => {}
            }
        }

        session.state = if cancelled {
            PlaybackState::Cancelled
        } else {
            PlaybackState::Completed
        };

        let outcome = PlaybackOutcome {
            success_count: session.success_count,
            fail_count: session.fail_count,
            attempted,
            cancelled,
        };

        if cancelled {
            info!("Playback cancelled after {} of {} items", attempted, total);
        }

        progress.on_complete(&outcome);

        if let Some(store) = &self.store {
            if let Err(e) = store.clear() {
                warn!("Failed to clear session: {:#}", e);
            }
        }
        progress.clear();

        Some(outcome)
    }
}

impl Default for Player {
    fn default() -> Self {
        Self::new(DEFAULT_INTER_ITEM_DELAY)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::playback::session::MemorySessionStore;
    use crate::retailers::Retailer;
    use async_trait::async_trait;
    use std::sync::atomic::AtomicUsize;
    use std::sync::Mutex;
    use tokio_test::{assert_pending, task};

    /// Fails for items whose name starts with "bad"; optionally cancels
    /// the player after a given number of calls.
    struct ScriptedAction {
        calls: AtomicUsize,
        cancel_after: Option<(usize, CancellationToken)>,
    }

    impl ScriptedAction {
        fn new() -> Self {
            Self { calls: AtomicUsize::new(0), cancel_after: None }
        }

        fn cancelling_after(calls: usize, token: CancellationToken) -> Self {
            Self { calls: AtomicUsize::new(0), cancel_after: Some((calls, token)) }
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl CartAction for ScriptedAction {
        async fn add_item(&self, item: &BasketItem) -> Result<(), PlaybackError> {
            let calls = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
            if let Some((after, token)) = &self.cancel_after {
                if calls == *after {
                    token.cancel();
                }
            }

            if item.label().starts_with("bad") {
                Err(PlaybackError::AffordanceNotFound)
            } else {
                Ok(())
            }
        }
    }

    #[derive(Default)]
    struct RecordingObserver {
        events: Mutex<Vec<String>>,
    }

    impl RecordingObserver {
        fn events(&self) -> Vec<String> {
            self.events.lock().unwrap().clone()
        }
    }

    impl ProgressObserver for RecordingObserver {
        fn on_item_started(&self, index: usize, total: usize) {
            self.events.lock().unwrap().push(format!("start {}/{}", index, total));
        }

        fn on_progress(&self, done: usize, total: usize) {
            self.events.lock().unwrap().push(format!("progress {}/{}", done, total));
        }

        fn on_item_failed(&self, index: usize, _item: &BasketItem, error: &PlaybackError) {
            self.events.lock().unwrap().push(format!("failed {} {}", index, error));
        }

        fn on_complete(&self, outcome: &PlaybackOutcome) {
            self.events
                .lock()
                .unwrap()
                .push(format!("complete {} {}", outcome.success_count, outcome.fail_count));
        }

        fn clear(&self) {
            self.events.lock().unwrap().push("clear".to_string());
        }
    }

    fn session(names: &[&str]) -> PlaybackSession {
        let items = names.iter().map(|n| BasketItem::new(None, Some(n))).collect();
        PlaybackSession::new(Retailer::Shufersal, items, 0)
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_item_does_not_stop_playback() {
        let player = Player::default();
        let action = ScriptedAction::new();
        let observer = RecordingObserver::default();
        let mut session = session(&["milk", "bad bread", "eggs"]);

        let outcome = player.run(&mut session, &action, &observer).await.unwrap();

        assert_eq!(
            outcome,
            PlaybackOutcome { success_count: 2, fail_count: 1, attempted: 3, cancelled: false }
        );
        assert_eq!(action.calls(), 3);
        assert_eq!(session.state, PlaybackState::Completed);
        assert_eq!(session.current_index, 2);
        assert_eq!(
            observer.events(),
            vec![
                "start 1/3",
                "progress 1/3",
                "start 2/3",
                "failed 1 Add to cart button not found",
                "start 3/3",
                "progress 3/3",
                "complete 2 1",
                "clear",
            ]
        );
        assert!(!player.is_running());
    }

    #[tokio::test(start_paused = true)]
    async fn test_items_are_paced() {
        let player = Player::new(Duration::from_millis(1500));
        let mut session = session(&["a", "b", "c"]);

        let start = tokio::time::Instant::now();
        player.run(&mut session, &ScriptedAction::new(), &LogProgress).await.unwrap();

        assert_eq!(start.elapsed(), Duration::from_millis(4500));
    }

    #[tokio::test(start_paused = true)]
    async fn test_concurrent_runs_execute_once() {
        let player = Player::default();
        let action = ScriptedAction::new();
        let mut first = session(&["a", "b"]);
        let mut second = session(&["c", "d"]);

        let (a, b) = tokio::join!(
            player.run(&mut first, &action, &LogProgress),
            player.run(&mut second, &action, &LogProgress),
        );

        assert_eq!(a.is_some() as usize + b.is_some() as usize, 1);
        assert_eq!(action.calls(), 2);
        let states = [first.state, second.state];
        assert!(states.contains(&PlaybackState::Completed));
        assert!(states.contains(&PlaybackState::Idle));
    }

    #[tokio::test(start_paused = true)]
    async fn test_run_while_running_is_ignored() {
        let player = Player::default();
        let action = ScriptedAction::new();
        let mut first = session(&["a", "b"]);
        let mut second = session(&["c"]);

        {
            let mut running = task::spawn(player.run(&mut first, &action, &LogProgress));
            assert_pending!(running.poll());
            assert!(player.is_running());

            assert!(player.run(&mut second, &action, &LogProgress).await.is_none());
        }

        // Dropping the in-flight run releases the guard
        assert!(!player.is_running());
        let outcome = player.run(&mut second, &action, &LogProgress).await.unwrap();
        assert_eq!(outcome.success_count, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_between_items() {
        let player = Player::default();
        let action = ScriptedAction::cancelling_after(1, player.cancellation_token());
        let observer = RecordingObserver::default();
        let mut session = session(&["a", "b", "c"]);

        let outcome = player.run(&mut session, &action, &observer).await.unwrap();

        assert!(outcome.cancelled);
        assert_eq!(outcome.attempted, 1);
        assert_eq!(outcome.success_count, 1);
        assert_eq!(action.calls(), 1);
        assert_eq!(session.state, PlaybackState::Cancelled);
        assert_eq!(observer.events().last().unwrap(), "clear");
    }

    #[tokio::test]
    async fn test_cancelled_before_start() {
        let token = CancellationToken::new();
        token.cancel();
        let player = Player::default().with_cancellation(token);
        let action = ScriptedAction::new();
        let mut session = session(&["a"]);

        let outcome = player.run(&mut session, &action, &LogProgress).await.unwrap();

        assert!(outcome.cancelled);
        assert_eq!(outcome.attempted, 0);
        assert_eq!(action.calls(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_store_cleared_on_completion() {
        let store = Arc::new(MemorySessionStore::new());
        let mut session = session(&["a"]);
        store.put(&session).unwrap();

        let player = Player::default().with_store(store.clone());
        player.run(&mut session, &ScriptedAction::new(), &LogProgress).await.unwrap();

        assert!(store.get().unwrap().is_none());
    }

    #[tokio::test]
    async fn test_empty_basket() {
        let player = Player::default();
        let mut session = session(&[]);

        let outcome = player.run(&mut session, &ScriptedAction::new(), &LogProgress).await.unwrap();

        assert_eq!(outcome, PlaybackOutcome::default());
        assert_eq!(session.state, PlaybackState::Completed);
    }
}
