//! Banner state reducer.
//!
//! Folds four independently-arriving signals into one UI-facing
//! [`BannerState`]: network reachability, the persisted last-sync
//! timestamp, a periodic tick (so elapsed-minute figures move without a
//! fresh event), and the transient visual-sync latch. Last value wins per
//! input; the reducer is a single task selecting over all of them.

use std::time::Duration;

use chrono::Utc;
use tokio::sync::{mpsc, watch};
use tokio::time::Instant;
use tracing::info;

use crate::domain::{classify, BannerState};
use crate::scheduler::SyncHandle;

/// Minimum time the `Syncing` banner stays visible once triggered,
/// however fast the underlying sync finishes.
pub const MIN_SYNCING_VISIBLE: Duration = Duration::from_millis(2_000);

const TICK_INTERVAL: Duration = Duration::from_secs(60);

#[derive(Debug)]
enum BannerCommand {
    TriggerVisualSync,
}

/// Handle for UI consumers: current state plus the visual-sync trigger.
#[derive(Clone)]
pub struct BannerHandle {
    cmd_tx: mpsc::Sender<BannerCommand>,
    state_rx: watch::Receiver<BannerState>,
}

impl BannerHandle {
    /// Show `Syncing` for at least [`MIN_SYNCING_VISIBLE`] and kick off a
    /// background sync. Triggering again while the latch is held extends
    /// the hold; it never cuts it short.
    pub async fn trigger_visual_sync(&self) {
        let _ = self.cmd_tx.send(BannerCommand::TriggerVisualSync).await;
    }

    pub fn state(&self) -> BannerState {
        self.state_rx.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<BannerState> {
        self.state_rx.clone()
    }
}

pub struct BannerReducer {
    online_rx: watch::Receiver<bool>,
    sync_rx: watch::Receiver<i64>,
    scheduler: SyncHandle,
    cmd_rx: mpsc::Receiver<BannerCommand>,
    state_tx: watch::Sender<BannerState>,
}

impl BannerReducer {
    /// `online_rx` carries reachability, `sync_rx` the last-sync
    /// timestamps (see [`crate::mediator::PageMediator::sync_times`]).
    pub fn new(
        online_rx: watch::Receiver<bool>,
        sync_rx: watch::Receiver<i64>,
        scheduler: SyncHandle,
    ) -> (Self, BannerHandle) {
        let (cmd_tx, cmd_rx) = mpsc::channel(8);
        let (state_tx, state_rx) = watch::channel(BannerState::Hidden);

        let handle = BannerHandle { cmd_tx, state_rx };
        let reducer = Self {
            online_rx,
            sync_rx,
            scheduler,
            cmd_rx,
            state_tx,
        };
        (reducer, handle)
    }

    pub async fn run(mut self) {
        info!("banner reducer started");
        let mut ticker = tokio::time::interval(TICK_INTERVAL);
        // Expiry of the visual-sync latch; None when not syncing.
        let mut latch: Option<Instant> = None;

        loop {
            self.publish(latch.is_some());

            tokio::select! {
                _ = ticker.tick() => {}
                changed = self.online_rx.changed() => {
                    if changed.is_err() {
                        break;
                    }
                }
                changed = self.sync_rx.changed() => {
                    if changed.is_err() {
                        break;
                    }
                }
                _ = async { tokio::time::sleep_until(latch.unwrap()).await }, if latch.is_some() => {
                    latch = None;
                }
                msg = self.cmd_rx.recv() => match msg {
                    Some(BannerCommand::TriggerVisualSync) => {
                        latch = Some(Instant::now() + MIN_SYNCING_VISIBLE);
                        self.scheduler.request_sync().await;
                    }
                    None => break,
                },
            }
        }

        info!("banner reducer stopped");
    }

    fn publish(&self, syncing: bool) {
        let state = if syncing {
            BannerState::Syncing
        } else {
            let is_online = *self.online_rx.borrow();
            let last_sync = *self.sync_rx.borrow();
            let now = Utc::now().timestamp_millis();
            BannerState::from_status(classify(is_online, last_sync, now), now)
        };

        self.state_tx.send_if_modified(|current| {
            if *current == state {
                false
            } else {
                *current = state;
                true
            }
        });
    }
}

/// Spawn the reducer as a tokio task and return the UI handle.
pub fn spawn_banner(
    online_rx: watch::Receiver<bool>,
    sync_rx: watch::Receiver<i64>,
    scheduler: SyncHandle,
) -> BannerHandle {
    let (reducer, handle) = BannerReducer::new(online_rx, sync_rx, scheduler);

    tokio::spawn(async move {
        reducer.run().await;
    });

    handle
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use async_trait::async_trait;

    use super::*;
    use crate::app::Result;
    use crate::domain::Photo;
    use crate::mediator::PageMediator;
    use crate::remote::RemoteSource;
    use crate::scheduler::spawn_scheduler;
    use crate::store::SqliteStore;

    /// Remote that always succeeds instantly with an empty feed.
    struct InstantRemote;

    #[async_trait]
    impl RemoteSource for InstantRemote {
        async fn fetch_page(&self, _cursor: Option<&str>) -> Result<Vec<Photo>> {
            Ok(Vec::new())
        }
    }

    struct Fixture {
        online_tx: watch::Sender<bool>,
        sync_tx: watch::Sender<i64>,
        handle: BannerHandle,
    }

    fn fixture(online: bool, last_sync: i64) -> Fixture {
        let store = Arc::new(SqliteStore::in_memory().unwrap());
        let mediator = Arc::new(PageMediator::new(store, Arc::new(InstantRemote)).unwrap());
        let scheduler = spawn_scheduler(mediator);

        let (online_tx, online_rx) = watch::channel(online);
        let (sync_tx, sync_rx) = watch::channel(last_sync);
        let handle = spawn_banner(online_rx, sync_rx, scheduler);

        Fixture {
            online_tx,
            sync_tx,
            handle,
        }
    }

    async fn wait_for_state(
        handle: &BannerHandle,
        pred: impl FnMut(&BannerState) -> bool,
    ) -> BannerState {
        let mut rx = handle.subscribe();
        let state = rx.wait_for(pred).await.unwrap().clone();
        state
    }

    #[tokio::test(start_paused = true)]
    async fn test_hidden_when_never_synced() {
        let fx = fixture(true, 0);
        let state = wait_for_state(&fx.handle, |s| *s == BannerState::Hidden).await;
        assert_eq!(state, BannerState::Hidden);
    }

    #[tokio::test(start_paused = true)]
    async fn test_updated_when_fresh() {
        let now = Utc::now().timestamp_millis();
        let fx = fixture(true, now - 30_000);
        wait_for_state(&fx.handle, |s| *s == BannerState::Updated).await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_online_with_minutes_when_stale() {
        let now = Utc::now().timestamp_millis();
        let fx = fixture(true, now - 65_000);
        let state = wait_for_state(&fx.handle, |s| matches!(s, BannerState::Online { .. })).await;
        assert_eq!(
            state,
            BannerState::Online {
                minutes_since_sync: 1,
                minutes_until_sync: 59
            }
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_offline_carries_last_sync() {
        let now = Utc::now().timestamp_millis();
        let last_sync = now - 65_000;
        let fx = fixture(true, last_sync);
        wait_for_state(&fx.handle, |s| matches!(s, BannerState::Online { .. })).await;

        fx.online_tx.send(false).unwrap();
        let state = wait_for_state(&fx.handle, |s| matches!(s, BannerState::Offline { .. })).await;
        assert_eq!(state, BannerState::Offline { last_sync });
    }

    #[tokio::test(start_paused = true)]
    async fn test_new_sync_timestamp_flips_to_updated() {
        let now = Utc::now().timestamp_millis();
        let fx = fixture(true, now - 65_000);
        wait_for_state(&fx.handle, |s| matches!(s, BannerState::Online { .. })).await;

        fx.sync_tx.send(Utc::now().timestamp_millis()).unwrap();
        wait_for_state(&fx.handle, |s| *s == BannerState::Updated).await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_latch_holds_for_minimum_duration() {
        let now = Utc::now().timestamp_millis();
        let fx = fixture(true, now - 30_000);
        wait_for_state(&fx.handle, |s| *s == BannerState::Updated).await;

        fx.handle.trigger_visual_sync().await;
        wait_for_state(&fx.handle, |s| *s == BannerState::Syncing).await;

        // The underlying sync finishes immediately; the banner must not.
        tokio::time::advance(Duration::from_millis(1_999)).await;
        tokio::task::yield_now().await;
        assert_eq!(fx.handle.state(), BannerState::Syncing);

        tokio::time::advance(Duration::from_millis(10)).await;
        wait_for_state(&fx.handle, |s| *s != BannerState::Syncing).await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_retrigger_extends_the_hold() {
        let now = Utc::now().timestamp_millis();
        let fx = fixture(true, now - 30_000);
        wait_for_state(&fx.handle, |s| *s == BannerState::Updated).await;

        fx.handle.trigger_visual_sync().await;
        wait_for_state(&fx.handle, |s| *s == BannerState::Syncing).await;

        tokio::time::advance(Duration::from_millis(1_500)).await;
        fx.handle.trigger_visual_sync().await;
        tokio::task::yield_now().await;

        // 2.5s after the first trigger, 1s after the second: still held.
        tokio::time::advance(Duration::from_millis(1_000)).await;
        tokio::task::yield_now().await;
        assert_eq!(fx.handle.state(), BannerState::Syncing);

        tokio::time::advance(Duration::from_millis(1_100)).await;
        wait_for_state(&fx.handle, |s| *s != BannerState::Syncing).await;
    }
}
