//! Background sync scheduler.
//!
//! Runs full refreshes off the request path of any one consumer. Requests
//! are de-duplicated into a single logical work slot: asking for a sync
//! while one is pending or running is a no-op. A run gets a bounded number
//! of attempts with exponential backoff; once they are exhausted the run
//! stays failed until someone explicitly requests a new one.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, watch};
use tracing::{debug, error, info, warn};

use crate::domain::PageRequest;
use crate::mediator::PageMediator;
use crate::store::CatalogStore;

/// Attempts per requested run, counting the first one.
const MAX_ATTEMPTS: u32 = 3;
/// Backoff before the second attempt; doubles for each further attempt.
const BACKOFF_BASE: Duration = Duration::from_secs(30);

/// Lifecycle of the single sync work slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncState {
    Idle,
    Pending,
    Running,
    /// All attempts of the last run failed. Cleared by the next request.
    Failed,
}

#[derive(Debug)]
enum SyncMessage {
    Sync,
    Shutdown,
}

/// Handle to the background scheduler task.
#[derive(Clone)]
pub struct SyncHandle {
    tx: mpsc::Sender<SyncMessage>,
    state: Arc<watch::Sender<SyncState>>,
}

impl SyncHandle {
    /// Request a full refresh. Idempotent while a run is pending or
    /// running; from `Idle` or `Failed` it admits a new run.
    pub async fn request_sync(&self) {
        let admitted = self.state.send_if_modified(|state| {
            if matches!(state, SyncState::Pending | SyncState::Running) {
                false
            } else {
                *state = SyncState::Pending;
                true
            }
        });

        if !admitted {
            debug!("sync already in flight, ignoring duplicate request");
            return;
        }

        if self.tx.send(SyncMessage::Sync).await.is_err() {
            warn!("sync scheduler is gone, dropping request");
            self.state.send_replace(SyncState::Failed);
        }
    }

    pub fn state(&self) -> SyncState {
        *self.state.borrow()
    }

    pub fn subscribe(&self) -> watch::Receiver<SyncState> {
        self.state.subscribe()
    }

    pub async fn shutdown(&self) {
        let _ = self.tx.send(SyncMessage::Shutdown).await;
    }
}

/// Scheduler worker; communicate with it through its [`SyncHandle`].
pub struct SyncScheduler<S: CatalogStore + Send + Sync + 'static> {
    mediator: Arc<PageMediator<S>>,
    rx: mpsc::Receiver<SyncMessage>,
    state: Arc<watch::Sender<SyncState>>,
}

impl<S: CatalogStore + Send + Sync + 'static> SyncScheduler<S> {
    pub fn new(mediator: Arc<PageMediator<S>>) -> (Self, SyncHandle) {
        let (tx, rx) = mpsc::channel(8);
        let state = Arc::new(watch::channel(SyncState::Idle).0);
        let handle = SyncHandle {
            tx,
            state: state.clone(),
        };
        (
            Self {
                mediator,
                rx,
                state,
            },
            handle,
        )
    }

    pub async fn run(mut self) {
        info!("sync scheduler started");

        while let Some(msg) = self.rx.recv().await {
            match msg {
                SyncMessage::Sync => self.run_once().await,
                SyncMessage::Shutdown => {
                    info!("sync scheduler shutting down");
                    break;
                }
            }
        }
    }

    async fn run_once(&self) {
        self.state.send_replace(SyncState::Running);

        let mut attempt = 1;
        loop {
            match self.mediator.load(PageRequest::Refresh, &[]).await {
                Ok(_) => {
                    info!(attempt, "sync completed");
                    self.state.send_replace(SyncState::Idle);
                    return;
                }
                Err(e) if attempt < MAX_ATTEMPTS => {
                    let delay = BACKOFF_BASE * 2u32.pow(attempt - 1);
                    warn!(attempt, error = %e, "sync failed, retrying in {:?}", delay);
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(e) => {
                    error!(attempt, error = %e, "sync failed permanently");
                    self.state.send_replace(SyncState::Failed);
                    return;
                }
            }
        }
    }
}

/// Spawn the scheduler as a tokio task and return its handle.
pub fn spawn_scheduler<S: CatalogStore + Send + Sync + 'static>(
    mediator: Arc<PageMediator<S>>,
) -> SyncHandle {
    let (scheduler, handle) = SyncScheduler::new(mediator);

    tokio::spawn(async move {
        scheduler.run().await;
    });

    handle
}
