//! Pagination mediator: decides per page request whether the remote feed
//! must be consulted, and drives the merge engine with the result.

use std::sync::Arc;

use chrono::Utc;
use tokio::sync::{watch, Mutex};
use tracing::debug;

use crate::app::Result;
use crate::domain::{PageRequest, Photo};
use crate::remote::RemoteSource;
use crate::store::CatalogStore;

/// Successful outcome of a page load.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoadOutcome {
    /// True when the feed has no further pages in the requested direction.
    pub end_reached: bool,
}

impl LoadOutcome {
    const END: Self = Self { end_reached: true };
}

pub struct PageMediator<S> {
    store: Arc<S>,
    remote: Arc<dyn RemoteSource>,
    /// Serializes store-mutating loads so a refresh and an append in
    /// flight cannot interleave their transactions.
    write_gate: Mutex<()>,
    sync_times: watch::Sender<i64>,
}

impl<S: CatalogStore> PageMediator<S> {
    pub fn new(store: Arc<S>, remote: Arc<dyn RemoteSource>) -> Result<Self> {
        let (sync_times, _) = watch::channel(store.last_sync()?);
        Ok(Self {
            store,
            remote,
            write_gate: Mutex::new(()),
            sync_times,
        })
    }

    /// Last-sync timestamps, re-published after every successful refresh.
    /// The banner reducer subscribes here.
    pub fn sync_times(&self) -> watch::Receiver<i64> {
        self.sync_times.subscribe()
    }

    /// Load one page of the given kind. `pages` is the consumer's current
    /// snapshot of loaded pages, used to locate the append cursor.
    ///
    /// The fetched batch is merged into the store in a single transaction;
    /// on any error nothing is written.
    pub async fn load(&self, request: PageRequest, pages: &[Vec<Photo>]) -> Result<LoadOutcome> {
        let cursor = match request {
            PageRequest::Refresh => None,
            // The feed has no backward direction; this is a fixed terminal
            // response, not an error.
            PageRequest::Prepend => return Ok(LoadOutcome::END),
            PageRequest::Append => {
                let last_item = pages
                    .iter()
                    .rev()
                    .find(|page| !page.is_empty())
                    .and_then(|page| page.last());

                let Some(last_item) = last_item else {
                    return Ok(LoadOutcome::END);
                };

                match self.store.remote_key(&last_item.id)? {
                    Some(key) => match key.next_key {
                        Some(next) => Some(next),
                        None => return Ok(LoadOutcome::END),
                    },
                    None => return Ok(LoadOutcome::END),
                }
            }
        };

        let batch = self.remote.fetch_page(cursor.as_deref()).await?;
        let end_reached = batch.is_empty();
        debug!(
            ?request,
            cursor = cursor.as_deref().unwrap_or("<start>"),
            fetched = batch.len(),
            "merging page"
        );

        let synced_at = Utc::now().timestamp_millis();
        {
            let _gate = self.write_gate.lock().await;
            self.store.merge_page(request, &batch, synced_at)?;
        }

        if request == PageRequest::Refresh {
            self.sync_times.send_replace(synced_at);
        }

        Ok(LoadOutcome { end_reached })
    }

    /// Mirror the whole feed locally: one refresh followed by appends
    /// until the server reports the end. Returns the number of pages
    /// fetched.
    pub async fn refresh_to_end(&self) -> Result<usize> {
        let mut outcome = self.load(PageRequest::Refresh, &[]).await?;
        let mut pages = 1;

        while !outcome.end_reached {
            let count = self.store.photo_count()?.max(1) as u32;
            let cached = self.store.photos(count, 0)?;
            outcome = self.load(PageRequest::Append, &[cached]).await?;
            pages += 1;
        }

        Ok(pages)
    }
}
