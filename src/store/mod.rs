pub mod sqlite;

use std::collections::HashSet;

use crate::app::Result;
use crate::domain::{PageRequest, Photo, RemoteKey};

pub use sqlite::SqliteStore;

/// Persistence seam for the catalog cache.
///
/// The merge engine is the only writer of photo and remote-key rows;
/// everything else is reads plus the single-row favorite toggle.
pub trait CatalogStore {
    // Paged reads (the UI's item source)
    fn photos(&self, limit: u32, offset: u32) -> Result<Vec<Photo>>;
    fn photo(&self, id: &str) -> Result<Option<Photo>>;
    fn photo_count(&self) -> Result<i64>;
    fn favorite_ids(&self) -> Result<HashSet<String>>;

    // Pagination bookkeeping
    fn remote_key(&self, photo_id: &str) -> Result<Option<RemoteKey>>;

    /// Reconcile a fetched batch into the cache, atomically.
    ///
    /// On `Refresh` this is a full replace that also records `synced_at`
    /// as the last-sync timestamp; on `Append` it only adds rows. In both
    /// cases favorite flags on re-fetched ids survive.
    fn merge_page(&self, request: PageRequest, batch: &[Photo], synced_at: i64) -> Result<()>;

    // Local-only state
    fn toggle_favorite(&self, id: &str) -> Result<bool>;

    /// Epoch milliseconds of the last successful refresh, 0 if never.
    fn last_sync(&self) -> Result<i64>;
}
