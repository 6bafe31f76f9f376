use std::collections::HashSet;
use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use rusqlite::{params, Connection, OptionalExtension};
use rusqlite_migration::{Migrations, M};

use crate::app::{LightboxError, Result};
use crate::domain::{PageRequest, Photo, RemoteKey};
use crate::store::CatalogStore;

const LAST_SYNC_KEY: &str = "last_sync_timestamp";

pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    pub fn new<P: AsRef<Path>>(path: P) -> Result<Self> {
        let conn = Connection::open(path)?;
        let store = Self {
            conn: Mutex::new(conn),
        };
        store.run_migrations()?;
        Ok(store)
    }

    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        let store = Self {
            conn: Mutex::new(conn),
        };
        store.run_migrations()?;
        Ok(store)
    }

    fn run_migrations(&self) -> Result<()> {
        let migrations = Migrations::new(vec![M::up(include_str!(
            "../../migrations/001-initial/up.sql"
        ))]);

        let mut conn = self.lock()?;
        conn.execute("PRAGMA foreign_keys = ON", [])?;
        migrations
            .to_latest(&mut conn)
            .map_err(|_| LightboxError::Store(rusqlite::Error::InvalidQuery))?;

        Ok(())
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn.lock().map_err(|e| {
            LightboxError::Store(rusqlite::Error::SqliteFailure(
                rusqlite::ffi::Error::new(1),
                Some(e.to_string()),
            ))
        })
    }

    fn row_to_photo(row: &rusqlite::Row<'_>) -> rusqlite::Result<Photo> {
        Ok(Photo {
            id: row.get(0)?,
            text: row.get(1)?,
            image_url: row.get(2)?,
            confidence: row.get(3)?,
            is_favorite: row.get::<_, i32>(4)? != 0,
        })
    }
}

impl CatalogStore for SqliteStore {
    fn photos(&self, limit: u32, offset: u32) -> Result<Vec<Photo>> {
        let conn = self.lock()?;

        let mut stmt = conn.prepare(
            "SELECT id, text, image_url, confidence, is_favorite
             FROM photos ORDER BY rowid LIMIT ?1 OFFSET ?2",
        )?;

        let photos = stmt
            .query_map(params![limit, offset], Self::row_to_photo)?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(photos)
    }

    fn photo(&self, id: &str) -> Result<Option<Photo>> {
        let conn = self.lock()?;

        let result = conn
            .query_row(
                "SELECT id, text, image_url, confidence, is_favorite
                 FROM photos WHERE id = ?1",
                params![id],
                Self::row_to_photo,
            )
            .optional()?;

        Ok(result)
    }

    fn photo_count(&self) -> Result<i64> {
        let conn = self.lock()?;
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM photos", [], |row| row.get(0))?;
        Ok(count)
    }

    fn favorite_ids(&self) -> Result<HashSet<String>> {
        let conn = self.lock()?;

        let mut stmt = conn.prepare("SELECT id FROM photos WHERE is_favorite = 1")?;
        let ids = stmt
            .query_map([], |row| row.get::<_, String>(0))?
            .collect::<std::result::Result<HashSet<_>, _>>()?;

        Ok(ids)
    }

    fn remote_key(&self, photo_id: &str) -> Result<Option<RemoteKey>> {
        let conn = self.lock()?;

        let result = conn
            .query_row(
                "SELECT photo_id, prev_key, next_key FROM remote_keys WHERE photo_id = ?1",
                params![photo_id],
                |row| {
                    Ok(RemoteKey {
                        photo_id: row.get(0)?,
                        prev_key: row.get(1)?,
                        next_key: row.get(2)?,
                    })
                },
            )
            .optional()?;

        Ok(result)
    }

    fn merge_page(&self, request: PageRequest, batch: &[Photo], synced_at: i64) -> Result<()> {
        let mut conn = self.lock()?;
        let tx = conn.transaction()?;

        // Favorite flags live only in this table, so remember them before
        // any row is replaced or deleted.
        let favorites: HashSet<String> = {
            let mut stmt = tx.prepare("SELECT id FROM photos WHERE is_favorite = 1")?;
            let ids = stmt
                .query_map([], |row| row.get::<_, String>(0))?
                .collect::<std::result::Result<HashSet<_>, _>>()?;
            ids
        };

        if request == PageRequest::Refresh {
            // Full replace: the feed is not stable across refreshes, so a
            // partial merge could leave stale rows behind.
            tx.execute("DELETE FROM remote_keys", [])?;
            tx.execute("DELETE FROM photos", [])?;
        }

        let next_key = batch.last().map(|photo| photo.id.clone());

        for photo in batch {
            let is_favorite = favorites.contains(&photo.id);
            tx.execute(
                "INSERT OR REPLACE INTO photos (id, text, image_url, confidence, is_favorite)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![
                    photo.id,
                    photo.text,
                    photo.image_url,
                    photo.confidence,
                    is_favorite as i32
                ],
            )?;
            tx.execute(
                "INSERT OR REPLACE INTO remote_keys (photo_id, prev_key, next_key)
                 VALUES (?1, NULL, ?2)",
                params![photo.id, next_key],
            )?;
        }

        if request == PageRequest::Refresh {
            // Recorded inside the transaction: a rolled-back refresh must
            // not claim a successful sync.
            tx.execute(
                "INSERT INTO sync_meta (key, value) VALUES (?1, ?2)
                 ON CONFLICT(key) DO UPDATE SET value = ?2",
                params![LAST_SYNC_KEY, synced_at],
            )?;
        }

        tx.commit()?;
        Ok(())
    }

    fn toggle_favorite(&self, id: &str) -> Result<bool> {
        let conn = self.lock()?;

        let updated = conn.execute(
            "UPDATE photos SET is_favorite = 1 - is_favorite WHERE id = ?1",
            params![id],
        )?;
        if updated == 0 {
            return Err(LightboxError::PhotoNotFound(id.to_string()));
        }

        let now_favorite: i32 = conn.query_row(
            "SELECT is_favorite FROM photos WHERE id = ?1",
            params![id],
            |row| row.get(0),
        )?;

        Ok(now_favorite != 0)
    }

    fn last_sync(&self) -> Result<i64> {
        let conn = self.lock()?;

        let value: Option<i64> = conn
            .query_row(
                "SELECT value FROM sync_meta WHERE key = ?1",
                params![LAST_SYNC_KEY],
                |row| row.get(0),
            )
            .optional()?;

        Ok(value.unwrap_or(0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn photo(id: &str) -> Photo {
        Photo {
            id: id.into(),
            text: format!("photo {}", id),
            image_url: format!("https://img.example.com/{}.png", id),
            confidence: 0.9,
            is_favorite: false,
        }
    }

    fn batch(ids: &[&str]) -> Vec<Photo> {
        ids.iter().map(|id| photo(id)).collect()
    }

    #[test]
    fn test_refresh_merge_inserts_photos_and_keys() {
        let store = SqliteStore::in_memory().unwrap();
        store
            .merge_page(PageRequest::Refresh, &batch(&["a", "b", "c"]), 1_000)
            .unwrap();

        assert_eq!(store.photo_count().unwrap(), 3);

        // Every key of the batch shares the last id as next_key.
        for id in ["a", "b", "c"] {
            let key = store.remote_key(id).unwrap().unwrap();
            assert_eq!(key.prev_key, None);
            assert_eq!(key.next_key, Some("c".into()));
        }
    }

    #[test]
    fn test_refresh_is_full_replace() {
        let store = SqliteStore::in_memory().unwrap();
        store
            .merge_page(PageRequest::Refresh, &batch(&["a", "b"]), 1_000)
            .unwrap();
        store
            .merge_page(PageRequest::Refresh, &batch(&["c"]), 2_000)
            .unwrap();

        assert!(store.photo("a").unwrap().is_none());
        assert!(store.photo("b").unwrap().is_none());
        assert!(store.photo("c").unwrap().is_some());
        assert!(store.remote_key("a").unwrap().is_none());
        assert_eq!(store.photo_count().unwrap(), 1);
    }

    #[test]
    fn test_favorite_survives_refresh_when_id_reappears() {
        let store = SqliteStore::in_memory().unwrap();
        store
            .merge_page(PageRequest::Refresh, &batch(&["a", "b"]), 1_000)
            .unwrap();
        store.toggle_favorite("a").unwrap();

        store
            .merge_page(PageRequest::Refresh, &batch(&["a", "b"]), 2_000)
            .unwrap();

        assert!(store.photo("a").unwrap().unwrap().is_favorite);
        assert!(!store.photo("b").unwrap().unwrap().is_favorite);
    }

    #[test]
    fn test_favorite_dropped_when_id_disappears() {
        let store = SqliteStore::in_memory().unwrap();
        store
            .merge_page(PageRequest::Refresh, &batch(&["a", "b"]), 1_000)
            .unwrap();
        store.toggle_favorite("a").unwrap();

        store
            .merge_page(PageRequest::Refresh, &batch(&["b"]), 2_000)
            .unwrap();

        assert!(store.photo("a").unwrap().is_none());
        assert_eq!(store.favorite_ids().unwrap().len(), 0);
    }

    #[test]
    fn test_append_merge_only_adds() {
        let store = SqliteStore::in_memory().unwrap();
        store
            .merge_page(PageRequest::Refresh, &batch(&["a", "b"]), 1_000)
            .unwrap();
        store
            .merge_page(PageRequest::Append, &batch(&["c", "d"]), 0)
            .unwrap();

        assert_eq!(store.photo_count().unwrap(), 4);
        assert!(store.photo("a").unwrap().is_some());
        // Earlier keys untouched, new keys point past the new batch.
        assert_eq!(
            store.remote_key("a").unwrap().unwrap().next_key,
            Some("b".into())
        );
        assert_eq!(
            store.remote_key("d").unwrap().unwrap().next_key,
            Some("d".into())
        );
    }

    #[test]
    fn test_append_preserves_favorite_on_refetched_id() {
        let store = SqliteStore::in_memory().unwrap();
        store
            .merge_page(PageRequest::Refresh, &batch(&["a", "b"]), 1_000)
            .unwrap();
        store.toggle_favorite("b").unwrap();

        // Server re-sends "b" in a later page; the REPLACE must not reset it.
        store
            .merge_page(PageRequest::Append, &batch(&["b", "c"]), 0)
            .unwrap();

        assert!(store.photo("b").unwrap().unwrap().is_favorite);
    }

    #[test]
    fn test_refresh_sets_last_sync_append_does_not() {
        let store = SqliteStore::in_memory().unwrap();
        assert_eq!(store.last_sync().unwrap(), 0);

        store
            .merge_page(PageRequest::Refresh, &batch(&["a"]), 1_234)
            .unwrap();
        assert_eq!(store.last_sync().unwrap(), 1_234);

        store
            .merge_page(PageRequest::Append, &batch(&["b"]), 9_999)
            .unwrap();
        assert_eq!(store.last_sync().unwrap(), 1_234);
    }

    #[test]
    fn test_empty_refresh_clears_and_stamps() {
        let store = SqliteStore::in_memory().unwrap();
        store
            .merge_page(PageRequest::Refresh, &batch(&["a"]), 1_000)
            .unwrap();
        store.merge_page(PageRequest::Refresh, &[], 2_000).unwrap();

        assert_eq!(store.photo_count().unwrap(), 0);
        assert_eq!(store.last_sync().unwrap(), 2_000);
    }

    #[test]
    fn test_toggle_favorite_roundtrip_restores_rows() {
        let store = SqliteStore::in_memory().unwrap();
        store
            .merge_page(PageRequest::Refresh, &batch(&["a", "b"]), 1_000)
            .unwrap();

        let before_photos = store.photos(10, 0).unwrap();
        let before_key = store.remote_key("a").unwrap();

        assert!(store.toggle_favorite("a").unwrap());
        assert!(!store.toggle_favorite("a").unwrap());

        assert_eq!(store.photos(10, 0).unwrap(), before_photos);
        assert_eq!(store.remote_key("a").unwrap(), before_key);
    }

    #[test]
    fn test_toggle_favorite_unknown_id() {
        let store = SqliteStore::in_memory().unwrap();
        let err = store.toggle_favorite("missing").unwrap_err();
        assert!(matches!(err, LightboxError::PhotoNotFound(_)));
    }

    #[test]
    fn test_photos_paged_in_feed_order() {
        let store = SqliteStore::in_memory().unwrap();
        store
            .merge_page(PageRequest::Refresh, &batch(&["a", "b", "c", "d"]), 1_000)
            .unwrap();

        let page = store.photos(2, 0).unwrap();
        assert_eq!(page.len(), 2);
        assert_eq!(page[0].id, "a");
        assert_eq!(page[1].id, "b");

        let page = store.photos(2, 2).unwrap();
        assert_eq!(page[0].id, "c");
        assert_eq!(page[1].id, "d");
    }

    #[test]
    fn test_persists_across_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("catalog.db");

        {
            let store = SqliteStore::new(&path).unwrap();
            store
                .merge_page(PageRequest::Refresh, &batch(&["a"]), 1_000)
                .unwrap();
            store.toggle_favorite("a").unwrap();
        }

        let store = SqliteStore::new(&path).unwrap();
        assert!(store.photo("a").unwrap().unwrap().is_favorite);
        assert_eq!(store.last_sync().unwrap(), 1_000);
    }
}
