//! Freshness classification and the UI-facing banner model.
//!
//! Everything here is pure data and pure functions; the reactive plumbing
//! that feeds them lives in [`crate::banner`].

/// Data younger than this is considered fresh.
pub const FRESH_DATA_THRESHOLD_MINUTES: i64 = 1;

/// Nominal interval between background syncs, used to derive the
/// "next update in N minutes" figure shown to the user.
pub const SYNC_INTERVAL_MINUTES: i64 = 60;

/// The kind of page load requested by the paging consumer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageRequest {
    /// Reload the feed from the beginning, replacing the cache.
    Refresh,
    /// Load backwards. The feed is forward-only, so this is always a
    /// terminal no-op.
    Prepend,
    /// Load the next page after the last cached one.
    Append,
}

/// How stale the local cache is relative to `now`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncStatus {
    NeverSynced,
    Offline { last_sync: i64 },
    DataIsFresh,
    DataIsStale { last_sync: i64 },
}

/// Classify cache freshness. Timestamps are epoch milliseconds;
/// `last_sync == 0` means no successful sync has ever completed.
pub fn classify(is_online: bool, last_sync: i64, now: i64) -> SyncStatus {
    if last_sync == 0 {
        return SyncStatus::NeverSynced;
    }

    if !is_online {
        return SyncStatus::Offline { last_sync };
    }

    let elapsed_minutes = (now - last_sync) / 60_000;
    if elapsed_minutes < FRESH_DATA_THRESHOLD_MINUTES {
        SyncStatus::DataIsFresh
    } else {
        SyncStatus::DataIsStale { last_sync }
    }
}

/// Ephemeral banner value published to the UI. Never persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BannerState {
    Hidden,
    Syncing,
    Updated,
    Offline {
        last_sync: i64,
    },
    Online {
        minutes_since_sync: i64,
        minutes_until_sync: i64,
    },
}

impl BannerState {
    /// Map a freshness status to its banner representation.
    pub fn from_status(status: SyncStatus, now: i64) -> Self {
        match status {
            SyncStatus::NeverSynced => BannerState::Hidden,
            SyncStatus::Offline { last_sync } => BannerState::Offline { last_sync },
            SyncStatus::DataIsFresh => BannerState::Updated,
            SyncStatus::DataIsStale { last_sync } => {
                let minutes_since_sync = (now - last_sync) / 60_000;
                BannerState::Online {
                    minutes_since_sync,
                    minutes_until_sync: (SYNC_INTERVAL_MINUTES - minutes_since_sync).max(0),
                }
            }
        }
    }
}

impl std::fmt::Display for BannerState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BannerState::Hidden => write!(f, "never synced"),
            BannerState::Syncing => write!(f, "syncing..."),
            BannerState::Updated => write!(f, "up to date"),
            BannerState::Offline { last_sync } => {
                write!(f, "offline (last synced at {})", format_millis(*last_sync))
            }
            BannerState::Online {
                minutes_since_sync,
                minutes_until_sync,
            } => write!(
                f,
                "updated {}m ago, next sync in {}m",
                minutes_since_sync, minutes_until_sync
            ),
        }
    }
}

fn format_millis(ms: i64) -> String {
    use chrono::{Local, TimeZone};
    match Local.timestamp_millis_opt(ms).single() {
        Some(dt) => dt.format("%Y-%m-%d %H:%M").to_string(),
        None => format!("{}ms", ms),
    }
}
