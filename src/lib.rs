//! # Lightbox
//!
//! A local, queryable cache of a cursor-paginated photo catalog, kept
//! consistent with the server by an incremental sync engine.
//!
//! ## Architecture
//!
//! ```text
//! RemoteSource → PageMediator → SqliteStore (merge engine)
//!                     ↑                ↓
//!               SyncScheduler    paged reads / favorite toggles
//!                     ↑
//!               BannerReducer → BannerState (UI)
//! ```
//!
//! Page requests (refresh / append) flow through the
//! [`mediator::PageMediator`], which resolves the fetch cursor from the
//! stored remote keys, calls the remote at most once, and merges the
//! batch into the store in a single transaction. Favorite flags are
//! local-only and survive destructive refreshes.
//!
//! Background freshness is handled by the [`scheduler`] (a de-duplicated,
//! bounded-retry work slot) and surfaced to the UI by the [`banner`]
//! reducer, which folds reachability, the last-sync timestamp, a periodic
//! tick, and the visual-sync latch into one [`domain::BannerState`].

/// Application context and error handling.
///
/// [`AppContext`](app::AppContext) wires config, store, remote source,
/// and mediator together.
pub mod app;

/// Banner state reducer: multi-signal fan-in with an anti-flicker latch.
pub mod banner;

/// Command-line interface using clap.
pub mod cli;

/// TOML configuration from `~/.config/lightbox/config.toml`.
pub mod config;

/// Background daemon for periodic refreshes.
pub mod daemon;

/// Core domain models: [`Photo`](domain::Photo),
/// [`RemoteKey`](domain::RemoteKey), freshness classification, and the
/// banner model.
pub mod domain;

/// Pagination mediator: cursor resolution and transactional page merges.
pub mod mediator;

/// Paginated catalog endpoint.
///
/// [`RemoteSource`](remote::RemoteSource) is the async seam;
/// [`HttpRemoteSource`](remote::HttpRemoteSource) is the reqwest-based
/// implementation.
pub mod remote;

/// Background sync scheduler: single-slot, bounded retries.
pub mod scheduler;

/// SQLite persistence layer.
///
/// [`CatalogStore`](store::CatalogStore) defines the storage seam;
/// [`SqliteStore`](store::SqliteStore) implements it, including the
/// favorite-preserving merge engine.
pub mod store;
