use std::sync::Arc;

use chrono::Utc;
use tokio::sync::watch;

use crate::app::{AppContext, Result};
use crate::banner::spawn_banner;
use crate::domain::{classify, BannerState};
use crate::scheduler::spawn_scheduler;
use crate::store::CatalogStore;

const LIST_PAGE_SIZE: u32 = 100;

pub async fn sync(ctx: &AppContext) -> Result<()> {
    println!("Syncing catalog...");
    let pages = ctx.mediator.refresh_to_end().await?;
    let count = ctx.store.photo_count()?;
    println!("Synced {} photos in {} pages", count, pages);
    Ok(())
}

pub fn list(ctx: &AppContext, favorites_only: bool) -> Result<()> {
    let mut offset = 0;
    let mut shown = 0;

    loop {
        let page = ctx.store.photos(LIST_PAGE_SIZE, offset)?;
        if page.is_empty() {
            break;
        }
        offset += page.len() as u32;

        for photo in &page {
            if favorites_only && !photo.is_favorite {
                continue;
            }
            let marker = if photo.is_favorite { "*" } else { " " };
            println!(
                "{} {}  {:>4.0}%  {}",
                marker,
                photo.id,
                photo.confidence * 100.0,
                photo.display_text()
            );
            shown += 1;
        }
    }

    if shown == 0 {
        println!("No photos cached. Run `lightbox sync` first.");
    }
    Ok(())
}

pub fn show(ctx: &AppContext, id: &str) -> Result<()> {
    match ctx.store.photo(id)? {
        Some(photo) => {
            println!("id:         {}", photo.id);
            println!("text:       {}", photo.display_text());
            println!("image:      {}", photo.image_url);
            println!("confidence: {:.2}", photo.confidence);
            println!("favorite:   {}", photo.is_favorite);
        }
        None => println!("No photo with id {}", id),
    }
    Ok(())
}

pub fn favorite(ctx: &AppContext, id: &str) -> Result<()> {
    let now_favorite = ctx.store.toggle_favorite(id)?;
    if now_favorite {
        println!("Marked {} as favorite", id);
    } else {
        println!("Removed favorite from {}", id);
    }
    Ok(())
}

pub fn status(ctx: &AppContext) -> Result<()> {
    let last_sync = ctx.store.last_sync()?;
    let now = Utc::now().timestamp_millis();
    let state = BannerState::from_status(classify(true, last_sync, now), now);
    println!("{}", state);
    println!("{} photos cached", ctx.store.photo_count()?);
    Ok(())
}

/// Run the scheduler and banner reducer, trigger a visual sync, and print
/// every banner transition until Ctrl-C.
pub async fn watch(ctx: Arc<AppContext>) -> Result<()> {
    let scheduler = spawn_scheduler(ctx.mediator.clone());
    let (_online_tx, online_rx) = watch::channel(true);
    let banner = spawn_banner(online_rx, ctx.mediator.sync_times(), scheduler);

    banner.trigger_visual_sync().await;

    let mut states = banner.subscribe();
    loop {
        println!("{}", states.borrow_and_update().clone());
        tokio::select! {
            changed = states.changed() => {
                if changed.is_err() {
                    break;
                }
            }
            _ = tokio::signal::ctrl_c() => break,
        }
    }

    Ok(())
}
