use std::collections::HashSet;
use std::time::Duration;

use tokio::time::sleep;
use tracing::{info, warn};

use crate::api::{PageCursor, Server, ServerListing};
use crate::error::{Result, ScrapeError};

/// Walks every page of the server listing and returns the servers that have
/// at least one player. Any failure discards the pages fetched so far.
pub async fn fetch_all_servers<L: ServerListing>(listing: &L, delay: Duration) -> Result<Vec<Server>> {
    let total = match listing.livestats().await {
        Ok(stats) => {
            info!(
                servers = stats.servers,
                players = stats.players,
                "Fetched livestats"
            );
            Some(stats.servers)
        }
        Err(e) => {
            warn!(error = %e, "Failed to fetch livestats");
            None
        }
    };
    sleep(delay).await;

    let mut active = Vec::new();
    let mut position: Option<PageCursor> = None;
    let mut fetched = 0usize;

    loop {
        let page = listing.servers(position.as_ref()).await?;
        fetched += page.servers.len();

        match total {
            Some(total) => info!("Fetched {}/{} servers", fetched, total),
            None => info!("Fetched {}/? servers", fetched),
        }

        let next = PageCursor::following(&page);
        let has_more = page.has_more;

        active.extend(page.servers.into_iter().filter(|s| !s.is_empty()));

        if !has_more {
            break;
        }

        position = match next {
            Some(next) => Some(next),
            None => {
                return Err(ScrapeError::malformed(
                    "listing reports more pages but gave no cursor to continue from",
                ))
            }
        };

        sleep(delay).await;
    }

    Ok(active)
}

/// Distinct player names across all rosters.
pub fn extract_players(servers: &[Server]) -> HashSet<String> {
    servers
        .iter()
        .flat_map(|server| server.players.iter())
        .map(|player| player.name.clone())
        .collect()
}
