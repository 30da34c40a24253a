use std::path::PathBuf;
use std::time::Duration;

use chrono::Local;
use tokio::time::sleep;
use tracing::{error, info};

use crate::api::{PlayerStatsSource, ServerListing};
use crate::dataset::Dataset;
use crate::error::{Result, ScrapeError};
use crate::merge::{merge, DedupPolicy, MergeOutcome, StatsFetcher};
use crate::pager::{extract_players, fetch_all_servers};
use crate::record::RecordBuilder;

#[derive(Debug, Clone)]
pub struct CycleSettings {
    pub output: PathBuf,
    /// Pause between consecutive requests to either API.
    pub delay: Duration,
    /// Pause between cycles; zero runs a single cycle.
    pub interval: Duration,
    pub policy: DedupPolicy,
}

/// One pass: list servers, collect the online players, add the unknown ones.
pub async fn run_cycle<L, S>(
    listing: &L,
    stats: &S,
    builder: &RecordBuilder,
    settings: &CycleSettings,
) -> Result<MergeOutcome>
where
    L: ServerListing,
    S: PlayerStatsSource,
{
    let servers = fetch_all_servers(listing, settings.delay).await?;
    let players = extract_players(&servers);
    info!(
        servers = servers.len(),
        players = players.len(),
        "Updating player stats dataset: {}",
        settings.output.display()
    );

    let mut dataset = Dataset::open(&settings.output)?;
    if !dataset.exists() {
        info!("Dataset not found, it will be created with a header");
    } else if dataset.is_empty() {
        info!("Dataset has a header but no players yet");
    } else {
        info!(rows = dataset.len(), "Loaded existing dataset");
    }

    let fetcher = StatsFetcher::new(stats, builder);
    merge(&mut dataset, &players, &fetcher, settings.policy, settings.delay).await
}

/// Repeats [`run_cycle`] until interrupted. A failed server pass skips the
/// cycle; a dataset failure stops the loop.
pub async fn run<L, S>(listing: &L, stats: &S, builder: &RecordBuilder, settings: &CycleSettings) -> Result<()>
where
    L: ServerListing,
    S: PlayerStatsSource,
{
    loop {
        info!(
            "Starting player stats scraping cycle at {}",
            Local::now().format("%Y-%m-%d %H:%M:%S")
        );

        let result = tokio::select! {
            result = run_cycle(listing, stats, builder, settings) => result,
            _ = tokio::signal::ctrl_c() => {
                info!("Interrupted, stopping");
                return Ok(());
            }
        };

        match result {
            Ok(outcome) => info!(
                appended = outcome.appended,
                known = outcome.known,
                failed = outcome.failed,
                "Scraping cycle completed"
            ),
            Err(e @ ScrapeError::Persistence { .. }) => return Err(e),
            Err(e) if settings.interval.is_zero() => return Err(e),
            Err(e) => error!(error = %e, "Failed to retrieve server data, skipping this cycle"),
        }

        if settings.interval.is_zero() {
            return Ok(());
        }

        if let Ok(wait) = chrono::Duration::from_std(settings.interval) {
            info!(
                "Waiting {}s until the next cycle at {}",
                settings.interval.as_secs(),
                (Local::now() + wait).format("%H:%M:%S")
            );
        }

        tokio::select! {
            _ = sleep(settings.interval) => {}
            _ = tokio::signal::ctrl_c() => {
                info!("Interrupted, stopping");
                return Ok(());
            }
        }
    }
}
