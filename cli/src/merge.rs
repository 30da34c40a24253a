use std::collections::HashSet;
use std::time::Duration;

use tokio::time::sleep;
use tracing::{debug, info, warn};

use crate::api::PlayerStatsSource;
use crate::dataset::Dataset;
use crate::error::Result;
use crate::record::{PlayerRecord, RecordBuilder};

/// How a candidate is recognised as already present in the dataset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum DedupPolicy {
    /// Skip known names before fetching, then skip known ids after.
    #[default]
    NameOrId,
    /// Fetch every candidate and key only by id, so a reused name with a new
    /// id is still added.
    IdOnly,
}

#[allow(async_fn_in_trait)]
pub trait RecordFetcher {
    async fn fetch_record(&self, name: &str) -> Result<PlayerRecord>;
}

/// Fetches a player's raw stats and flattens them.
pub struct StatsFetcher<'a, S> {
    source: &'a S,
    builder: &'a RecordBuilder,
}

impl<'a, S: PlayerStatsSource> StatsFetcher<'a, S> {
    pub fn new(source: &'a S, builder: &'a RecordBuilder) -> Self {
        Self { source, builder }
    }
}

impl<S: PlayerStatsSource> RecordFetcher for StatsFetcher<'_, S> {
    async fn fetch_record(&self, name: &str) -> Result<PlayerRecord> {
        let payload = self.source.player_stats(name).await?;
        self.builder.build_record(name, &payload)
    }
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct MergeOutcome {
    pub appended: usize,
    pub known: usize,
    pub failed: usize,
}

/// Fetches every candidate not yet in `dataset` and appends the new ones in
/// a single write. Players whose fetch fails are left out of this round.
pub async fn merge<F: RecordFetcher>(
    dataset: &mut Dataset,
    candidates: &HashSet<String>,
    fetcher: &F,
    policy: DedupPolicy,
    delay: Duration,
) -> Result<MergeOutcome> {
    let mut names: Vec<&String> = candidates.iter().collect();
    names.sort();

    let mut outcome = MergeOutcome::default();
    let mut fresh: Vec<PlayerRecord> = Vec::new();
    let mut fresh_ids = HashSet::new();
    let mut fetched_any = false;

    for name in names {
        if policy == DedupPolicy::NameOrId && dataset.knows_name(name) {
            outcome.known += 1;
            continue;
        }

        if fetched_any {
            sleep(delay).await;
        }
        fetched_any = true;

        let record = match fetcher.fetch_record(name).await {
            Ok(record) => record,
            Err(e) => {
                warn!(player = %name, error = %e, "Failed to fetch player stats");
                outcome.failed += 1;
                continue;
            }
        };

        let id = record.id();
        if dataset.knows_id(&id) || !fresh_ids.insert(id) {
            debug!(player = %name, id = %record.id(), "Already in dataset by id");
            outcome.known += 1;
            continue;
        }

        info!("Successfully fetched {}'s stats", name);
        fresh.push(record);
    }

    outcome.appended = dataset.append(&fresh)?;

    if outcome.appended > 0 {
        info!(
            path = %dataset.path().display(),
            "Added {} new players to dataset", outcome.appended
        );
    } else {
        warn!("No players were added to dataset");
    }

    Ok(outcome)
}
