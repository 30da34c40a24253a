use std::path::PathBuf;
use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use bf4_player_db::api::{build_client, BfListClient, GameToolsClient};
use bf4_player_db::config::{BFLIST_BASE, GAMETOOLS_BASE};
use bf4_player_db::cycle::{self, CycleSettings};
use bf4_player_db::merge::DedupPolicy;
use bf4_player_db::normalize::Taxonomy;
use bf4_player_db::record::RecordBuilder;

#[derive(Parser)]
#[command(name = "bf4-player-db")]
#[command(about = "Build a Battlefield 4 player stats dataset from the players currently online")]
struct Cli {
    /// Path to the output CSV file
    #[arg(short, long, default_value = "dataset.csv")]
    output: PathBuf,

    /// Delay between API requests in milliseconds
    #[arg(short, long, default_value = "500")]
    delay: u64,

    /// Seconds between scraping cycles; 0 runs a single cycle
    #[arg(short, long, default_value = "10")]
    interval: u64,

    /// How a player is recognised as already in the dataset
    #[arg(long, value_enum, default_value_t = DedupPolicy::NameOrId)]
    dedup: DedupPolicy,

    /// Base URL of the server listing API
    #[arg(long, default_value = BFLIST_BASE)]
    servers_api: String,

    /// Base URL of the player stats API
    #[arg(long, default_value = GAMETOOLS_BASE)]
    stats_api: String,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();

    info!("BF4 player stats scraper");
    info!("Output file: {}", cli.output.display());
    info!("Request delay: {}ms, cycle interval: {}s", cli.delay, cli.interval);

    let client = build_client().context("failed to build HTTP client")?;
    let listing = BfListClient::new(client.clone(), cli.servers_api);
    let stats = GameToolsClient::new(client, cli.stats_api);
    let builder = RecordBuilder::new(Taxonomy::weapons(), Taxonomy::vehicles());

    let settings = CycleSettings {
        output: cli.output,
        delay: Duration::from_millis(cli.delay),
        interval: Duration::from_secs(cli.interval),
        policy: cli.dedup,
    };

    cycle::run(&listing, &stats, &builder, &settings)
        .await
        .with_context(|| format!("scraping into {} failed", settings.output.display()))?;

    Ok(())
}
