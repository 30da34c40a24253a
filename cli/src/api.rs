//! HTTP collaborators: the bflist server listing and the gametools stats API.

use std::time::Duration;

use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value;
use tracing::debug;

use crate::config::USER_AGENT;
use crate::error::{Result, ScrapeError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct LiveStats {
    pub servers: u64,
    pub players: u64,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Server {
    pub ip: String,
    pub port: u16,
    pub players: Vec<ServerPlayer>,
}

impl Server {
    pub fn is_empty(&self) -> bool {
        self.players.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ServerPlayer {
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ServerPage {
    pub servers: Vec<Server>,
    pub cursor: Option<String>,
    #[serde(rename = "hasMore")]
    pub has_more: bool,
}

/// Position after a page: the opaque cursor from the response together with
/// the `ip:port` of the last server on that page. Always sent as a pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageCursor {
    pub cursor: String,
    pub after: String,
}

impl PageCursor {
    /// `None` when the page had no cursor or no servers to anchor `after` on.
    pub fn following(page: &ServerPage) -> Option<Self> {
        let cursor = page.cursor.clone()?;
        let last = page.servers.last()?;
        Some(Self {
            cursor,
            after: format!("{}:{}", last.ip, last.port),
        })
    }
}

#[allow(async_fn_in_trait)]
pub trait ServerListing {
    async fn livestats(&self) -> Result<LiveStats>;

    async fn servers(&self, position: Option<&PageCursor>) -> Result<ServerPage>;
}

#[allow(async_fn_in_trait)]
pub trait PlayerStatsSource {
    /// Raw `all` payload for one player name.
    async fn player_stats(&self, name: &str) -> Result<Value>;
}

pub fn build_client() -> Result<reqwest::Client> {
    let client = reqwest::Client::builder()
        .timeout(Duration::from_secs(30))
        .pool_max_idle_per_host(2)
        .user_agent(USER_AGENT)
        .build()?;
    Ok(client)
}

async fn get_json<T: DeserializeOwned>(
    client: &reqwest::Client,
    url: &str,
    query: &[(&str, &str)],
) -> Result<T> {
    debug!(url, ?query, "GET");
    let response = client.get(url).query(query).send().await?;

    if !response.status().is_success() {
        return Err(ScrapeError::Status {
            status: response.status(),
            url: url.to_string(),
        });
    }

    let body = response.bytes().await?;
    serde_json::from_slice(&body)
        .map_err(|e| ScrapeError::malformed(format!("{url}: {e}")))
}

fn join(base: &str, path: &str) -> String {
    format!("{}/{}", base.trim_end_matches('/'), path)
}

#[derive(Debug, Clone)]
pub struct BfListClient {
    client: reqwest::Client,
    base: String,
}

impl BfListClient {
    pub fn new(client: reqwest::Client, base: impl Into<String>) -> Self {
        Self {
            client,
            base: base.into(),
        }
    }
}

impl ServerListing for BfListClient {
    async fn livestats(&self) -> Result<LiveStats> {
        get_json(&self.client, &join(&self.base, "livestats"), &[]).await
    }

    async fn servers(&self, position: Option<&PageCursor>) -> Result<ServerPage> {
        let url = join(&self.base, "servers");
        match position {
            Some(p) => {
                let query = [("cursor", p.cursor.as_str()), ("after", p.after.as_str())];
                get_json(&self.client, &url, &query).await
            }
            None => get_json(&self.client, &url, &[]).await,
        }
    }
}

#[derive(Debug, Clone)]
pub struct GameToolsClient {
    client: reqwest::Client,
    base: String,
}

impl GameToolsClient {
    pub fn new(client: reqwest::Client, base: impl Into<String>) -> Self {
        Self {
            client,
            base: base.into(),
        }
    }
}

impl PlayerStatsSource for GameToolsClient {
    async fn player_stats(&self, name: &str) -> Result<Value> {
        let query = [("name", name), ("format_values", "false")];
        get_json(&self.client, &join(&self.base, "all"), &query).await
    }
}
