use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::{Context, Result};
use once_cell::sync::OnceCell;
use reqwest::blocking::Client;
use tracing::warn;

use crate::team_stats::AdvancedStats;

const REQUEST_TIMEOUT_SECS: u64 = 10;

static CLIENT: OnceCell<Client> = OnceCell::new();

fn http_client() -> Result<&'static Client> {
    CLIENT.get_or_try_init(|| {
        Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .context("failed to build http client")
    })
}

pub type AdvancedStatsMap = HashMap<String, AdvancedStats>;

/// Per-season cache over the advanced-stats feed.
///
/// An explicit value rather than module state, so concurrent seasons and test
/// runs don't interfere. Loading never fails: a fetch or parse error degrades
/// to an empty map (cached, so the feed is not hammered on every matchup) and
/// the engine falls back to its non-advanced paths.
pub struct AdvancedStatsCache {
    base_url: Option<String>,
    seasons: Mutex<HashMap<i32, Arc<AdvancedStatsMap>>>,
}

impl AdvancedStatsCache {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: Some(base_url.into()),
            seasons: Mutex::new(HashMap::new()),
        }
    }

    /// Cache with no feed behind it: every season resolves empty unless
    /// seeded with `insert`. Used offline and in tests.
    pub fn offline() -> Self {
        Self {
            base_url: None,
            seasons: Mutex::new(HashMap::new()),
        }
    }

    /// Advanced stats for a season, fetching on first use. This is the one
    /// blocking I/O point of the engine.
    pub fn load(&self, season: i32) -> Arc<AdvancedStatsMap> {
        {
            let seasons = self.seasons.lock().expect("advanced stats lock poisoned");
            if let Some(cached) = seasons.get(&season) {
                return Arc::clone(cached);
            }
        }

        let map = match &self.base_url {
            Some(base) => match fetch_season(base, season) {
                Ok(map) => map,
                Err(err) => {
                    warn!(season, error = %err, "advanced stats unavailable, using base model");
                    AdvancedStatsMap::new()
                }
            },
            None => AdvancedStatsMap::new(),
        };

        let map = Arc::new(map);
        let mut seasons = self.seasons.lock().expect("advanced stats lock poisoned");
        seasons
            .entry(season)
            .or_insert_with(|| Arc::clone(&map))
            .clone()
    }

    /// Seed or replace a season's map directly.
    pub fn insert(&self, season: i32, map: AdvancedStatsMap) {
        let mut seasons = self.seasons.lock().expect("advanced stats lock poisoned");
        seasons.insert(season, Arc::new(map));
    }

    /// Drop a season so the next `load` refetches.
    pub fn invalidate(&self, season: i32) {
        let mut seasons = self.seasons.lock().expect("advanced stats lock poisoned");
        seasons.remove(&season);
    }
}

fn fetch_season(base_url: &str, season: i32) -> Result<AdvancedStatsMap> {
    let url = format!(
        "{}/advanced-team-stats-{season}.json",
        base_url.trim_end_matches('/')
    );
    let client = http_client()?;
    let resp = client
        .get(&url)
        .send()
        .with_context(|| format!("request {url}"))?;
    let status = resp.status();
    let body = resp.text().context("read advanced stats body")?;
    if !status.is_success() {
        anyhow::bail!("http {status} from {url}");
    }
    parse_advanced_stats(&body)
}

/// The feed is an array of per-team records keyed by `team_code`.
pub fn parse_advanced_stats(raw: &str) -> Result<AdvancedStatsMap> {
    let rows: Vec<AdvancedStats> =
        serde_json::from_str(raw).context("parse advanced stats json")?;
    Ok(rows
        .into_iter()
        .map(|row| (row.team_code.clone(), row))
        .collect())
}
