use crate::models::{Game, Sport};
use crate::utils::normalizer::normalize;
use anyhow::{Context, Result};
use serde_json::Value;
use tracing::{error, info, warn};

const ODDS_API_BASE_URL: &str = "https://api.the-odds-api.com/v4";
const REGIONS: &str = "us,us2";
const MARKETS: &str = "h2h,spreads,totals";

/// Switch keys before the quota actually hits zero
pub const MIN_REQUESTS_THRESHOLD: u32 = 5;

/// Ordered set of Odds API keys; the active key moves forward when the
/// current one runs low on requests
#[derive(Debug, Clone)]
pub struct ApiKeyRing {
    keys: Vec<String>,
    current: usize,
}

impl ApiKeyRing {
    pub fn new(keys: Vec<String>) -> Result<Self> {
        anyhow::ensure!(!keys.is_empty(), "At least one Odds API key is required");
        Ok(Self { keys, current: 0 })
    }

    pub fn current(&self) -> &str {
        &self.keys[self.current]
    }

    pub fn position(&self) -> usize {
        self.current
    }

    /// Move to the next key when `remaining` is at or below the threshold, or
    /// when the quota check itself failed. Returns whether the key changed.
    pub fn rotate_if_exhausted(&mut self, remaining: &Result<Option<u32>>) -> bool {
        let exhausted = match remaining {
            Ok(Some(remaining)) => *remaining <= MIN_REQUESTS_THRESHOLD,
            Ok(None) => false,
            Err(e) => {
                warn!("Quota check failed for key #{}: {:#}", self.current + 1, e);
                true
            }
        };
        if !exhausted {
            return false;
        }

        if self.current + 1 < self.keys.len() {
            self.current += 1;
            info!("Switching to backup Odds API key #{}", self.current + 1);
            true
        } else {
            error!("All Odds API keys are near their request limit");
            false
        }
    }
}

pub struct OddsApiClient {
    keys: ApiKeyRing,
    base_url: String,
    client: reqwest::Client,
}

impl OddsApiClient {
    pub fn new(keys: ApiKeyRing) -> Self {
        Self::with_base_url(keys, ODDS_API_BASE_URL)
    }

    pub fn with_base_url(keys: ApiKeyRing, base_url: impl Into<String>) -> Self {
        Self {
            keys,
            base_url: base_url.into(),
            client: reqwest::Client::new(),
        }
    }

    pub fn keys(&self) -> &ApiKeyRing {
        &self.keys
    }

    /// Fetch the raw odds payload for a sport: every game with its
    /// bookmakers' moneyline, spread and totals markets in American odds
    pub async fn fetch_odds(&self, sport: &Sport) -> Result<Value> {
        let url = format!("{}/sports/{}/odds/", self.base_url, sport.as_str());

        let response = self
            .client
            .get(&url)
            .query(&[
                ("apiKey", self.keys.current()),
                ("regions", REGIONS),
                ("markets", MARKETS),
                ("oddsFormat", "american"),
                ("includeLinks", "true"),
            ])
            .send()
            .await
            .context("Failed to fetch odds from The Odds API")?;

        if !response.status().is_success() {
            anyhow::bail!("Odds API returned error: {}", response.status());
        }

        response
            .json()
            .await
            .context("Failed to parse Odds API response")
    }

    /// Fetch and normalize the current games for a sport
    pub async fn fetch_games(&self, sport: &Sport) -> Result<Vec<Game>> {
        let raw = self.fetch_odds(sport).await?;
        let games = normalize(raw).with_context(|| format!("Malformed {} feed", sport))?;
        Ok(games)
    }

    /// How many API requests the active key has left
    pub async fn check_usage(&self) -> Result<Option<u32>> {
        let url = format!("{}/sports", self.base_url);

        let response = self
            .client
            .get(&url)
            .query(&[("apiKey", self.keys.current())])
            .send()
            .await
            .context("Failed to check Odds API usage")?;

        if !response.status().is_success() {
            anyhow::bail!("Odds API usage check returned error: {}", response.status());
        }

        let remaining = response
            .headers()
            .get("x-requests-remaining")
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.trim().parse::<f64>().ok())
            .map(|v| v.max(0.0) as u32);

        if let Some(used) = response.headers().get("x-requests-used") {
            info!("API requests used: {:?}", used);
        }
        info!("API requests remaining: {:?}", remaining);

        Ok(remaining)
    }

    /// Check the active key's quota and rotate to a backup key if it is low
    pub async fn rotate_key_if_needed(&mut self) -> bool {
        let remaining = self.check_usage().await;
        self.keys.rotate_if_exhausted(&remaining)
    }
}
