use crate::models::Sport;
use anyhow::{Context, Result};
use std::net::SocketAddr;
use std::path::PathBuf;

const DEFAULT_SNAPSHOT_DIR: &str = "cache/snapshots";
const DEFAULT_HISTORY_WINDOW: usize = 8;
const DEFAULT_WEB_ADDR: &str = "127.0.0.1:3000";

/// Settings read from the environment (and `.env`)
#[derive(Debug, Clone)]
pub struct Config {
    /// `ODDS_API_KEY`, then the optional backup `ODDS_API_KEY_2`
    pub odds_api_keys: Vec<String>,
    pub snapshot_dir: PathBuf,
    /// How many recent records a game page scans for history
    pub history_window: usize,
    pub web_addr: SocketAddr,
    pub sports: Vec<Sport>,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenv::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from any variable source; empty values count as unset
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let odds_api_keys = ["ODDS_API_KEY", "ODDS_API_KEY_2"]
            .into_iter()
            .filter_map(|key| var(key))
            .collect();

        let snapshot_dir = var("SNAPSHOT_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_SNAPSHOT_DIR));

        let history_window = match var("HISTORY_WINDOW") {
            Some(v) => v
                .trim()
                .parse::<usize>()
                .with_context(|| format!("HISTORY_WINDOW must be a number, got '{}'", v))?,
            None => DEFAULT_HISTORY_WINDOW,
        };
        anyhow::ensure!(history_window >= 2, "HISTORY_WINDOW must be at least 2");

        let web_addr = var("WEB_ADDR")
            .unwrap_or_else(|| DEFAULT_WEB_ADDR.to_string())
            .parse::<SocketAddr>()
            .context("WEB_ADDR must be a socket address like 127.0.0.1:3000")?;

        let sports = match var("SPORTS") {
            Some(list) => list
                .split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(|s| Sport::from(s.to_string()))
                .collect(),
            None => Sport::ALL.to_vec(),
        };

        Ok(Self {
            odds_api_keys,
            snapshot_dir,
            history_window,
            web_addr,
            sports,
        })
    }
}
