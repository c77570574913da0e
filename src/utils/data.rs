use crate::models::{MarketKey, Side, Snapshot, SnapshotRecord, Sport};
use crate::utils::best_price::best_quote;
use crate::utils::snapshots::assemble;
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Where persisted snapshot records live.
///
/// Readers only ever ask for the most recent records of one sport, newest
/// first; the history and comparison logic works on what these return.
pub trait SnapshotStore: Send + Sync {
    /// Store a record. Records are never rewritten once stored.
    fn append(&self, record: &SnapshotRecord) -> Result<()>;

    /// The `limit` most recent records for `sport`, newest first
    fn recent_records(&self, sport: &Sport, limit: usize) -> Result<Vec<SnapshotRecord>>;

    /// Every record sharing the most recent timestamp for `sport`
    /// (one record, or all parts of a split snapshot)
    fn latest_records(&self, sport: &Sport) -> Result<Vec<SnapshotRecord>>;
}

/// Serialize a value to a pretty-printed JSON file
pub fn save_json<T: Serialize + ?Sized>(value: &T, path: &Path) -> Result<()> {
    let json = serde_json::to_string_pretty(value).context("Failed to serialize data")?;
    std::fs::write(path, json)
        .with_context(|| format!("Failed to write file {}", path.display()))?;
    Ok(())
}

/// Load a value from a JSON file
pub fn load_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let json = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read file {}", path.display()))?;
    let value = serde_json::from_str(&json)
        .with_context(|| format!("Failed to deserialize {}", path.display()))?;
    Ok(value)
}

/// Snapshot store keeping one JSON document per record under
/// `<root>/<sport_key>/<timestamp_millis>[-p<part>].json`
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    root: PathBuf,
}

impl JsonFileStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Directory holding a sport's records. Keys that could leave the root
    /// are refused.
    fn sport_dir(&self, sport: &Sport) -> Result<PathBuf> {
        anyhow::ensure!(
            sport.has_plain_key(),
            "Refusing to use sport key {:?} as a snapshot directory",
            sport.as_str()
        );
        Ok(self.root.join(sport.as_str()))
    }

    fn file_name(record: &SnapshotRecord) -> String {
        let millis = record.timestamp.timestamp_millis();
        match record.part {
            Some(part) if record.is_split() => format!("{}-p{}.json", millis, part),
            _ => format!("{}.json", millis),
        }
    }

    /// Record files for a sport with the timestamp encoded in their name,
    /// newest first
    fn list(&self, sport: &Sport) -> Result<Vec<(i64, PathBuf)>> {
        let dir = self.sport_dir(sport)?;
        if !dir.exists() {
            return Ok(Vec::new());
        }

        let mut files = Vec::new();
        for entry in std::fs::read_dir(&dir)
            .with_context(|| format!("Failed to list snapshot dir {}", dir.display()))?
        {
            let path = entry?.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            let millis = path
                .file_stem()
                .and_then(|s| s.to_str())
                .and_then(|s| s.split('-').next())
                .and_then(|s| s.parse::<i64>().ok());
            match millis {
                Some(millis) => files.push((millis, path)),
                None => debug!("Ignoring unrecognised file {}", path.display()),
            }
        }

        files.sort_by(|a, b| b.0.cmp(&a.0).then_with(|| a.1.cmp(&b.1)));
        Ok(files)
    }
}

impl SnapshotStore for JsonFileStore {
    fn append(&self, record: &SnapshotRecord) -> Result<()> {
        let dir = self.sport_dir(&record.sport)?;
        std::fs::create_dir_all(&dir)
            .with_context(|| format!("Failed to create snapshot dir {}", dir.display()))?;

        let path = dir.join(Self::file_name(record));
        let json = serde_json::to_string_pretty(record).context("Failed to serialize snapshot")?;
        let mut file = OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&path)
            .with_context(|| format!("Snapshot {} is already stored", path.display()))?;
        file.write_all(json.as_bytes())
            .with_context(|| format!("Failed to write snapshot {}", path.display()))?;

        debug!("Stored snapshot record {}", path.display());
        Ok(())
    }

    fn recent_records(&self, sport: &Sport, limit: usize) -> Result<Vec<SnapshotRecord>> {
        self.list(sport)?
            .into_iter()
            .take(limit)
            .map(|(_, path)| load_json(&path))
            .collect()
    }

    fn latest_records(&self, sport: &Sport) -> Result<Vec<SnapshotRecord>> {
        let files = self.list(sport)?;
        let Some(&(latest, _)) = files.first() else {
            return Ok(Vec::new());
        };

        files
            .into_iter()
            .take_while(|(millis, _)| *millis == latest)
            .map(|(_, path)| load_json(&path))
            .collect()
    }
}

/// Assembled snapshots from the `limit` most recent records, newest first
pub fn recent_snapshots(
    store: &dyn SnapshotStore,
    sport: &Sport,
    limit: usize,
) -> Result<Vec<Snapshot>> {
    let records = store
        .recent_records(sport, limit)
        .with_context(|| format!("Failed to load recent {} snapshots", sport))?;
    Ok(assemble(records))
}

/// The most recent complete snapshot for a sport, if any
pub fn latest_snapshot(store: &dyn SnapshotStore, sport: &Sport) -> Result<Option<Snapshot>> {
    let records = store
        .latest_records(sport)
        .with_context(|| format!("Failed to load latest {} snapshot", sport))?;
    if records.is_empty() {
        return Ok(None);
    }

    let snapshot = assemble(records).into_iter().next();
    if snapshot.is_none() {
        warn!("Latest {} snapshot is missing parts", sport);
    }
    Ok(snapshot)
}

/// Best available line for one side of a game, as exported to CSV
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BestPriceRow {
    pub game_id: String,
    pub commence_time: Option<DateTime<Utc>>,
    pub home_team: String,
    pub away_team: String,
    pub market: MarketKey,
    pub side: Side,
    pub outcome: String,
    pub point: Option<f64>,
    pub price: i32,
    pub bookmaker: String,
}

/// Best line for the home and away (or over and under) side of every game
pub fn best_price_rows(snapshot: &Snapshot, market: MarketKey) -> Vec<BestPriceRow> {
    let sides = match market {
        MarketKey::Totals => [Side::Over, Side::Under],
        MarketKey::Moneyline | MarketKey::Spread => [Side::Away, Side::Home],
    };

    snapshot
        .games
        .iter()
        .flat_map(|game| {
            sides.into_iter().filter_map(move |side| {
                let quote = best_quote(game, market, side)?;
                Some(BestPriceRow {
                    game_id: game.id.clone(),
                    commence_time: game.commence_time,
                    home_team: game.home_team.clone(),
                    away_team: game.away_team.clone(),
                    market,
                    side,
                    outcome: quote.outcome.name.clone(),
                    point: quote.outcome.point,
                    price: quote.outcome.price,
                    bookmaker: quote.bookmaker.title.clone(),
                })
            })
        })
        .collect()
}

/// Save best prices to CSV
pub fn save_best_prices_to_csv(rows: &[BestPriceRow], filename: &Path) -> Result<()> {
    let mut writer = csv::Writer::from_path(filename)
        .with_context(|| format!("Failed to create CSV file {}", filename.display()))?;
    for row in rows {
        writer.serialize(row).context("Failed to write CSV row")?;
    }
    writer.flush().context("Failed to flush CSV file")?;
    Ok(())
}
