use chrono::{DateTime, Utc};
use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use std::str::FromStr;

/// Sports ingested from The Odds API, keyed by the feed's `sport_key`
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Sport {
    Nfl,
    CollegeFootball,
    Nba,
    CollegeBasketball,
    Nhl,
    /// A sport key the tracker does not know about, kept verbatim
    Other(String),
}

impl Sport {
    pub const ALL: [Sport; 5] = [
        Sport::Nfl,
        Sport::CollegeFootball,
        Sport::Nba,
        Sport::CollegeBasketball,
        Sport::Nhl,
    ];

    pub fn as_str(&self) -> &str {
        match self {
            Sport::Nfl => "americanfootball_nfl",
            Sport::CollegeFootball => "americanfootball_ncaaf",
            Sport::Nba => "basketball_nba",
            Sport::CollegeBasketball => "basketball_ncaab",
            Sport::Nhl => "icehockey_nhl",
            Sport::Other(key) => key,
        }
    }

    pub fn title(&self) -> &str {
        match self {
            Sport::Nfl => "NFL",
            Sport::CollegeFootball => "NCAA Football",
            Sport::Nba => "NBA",
            Sport::CollegeBasketball => "NCAA Basketball",
            Sport::Nhl => "NHL",
            Sport::Other(key) => key,
        }
    }

    /// Whether the key is made only of `[a-z0-9_]`, like every feed sport key.
    /// Stores use the key as a directory name.
    pub fn has_plain_key(&self) -> bool {
        let key = self.as_str();
        !key.is_empty()
            && key
                .bytes()
                .all(|b| b.is_ascii_lowercase() || b.is_ascii_digit() || b == b'_')
    }

    /// Number of records one fetch cycle is written as.
    /// The college basketball slate is too large for a single document.
    pub fn record_parts(&self) -> u32 {
        match self {
            Sport::CollegeBasketball => 2,
            _ => 1,
        }
    }
}

impl From<String> for Sport {
    fn from(key: String) -> Self {
        match key.as_str() {
            "americanfootball_nfl" | "nfl" => Sport::Nfl,
            "americanfootball_ncaaf" | "ncaaf" => Sport::CollegeFootball,
            "basketball_nba" | "nba" => Sport::Nba,
            "basketball_ncaab" | "ncaab" => Sport::CollegeBasketball,
            "icehockey_nhl" | "nhl" => Sport::Nhl,
            _ => Sport::Other(key),
        }
    }
}

impl From<Sport> for String {
    fn from(sport: Sport) -> Self {
        match sport {
            Sport::Other(key) => key,
            known => known.as_str().to_string(),
        }
    }
}

impl FromStr for Sport {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Sport::from(s.to_string()))
    }
}

impl fmt::Display for Sport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The three markets the tracker compares
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MarketKey {
    #[serde(rename = "h2h")]
    Moneyline,
    #[serde(rename = "spreads")]
    Spread,
    #[serde(rename = "totals")]
    Totals,
}

impl MarketKey {
    pub const ALL: [MarketKey; 3] = [MarketKey::Moneyline, MarketKey::Spread, MarketKey::Totals];

    pub fn as_str(&self) -> &'static str {
        match self {
            MarketKey::Moneyline => "h2h",
            MarketKey::Spread => "spreads",
            MarketKey::Totals => "totals",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            MarketKey::Moneyline => "Moneyline",
            MarketKey::Spread => "Spread",
            MarketKey::Totals => "Totals",
        }
    }

    /// Parse a feed market key, `None` for markets outside the fixed vocabulary
    pub fn from_feed_key(key: &str) -> Option<Self> {
        match key {
            "h2h" => Some(MarketKey::Moneyline),
            "spreads" => Some(MarketKey::Spread),
            "totals" => Some(MarketKey::Totals),
            _ => None,
        }
    }
}

impl FromStr for MarketKey {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "h2h" | "moneyline" => Ok(MarketKey::Moneyline),
            "spreads" | "spread" => Ok(MarketKey::Spread),
            "totals" | "total" => Ok(MarketKey::Totals),
            other => Err(format!("unknown market '{}'", other)),
        }
    }
}

impl fmt::Display for MarketKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Which leg of a market a bettor is looking at
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    Home,
    Away,
    Over,
    Under,
}

impl Side {
    /// Totals have no home/away legs; the dashboard shows Over in the home
    /// column and Under in the away column.
    pub fn for_market(self, market: MarketKey) -> Side {
        match (market, self) {
            (MarketKey::Totals, Side::Home) => Side::Over,
            (MarketKey::Totals, Side::Away) => Side::Under,
            (_, side) => side,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Side::Home => "home",
            Side::Away => "away",
            Side::Over => "over",
            Side::Under => "under",
        }
    }
}

impl FromStr for Side {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "home" => Ok(Side::Home),
            "away" => Ok(Side::Away),
            "over" => Ok(Side::Over),
            "under" => Ok(Side::Under),
            other => Err(format!("unknown side '{}'", other)),
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

pub const OVER: &str = "Over";
pub const UNDER: &str = "Under";

/// A single priced outcome offered by a bookmaker
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Outcome {
    pub name: String,
    #[serde(deserialize_with = "deserialize_american_price")]
    pub price: i32, // American odds format (e.g., -110, +150)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub point: Option<f64>, // Spread or total line
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub link: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Outcome {
    pub fn new(name: impl Into<String>, price: i32, point: Option<f64>) -> Self {
        Self {
            name: name.into(),
            price,
            point,
            link: None,
            extra: Map::new(),
        }
    }
}

/// The feed sends American odds as JSON numbers, sometimes with a `.0` suffix
fn deserialize_american_price<'de, D>(deserializer: D) -> Result<i32, D::Error>
where
    D: Deserializer<'de>,
{
    let price = f64::deserialize(deserializer)?;
    if price.fract() != 0.0 || price < i32::MIN as f64 || price > i32::MAX as f64 {
        return Err(D::Error::custom(format!(
            "price {} is not a whole American odds value",
            price
        )));
    }
    Ok(price as i32)
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Market {
    pub key: MarketKey,
    #[serde(default)]
    pub outcomes: Vec<Outcome>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Market {
    pub fn new(key: MarketKey, outcomes: Vec<Outcome>) -> Self {
        Self {
            key,
            outcomes,
            extra: Map::new(),
        }
    }
}

/// Odds from one sportsbook for one game
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bookmaker {
    pub key: String,
    pub title: String,
    #[serde(default)]
    pub markets: Vec<Market>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_update: Option<DateTime<Utc>>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Bookmaker {
    pub fn new(key: impl Into<String>, title: impl Into<String>, markets: Vec<Market>) -> Self {
        Self {
            key: key.into(),
            title: title.into(),
            markets,
            last_update: None,
            extra: Map::new(),
        }
    }

    pub fn market(&self, key: MarketKey) -> Option<&Market> {
        self.markets.iter().find(|m| m.key == key)
    }
}

/// A game as captured in one snapshot. `id` is stable across snapshots.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Game {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sport_key: Option<Sport>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub commence_time: Option<DateTime<Utc>>,
    pub home_team: String,
    pub away_team: String,
    pub bookmakers: Vec<Bookmaker>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Game {
    pub fn new(
        id: impl Into<String>,
        home_team: impl Into<String>,
        away_team: impl Into<String>,
        bookmakers: Vec<Bookmaker>,
    ) -> Self {
        Self {
            id: id.into(),
            sport_key: None,
            commence_time: None,
            home_team: home_team.into(),
            away_team: away_team.into(),
            bookmakers,
            extra: Map::new(),
        }
    }

    pub fn bookmaker(&self, key: &str) -> Option<&Bookmaker> {
        self.bookmakers.iter().find(|b| b.key == key)
    }

    /// Outcome name that identifies `side` in this game's markets
    pub fn outcome_name(&self, side: Side) -> &str {
        match side {
            Side::Home => &self.home_team,
            Side::Away => &self.away_team,
            Side::Over => OVER,
            Side::Under => UNDER,
        }
    }

    pub fn matchup(&self) -> String {
        format!("{} @ {}", self.away_team, self.home_team)
    }
}

/// One fetch cycle's worth of games for a sport, reassembled from its records
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    pub sport: Sport,
    pub timestamp: DateTime<Utc>,
    pub games: Vec<Game>,
}

impl Snapshot {
    pub fn game(&self, game_id: &str) -> Option<&Game> {
        self.games.iter().find(|g| g.id == game_id)
    }

    pub fn contains(&self, game_id: &str) -> bool {
        self.game(game_id).is_some()
    }
}

/// A persisted snapshot document. Oversized sports are split into
/// `total_parts` records that share one timestamp.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SnapshotRecord {
    pub sport: Sport,
    pub data: Vec<Game>,
    pub timestamp: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub part: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_parts: Option<u32>,
}

impl SnapshotRecord {
    pub fn is_split(&self) -> bool {
        self.total_parts.map_or(false, |total| total > 1)
    }
}
