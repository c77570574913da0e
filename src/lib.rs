pub mod api;
pub mod config;
pub mod error;
pub mod models;
pub mod utils;

pub use api::*;
pub use error::{GameNotFoundError, MalformedFeedError};
pub use models::*;
pub use utils::*;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::info;
use utils::best_price::best_price;
use utils::data::SnapshotStore;
use utils::history::select_history;
use utils::line_board::{line_board, schedule_line, LineRow};
use utils::snapshots::partition;
use utils::trend::{odds_trend, trend_bookmakers, TrendPoint};

/// What one fetch cycle stored for a sport
#[derive(Debug, Clone, Serialize)]
pub struct SportIngest {
    pub sport: Sport,
    pub timestamp: DateTime<Utc>,
    pub games: usize,
    pub records: usize,
}

/// Fetch every sport once and append the snapshots to the store.
///
/// The API key is rotated first if its quota is low. A failure for any sport
/// stops the cycle; sports stored before the failure stay stored.
pub async fn run_fetch_cycle(
    client: &mut OddsApiClient,
    store: &dyn SnapshotStore,
    sports: &[Sport],
) -> Result<Vec<SportIngest>> {
    client.rotate_key_if_needed().await;

    let mut report = Vec::with_capacity(sports.len());
    for sport in sports {
        info!("Fetching odds for {}", sport);
        let games = client
            .fetch_games(sport)
            .await
            .with_context(|| format!("Failed to fetch {} odds", sport))?;

        let timestamp = Utc::now();
        let game_count = games.len();
        let records = partition(sport, games, timestamp);
        for record in &records {
            store
                .append(record)
                .with_context(|| format!("Failed to store {} snapshot", sport))?;
        }

        info!(
            "Stored {} {} games in {} record(s)",
            game_count,
            sport,
            records.len()
        );
        report.push(SportIngest {
            sport: sport.clone(),
            timestamp,
            games: game_count,
            records: records.len(),
        });
    }

    Ok(report)
}

/// A game card on a sport's schedule
#[derive(Debug, Clone, Serialize)]
pub struct ScheduleEntry {
    pub game_id: String,
    pub commence_time: Option<DateTime<Utc>>,
    pub home_team: String,
    pub away_team: String,
    pub home_line: Option<String>,
    pub away_line: Option<String>,
}

/// Schedule for the latest snapshot of a sport, showing `market` lines
pub fn schedule(snapshot: &Snapshot, market: MarketKey) -> Vec<ScheduleEntry> {
    snapshot
        .games
        .iter()
        .map(|game| ScheduleEntry {
            game_id: game.id.clone(),
            commence_time: game.commence_time,
            home_team: game.home_team.clone(),
            away_team: game.away_team.clone(),
            home_line: schedule_line(game, market, Side::Home),
            away_line: schedule_line(game, market, Side::Away),
        })
        .collect()
}

/// Everything the game page shows for one leg of one market
#[derive(Debug, Clone, Serialize)]
pub struct GameReport {
    pub game: Game,
    pub market: MarketKey,
    pub side: Side,
    pub team: String,
    pub current_at: DateTime<Utc>,
    pub previous_at: Option<DateTime<Utc>>,
    pub best: Option<Outcome>,
    pub rows: Vec<LineRow>,
    pub trend: Vec<TrendPoint>,
    pub trend_bookmakers: Vec<String>,
}

/// Build the game page from a sport's recent snapshots (newest first)
pub fn game_report(
    snapshots: &[Snapshot],
    game_id: &str,
    market: MarketKey,
    side: Side,
    trend_bookmaker: Option<&str>,
) -> Result<GameReport, GameNotFoundError> {
    let window = select_history(snapshots, game_id)?;
    let game = window.current_game;

    Ok(GameReport {
        game: game.clone(),
        market,
        side,
        team: game.outcome_name(side.for_market(market)).to_string(),
        current_at: window.current.timestamp,
        previous_at: window.previous.map(|s| s.timestamp),
        best: best_price(game, market, side).cloned(),
        rows: line_board(game, window.previous_bookmakers(), market, side),
        trend: odds_trend(snapshots, game_id, market, side, trend_bookmaker),
        trend_bookmakers: trend_bookmakers(snapshots, game_id),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::data::JsonFileStore;
    use crate::utils::movement::Movement;
    use axum::extract::{Path, Query};
    use axum::http::StatusCode;
    use axum::response::{IntoResponse, Response};
    use axum::routing::get;
    use axum::{Json, Router};
    use chrono::TimeZone;
    use serde_json::json;
    use std::collections::HashMap;

    fn snapshot(hour: u32, home_price: i32) -> Snapshot {
        Snapshot {
            sport: Sport::Nfl,
            timestamp: Utc.with_ymd_and_hms(2024, 9, 8, hour, 0, 0).unwrap(),
            games: vec![Game::new(
                "nfl1",
                "Green Bay Packers",
                "Chicago Bears",
                vec![Bookmaker::new(
                    "draftkings",
                    "DraftKings",
                    vec![Market::new(
                        MarketKey::Moneyline,
                        vec![
                            Outcome::new("Green Bay Packers", home_price, None),
                            Outcome::new("Chicago Bears", 140, None),
                        ],
                    )],
                )],
            )],
        }
    }

    #[test]
    fn test_game_report_compares_against_previous_snapshot() {
        let snapshots = vec![snapshot(12, -160), snapshot(8, -150)];

        let report =
            game_report(&snapshots, "nfl1", MarketKey::Moneyline, Side::Home, None).unwrap();
        assert_eq!(report.team, "Green Bay Packers");
        assert_eq!(report.best.as_ref().map(|o| o.price), Some(-160));
        assert_eq!(report.rows.len(), 1);
        assert_eq!(report.rows[0].movement, Movement::Worsened);
        assert!(report.previous_at.is_some());
        assert_eq!(report.trend.len(), 2);
        assert_eq!(report.trend_bookmakers, ["DraftKings"]);
    }

    #[test]
    fn test_game_report_unknown_game() {
        let snapshots = vec![snapshot(12, -160)];
        let err = game_report(&snapshots, "nope", MarketKey::Spread, Side::Away, None)
            .unwrap_err();
        assert_eq!(err.game_id, "nope");
    }

    #[test]
    fn test_schedule_lines() {
        let entries = schedule(&snapshot(12, -160), MarketKey::Moneyline);
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].home_line.as_deref(), Some("-160"));
        assert_eq!(entries[0].away_line.as_deref(), Some("+140"));

        let spreads = schedule(&snapshot(12, -160), MarketKey::Spread);
        assert_eq!(spreads[0].home_line, None);
    }

    /// Stand-in Odds API: the primary key is down to its last requests, only
    /// the backup key may fetch odds, and only college basketball has a slate.
    async fn feed_server() -> String {
        async fn odds(
            Path(sport): Path<String>,
            Query(params): Query<HashMap<String, String>>,
        ) -> Response {
            if params.get("apiKey").map(String::as_str) != Some("backup") {
                return StatusCode::UNAUTHORIZED.into_response();
            }
            match sport.as_str() {
                "basketball_ncaab" => Json(json!([
                    { "id": "g1", "home_team": "Duke", "away_team": "UNC", "bookmakers": [] },
                    { "id": "g2", "home_team": "Kansas", "away_team": "Baylor", "bookmakers": [] },
                    { "id": "g3", "home_team": "Gonzaga", "away_team": "Saint Mary's", "bookmakers": [] }
                ]))
                .into_response(),
                _ => StatusCode::INTERNAL_SERVER_ERROR.into_response(),
            }
        }

        let router = Router::new()
            .route(
                "/sports",
                get(|| async { ([("x-requests-remaining", "5")], Json(json!([]))) }),
            )
            .route("/sports/:sport/odds/", get(odds));

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move { axum::serve(listener, router).await.unwrap() });
        format!("http://{}", addr)
    }

    fn client(base_url: String) -> OddsApiClient {
        let keys = ApiKeyRing::new(vec!["primary".to_string(), "backup".to_string()]).unwrap();
        OddsApiClient::with_base_url(keys, base_url)
    }

    #[tokio::test]
    async fn test_check_usage_reads_remaining_header() {
        let client = client(feed_server().await);
        assert_eq!(client.check_usage().await.unwrap(), Some(5));
    }

    #[tokio::test]
    async fn test_fetch_cycle_stores_every_part_with_one_timestamp() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileStore::new(dir.path());
        let mut client = client(feed_server().await);

        let report = run_fetch_cycle(&mut client, &store, &[Sport::CollegeBasketball])
            .await
            .unwrap();
        assert_eq!(client.keys().current(), "backup");
        assert_eq!(report.len(), 1);
        assert_eq!(report[0].games, 3);
        assert_eq!(report[0].records, 2);

        let records = store.latest_records(&Sport::CollegeBasketball).unwrap();
        assert_eq!(records.len(), 2);
        assert!(records.iter().all(|r| r.timestamp == report[0].timestamp));
        let mut parts: Vec<_> = records.iter().map(|r| (r.part, r.data.len())).collect();
        parts.sort();
        assert_eq!(parts, [(Some(1), 2), (Some(2), 1)]);
    }

    #[tokio::test]
    async fn test_fetch_cycle_aborts_on_failed_sport() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileStore::new(dir.path());
        let mut client = client(feed_server().await);

        let result = run_fetch_cycle(
            &mut client,
            &store,
            &[Sport::CollegeBasketball, Sport::Nba, Sport::Nhl],
        )
        .await;
        let err = result.unwrap_err();
        assert!(format!("{:#}", err).contains("basketball_nba"));

        // Stored before the failure, nothing after it
        assert_eq!(store.latest_records(&Sport::CollegeBasketball).unwrap().len(), 2);
        assert!(store.latest_records(&Sport::Nba).unwrap().is_empty());
        assert!(store.latest_records(&Sport::Nhl).unwrap().is_empty());
    }
}
