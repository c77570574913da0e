use anyhow::Context;
use askama::Template;
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{Html, IntoResponse, Redirect, Response},
    routing::get,
    Json, Router,
};
use odds_line_tracker::config::Config;
use odds_line_tracker::data::{latest_snapshot, recent_snapshots, JsonFileStore, SnapshotStore};
use odds_line_tracker::line_board::format_point;
use odds_line_tracker::{game_report, schedule, GameReport, MarketKey, Side, Snapshot, Sport};
use serde::Deserialize;
use std::sync::Arc;
use tower_http::services::ServeDir;
use tracing::{error, info};

// Custom filters for formatting
mod filters {
    pub fn format_odds(odds: &i32) -> ::askama::Result<String> {
        Ok(odds_line_tracker::line_board::format_odds(*odds))
    }
}

const TIME_FORMAT: &str = "%m/%d/%Y %I:%M %p UTC";

struct MarketLink {
    key: &'static str,
    label: &'static str,
    selected: bool,
}

fn market_links(selected: MarketKey) -> Vec<MarketLink> {
    MarketKey::ALL
        .iter()
        .map(|market| MarketLink {
            key: market.as_str(),
            label: market.label(),
            selected: *market == selected,
        })
        .collect()
}

struct SportLink {
    key: String,
    title: String,
}

struct ScheduleRow {
    game_id: String,
    kickoff: String,
    home_team: String,
    away_team: String,
    home_line: String,
    away_line: String,
}

struct LineRowView {
    bookmaker: String,
    point: String,
    price: i32,
    arrow: &'static str,
    movement: &'static str,
    is_best: bool,
    link: String,
}

struct TrendRowView {
    observed_at: String,
    value: String,
}

#[derive(Template)]
#[template(path = "index.html")]
struct IndexTemplate {
    sports: Vec<SportLink>,
}

#[derive(Template)]
#[template(path = "sport.html")]
struct SportTemplate {
    title: String,
    sport_key: String,
    market_key: &'static str,
    markets: Vec<MarketLink>,
    as_of: String,
    games: Vec<ScheduleRow>,
}

#[derive(Template)]
#[template(path = "game.html")]
struct GameTemplate {
    matchup: String,
    team: String,
    sport_key: String,
    game_id: String,
    side: &'static str,
    market_key: &'static str,
    market_label: &'static str,
    markets: Vec<MarketLink>,
    current_at: String,
    previous_at: String,
    best: String,
    rows: Vec<LineRowView>,
    trend: Vec<TrendRowView>,
    trend_bookmakers: Vec<String>,
    trend_bookmaker: String,
}

impl GameTemplate {
    fn new(report: &GameReport, sport: &Sport, trend_bookmaker: Option<&str>) -> Self {
        let line = |point: Option<f64>| point.map(format_point).unwrap_or_default();

        Self {
            matchup: report.game.matchup(),
            team: report.team.clone(),
            sport_key: sport.as_str().to_string(),
            game_id: report.game.id.clone(),
            side: report.side.as_str(),
            market_key: report.market.as_str(),
            market_label: report.market.label(),
            markets: market_links(report.market),
            current_at: report.current_at.format(TIME_FORMAT).to_string(),
            previous_at: report
                .previous_at
                .map(|t| t.format(TIME_FORMAT).to_string())
                .unwrap_or_else(|| "none".to_string()),
            best: report
                .best
                .as_ref()
                .map(|best| {
                    format!(
                        "{} {}",
                        line(best.point),
                        odds_line_tracker::line_board::format_odds(best.price)
                    )
                    .trim()
                    .to_string()
                })
                .unwrap_or_else(|| "-".to_string()),
            rows: report
                .rows
                .iter()
                .map(|row| LineRowView {
                    bookmaker: row.bookmaker_title.clone(),
                    point: line(row.outcome.point),
                    price: row.outcome.price,
                    arrow: row.movement.arrow(),
                    movement: row.movement.as_str(),
                    is_best: row.is_best,
                    link: row.link.clone().unwrap_or_default(),
                })
                .collect(),
            trend: report
                .trend
                .iter()
                .map(|point| TrendRowView {
                    observed_at: point.observed_at.format(TIME_FORMAT).to_string(),
                    value: point.value.to_string(),
                })
                .collect(),
            trend_bookmakers: report.trend_bookmakers.clone(),
            trend_bookmaker: trend_bookmaker.unwrap_or_default().to_string(),
        }
    }
}

struct HtmlTemplate<T>(T);

impl<T> IntoResponse for HtmlTemplate<T>
where
    T: Template,
{
    fn into_response(self) -> Response {
        match self.0.render() {
            Ok(html) => Html(html).into_response(),
            Err(err) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("Failed to render template: {}", err),
            )
                .into_response(),
        }
    }
}

fn sport_not_tracked() -> Response {
    (StatusCode::NOT_FOUND, "Sport is not tracked").into_response()
}

fn internal_error(err: anyhow::Error) -> Response {
    error!("Request failed: {:#}", err);
    (StatusCode::INTERNAL_SERVER_ERROR, "Failed to load odds data").into_response()
}

#[derive(Clone)]
struct AppState {
    store: Arc<dyn SnapshotStore>,
    history_window: usize,
    sports: Vec<Sport>,
}

impl AppState {
    /// Only configured sports are served; anything else never reaches the store
    fn tracks(&self, sport: &Sport) -> bool {
        self.sports.contains(sport)
    }

    async fn recent(&self, sport: Sport) -> anyhow::Result<Vec<Snapshot>> {
        let store = self.store.clone();
        let limit = self.history_window;
        tokio::task::spawn_blocking(move || recent_snapshots(store.as_ref(), &sport, limit))
            .await
            .context("Snapshot loader task failed")?
    }

    async fn latest(&self, sport: Sport) -> anyhow::Result<Option<Snapshot>> {
        let store = self.store.clone();
        tokio::task::spawn_blocking(move || latest_snapshot(store.as_ref(), &sport))
            .await
            .context("Snapshot loader task failed")?
    }
}

#[derive(Debug, Deserialize)]
struct LineQuery {
    market: Option<MarketKey>,
    bookmaker: Option<String>,
}

async fn index(State(state): State<AppState>) -> impl IntoResponse {
    let template = IndexTemplate {
        sports: state
            .sports
            .iter()
            .map(|sport| SportLink {
                key: sport.as_str().to_string(),
                title: sport.title().to_string(),
            })
            .collect(),
    };

    HtmlTemplate(template)
}

async fn sport_page(
    State(state): State<AppState>,
    Path(sport): Path<Sport>,
    Query(query): Query<LineQuery>,
) -> Response {
    if !state.tracks(&sport) {
        return sport_not_tracked();
    }

    let market = query.market.unwrap_or(MarketKey::Spread);
    let snapshot = match state.latest(sport.clone()).await {
        Ok(snapshot) => snapshot,
        Err(e) => return internal_error(e),
    };

    let (as_of, games) = match &snapshot {
        Some(snapshot) => (
            snapshot.timestamp.format(TIME_FORMAT).to_string(),
            schedule(snapshot, market)
                .into_iter()
                .map(|entry| ScheduleRow {
                    game_id: entry.game_id,
                    kickoff: entry
                        .commence_time
                        .map(|t| t.format(TIME_FORMAT).to_string())
                        .unwrap_or_default(),
                    home_team: entry.home_team,
                    away_team: entry.away_team,
                    home_line: entry.home_line.unwrap_or_else(|| "-".to_string()),
                    away_line: entry.away_line.unwrap_or_else(|| "-".to_string()),
                })
                .collect(),
        ),
        None => (String::new(), Vec::new()),
    };

    let template = SportTemplate {
        title: sport.title().to_string(),
        sport_key: sport.as_str().to_string(),
        market_key: market.as_str(),
        markets: market_links(market),
        as_of,
        games,
    };

    HtmlTemplate(template).into_response()
}

async fn load_report(
    state: &AppState,
    sport: Sport,
    game_id: &str,
    side: Side,
    query: &LineQuery,
) -> anyhow::Result<Option<GameReport>> {
    let snapshots = state.recent(sport).await?;
    let market = query.market.unwrap_or(MarketKey::Spread);

    match game_report(
        &snapshots,
        game_id,
        market,
        side,
        query.bookmaker.as_deref().filter(|b| !b.is_empty()),
    ) {
        Ok(report) => Ok(Some(report)),
        Err(not_found) => {
            info!("{}", not_found);
            Ok(None)
        }
    }
}

async fn game_page(
    State(state): State<AppState>,
    Path((sport, game_id, side)): Path<(Sport, String, Side)>,
    Query(query): Query<LineQuery>,
) -> Response {
    if !state.tracks(&sport) {
        return sport_not_tracked();
    }

    match load_report(&state, sport.clone(), &game_id, side, &query).await {
        Ok(Some(report)) => {
            let template = GameTemplate::new(&report, &sport, query.bookmaker.as_deref());
            HtmlTemplate(template).into_response()
        }
        // Unknown games send the visitor back to the start page
        Ok(None) => Redirect::to("/").into_response(),
        Err(e) => internal_error(e),
    }
}

async fn sport_api(
    State(state): State<AppState>,
    Path(sport): Path<Sport>,
    Query(query): Query<LineQuery>,
) -> Response {
    if !state.tracks(&sport) {
        return sport_not_tracked();
    }

    let market = query.market.unwrap_or(MarketKey::Spread);
    match state.latest(sport).await {
        Ok(Some(snapshot)) => Json(schedule(&snapshot, market)).into_response(),
        Ok(None) => (StatusCode::NOT_FOUND, "No snapshots stored for this sport").into_response(),
        Err(e) => internal_error(e),
    }
}

async fn game_api(
    State(state): State<AppState>,
    Path((sport, game_id, side)): Path<(Sport, String, Side)>,
    Query(query): Query<LineQuery>,
) -> Response {
    if !state.tracks(&sport) {
        return sport_not_tracked();
    }

    match load_report(&state, sport, &game_id, side, &query).await {
        Ok(Some(report)) => Json(report).into_response(),
        Ok(None) => (StatusCode::NOT_FOUND, "Game not found").into_response(),
        Err(e) => internal_error(e),
    }
}

fn app(state: AppState) -> Router {
    Router::new()
        // This will serve files from the "static" directory at the "/static" URL path
        .nest_service("/static", ServeDir::new("static"))
        .route("/", get(index))
        .route("/sport/:sport", get(sport_page))
        .route("/game/:sport/:game_id/:side", get(game_page))
        .route("/api/sport/:sport", get(sport_api))
        .route("/api/game/:sport/:game_id/:side", get(game_api))
        .with_state(state)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::fmt::init();

    let config = Config::from_env()?;
    let state = AppState {
        store: Arc::new(JsonFileStore::new(&config.snapshot_dir)),
        history_window: config.history_window,
        sports: config.sports.clone(),
    };

    println!("\nStarting web server at http://{}", config.web_addr);
    println!("Press Ctrl+C to stop\n");

    let listener = tokio::net::TcpListener::bind(config.web_addr)
        .await
        .with_context(|| format!("Failed to bind {}", config.web_addr))?;

    axum::serve(listener, app(state))
        .await
        .context("Web server stopped unexpectedly")?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{header, Request};
    use chrono::{TimeZone, Utc};
    use odds_line_tracker::models::{Bookmaker, Game, Market, Outcome};
    use odds_line_tracker::snapshots::partition;
    use tower::ServiceExt;

    fn seeded_state(dir: &std::path::Path) -> AppState {
        let store = JsonFileStore::new(dir);
        for (hour, price) in [(10, -150), (12, -145)] {
            let game = Game::new(
                "nhl42",
                "New York Rangers",
                "Boston Bruins",
                vec![Bookmaker::new(
                    "fanduel",
                    "FanDuel",
                    vec![Market::new(
                        MarketKey::Moneyline,
                        vec![
                            Outcome::new("New York Rangers", price, None),
                            Outcome::new("Boston Bruins", 125, None),
                        ],
                    )],
                )],
            );
            let timestamp = Utc.with_ymd_and_hms(2025, 2, 1, hour, 0, 0).unwrap();
            for record in partition(&Sport::Nhl, vec![game], timestamp) {
                store.append(&record).unwrap();
            }
        }

        AppState {
            store: Arc::new(store),
            history_window: 8,
            sports: vec![Sport::Nhl, Sport::Nba],
        }
    }

    async fn request(app: Router, uri: &str) -> Response {
        app.oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_game_api_reports_movement() {
        let dir = tempfile::tempdir().unwrap();
        let app = app(seeded_state(dir.path()));

        let response = request(app, "/api/game/icehockey_nhl/nhl42/home?market=h2h").await;
        assert_eq!(response.status(), StatusCode::OK);

        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let report: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(report["rows"][0]["movement"], "improved");
        assert_eq!(report["rows"][0]["is_best"], true);
        assert_eq!(report["best"]["price"], -145);
    }

    #[tokio::test]
    async fn test_unknown_game_redirects_home() {
        let dir = tempfile::tempdir().unwrap();
        let app = app(seeded_state(dir.path()));

        let response = request(app.clone(), "/game/icehockey_nhl/missing/away").await;
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(response.headers()[header::LOCATION], "/");

        let response = request(app, "/api/game/icehockey_nhl/missing/away").await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_pages_render() {
        let dir = tempfile::tempdir().unwrap();
        let app = app(seeded_state(dir.path()));

        let response = request(app.clone(), "/").await;
        assert_eq!(response.status(), StatusCode::OK);

        let response = request(app.clone(), "/sport/nhl?market=h2h").await;
        assert_eq!(response.status(), StatusCode::OK);
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let html = String::from_utf8(body.to_vec()).unwrap();
        assert!(html.contains("New York Rangers"));
        assert!(html.contains("-145"));

        let response = request(app, "/game/icehockey_nhl/nhl42/home?market=h2h").await;
        assert_eq!(response.status(), StatusCode::OK);
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let html = String::from_utf8(body.to_vec()).unwrap();
        assert!(html.contains(r#"<option value="">First listed bookmaker</option>"#));
        assert!(html.contains(r#"<option value="FanDuel">FanDuel</option>"#));
    }

    #[tokio::test]
    async fn test_sport_api_without_snapshots() {
        let dir = tempfile::tempdir().unwrap();
        let app = app(seeded_state(dir.path()));

        let response = request(app, "/api/sport/nba").await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        assert_eq!(&body[..], b"No snapshots stored for this sport");
    }

    #[tokio::test]
    async fn test_untracked_sports_are_not_served() {
        let dir = tempfile::tempdir().unwrap();
        let app = app(seeded_state(dir.path()));

        for uri in [
            "/api/sport/..%2Felsewhere%2Fsecret",
            "/sport/..%2F..%2Fetc",
            "/sport/basketball_ncaab",
            "/api/game/americanfootball_nfl/nhl42/home",
            "/game/..%2Fnhl/nhl42/home",
        ] {
            let response = request(app.clone(), uri).await;
            assert_eq!(response.status(), StatusCode::NOT_FOUND, "{}", uri);
        }
    }
}
