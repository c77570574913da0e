use crate::models::{MarketKey, Side, Snapshot};
use chrono::{DateTime, Utc};
use serde::Serialize;

/// One observation of a line over time
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrendPoint {
    pub observed_at: DateTime<Utc>,
    /// Price for moneyline, point for spreads and totals
    pub value: f64,
}

/// Follow one leg of a game's market across snapshots, oldest first.
///
/// Reads the named bookmaker, or each snapshot's first bookmaker when none is
/// given. Snapshots missing the game, bookmaker, market or outcome are skipped.
pub fn odds_trend(
    snapshots: &[Snapshot],
    game_id: &str,
    market: MarketKey,
    side: Side,
    bookmaker_title: Option<&str>,
) -> Vec<TrendPoint> {
    let side = side.for_market(market);

    let mut observed: Vec<(DateTime<Utc>, TrendPoint)> = snapshots
        .iter()
        .filter_map(|snapshot| {
            let game = snapshot.game(game_id)?;
            let bookmaker = match bookmaker_title {
                Some(title) => game.bookmakers.iter().find(|b| b.title == title)?,
                None => game.bookmakers.first()?,
            };
            let name = game.outcome_name(side);
            let outcome = bookmaker
                .market(market)?
                .outcomes
                .iter()
                .find(|o| o.name == name)?;

            let value = match market {
                MarketKey::Moneyline => f64::from(outcome.price),
                MarketKey::Spread | MarketKey::Totals => outcome.point?,
            };
            let observed_at = bookmaker.last_update.unwrap_or(snapshot.timestamp);

            Some((snapshot.timestamp, TrendPoint { observed_at, value }))
        })
        .collect();

    observed.sort_by_key(|(taken_at, _)| *taken_at);
    observed.into_iter().map(|(_, point)| point).collect()
}

/// Titles of every bookmaker that quoted the game in any snapshot, in first-seen order
pub fn trend_bookmakers(snapshots: &[Snapshot], game_id: &str) -> Vec<String> {
    let mut titles: Vec<String> = Vec::new();
    for bookmaker in snapshots
        .iter()
        .filter_map(|s| s.game(game_id))
        .flat_map(|g| &g.bookmakers)
    {
        if !titles.contains(&bookmaker.title) {
            titles.push(bookmaker.title.clone());
        }
    }
    titles
}
