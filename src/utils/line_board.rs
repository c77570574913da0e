use crate::models::{Bookmaker, Game, MarketKey, Outcome, Side};
use crate::utils::best_price::{best_price, is_best_price, quotes};
use crate::utils::links::clean_sports_link;
use crate::utils::movement::{movement_for_bookmaker, Movement};
use serde::Serialize;

/// One bookmaker's line for the leg being viewed
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LineRow {
    pub bookmaker_key: String,
    pub bookmaker_title: String,
    pub outcome: Outcome,
    pub is_best: bool,
    pub movement: Movement,
    pub link: Option<String>,
}

impl LineRow {
    pub fn format(&self) -> String {
        let line = match self.outcome.point {
            Some(point) => format!("{} {}", format_point(point), format_odds(self.outcome.price)),
            None => format_odds(self.outcome.price),
        };
        format!(
            "{:<20} {:>14} {:<2}{}",
            self.bookmaker_title,
            line,
            self.movement.arrow(),
            if self.is_best { " BEST" } else { "" }
        )
    }
}

/// Rows for every bookmaker quoting `side` of `market`, in bookmaker order,
/// flagged with the best line and the move since `previous_bookmakers`
pub fn line_board(
    game: &Game,
    previous_bookmakers: Option<&[Bookmaker]>,
    market: MarketKey,
    side: Side,
) -> Vec<LineRow> {
    let best = best_price(game, market, side);

    quotes(game, market, side)
        .into_iter()
        .map(|quote| LineRow {
            bookmaker_key: quote.bookmaker.key.clone(),
            bookmaker_title: quote.bookmaker.title.clone(),
            outcome: quote.outcome.clone(),
            is_best: best.map_or(false, |best| is_best_price(quote.outcome, best)),
            movement: movement_for_bookmaker(
                market,
                quote.outcome,
                &quote.bookmaker.key,
                previous_bookmakers,
            ),
            link: quote.outcome.link.as_deref().map(clean_sports_link),
        })
        .collect()
}

/// Short line shown on a schedule card, taken from the first bookmaker
pub fn schedule_line(game: &Game, market: MarketKey, side: Side) -> Option<String> {
    let side = side.for_market(market);
    let name = game.outcome_name(side);
    let outcome = game
        .bookmakers
        .first()?
        .market(market)?
        .outcomes
        .iter()
        .find(|o| o.name == name)?;

    match market {
        MarketKey::Moneyline => Some(format_odds(outcome.price)),
        MarketKey::Spread => outcome.point.map(format_point),
        MarketKey::Totals => outcome
            .point
            .map(|point| format!("{} {}", outcome.name, point)),
    }
}

pub fn format_odds(price: i32) -> String {
    format!("{:+}", price)
}

pub fn format_point(point: f64) -> String {
    format!("{:+}", point)
}
