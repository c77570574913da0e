use crate::models::{Bookmaker, Game, MarketKey, Outcome, Side};

/// How quotes for one leg of a market are ranked against each other.
///
/// The best quote is found by folding over every bookmaker's quote for the
/// leg: each candidate replaces the running best when [`LineRule::prefers`]
/// says so, otherwise the earlier quote is kept.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineRule {
    /// Underdog prices: higher wins. Favorite prices: closer to zero wins.
    Moneyline,
    /// Favorite legs: fewer points given wins. Underdog legs: more points received wins.
    Spread,
    /// Lower total wins
    Over,
    /// Higher total wins
    Under,
}

impl LineRule {
    pub fn for_market(market: MarketKey, side: Side) -> Self {
        match (market, side.for_market(market)) {
            (MarketKey::Moneyline, _) => LineRule::Moneyline,
            (MarketKey::Spread, _) => LineRule::Spread,
            (MarketKey::Totals, Side::Under) => LineRule::Under,
            (MarketKey::Totals, _) => LineRule::Over,
        }
    }

    /// Whether `candidate` should replace `best`.
    ///
    /// The comparison is picked by the candidate's own sign (moneyline price,
    /// spread point), so quotes of opposite sign are not ranked symmetrically.
    pub fn prefers(self, candidate: &Outcome, best: &Outcome) -> bool {
        match self {
            LineRule::Moneyline => {
                if candidate.price > 0 {
                    candidate.price > best.price
                } else {
                    candidate.price.abs() < best.price.abs()
                }
            }
            LineRule::Spread => match (candidate.point, best.point) {
                (Some(c), Some(b)) if c < 0.0 => {
                    better_line(c.abs(), b.abs(), Prefer::Lower, candidate, best)
                }
                (Some(c), Some(b)) => better_line(c, b, Prefer::Higher, candidate, best),
                _ => false,
            },
            LineRule::Over => match (candidate.point, best.point) {
                (Some(c), Some(b)) => better_line(c, b, Prefer::Lower, candidate, best),
                _ => false,
            },
            LineRule::Under => match (candidate.point, best.point) {
                (Some(c), Some(b)) => better_line(c, b, Prefer::Higher, candidate, best),
                _ => false,
            },
        }
    }

    /// Spread and totals quotes are only comparable with a line attached
    fn needs_point(self) -> bool {
        !matches!(self, LineRule::Moneyline)
    }
}

#[derive(Clone, Copy)]
enum Prefer {
    Lower,
    Higher,
}

/// Compare two lines; on an exact tie the higher price wins
fn better_line(
    candidate_line: f64,
    best_line: f64,
    prefer: Prefer,
    candidate: &Outcome,
    best: &Outcome,
) -> bool {
    if candidate_line == best_line {
        return candidate.price > best.price;
    }
    match prefer {
        Prefer::Lower => candidate_line < best_line,
        Prefer::Higher => candidate_line > best_line,
    }
}

/// A bookmaker's quote for one leg of a market
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Quote<'a> {
    pub bookmaker: &'a Bookmaker,
    pub outcome: &'a Outcome,
}

/// Every bookmaker's quote for `side` of `market`, in bookmaker order
pub fn quotes<'a>(game: &'a Game, market: MarketKey, side: Side) -> Vec<Quote<'a>> {
    let side = side.for_market(market);
    let name = game.outcome_name(side);

    game.bookmakers
        .iter()
        .filter_map(|bookmaker| {
            let outcome = bookmaker
                .market(market)?
                .outcomes
                .iter()
                .find(|o| o.name == name)?;
            Some(Quote { bookmaker, outcome })
        })
        .collect()
}

/// The most favorable quote for a bettor on `side` of `market`, with the
/// bookmaker offering it
pub fn best_quote(game: &Game, market: MarketKey, side: Side) -> Option<Quote<'_>> {
    let rule = LineRule::for_market(market, side);

    quotes(game, market, side)
        .into_iter()
        .filter(|quote| !rule.needs_point() || quote.outcome.point.is_some())
        .reduce(|best, candidate| {
            if rule.prefers(candidate.outcome, best.outcome) {
                candidate
            } else {
                best
            }
        })
}

/// The most favorable outcome for a bettor on `side` of `market`.
///
/// `None` when the game has no bookmakers, nobody offers the market, or no
/// outcome matches the side.
pub fn best_price(game: &Game, market: MarketKey, side: Side) -> Option<&Outcome> {
    best_quote(game, market, side).map(|quote| quote.outcome)
}

/// Whether a displayed outcome carries the resolved best line
pub fn is_best_price(outcome: &Outcome, best: &Outcome) -> bool {
    outcome.price == best.price && outcome.point == best.point
}
