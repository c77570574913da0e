use crate::models::{Bookmaker, MarketKey, Outcome};
use serde::{Deserialize, Serialize};

/// Direction a quoted price moved since the previous snapshot
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Movement {
    Improved,
    Worsened,
    Unchanged,
    NoPriorData,
}

impl Movement {
    pub fn arrow(&self) -> &'static str {
        match self {
            Movement::Improved => "▲",
            Movement::Worsened => "▼",
            Movement::Unchanged | Movement::NoPriorData => "",
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Movement::Improved => "improved",
            Movement::Worsened => "worsened",
            Movement::Unchanged => "unchanged",
            Movement::NoPriorData => "no_prior_data",
        }
    }
}

/// Find the previous quote for the same leg. Totals legs are matched by their
/// Over/Under role, every other market by outcome name.
fn matching_outcome<'a>(
    market: MarketKey,
    current: &Outcome,
    previous: &'a [Outcome],
) -> Option<&'a Outcome> {
    match market {
        MarketKey::Totals => previous
            .iter()
            .find(|o| o.name.eq_ignore_ascii_case(&current.name)),
        MarketKey::Moneyline | MarketKey::Spread => {
            previous.iter().find(|o| o.name == current.name)
        }
    }
}

/// Classify how `current` moved against the same bookmaker's previous
/// outcomes for the same market.
///
/// Only `price` is compared; a line (point) change on its own reads as
/// `Unchanged`. A higher American price is better for the bettor on either
/// side of the line.
pub fn movement(market: MarketKey, current: &Outcome, previous: &[Outcome]) -> Movement {
    let Some(previous) = matching_outcome(market, current, previous) else {
        return Movement::NoPriorData;
    };

    match current.price.cmp(&previous.price) {
        std::cmp::Ordering::Greater => Movement::Improved,
        std::cmp::Ordering::Less => Movement::Worsened,
        std::cmp::Ordering::Equal => Movement::Unchanged,
    }
}

/// Look up `bookmaker_key`'s market in the previous snapshot's bookmakers and
/// classify the move. `previous_bookmakers` is `None` when there is no prior
/// snapshot at all.
pub fn movement_for_bookmaker(
    market: MarketKey,
    current: &Outcome,
    bookmaker_key: &str,
    previous_bookmakers: Option<&[Bookmaker]>,
) -> Movement {
    previous_bookmakers
        .and_then(|bookmakers| bookmakers.iter().find(|b| b.key == bookmaker_key))
        .and_then(|bookmaker| bookmaker.market(market))
        .map_or(Movement::NoPriorData, |previous| {
            movement(market, current, &previous.outcomes)
        })
}
