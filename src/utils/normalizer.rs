use crate::error::MalformedFeedError;
use crate::models::{Game, MarketKey};
use serde_json::{Map, Value};
use std::collections::HashSet;
use tracing::debug;

/// Fields a game must carry for it to be joined across snapshots and priced
const REQUIRED_FIELDS: [&str; 4] = ["id", "home_team", "away_team", "bookmakers"];

/// Validate a raw Odds API payload and shape it into games.
///
/// This is a structural boundary only: unknown fields are kept on the
/// models' `extra` maps and nothing is reordered or recomputed. Markets
/// outside the h2h/spreads/totals vocabulary are dropped.
pub fn normalize(raw: Value) -> Result<Vec<Game>, MalformedFeedError> {
    let Value::Array(items) = raw else {
        return Err(MalformedFeedError::NotAnArray);
    };

    let games = items
        .into_iter()
        .enumerate()
        .map(|(index, item)| normalize_game(index, item))
        .collect::<Result<Vec<_>, _>>()?;

    debug!("Normalized {} games from feed payload", games.len());
    Ok(games)
}

/// Same as [`normalize`] for a payload that has not been parsed yet
pub fn normalize_str(json: &str) -> Result<Vec<Game>, MalformedFeedError> {
    let raw: Value =
        serde_json::from_str(json).map_err(|e| MalformedFeedError::InvalidJson(e.to_string()))?;
    normalize(raw)
}

fn normalize_game(index: usize, item: Value) -> Result<Game, MalformedFeedError> {
    let Value::Object(mut object) = item else {
        return Err(MalformedFeedError::NotAnObject { index });
    };

    for field in REQUIRED_FIELDS {
        if object.get(field).map_or(true, Value::is_null) {
            return Err(MalformedFeedError::MissingField { index, field });
        }
    }

    match object.get_mut("bookmakers") {
        Some(Value::Array(bookmakers)) => {
            for bookmaker in bookmakers.iter_mut() {
                if let Value::Object(bookmaker) = bookmaker {
                    retain_known_markets(index, bookmaker)?;
                }
            }
        }
        _ => {
            return Err(MalformedFeedError::Invalid {
                index,
                reason: "`bookmakers` is not an array".to_string(),
            })
        }
    }

    let game: Game =
        serde_json::from_value(Value::Object(object)).map_err(|e| MalformedFeedError::Invalid {
            index,
            reason: e.to_string(),
        })?;

    let zero_priced = game
        .bookmakers
        .iter()
        .flat_map(|b| &b.markets)
        .flat_map(|m| &m.outcomes)
        .find(|o| o.price == 0);
    if let Some(outcome) = zero_priced {
        return Err(MalformedFeedError::ZeroPrice {
            index,
            outcome: outcome.name.clone(),
        });
    }

    Ok(game)
}

/// Drop markets outside the fixed vocabulary and reject repeated market keys
fn retain_known_markets(
    index: usize,
    bookmaker: &mut Map<String, Value>,
) -> Result<(), MalformedFeedError> {
    let bookmaker_key = bookmaker
        .get("key")
        .and_then(Value::as_str)
        .unwrap_or("?")
        .to_string();

    let Some(Value::Array(markets)) = bookmaker.get_mut("markets") else {
        return Ok(());
    };

    if markets
        .iter()
        .any(|market| market.get("key").and_then(Value::as_str).is_none())
    {
        return Err(MalformedFeedError::Invalid {
            index,
            reason: format!("bookmaker `{}` has a market without a `key`", bookmaker_key),
        });
    }

    markets.retain(|market| {
        let key = market.get("key").and_then(Value::as_str);
        let known = key.and_then(MarketKey::from_feed_key).is_some();
        if !known {
            debug!(
                "Dropping market {:?} from bookmaker {}",
                key.unwrap_or_default(),
                bookmaker_key
            );
        }
        known
    });

    let mut seen = HashSet::new();
    for market in markets.iter() {
        if let Some(key) = market.get("key").and_then(Value::as_str) {
            if !seen.insert(key) {
                return Err(MalformedFeedError::DuplicateMarket {
                    index,
                    bookmaker: bookmaker_key,
                    market: key.to_string(),
                });
            }
        }
    }

    Ok(())
}
