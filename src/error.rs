use thiserror::Error;

/// Raw feed payload is missing structure the tracker relies on.
/// Surfaced to the caller as-is; retrying is the ingest side's decision.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum MalformedFeedError {
    #[error("feed payload is not valid JSON: {0}")]
    InvalidJson(String),

    #[error("feed payload is not a JSON array of games")]
    NotAnArray,

    #[error("game #{index} is not a JSON object")]
    NotAnObject { index: usize },

    #[error("game #{index} is missing required field `{field}`")]
    MissingField { index: usize, field: &'static str },

    #[error("game #{index}: bookmaker `{bookmaker}` lists market `{market}` more than once")]
    DuplicateMarket {
        index: usize,
        bookmaker: String,
        market: String,
    },

    #[error("game #{index}: outcome `{outcome}` has a zero price")]
    ZeroPrice { index: usize, outcome: String },

    #[error("game #{index} is invalid: {reason}")]
    Invalid { index: usize, reason: String },
}

/// No supplied snapshot contains the requested game
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("game {game_id} not found in any recent snapshot")]
pub struct GameNotFoundError {
    pub game_id: String,
}

impl GameNotFoundError {
    pub fn new(game_id: impl Into<String>) -> Self {
        Self {
            game_id: game_id.into(),
        }
    }
}
