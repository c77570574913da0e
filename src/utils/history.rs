use crate::error::GameNotFoundError;
use crate::models::{Bookmaker, Game, Snapshot};

/// The two most recent snapshots of a sport that both carry one game
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HistoryWindow<'a> {
    pub current: &'a Snapshot,
    pub previous: Option<&'a Snapshot>,
    pub current_game: &'a Game,
    pub previous_game: Option<&'a Game>,
}

impl<'a> HistoryWindow<'a> {
    /// Bookmakers as they stood in the previous snapshot, the baseline for
    /// movement arrows
    pub fn previous_bookmakers(&self) -> Option<&'a [Bookmaker]> {
        self.previous_game.map(|game| game.bookmakers.as_slice())
    }
}

/// Pick the current and previous snapshots for `game_id`.
///
/// `snapshots` must already be ordered most recent first and bounded by the
/// caller; nothing here reads from storage.
pub fn select_history<'a>(
    snapshots: &'a [Snapshot],
    game_id: &str,
) -> Result<HistoryWindow<'a>, GameNotFoundError> {
    let mut qualifying = snapshots
        .iter()
        .filter_map(|snapshot| snapshot.game(game_id).map(|game| (snapshot, game)));

    let (current, current_game) = qualifying
        .next()
        .ok_or_else(|| GameNotFoundError::new(game_id))?;
    let previous = qualifying.next();

    Ok(HistoryWindow {
        current,
        previous: previous.map(|(snapshot, _)| snapshot),
        current_game,
        previous_game: previous.map(|(_, game)| game),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Sport;
    use chrono::{DateTime, TimeZone, Utc};

    fn at(hour: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 12, 1, hour, 0, 0).unwrap()
    }

    fn snapshot(hour: u32, game_ids: &[&str]) -> Snapshot {
        Snapshot {
            sport: Sport::Nfl,
            timestamp: at(hour),
            games: game_ids
                .iter()
                .map(|id| Game::new(*id, "Buffalo Bills", "Miami Dolphins", vec![]))
                .collect(),
        }
    }

    #[test]
    fn test_two_most_recent_snapshots() {
        let snapshots = vec![
            snapshot(3, &["a", "b"]),
            snapshot(2, &["a"]),
            snapshot(1, &["a"]),
        ];

        let window = select_history(&snapshots, "a").unwrap();
        assert_eq!(window.current.timestamp, at(3));
        assert_eq!(window.previous.map(|s| s.timestamp), Some(at(2)));
        assert_eq!(window.current_game.id, "a");
    }

    #[test]
    fn test_skips_snapshots_without_the_game() {
        let snapshots = vec![
            snapshot(4, &["x"]),
            snapshot(3, &["a"]),
            snapshot(2, &["y"]),
            snapshot(1, &["a"]),
        ];

        let window = select_history(&snapshots, "a").unwrap();
        assert_eq!(window.current.timestamp, at(3));
        assert_eq!(window.previous.map(|s| s.timestamp), Some(at(1)));
    }

    #[test]
    fn test_single_snapshot_has_no_previous() {
        let snapshots = vec![snapshot(2, &["b"]), snapshot(1, &["a"])];

        let window = select_history(&snapshots, "a").unwrap();
        assert_eq!(window.current.timestamp, at(1));
        assert!(window.previous.is_none());
        assert!(window.previous_bookmakers().is_none());
    }

    #[test]
    fn test_game_not_found() {
        let snapshots = vec![snapshot(1, &["a"])];
        assert_eq!(
            select_history(&snapshots, "zzz").unwrap_err(),
            GameNotFoundError::new("zzz")
        );
        assert!(select_history(&[], "a").is_err());
    }
}
