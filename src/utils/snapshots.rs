use crate::models::{Game, Snapshot, SnapshotRecord, Sport};
use chrono::{DateTime, Utc};
use std::collections::{BTreeMap, HashMap};
use tracing::warn;

/// Split one fetch cycle's games into the records it is persisted as.
///
/// Sports with a single record part get one unsplit record. Otherwise the
/// games are cut into `total_parts` consecutive chunks (the first chunks take
/// the remainder) that all share `timestamp`.
pub fn partition(sport: &Sport, games: Vec<Game>, timestamp: DateTime<Utc>) -> Vec<SnapshotRecord> {
    let total_parts = sport.record_parts();
    if total_parts <= 1 {
        return vec![SnapshotRecord {
            sport: sport.clone(),
            data: games,
            timestamp,
            part: None,
            total_parts: None,
        }];
    }

    let chunk = games.len().div_ceil(total_parts as usize).max(1);
    let mut games = games.into_iter();

    (1..=total_parts)
        .map(|part| SnapshotRecord {
            sport: sport.clone(),
            data: games.by_ref().take(chunk).collect(),
            timestamp,
            part: Some(part),
            total_parts: Some(total_parts),
        })
        .collect()
}

/// Rebuild snapshots from persisted records, most recent first.
///
/// Split records are joined in part order once every part sharing their
/// sport and timestamp is present. A part set that is still incomplete is
/// skipped rather than treated as a full snapshot.
pub fn assemble(records: Vec<SnapshotRecord>) -> Vec<Snapshot> {
    let mut snapshots = Vec::new();
    let mut split: HashMap<(String, DateTime<Utc>), Vec<SnapshotRecord>> = HashMap::new();

    for record in records {
        if record.is_split() {
            split
                .entry((record.sport.as_str().to_string(), record.timestamp))
                .or_default()
                .push(record);
        } else {
            snapshots.push(Snapshot {
                sport: record.sport,
                timestamp: record.timestamp,
                games: record.data,
            });
        }
    }

    for ((sport_key, timestamp), parts) in split {
        match join_parts(parts) {
            Some(snapshot) => snapshots.push(snapshot),
            None => warn!(
                "Skipping incomplete {} snapshot at {}: not all parts are stored yet",
                sport_key, timestamp
            ),
        }
    }

    snapshots.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
    snapshots
}

fn join_parts(parts: Vec<SnapshotRecord>) -> Option<Snapshot> {
    let total_parts = parts.iter().filter_map(|r| r.total_parts).max()?;
    let first = parts.first()?;
    let sport = first.sport.clone();
    let timestamp = first.timestamp;

    let mut by_part: BTreeMap<u32, Vec<Game>> = BTreeMap::new();
    for record in parts {
        if let Some(part) = record.part {
            by_part.entry(part).or_insert(record.data);
        }
    }

    let complete = (1..=total_parts).all(|part| by_part.contains_key(&part));
    if !complete {
        return None;
    }

    Some(Snapshot {
        sport,
        timestamp,
        games: by_part.into_values().flatten().collect(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn games(n: usize) -> Vec<Game> {
        (0..n)
            .map(|i| Game::new(format!("g{}", i), "Duke", "North Carolina", vec![]))
            .collect()
    }

    fn at(hour: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 11, 5, hour, 0, 0).unwrap()
    }

    #[test]
    fn test_partition_single_record_sport() {
        let records = partition(&Sport::Nba, games(3), at(12));
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].part, None);
        assert_eq!(records[0].data.len(), 3);
    }

    #[test]
    fn test_partition_splits_ncaab_with_ceiling_midpoint() {
        let records = partition(&Sport::CollegeBasketball, games(5), at(12));
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].data.len(), 3);
        assert_eq!(records[1].data.len(), 2);
        assert_eq!(records[0].part, Some(1));
        assert_eq!(records[1].total_parts, Some(2));
        assert!(records.iter().all(|r| r.timestamp == at(12)));
    }

    #[test]
    fn test_partition_empty_slate_still_writes_every_part() {
        let records = partition(&Sport::CollegeBasketball, vec![], at(12));
        assert_eq!(records.len(), 2);
        assert!(records.iter().all(|r| r.data.is_empty()));
    }

    #[test]
    fn test_assemble_joins_parts_in_order() {
        let mut records = partition(&Sport::CollegeBasketball, games(5), at(12));
        records.reverse();

        let snapshots = assemble(records);
        assert_eq!(snapshots.len(), 1);
        let ids: Vec<_> = snapshots[0].games.iter().map(|g| g.id.as_str()).collect();
        assert_eq!(ids, ["g0", "g1", "g2", "g3", "g4"]);
    }

    #[test]
    fn test_assemble_skips_incomplete_part_sets() {
        let mut records = partition(&Sport::CollegeBasketball, games(4), at(12));
        records.pop();
        records.extend(partition(&Sport::CollegeBasketball, games(4), at(10)));

        let snapshots = assemble(records);
        assert_eq!(snapshots.len(), 1);
        assert_eq!(snapshots[0].timestamp, at(10));
    }

    #[test]
    fn test_assemble_orders_most_recent_first() {
        let mut records = Vec::new();
        for hour in [8, 14, 11] {
            records.extend(partition(&Sport::Nhl, games(1), at(hour)));
        }

        let timestamps: Vec<_> = assemble(records).iter().map(|s| s.timestamp).collect();
        assert_eq!(timestamps, [at(14), at(11), at(8)]);
    }
}
