use crate::core::participant::Participant;
use helpers::general::{argsort, SortOrder};
use std::fmt::Write;

/// Sort orders offered by the leaderboard. Scores are listed highest first, names and UUIDs
/// alphabetically.
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum LeaderboardOrder {
    Score,
    Name,
    Uuid,
}

/// sort_roster returns the roster in the requested order. Equal keys keep the roster order.
pub fn sort_roster(roster: &[Participant], order: LeaderboardOrder) -> Vec<&Participant> {
    let idxs = match order {
        LeaderboardOrder::Score => {
            let scores: Vec<i64> = roster.iter().map(|p| p.score).collect();
            argsort(&scores, SortOrder::Descending)
        }
        LeaderboardOrder::Name => {
            let names: Vec<&str> = roster.iter().map(|p| p.name.as_str()).collect();
            argsort(&names, SortOrder::Ascending)
        }
        LeaderboardOrder::Uuid => {
            let uuids: Vec<&str> = roster.iter().map(|p| p.uuid.as_str()).collect();
            argsort(&uuids, SortOrder::Ascending)
        }
    };

    idxs.into_iter().map(|i| &roster[i]).collect()
}

/// find_participants matches a query against the roster: an exact UUID, or else a
/// case-insensitive part of the name.
pub fn find_participants<'a>(roster: &'a [Participant], query: &str) -> Vec<&'a Participant> {
    if let Some(p) = roster.iter().find(|p| p.uuid == query) {
        return vec![p];
    }
    let query = query.to_lowercase();
    roster
        .iter()
        .filter(|p| p.name.to_lowercase().contains(&query))
        .collect()
}

pub fn format_leaderboard(entries: &[&Participant]) -> String {
    let mut content = String::new();
    let _ = writeln!(
        &mut content,
        "{:<20} {:>7} {:>9} {:>9}  {}",
        "Name", "Score", "MinSpeed", "MaxSpeed", "UUID"
    );
    for p in entries.iter() {
        let _ = writeln!(
            &mut content,
            "{:<20} {:>7} {:>9} {:>9}  {}",
            p.name, p.score, p.min_speed, p.max_speed, p.uuid
        );
    }
    content
}
