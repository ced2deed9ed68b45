use std::cmp::Ordering;

use crate::normalize::normalize_match;
use crate::state::{HeadToHeadMatch, HeadToHeadStats, Match, TeamRecord};
use crate::upstream::{RawHeadToHead, RawTeamRecord};

/// Orients a head-to-head payload to the current fixture: `home` always holds
/// the record of `home_id`, whatever order the provider sent the pair in.
pub fn aggregate_head_to_head(
    raw: &RawHeadToHead,
    home_id: &str,
    away_id: &str,
    locale: &str,
) -> HeadToHeadStats {
    let a = raw.team_a.as_ref();
    let b = raw.team_b.as_ref();
    let swapped = record_id(b) == Some(home_id) && record_id(a) != Some(home_id);
    let (home, away) = if swapped { (b, a) } else { (a, b) };

    let mut history: Vec<(Option<chrono::DateTime<chrono::Utc>>, HeadToHeadMatch)> = raw
        .matches
        .iter()
        .filter_map(|item| normalize_match(item, locale))
        .map(|m| (m.kickoff, history_row(&m, home_id, away_id)))
        .collect();
    history.sort_by(|(ka, a), (kb, b)| newest_first(*ka, *kb).then_with(|| a.id.cmp(&b.id)));

    HeadToHeadStats {
        home: team_record(home),
        away: team_record(away),
        history: history.into_iter().map(|(_, row)| row).collect(),
    }
}

fn record_id(record: Option<&RawTeamRecord>) -> Option<&str> {
    record.and_then(|record| record.team_id.as_deref())
}

fn team_record(record: Option<&RawTeamRecord>) -> TeamRecord {
    match record {
        Some(record) => TeamRecord {
            team_id: record.team_id.clone(),
            matches_played: record.matches_played.unwrap_or(0),
            wins: record.wins.unwrap_or(0),
            draws: record.draws.unwrap_or(0),
            losses: record.losses.unwrap_or(0),
        },
        None => TeamRecord {
            team_id: None,
            matches_played: 0,
            wins: 0,
            draws: 0,
            losses: 0,
        },
    }
}

/// `did_home_win` / `did_away_win` refer to the current pair, not to the
/// sides this meeting was listed with.
fn history_row(m: &Match, home_id: &str, away_id: &str) -> HeadToHeadMatch {
    let winner = meeting_winner(m);
    HeadToHeadMatch {
        id: m.id.clone(),
        kickoff: m.kickoff,
        competition_name: m.competition_name.clone(),
        home_name: m.home.name.clone(),
        away_name: m.away.name.clone(),
        home_score: m.home.score,
        away_score: m.away.score,
        did_home_win: winner == Some(home_id),
        did_away_win: winner == Some(away_id),
    }
}

fn meeting_winner(m: &Match) -> Option<&str> {
    match (m.home.score, m.away.score) {
        (Some(h), Some(a)) if h > a => m.home.id.as_deref(),
        (Some(h), Some(a)) if a > h => m.away.id.as_deref(),
        _ => m.winner.as_deref(),
    }
}

fn newest_first<T: Ord>(a: Option<T>, b: Option<T>) -> Ordering {
    match (a, b) {
        (Some(x), Some(y)) => y.cmp(&x),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}
