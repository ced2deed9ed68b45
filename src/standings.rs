use std::cmp::Ordering;
use std::collections::BTreeMap;

use crate::grouping::compare_display_names;
use crate::names::resolve_localized_opt;
use crate::normalize::normalize_team;
use crate::upstream::{RawFormMatch, RawStandingEntry, value_to_i64};
use crate::state::{FormOutcome, StandingGroup, StandingRow};

pub const FORM_LENGTH: usize = 5;
const UNGROUPED_TABLE: &str = "Table";

/// Builds one table per standings group. Rows keep the provider's position
/// when it sent one; unranked rows are ordered by points, goal difference and
/// goals for, and are numbered after the highest provider position.
pub fn aggregate_standings(entries: &[RawStandingEntry], locale: &str) -> Vec<StandingGroup> {
    let mut tables: BTreeMap<String, Vec<(Option<u32>, StandingRow)>> = BTreeMap::new();
    for entry in entries {
        let name = resolve_localized_opt(&entry.group, Some(locale))
            .unwrap_or_else(|| UNGROUPED_TABLE.to_string());
        tables
            .entry(name)
            .or_default()
            .push((entry.position, standing_row(entry, locale)));
    }

    let mut groups: Vec<StandingGroup> = tables
        .into_iter()
        .map(|(name, mut rows)| {
            rows.sort_by(|(pa, a), (pb, b)| compare_ranked(*pa, a, *pb, b));
            let mut next_free = rows
                .iter()
                .filter_map(|(position, _)| *position)
                .max()
                .unwrap_or(0);
            let rows = rows
                .into_iter()
                .map(|(position, mut row)| {
                    row.position = position.unwrap_or_else(|| {
                        next_free += 1;
                        next_free
                    });
                    row
                })
                .collect();
            StandingGroup { name, rows }
        })
        .collect();
    groups.sort_by(|a, b| compare_display_names(&a.name, &b.name));
    groups
}

fn standing_row(entry: &RawStandingEntry, locale: &str) -> StandingRow {
    let team = normalize_team(entry.team.as_ref(), None, locale);
    let goals_for = entry.goals_for.unwrap_or(0);
    let goals_against = entry.goals_against.unwrap_or(0);
    let goal_difference = entry
        .goal_difference
        .as_ref()
        .and_then(value_to_i64)
        .unwrap_or(i64::from(goals_for) - i64::from(goals_against));
    let form = team
        .id
        .as_deref()
        .map(|team_id| recent_form(&entry.match_results, team_id))
        .unwrap_or_default();

    StandingRow {
        position: 0,
        team_id: team.id,
        team_name: team.name,
        team_abbreviation: team.abbreviation,
        team_logo_url: team.logo_url,
        played: entry.played.unwrap_or(0),
        won: entry.won.unwrap_or(0),
        drawn: entry.drawn.unwrap_or(0),
        lost: entry.lost.unwrap_or(0),
        goals_for,
        goals_against,
        goal_difference,
        points: entry.points.unwrap_or(0),
        form,
    }
}

/// `results` arrive most recent first; the returned form is oldest first.
/// Unplayed fixtures and matches the team did not play in are skipped.
pub fn recent_form(results: &[RawFormMatch], team_id: &str) -> Vec<FormOutcome> {
    let mut form: Vec<FormOutcome> = results
        .iter()
        .filter_map(|result| outcome_for(result, team_id))
        .take(FORM_LENGTH)
        .collect();
    form.reverse();
    form
}

fn outcome_for(result: &RawFormMatch, team_id: &str) -> Option<FormOutcome> {
    let (home, away) = (result.home_score?, result.away_score?);
    let (ours, theirs) = if result.home_team_id.as_deref() == Some(team_id) {
        (home, away)
    } else if result.away_team_id.as_deref() == Some(team_id) {
        (away, home)
    } else {
        return None;
    };
    Some(match ours.cmp(&theirs) {
        Ordering::Greater => FormOutcome::Win,
        Ordering::Equal => FormOutcome::Draw,
        Ordering::Less => FormOutcome::Loss,
    })
}

fn compare_ranked(
    pos_a: Option<u32>,
    a: &StandingRow,
    pos_b: Option<u32>,
    b: &StandingRow,
) -> Ordering {
    let by_position = match (pos_a, pos_b) {
        (Some(x), Some(y)) => x.cmp(&y),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    };
    by_position
        .then_with(|| b.points.cmp(&a.points))
        .then_with(|| b.goal_difference.cmp(&a.goal_difference))
        .then_with(|| b.goals_for.cmp(&a.goals_for))
        .then_with(|| a.team_name.cmp(&b.team_name))
}

pub fn form_string(form: &[FormOutcome]) -> String {
    form.iter().map(|outcome| outcome.letter()).collect()
}
