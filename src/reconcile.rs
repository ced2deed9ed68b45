use std::collections::{HashMap, HashSet};

use thiserror::Error;

use crate::state::{CompetitionGroup, Match};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ReconcileError {
    #[error("fresh groups are for {fresh}, board is rendered for {previous}")]
    DateMismatch { previous: String, fresh: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReconcileOutcome {
    pub groups: Vec<CompetitionGroup>,
    pub updated: Vec<String>,
    /// Ids present in the fresh fetch but not on the board. The caller decides
    /// whether to regroup; they are never spliced in here.
    pub unseen: Vec<String>,
}

/// Copies score, status, winner and match time from `fresh` onto the matches
/// of `previous`. Group keys, ordering and every other field are preserved;
/// rendered matches missing from `fresh` are left as they were.
pub fn reconcile_groups(
    previous: &[CompetitionGroup],
    fresh: &[CompetitionGroup],
) -> Result<ReconcileOutcome, ReconcileError> {
    if let (Some(previous_date), Some(fresh_date)) = (board_date(previous), board_date(fresh))
        && previous_date != fresh_date
    {
        return Err(ReconcileError::DateMismatch {
            previous: previous_date.to_string(),
            fresh: fresh_date.to_string(),
        });
    }

    let fresh_by_id: HashMap<&str, &Match> = fresh
        .iter()
        .flat_map(|group| group.matches.iter())
        .map(|m| (m.id.as_str(), m))
        .collect();

    let mut rendered: HashSet<&str> = HashSet::new();
    let mut updated = Vec::new();
    let groups = previous
        .iter()
        .map(|group| {
            let mut group = group.clone();
            for m in &mut group.matches {
                if let Some(next) = fresh_by_id.get(m.id.as_str())
                    && m.refresh_from(next)
                {
                    updated.push(m.id.clone());
                }
            }
            group
        })
        .collect();

    for m in previous.iter().flat_map(|group| group.matches.iter()) {
        rendered.insert(m.id.as_str());
    }
    let unseen = fresh
        .iter()
        .flat_map(|group| group.matches.iter())
        .filter(|m| !rendered.contains(m.id.as_str()))
        .map(|m| m.id.clone())
        .collect();

    Ok(ReconcileOutcome {
        groups,
        updated,
        unseen,
    })
}

fn board_date(groups: &[CompetitionGroup]) -> Option<&str> {
    groups
        .iter()
        .map(|group| group.key.date.as_str())
        .find(|date| !date.is_empty())
}
