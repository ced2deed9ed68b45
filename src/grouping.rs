use std::cmp::Ordering;
use std::collections::{BTreeMap, HashMap};

use crate::bucket::local_date_label;
use crate::context::{SessionContext, competition_key};
use crate::state::{CompetitionGroup, GroupKey, Match};

pub fn group_matches(matches: &[Match], context: &SessionContext) -> Vec<CompetitionGroup> {
    let mut buckets: BTreeMap<GroupKey, Vec<Match>> = BTreeMap::new();
    for m in dedupe_by_id(matches)
        .into_iter()
        .filter(|m| has_listable_competition(m))
    {
        let key = GroupKey {
            competition: competition_key(m),
            date: date_label_for(m, context),
            match_day: m.match_day,
        };
        buckets.entry(key).or_default().push(m.clone());
    }

    let mut groups: Vec<CompetitionGroup> = buckets
        .into_iter()
        .map(|(key, mut members)| {
            members.sort_by(compare_kickoff);
            let meta = context.competition(&key.competition);
            let first = &members[0];
            CompetitionGroup {
                name: meta
                    .map(|meta| meta.name.clone())
                    .unwrap_or_else(|| first.competition_name.clone()),
                logo_url: meta.and_then(|meta| meta.logo_url.clone()),
                season: meta
                    .and_then(|meta| meta.season.clone())
                    .or_else(|| first.season_name.clone()),
                key,
                matches: members,
            }
        })
        .collect();

    groups.sort_by(compare_groups);
    groups
}

/// One entry per match id. A repeated id keeps its first slot and takes the
/// last record's contents.
pub fn dedupe_by_id(matches: &[Match]) -> Vec<&Match> {
    let mut slots: HashMap<&str, usize> = HashMap::new();
    let mut unique: Vec<&Match> = Vec::with_capacity(matches.len());
    for m in matches {
        match slots.get(m.id.as_str()) {
            Some(&slot) => unique[slot] = m,
            None => {
                slots.insert(m.id.as_str(), unique.len());
                unique.push(m);
            }
        }
    }
    unique
}

pub fn has_listable_competition(m: &Match) -> bool {
    match m.competition_id.as_deref() {
        Some(id) => !id.is_empty() && id.bytes().all(|b| b.is_ascii_digit()),
        None => true,
    }
}

fn date_label_for(m: &Match, context: &SessionContext) -> String {
    context
        .reference
        .or_else(|| m.kickoff.map(|kickoff| kickoff.date_naive()))
        .map(local_date_label)
        .unwrap_or_default()
}

pub fn compare_kickoff(a: &Match, b: &Match) -> Ordering {
    match (a.kickoff, b.kickoff) {
        (Some(x), Some(y)) => x.cmp(&y),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
    .then_with(|| a.id.cmp(&b.id))
}

pub fn compare_groups(a: &CompetitionGroup, b: &CompetitionGroup) -> Ordering {
    compare_display_names(&a.name, &b.name)
        .then_with(|| a.key.date.cmp(&b.key.date))
        .then_with(|| a.key.match_day.cmp(&b.key.match_day))
        .then_with(|| a.key.competition.cmp(&b.key.competition))
}

pub fn compare_display_names(a: &str, b: &str) -> Ordering {
    a.to_lowercase()
        .cmp(&b.to_lowercase())
        .then_with(|| a.cmp(b))
}
