use std::collections::HashMap;

use chrono::NaiveDate;

use crate::normalize::competition_logo_url;
use crate::state::{Match, StandingGroup, StandingsKey};

const NAME_KEY_PREFIX: &str = "name:";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompetitionMeta {
    pub name: String,
    pub logo_url: Option<String>,
    pub season: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct SessionContext {
    pub reference: Option<NaiveDate>,
    competitions: HashMap<String, CompetitionMeta>,
    standings: HashMap<StandingsKey, Vec<StandingGroup>>,
}

impl SessionContext {
    pub fn new(reference: NaiveDate) -> Self {
        Self {
            reference: Some(reference),
            ..Self::default()
        }
    }

    /// Records display metadata for every competition seen in a fetch. The
    /// first sighting wins so labels do not flicker between polls.
    pub fn absorb_matches(&mut self, matches: &[Match]) {
        for m in matches {
            let key = competition_key(m);
            self.competitions
                .entry(key)
                .or_insert_with(|| CompetitionMeta {
                    name: m.competition_name.clone(),
                    logo_url: m.competition_id.as_deref().map(competition_logo_url),
                    season: m.season_name.clone(),
                });
        }
    }

    pub fn competition(&self, key: &str) -> Option<&CompetitionMeta> {
        self.competitions.get(key)
    }

    pub fn set_standings(&mut self, key: StandingsKey, groups: Vec<StandingGroup>) {
        self.standings.insert(key, groups);
    }

    pub fn standings(&self, key: &StandingsKey) -> Option<&[StandingGroup]> {
        self.standings.get(key).map(Vec::as_slice)
    }

    pub fn has_standings(&self, key: &StandingsKey) -> bool {
        self.standings.contains_key(key)
    }
}

/// Competition id, or `name:<display name>` for matches the feed left
/// unattributed. The prefix keeps a name from colliding with a numeric id.
pub fn competition_key(m: &Match) -> String {
    match &m.competition_id {
        Some(id) => id.clone(),
        None => format!("{NAME_KEY_PREFIX}{}", m.competition_name),
    }
}
