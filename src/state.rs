use std::collections::{HashMap, VecDeque};
use std::fmt;
use std::time::SystemTime;

use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;

use crate::bucket::{ViewerZone, bucket_matches};
use crate::context::SessionContext;
use crate::grouping::group_matches;
use crate::reconcile::{ReconcileError, reconcile_groups};

const LOG_CAPACITY: usize = 200;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum MatchStatus {
    Scheduled,
    Live,
    Finished,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TeamSide {
    pub id: Option<String>,
    pub name: String,
    pub abbreviation: String,
    pub logo_url: Option<String>,
    pub score: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Match {
    pub id: String,
    pub competition_id: Option<String>,
    pub competition_name: String,
    pub season_id: Option<String>,
    pub season_name: Option<String>,
    pub stage_id: Option<String>,
    pub stage_name: Option<String>,
    pub home: TeamSide,
    pub away: TeamSide,
    pub kickoff: Option<DateTime<Utc>>,
    pub status: MatchStatus,
    pub match_day: Option<u32>,
    pub venue: Option<String>,
    pub winner: Option<String>,
    pub match_time: Option<String>,
}

impl Match {
    pub fn is_live(&self) -> bool {
        self.status == MatchStatus::Live
    }

    /// Copies the fields a poll is allowed to change. Identity, team display
    /// data and competition metadata stay as first rendered.
    pub fn refresh_from(&mut self, fresh: &Match) -> bool {
        let changed = self.home.score != fresh.home.score
            || self.away.score != fresh.away.score
            || self.status != fresh.status
            || self.winner != fresh.winner
            || self.match_time != fresh.match_time;
        self.home.score = fresh.home.score;
        self.away.score = fresh.away.score;
        self.status = fresh.status;
        self.winner = fresh.winner.clone();
        self.match_time = fresh.match_time.clone();
        changed
    }

    pub fn standings_key(&self) -> Option<StandingsKey> {
        Some(StandingsKey {
            competition_id: self.competition_id.clone()?,
            season_id: self.season_id.clone()?,
            stage_id: self.stage_id.clone()?,
        })
    }

    pub fn detail_key(&self) -> Option<MatchKey> {
        Some(MatchKey {
            standings: self.standings_key()?,
            match_id: self.id.clone(),
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct GroupKey {
    /// Competition id, or `name:<display name>` when the feed has none.
    pub competition: String,
    pub date: String,
    pub match_day: Option<u32>,
}

impl fmt::Display for GroupKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.match_day {
            Some(day) => write!(f, "{}:{}:{day}", self.competition, self.date),
            None => write!(f, "{}:{}", self.competition, self.date),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CompetitionGroup {
    pub key: GroupKey,
    pub name: String,
    pub logo_url: Option<String>,
    pub season: Option<String>,
    pub matches: Vec<Match>,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct StandingsKey {
    pub competition_id: String,
    pub season_id: String,
    pub stage_id: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct MatchKey {
    pub standings: StandingsKey,
    pub match_id: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum FormOutcome {
    Win,
    Draw,
    Loss,
}

impl FormOutcome {
    pub fn letter(self) -> char {
        match self {
            FormOutcome::Win => 'W',
            FormOutcome::Draw => 'D',
            FormOutcome::Loss => 'L',
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StandingRow {
    pub position: u32,
    pub team_id: Option<String>,
    pub team_name: String,
    pub team_abbreviation: String,
    pub team_logo_url: Option<String>,
    pub played: u32,
    pub won: u32,
    pub drawn: u32,
    pub lost: u32,
    pub goals_for: u32,
    pub goals_against: u32,
    pub goal_difference: i64,
    pub points: u32,
    pub form: Vec<FormOutcome>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StandingGroup {
    pub name: String,
    pub rows: Vec<StandingRow>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Side {
    Home,
    Away,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum GoalKind {
    Regular,
    Penalty,
    OwnGoal,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum CardKind {
    Yellow,
    Red,
    SecondYellow,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum TimelineEventType {
    Goal,
    YellowCard,
    RedCard,
    Substitution,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum TimelinePayload {
    Goal {
        scorer: String,
        assist: Option<String>,
        kind: GoalKind,
    },
    Card {
        player: String,
        kind: CardKind,
    },
    Substitution {
        player_off: String,
        player_on: String,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TimelineEvent {
    pub minute: String,
    pub period: u32,
    pub side: Side,
    pub payload: TimelinePayload,
}

impl TimelineEvent {
    pub fn event_type(&self) -> TimelineEventType {
        match &self.payload {
            TimelinePayload::Goal { .. } => TimelineEventType::Goal,
            TimelinePayload::Card {
                kind: CardKind::Yellow,
                ..
            } => TimelineEventType::YellowCard,
            TimelinePayload::Card { .. } => TimelineEventType::RedCard,
            TimelinePayload::Substitution { .. } => TimelineEventType::Substitution,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TeamRecord {
    pub team_id: Option<String>,
    pub matches_played: u32,
    pub wins: u32,
    pub draws: u32,
    pub losses: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HeadToHeadMatch {
    pub id: String,
    pub kickoff: Option<DateTime<Utc>>,
    pub competition_name: String,
    pub home_name: String,
    pub away_name: String,
    pub home_score: Option<u32>,
    pub away_score: Option<u32>,
    /// Whether the *current* home team won this meeting.
    pub did_home_win: bool,
    /// Whether the *current* away team won this meeting.
    pub did_away_win: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HeadToHeadStats {
    pub home: TeamRecord,
    pub away: TeamRecord,
    pub history: Vec<HeadToHeadMatch>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MatchDetail {
    pub summary: Match,
    pub timeline: Vec<TimelineEvent>,
}

#[derive(Debug, Clone)]
pub struct BoardState {
    pub session: u64,
    pub zone: ViewerZone,
    pub reference: Option<NaiveDate>,
    pub groups: Vec<CompetitionGroup>,
    pub context: SessionContext,
    pub timelines: HashMap<String, Vec<TimelineEvent>>,
    pub head_to_head: HashMap<String, HeadToHeadStats>,
    pub last_refresh: Option<SystemTime>,
    pub logs: VecDeque<String>,
}

impl Default for BoardState {
    fn default() -> Self {
        Self::new(ViewerZone::Local)
    }
}

impl BoardState {
    pub fn new(zone: ViewerZone) -> Self {
        Self {
            session: 0,
            zone,
            reference: None,
            groups: Vec::new(),
            context: SessionContext::default(),
            timelines: HashMap::new(),
            head_to_head: HashMap::new(),
            last_refresh: None,
            logs: VecDeque::new(),
        }
    }

    /// Starts a new reference-date session and drops everything scoped to the
    /// previous one. Deltas still in flight for the old session are ignored by
    /// [`apply_delta`] from here on.
    pub fn begin_session(&mut self, reference: NaiveDate) -> ProviderCommand {
        self.session += 1;
        self.reference = Some(reference);
        self.groups.clear();
        self.context = SessionContext::new(reference);
        self.timelines.clear();
        self.head_to_head.clear();
        self.last_refresh = None;
        ProviderCommand::Watch {
            session: self.session,
            date: reference,
        }
    }

    pub fn begin_session_now(&mut self) -> ProviderCommand {
        let today = self.zone.local_date(Utc::now());
        self.begin_session(today)
    }

    pub fn push_log(&mut self, msg: impl Into<String>) {
        self.logs.push_back(msg.into());
        while self.logs.len() > LOG_CAPACITY {
            self.logs.pop_front();
        }
    }

    pub fn find_match(&self, match_id: &str) -> Option<&Match> {
        self.groups
            .iter()
            .flat_map(|group| group.matches.iter())
            .find(|m| m.id == match_id)
    }

    fn find_match_mut(&mut self, match_id: &str) -> Option<&mut Match> {
        self.groups
            .iter_mut()
            .flat_map(|group| group.matches.iter_mut())
            .find(|m| m.id == match_id)
    }

    pub fn visible_standings_keys(&self) -> Vec<StandingsKey> {
        let mut keys: Vec<StandingsKey> = Vec::new();
        for key in self
            .groups
            .iter()
            .flat_map(|group| group.matches.iter())
            .filter_map(Match::standings_key)
        {
            if !keys.contains(&key) {
                keys.push(key);
            }
        }
        keys
    }

    fn rebuild_groups(&mut self, matches: &[Match]) {
        let Some(reference) = self.reference else {
            return;
        };
        let on_day = bucket_matches(matches, reference, &self.zone);
        self.groups = group_matches(&on_day, &self.context);
    }
}

#[derive(Debug, Clone)]
pub enum Delta {
    /// A match-feed fetch for the session's window. `full` marks the first
    /// fetch of a session, which builds the board instead of reconciling.
    Matches {
        session: u64,
        matches: Vec<Match>,
        full: bool,
    },
    Standings {
        session: u64,
        key: StandingsKey,
        groups: Vec<StandingGroup>,
    },
    MatchDetail {
        session: u64,
        detail: MatchDetail,
    },
    HeadToHead {
        session: u64,
        match_id: String,
        stats: HeadToHeadStats,
    },
    Log(String),
}

impl Delta {
    fn session(&self) -> Option<u64> {
        match self {
            Delta::Matches { session, .. }
            | Delta::Standings { session, .. }
            | Delta::MatchDetail { session, .. }
            | Delta::HeadToHead { session, .. } => Some(*session),
            Delta::Log(_) => None,
        }
    }
}

#[derive(Debug, Clone)]
pub enum ProviderCommand {
    Watch { session: u64, date: NaiveDate },
    Unwatch,
    FetchStandings {
        session: u64,
        keys: Vec<StandingsKey>,
    },
    FetchMatchCenter {
        session: u64,
        key: MatchKey,
        home_id: String,
        away_id: String,
    },
    Shutdown,
}

pub fn apply_delta(state: &mut BoardState, delta: Delta) -> Result<(), ReconcileError> {
    if let Some(session) = delta.session()
        && session != state.session
    {
        tracing::debug!(session, current = state.session, "dropping stale delta");
        return Ok(());
    }

    match delta {
        Delta::Matches { matches, full, .. } => {
            state.context.absorb_matches(&matches);
            if full || state.groups.is_empty() {
                state.rebuild_groups(&matches);
            } else {
                let Some(reference) = state.reference else {
                    return Ok(());
                };
                let on_day = bucket_matches(&matches, reference, &state.zone);
                let fresh = group_matches(&on_day, &state.context);
                let outcome = reconcile_groups(&state.groups, &fresh)?;
                if outcome.unseen.is_empty() {
                    state.groups = outcome.groups;
                } else {
                    // The set of matches for the day changed: regroup from scratch.
                    state.push_log(format!(
                        "[INFO] {} new match(es) for the day, regrouping",
                        outcome.unseen.len()
                    ));
                    let mut merged: Vec<Match> = outcome
                        .groups
                        .into_iter()
                        .flat_map(|group| group.matches)
                        .collect();
                    merged.extend(
                        on_day
                            .into_iter()
                            .filter(|m| outcome.unseen.contains(&m.id)),
                    );
                    state.rebuild_groups(&merged);
                }
            }
            state.last_refresh = Some(SystemTime::now());
        }
        Delta::Standings { key, groups, .. } => {
            state.context.set_standings(key, groups);
        }
        Delta::MatchDetail { detail, .. } => {
            let MatchDetail { summary, timeline } = detail;
            if let Some(existing) = state.find_match_mut(&summary.id) {
                existing.refresh_from(&summary);
            }
            state.timelines.insert(summary.id, timeline);
        }
        Delta::HeadToHead {
            match_id, stats, ..
        } => {
            state.head_to_head.insert(match_id, stats);
        }
        Delta::Log(msg) => state.push_log(msg),
    }
    Ok(())
}
