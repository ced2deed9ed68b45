use std::sync::{Mutex, PoisonError};

use anyhow::{Result, anyhow};
use chrono::{DateTime, Duration as ChronoDuration, NaiveDate, Utc};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::bucket::FetchWindow;
use crate::feed_source::FeedSource;
use crate::names::LocalizedText;
use crate::normalize::{STATUS_CODE_FINISHED, STATUS_CODE_LIVE, STATUS_CODE_SCHEDULED};
use crate::state::{MatchKey, StandingsKey};
use crate::timeline::{CARD_RED, CARD_YELLOW, GOAL_TYPE_PENALTY, GOAL_TYPE_REGULAR};
use crate::upstream::{
    RawBooking, RawFormMatch, RawGoal, RawHeadToHead, RawMatch, RawPlayer, RawStandingEntry,
    RawSubstitution, RawTeam, RawTeamRecord,
};

const SQUAD_SIZE: u32 = 14;
const FULL_TIME: u32 = 90;

struct DemoCompetition {
    id: &'static str,
    name: &'static str,
    season: &'static str,
    season_name: &'static str,
    stage: &'static str,
    stage_name: &'static str,
    teams: &'static [usize],
}

const COMPETITIONS: &[DemoCompetition] = &[
    DemoCompetition {
        id: "17",
        name: "FIFA World Cup",
        season: "285023",
        season_name: "FIFA World Cup 2026",
        stage: "289273",
        stage_name: "First Stage",
        teams: &[0, 1, 2, 3, 4, 5, 6, 7],
    },
    DemoCompetition {
        id: "520",
        name: "CONCACAF Nations League",
        season: "284400",
        season_name: "Nations League 2026",
        stage: "284401",
        stage_name: "League A",
        teams: &[8, 9, 10, 11],
    },
    DemoCompetition {
        id: "FRIENDLY-X",
        name: "International Friendlies",
        season: "1",
        season_name: "Friendlies",
        stage: "1",
        stage_name: "Friendlies",
        teams: &[12, 13],
    },
];

const TEAMS: &[(&str, &str, &str)] = &[
    ("43924", "Brazil", "BRA"),
    ("43922", "Argentina", "ARG"),
    ("43946", "France", "FRA"),
    ("43948", "Germany", "GER"),
    ("43969", "Spain", "ESP"),
    ("43942", "England", "ENG"),
    ("43963", "Portugal", "POR"),
    ("43960", "Netherlands", "NED"),
    ("43921", "USA", "USA"),
    ("43911", "Mexico", "MEX"),
    ("43928", "Canada", "CAN"),
    ("43901", "Panama", "PAN"),
    ("43935", "Japan", "JPN"),
    ("43822", "Korea Republic", "KOR"),
];

/// Kickoff times in UTC hours; the last lands late enough to change calendar
/// day for viewers east of UTC.
const KICKOFF_HOURS: &[(u32, u32)] = &[(13, 0), (16, 0), (19, 0), (23, 30)];

#[derive(Debug, Clone)]
struct DemoGoal {
    home: bool,
    minute: u32,
    scorer: u32,
    penalty: bool,
}

#[derive(Debug, Clone)]
struct DemoFixture {
    id: String,
    competition: usize,
    match_day: u32,
    home: usize,
    away: usize,
    kickoff: DateTime<Utc>,
    status: i64,
    minute: u32,
    goals: Vec<DemoGoal>,
    cards: Vec<(bool, u32, u32, i64)>,
}

impl DemoFixture {
    fn score(&self, home: bool) -> u32 {
        self.goals.iter().filter(|goal| goal.home == home).count() as u32
    }
}

struct DemoState {
    rng: StdRng,
    day: Option<NaiveDate>,
    fixtures: Vec<DemoFixture>,
    next_id: u64,
}

pub struct DemoFeed {
    state: Mutex<DemoState>,
    failure_rate: f64,
}

impl DemoFeed {
    pub fn seeded(seed: u64) -> Self {
        Self::with_failure_rate(seed, 0.08)
    }

    pub fn with_failure_rate(seed: u64, failure_rate: f64) -> Self {
        Self {
            state: Mutex::new(DemoState {
                rng: StdRng::seed_from_u64(seed),
                day: None,
                fixtures: Vec::new(),
                next_id: 400_100_000,
            }),
            failure_rate: failure_rate.clamp(0.0, 1.0),
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, DemoState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl FeedSource for DemoFeed {
    fn fetch_matches(
        &self,
        window: &FetchWindow,
        locale: &str,
        count: usize,
    ) -> Result<Vec<RawMatch>> {
        let mut state = self.lock();
        let day = window.from.date_naive() + ChronoDuration::days(1);
        if state.day != Some(day) {
            seed_slate(&mut state, day);
        } else {
            if state.rng.gen_bool(self.failure_rate) {
                return Err(anyhow!("simulated upstream timeout"));
            }
            advance_slate(&mut state);
        }
        Ok(state
            .fixtures
            .iter()
            .filter(|fixture| window.contains(fixture.kickoff))
            .take(count)
            .map(|fixture| calendar_record(fixture, locale))
            .collect())
    }

    fn fetch_standings(&self, key: &StandingsKey, locale: &str) -> Result<Vec<RawStandingEntry>> {
        let Some(competition) = COMPETITIONS.iter().find(|c| c.id == key.competition_id) else {
            return Ok(Vec::new());
        };
        let mut state = self.lock();
        let teams = competition.teams;
        let half = teams.len().div_ceil(2);
        let entries = teams
            .iter()
            .enumerate()
            .map(|(idx, &team)| {
                let group = if idx < half { "Group A" } else { "Group B" };
                standing_entry(&mut state.rng, team, teams, group, locale)
            })
            .collect();
        Ok(entries)
    }

    fn fetch_head_to_head(
        &self,
        team_a: &str,
        team_b: &str,
        locale: &str,
        count: usize,
    ) -> Result<RawHeadToHead> {
        let (Some(a), Some(b)) = (team_index(team_a), team_index(team_b)) else {
            return Ok(RawHeadToHead::default());
        };
        let mut state = self.lock();
        let meetings = count.min(6);
        let mut matches = Vec::with_capacity(meetings);
        let (mut a_wins, mut b_wins, mut draws) = (0, 0, 0);
        for n in 0..meetings {
            // Alternate who hosted so orientation has to come from the ids.
            let (home, away) = if n % 2 == 0 { (a, b) } else { (b, a) };
            let home_goals = state.rng.gen_range(0..4);
            let away_goals = state.rng.gen_range(0..4);
            let winner = match home_goals.cmp(&away_goals) {
                std::cmp::Ordering::Greater => Some(home),
                std::cmp::Ordering::Less => Some(away),
                std::cmp::Ordering::Equal => None,
            };
            match winner {
                Some(team) if team == a => a_wins += 1,
                Some(_) => b_wins += 1,
                None => draws += 1,
            }
            let kickoff = Utc::now() - ChronoDuration::days(400 * (n as i64 + 1));
            matches.push(RawMatch {
                id: Some(format!("h2h-{}-{}-{n}", TEAMS[a].0, TEAMS[b].0)),
                competition_name: vec![LocalizedText::new(locale, "International Friendly")],
                date: Some(kickoff.to_rfc3339()),
                status_code: Some(STATUS_CODE_FINISHED),
                home: Some(raw_team(home, None, locale)),
                away: Some(raw_team(away, None, locale)),
                home_team_score: Some(home_goals),
                away_team_score: Some(away_goals),
                winner: winner.map(|team| TEAMS[team].0.to_string()),
                ..RawMatch::default()
            });
        }
        let record = |team: usize, wins: u32, losses: u32| RawTeamRecord {
            team_id: Some(TEAMS[team].0.to_string()),
            matches_played: Some(meetings as u32),
            wins: Some(wins),
            draws: Some(draws),
            losses: Some(losses),
        };
        // The provider lists the pair in its own order, not home-first.
        let (first, second) = if a > b {
            (record(a, a_wins, b_wins), record(b, b_wins, a_wins))
        } else {
            (record(b, b_wins, a_wins), record(a, a_wins, b_wins))
        };
        Ok(RawHeadToHead {
            team_a: Some(first),
            team_b: Some(second),
            matches,
        })
    }

    fn fetch_match_detail(&self, key: &MatchKey, locale: &str) -> Result<Option<RawMatch>> {
        let state = self.lock();
        let Some(fixture) = state.fixtures.iter().find(|f| f.id == key.match_id) else {
            return Ok(None);
        };
        if fixture.status == STATUS_CODE_SCHEDULED {
            return Ok(None);
        }
        Ok(Some(live_record(fixture, locale)))
    }
}

fn seed_slate(state: &mut DemoState, day: NaiveDate) {
    state.day = Some(day);
    state.fixtures.clear();
    let now = Utc::now();
    for (comp_idx, competition) in COMPETITIONS.iter().enumerate() {
        for (pair_idx, pair) in competition.teams.chunks(2).enumerate() {
            let [home, away] = pair else { continue };
            let (hour, minute) = KICKOFF_HOURS[(comp_idx + pair_idx) % KICKOFF_HOURS.len()];
            let kickoff = day
                .and_hms_opt(hour, minute, 0)
                .map(|naive| naive.and_utc())
                .unwrap_or(now);
            let id = state.next_id.to_string();
            state.next_id += 1;
            let mut fixture = DemoFixture {
                id,
                competition: comp_idx,
                match_day: 1 + (pair_idx as u32 / 2),
                home: *home,
                away: *away,
                kickoff,
                status: STATUS_CODE_SCHEDULED,
                minute: 0,
                goals: Vec::new(),
                cards: Vec::new(),
            };
            match pair_idx % 3 {
                0 => {
                    fixture.status = STATUS_CODE_FINISHED;
                    play_until(&mut state.rng, &mut fixture, FULL_TIME);
                }
                1 => {
                    fixture.status = STATUS_CODE_LIVE;
                    let minute = state.rng.gen_range(5..70);
                    play_until(&mut state.rng, &mut fixture, minute);
                }
                _ => {}
            }
            state.fixtures.push(fixture);
        }
    }
    tracing::debug!(%day, fixtures = state.fixtures.len(), "demo slate seeded");
}

fn advance_slate(state: &mut DemoState) {
    let DemoState {
        rng,
        fixtures,
        day,
        next_id,
    } = state;
    for fixture in fixtures.iter_mut() {
        match fixture.status {
            STATUS_CODE_LIVE => {
                let target = (fixture.minute + rng.gen_range(1..6)).min(FULL_TIME);
                play_until(rng, fixture, target);
                if fixture.minute >= FULL_TIME {
                    fixture.status = STATUS_CODE_FINISHED;
                }
            }
            STATUS_CODE_SCHEDULED if rng.gen_bool(0.1) => {
                fixture.status = STATUS_CODE_LIVE;
                fixture.minute = 1;
            }
            _ => {}
        }
    }

    // A late fixture announcement now and then changes the day's match set.
    if rng.gen_bool(0.05)
        && let Some(day) = *day
    {
        let kickoff = day.and_hms_opt(21, 0, 0).map(|naive| naive.and_utc());
        if let Some(kickoff) = kickoff {
            let competition = 1;
            let teams = COMPETITIONS[competition].teams;
            let home = teams[rng.gen_range(0..teams.len())];
            let away = teams
                .iter()
                .copied()
                .find(|&team| team != home)
                .unwrap_or(home);
            fixtures.push(DemoFixture {
                id: next_id.to_string(),
                competition,
                match_day: 3,
                home,
                away,
                kickoff,
                status: STATUS_CODE_SCHEDULED,
                minute: 0,
                goals: Vec::new(),
                cards: Vec::new(),
            });
            *next_id += 1;
        }
    }
}

fn play_until(rng: &mut StdRng, fixture: &mut DemoFixture, target: u32) {
    while fixture.minute < target {
        fixture.minute += 1;
        if rng.gen_bool(0.025) {
            fixture.goals.push(DemoGoal {
                home: rng.gen_bool(0.5),
                minute: fixture.minute,
                scorer: rng.gen_range(1..=SQUAD_SIZE),
                penalty: rng.gen_bool(0.1),
            });
        }
        if rng.gen_bool(0.02) {
            let card = if rng.gen_bool(0.1) { CARD_RED } else { CARD_YELLOW };
            fixture
                .cards
                .push((rng.gen_bool(0.5), fixture.minute, rng.gen_range(1..=SQUAD_SIZE), card));
        }
    }
}

fn team_index(id: &str) -> Option<usize> {
    TEAMS.iter().position(|(team_id, _, _)| *team_id == id)
}

fn raw_team(team: usize, score: Option<u32>, locale: &str) -> RawTeam {
    let (id, name, abbreviation) = TEAMS[team];
    RawTeam {
        id: Some(id.to_string()),
        name: vec![LocalizedText::new(locale, name)],
        abbreviation: Some(abbreviation.to_string()),
        score,
        ..RawTeam::default()
    }
}

fn player_id(team: usize, number: u32) -> String {
    format!("{}{number:02}", TEAMS[team].0)
}

fn roster(team: usize, locale: &str) -> Vec<RawPlayer> {
    let abbreviation = TEAMS[team].2;
    (1..=SQUAD_SIZE)
        .map(|number| RawPlayer {
            id: Some(player_id(team, number)),
            name: vec![LocalizedText::new(locale, &format!("{abbreviation} Player {number}"))],
            short_name: Vec::new(),
        })
        .collect()
}

fn calendar_record(fixture: &DemoFixture, locale: &str) -> RawMatch {
    let competition = &COMPETITIONS[fixture.competition];
    let started = fixture.status != STATUS_CODE_SCHEDULED;
    let home_score = started.then(|| fixture.score(true));
    let away_score = started.then(|| fixture.score(false));
    let winner = match (fixture.status, home_score, away_score) {
        (STATUS_CODE_FINISHED, Some(h), Some(a)) if h > a => Some(TEAMS[fixture.home].0),
        (STATUS_CODE_FINISHED, Some(h), Some(a)) if a > h => Some(TEAMS[fixture.away].0),
        _ => None,
    };
    RawMatch {
        id: Some(fixture.id.clone()),
        competition_id: Some(competition.id.to_string()),
        season_id: Some(competition.season.to_string()),
        stage_id: Some(competition.stage.to_string()),
        competition_name: vec![LocalizedText::new(locale, competition.name)],
        season_name: vec![LocalizedText::new(locale, competition.season_name)],
        stage_name: vec![LocalizedText::new(locale, competition.stage_name)],
        date: Some(fixture.kickoff.to_rfc3339()),
        status_code: Some(fixture.status),
        match_day: Some(fixture.match_day),
        match_time: (fixture.status == STATUS_CODE_LIVE).then(|| format!("{}'", fixture.minute)),
        home: Some(raw_team(fixture.home, None, locale)),
        away: Some(raw_team(fixture.away, None, locale)),
        home_team_score: home_score,
        away_team_score: away_score,
        winner: winner.map(str::to_string),
        ..RawMatch::default()
    }
}

fn live_record(fixture: &DemoFixture, locale: &str) -> RawMatch {
    let mut record = calendar_record(fixture, locale);
    let mut home = record.home.take().unwrap_or_default();
    let mut away = record.away.take().unwrap_or_default();
    for (side, team, is_home) in [(&mut home, fixture.home, true), (&mut away, fixture.away, false)] {
        side.players = roster(team, locale);
        side.goals = fixture
            .goals
            .iter()
            .filter(|goal| goal.home == is_home)
            .map(|goal| RawGoal {
                player_id: Some(player_id(team, goal.scorer)),
                assist_player_id: (!goal.penalty)
                    .then(|| player_id(team, goal.scorer % SQUAD_SIZE + 1)),
                minute: Some(format!("{}'", goal.minute)),
                period: Some(if goal.minute > 45 { 5 } else { 3 }),
                goal_type: Some(if goal.penalty {
                    GOAL_TYPE_PENALTY
                } else {
                    GOAL_TYPE_REGULAR
                }),
            })
            .collect();
        side.bookings = fixture
            .cards
            .iter()
            .filter(|(home, ..)| *home == is_home)
            .map(|(_, minute, number, card)| RawBooking {
                player_id: Some(player_id(team, *number)),
                minute: Some(format!("{minute}'")),
                period: Some(if *minute > 45 { 5 } else { 3 }),
                card: Some(*card),
            })
            .collect();
        if fixture.minute >= 60 {
            side.substitutions = vec![RawSubstitution {
                player_off_id: Some(player_id(team, 9)),
                player_on_id: Some(player_id(team, 12)),
                minute: Some("60'".to_string()),
                period: Some(5),
            }];
        }
    }
    record.home_team = Some(home);
    record.away_team = Some(away);
    record
}

fn standing_entry(
    rng: &mut StdRng,
    team: usize,
    competition_teams: &[usize],
    group: &str,
    locale: &str,
) -> RawStandingEntry {
    let won = rng.gen_range(0..3);
    let drawn = rng.gen_range(0..(3 - won).max(1));
    let lost = 3u32.saturating_sub(won + drawn);
    let goals_for = won * 2 + drawn + rng.gen_range(0..2);
    let goals_against = lost * 2 + drawn;
    let opponents: Vec<usize> = competition_teams
        .iter()
        .copied()
        .filter(|&other| other != team)
        .collect();
    let match_results = opponents
        .iter()
        .take(5)
        .enumerate()
        .map(|(n, &opponent)| RawFormMatch {
            id: Some(format!("form-{}-{n}", TEAMS[team].0)),
            home_team_id: Some(TEAMS[team].0.to_string()),
            away_team_id: Some(TEAMS[opponent].0.to_string()),
            home_score: Some(rng.gen_range(0..4)),
            away_score: Some(rng.gen_range(0..3)),
        })
        .collect();
    // Half the rows ship a difference, the rest rely on the derived one.
    let goal_difference = rng
        .gen_bool(0.5)
        .then(|| serde_json::Value::from(i64::from(goals_for) - i64::from(goals_against)));
    RawStandingEntry {
        position: None,
        team: Some(raw_team(team, None, locale)),
        played: Some(won + drawn + lost),
        won: Some(won),
        drawn: Some(drawn),
        lost: Some(lost),
        goals_for: Some(goals_for),
        goals_against: Some(goals_against),
        goal_difference,
        points: Some(won * 3 + drawn),
        group: vec![LocalizedText::new(locale, group)],
        match_results,
    }
}
