use chrono::{DateTime, NaiveDateTime, Utc};

use crate::names::{resolve_localized_opt, LocalizedText};
use crate::state::{Match, MatchStatus, TeamSide};
use crate::upstream::{RawMatch, RawTeam};

/// Upstream status codes. Anything not listed here reads as scheduled.
pub const STATUS_CODE_FINISHED: i64 = 0;
pub const STATUS_CODE_SCHEDULED: i64 = 1;
pub const STATUS_CODE_LIVE: i64 = 3;
pub const STATUS_CODE_LIVE_BREAK: i64 = 4;
pub const STATUS_CODE_TERMINAL_FLOOR: i64 = 10;

pub const TEAM_LOGO_TEMPLATE: &str = "https://api.fifa.com/api/v3/picture/teams-sq-4/{id}";
pub const COMPETITION_LOGO_TEMPLATE: &str =
    "https://api.fifa.com/api/v3/picture/competitions-sq-4/{id}";
const PICTURE_FORMAT: &str = "sq";
const PICTURE_SIZE: &str = "4";

const TBD_TEAM: &str = "TBD";
const FALLBACK_COMPETITION: &str = "Competition";

#[derive(Debug, Clone, Copy)]
pub enum TeamShape<'a> {
    Calendar(&'a RawTeam),
    Live(&'a RawTeam),
    Missing,
}

impl<'a> TeamShape<'a> {
    pub fn home(raw: &'a RawMatch) -> Self {
        Self::pick(raw.home.as_ref(), raw.home_team.as_ref())
    }

    pub fn away(raw: &'a RawMatch) -> Self {
        Self::pick(raw.away.as_ref(), raw.away_team.as_ref())
    }

    fn pick(calendar: Option<&'a RawTeam>, live: Option<&'a RawTeam>) -> Self {
        match (calendar, live) {
            (Some(team), _) => TeamShape::Calendar(team),
            (None, Some(team)) => TeamShape::Live(team),
            (None, None) => TeamShape::Missing,
        }
    }

    pub fn team(self) -> Option<&'a RawTeam> {
        match self {
            TeamShape::Calendar(team) | TeamShape::Live(team) => Some(team),
            TeamShape::Missing => None,
        }
    }
}

pub fn normalize_matches(raw: &[RawMatch], locale: &str) -> Vec<Match> {
    raw.iter()
        .filter_map(|item| normalize_match(item, locale))
        .collect()
}

pub fn normalize_match(raw: &RawMatch, locale: &str) -> Option<Match> {
    let id = raw.id.clone()?;
    let home = normalize_team(TeamShape::home(raw).team(), raw.home_team_score, locale);
    let away = normalize_team(TeamShape::away(raw).team(), raw.away_team_score, locale);

    let competition_name = resolve_localized_opt(&raw.competition_name, Some(locale))
        .or_else(|| resolve_localized_opt(&raw.stage_name, Some(locale)))
        .unwrap_or_else(|| FALLBACK_COMPETITION.to_string());

    let venue = raw
        .stadium
        .as_ref()
        .and_then(|stadium| resolve_localized_opt(&stadium.name, Some(locale)));

    Some(Match {
        id,
        competition_id: raw.competition_id.clone(),
        competition_name,
        season_id: raw.season_id.clone(),
        season_name: resolve_localized_opt(&raw.season_name, Some(locale)),
        stage_id: raw.stage_id.clone(),
        stage_name: resolve_localized_opt(&raw.stage_name, Some(locale)),
        home,
        away,
        kickoff: raw.date.as_deref().and_then(parse_kickoff),
        status: status_from_code(raw.status_code),
        match_day: raw.match_day,
        venue,
        winner: raw.winner.clone(),
        match_time: raw.match_time.clone(),
    })
}

pub fn status_from_code(code: Option<i64>) -> MatchStatus {
    match code {
        Some(STATUS_CODE_FINISHED) => MatchStatus::Finished,
        Some(STATUS_CODE_SCHEDULED) => MatchStatus::Scheduled,
        Some(STATUS_CODE_LIVE | STATUS_CODE_LIVE_BREAK) => MatchStatus::Live,
        Some(code) if code >= STATUS_CODE_TERMINAL_FLOOR => MatchStatus::Finished,
        _ => MatchStatus::Scheduled,
    }
}

/// `top_level_score` is the match-level `HomeTeamScore`/`AwayTeamScore`,
/// which wins over the score nested in the team record.
pub(crate) fn normalize_team(raw: Option<&RawTeam>, top_level_score: Option<u32>, locale: &str) -> TeamSide {
    let Some(team) = raw else {
        return TeamSide {
            id: None,
            name: TBD_TEAM.to_string(),
            abbreviation: TBD_TEAM.to_string(),
            logo_url: None,
            score: top_level_score,
        };
    };

    let name = team_display_name(&team.name, team.short_name.as_deref(), locale);
    let abbreviation = team
        .abbreviation
        .clone()
        .unwrap_or_else(|| abbreviate(&name));
    let logo_url = team
        .picture_url
        .as_deref()
        .map(fill_picture_placeholders)
        .or_else(|| team.id.as_deref().map(|id| TEAM_LOGO_TEMPLATE.replace("{id}", id)));

    TeamSide {
        id: team.id.clone(),
        name,
        abbreviation,
        logo_url,
        score: top_level_score.or(team.score),
    }
}

pub fn team_display_name(names: &[LocalizedText], short_name: Option<&str>, locale: &str) -> String {
    resolve_localized_opt(names, Some(locale))
        .or_else(|| short_name.map(str::to_string))
        .unwrap_or_else(|| TBD_TEAM.to_string())
}

fn abbreviate(name: &str) -> String {
    name.trim().chars().take(3).collect::<String>().to_uppercase()
}

fn fill_picture_placeholders(url: &str) -> String {
    url.replace("{format}", PICTURE_FORMAT)
        .replace("{size}", PICTURE_SIZE)
}

pub fn competition_logo_url(competition_id: &str) -> String {
    COMPETITION_LOGO_TEMPLATE.replace("{id}", competition_id)
}

pub fn parse_kickoff(raw: &str) -> Option<DateTime<Utc>> {
    let trimmed = raw.trim();
    if let Ok(parsed) = DateTime::parse_from_rfc3339(trimmed) {
        return Some(parsed.with_timezone(&Utc));
    }
    ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%dT%H:%M", "%Y-%m-%d %H:%M:%S"]
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(trimmed, fmt).ok())
        .map(|naive| naive.and_utc())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_codes_map_through_named_table() {
        assert_eq!(status_from_code(Some(0)), MatchStatus::Finished);
        assert_eq!(status_from_code(Some(1)), MatchStatus::Scheduled);
        assert_eq!(status_from_code(Some(3)), MatchStatus::Live);
        assert_eq!(status_from_code(Some(4)), MatchStatus::Live);
        assert_eq!(status_from_code(Some(2)), MatchStatus::Scheduled);
        assert_eq!(status_from_code(Some(12)), MatchStatus::Finished);
        assert_eq!(status_from_code(None), MatchStatus::Scheduled);
    }

    #[test]
    fn kickoff_accepts_offsets_and_naive_utc() {
        let with_z = parse_kickoff("2026-06-15T23:30:00Z").expect("rfc3339");
        let naive = parse_kickoff("2026-06-15T23:30:00").expect("naive");
        let offset = parse_kickoff("2026-06-16T01:30:00+02:00").expect("offset");
        assert_eq!(with_z, naive);
        assert_eq!(with_z, offset);
        assert!(parse_kickoff("soon").is_none());
    }

    #[test]
    fn abbreviation_uses_first_three_letters() {
        assert_eq!(abbreviate("Brazil"), "BRA");
        assert_eq!(abbreviate("TBD"), "TBD");
        assert_eq!(abbreviate("  côte"), "CÔT");
    }
}
