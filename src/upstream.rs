use anyhow::{Context, Result};
use serde::{Deserialize, Deserializer};
use serde_json::Value;

use crate::names::LocalizedText;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawMatch {
    #[serde(rename = "IdMatch", default, deserialize_with = "opt_text")]
    pub id: Option<String>,
    #[serde(rename = "IdCompetition", default, deserialize_with = "opt_text")]
    pub competition_id: Option<String>,
    #[serde(rename = "IdSeason", default, deserialize_with = "opt_text")]
    pub season_id: Option<String>,
    #[serde(rename = "IdStage", default, deserialize_with = "opt_text")]
    pub stage_id: Option<String>,
    #[serde(rename = "CompetitionName", default, deserialize_with = "vec_or_default")]
    pub competition_name: Vec<LocalizedText>,
    #[serde(rename = "SeasonName", default, deserialize_with = "vec_or_default")]
    pub season_name: Vec<LocalizedText>,
    #[serde(rename = "StageName", default, deserialize_with = "vec_or_default")]
    pub stage_name: Vec<LocalizedText>,
    #[serde(rename = "Date", default, deserialize_with = "opt_text")]
    pub date: Option<String>,
    #[serde(rename = "MatchStatus", default, deserialize_with = "opt_i64")]
    pub status_code: Option<i64>,
    #[serde(rename = "MatchDay", default, deserialize_with = "opt_u32")]
    pub match_day: Option<u32>,
    #[serde(rename = "MatchTime", default, deserialize_with = "opt_text")]
    pub match_time: Option<String>,
    #[serde(rename = "Home", default)]
    pub home: Option<RawTeam>,
    #[serde(rename = "Away", default)]
    pub away: Option<RawTeam>,
    #[serde(rename = "HomeTeam", default)]
    pub home_team: Option<RawTeam>,
    #[serde(rename = "AwayTeam", default)]
    pub away_team: Option<RawTeam>,
    #[serde(rename = "HomeTeamScore", default, deserialize_with = "opt_u32")]
    pub home_team_score: Option<u32>,
    #[serde(rename = "AwayTeamScore", default, deserialize_with = "opt_u32")]
    pub away_team_score: Option<u32>,
    #[serde(rename = "Stadium", default)]
    pub stadium: Option<RawStadium>,
    #[serde(rename = "Winner", default, deserialize_with = "opt_text")]
    pub winner: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawTeam {
    #[serde(rename = "IdTeam", default, deserialize_with = "opt_text")]
    pub id: Option<String>,
    #[serde(rename = "TeamName", default, deserialize_with = "vec_or_default")]
    pub name: Vec<LocalizedText>,
    #[serde(rename = "ShortClubName", default, deserialize_with = "opt_text")]
    pub short_name: Option<String>,
    #[serde(rename = "Abbreviation", default, deserialize_with = "opt_text")]
    pub abbreviation: Option<String>,
    #[serde(rename = "PictureUrl", default, deserialize_with = "opt_text")]
    pub picture_url: Option<String>,
    #[serde(rename = "Score", default, deserialize_with = "opt_u32")]
    pub score: Option<u32>,
    // Only populated on the live-shaped record of a match-detail payload.
    #[serde(rename = "Goals", default, deserialize_with = "vec_or_default")]
    pub goals: Vec<RawGoal>,
    #[serde(rename = "Bookings", default, deserialize_with = "vec_or_default")]
    pub bookings: Vec<RawBooking>,
    #[serde(rename = "Substitutions", default, deserialize_with = "vec_or_default")]
    pub substitutions: Vec<RawSubstitution>,
    #[serde(rename = "Players", default, deserialize_with = "vec_or_default")]
    pub players: Vec<RawPlayer>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawStadium {
    #[serde(rename = "Name", default, deserialize_with = "vec_or_default")]
    pub name: Vec<LocalizedText>,
    #[serde(rename = "CityName", default, deserialize_with = "vec_or_default")]
    pub city: Vec<LocalizedText>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawGoal {
    #[serde(rename = "IdPlayer", default, deserialize_with = "opt_text")]
    pub player_id: Option<String>,
    #[serde(rename = "IdAssistPlayer", default, deserialize_with = "opt_text")]
    pub assist_player_id: Option<String>,
    #[serde(rename = "Minute", default, deserialize_with = "opt_text")]
    pub minute: Option<String>,
    #[serde(rename = "Period", default, deserialize_with = "opt_u32")]
    pub period: Option<u32>,
    #[serde(rename = "Type", default, deserialize_with = "opt_i64")]
    pub goal_type: Option<i64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawBooking {
    #[serde(rename = "IdPlayer", default, deserialize_with = "opt_text")]
    pub player_id: Option<String>,
    #[serde(rename = "Minute", default, deserialize_with = "opt_text")]
    pub minute: Option<String>,
    #[serde(rename = "Period", default, deserialize_with = "opt_u32")]
    pub period: Option<u32>,
    #[serde(rename = "Card", default, deserialize_with = "opt_i64")]
    pub card: Option<i64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawSubstitution {
    #[serde(rename = "IdPlayerOff", default, deserialize_with = "opt_text")]
    pub player_off_id: Option<String>,
    #[serde(rename = "IdPlayerOn", default, deserialize_with = "opt_text")]
    pub player_on_id: Option<String>,
    #[serde(rename = "Minute", default, deserialize_with = "opt_text")]
    pub minute: Option<String>,
    #[serde(rename = "Period", default, deserialize_with = "opt_u32")]
    pub period: Option<u32>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawPlayer {
    #[serde(rename = "IdPlayer", default, deserialize_with = "opt_text")]
    pub id: Option<String>,
    #[serde(rename = "PlayerName", default, deserialize_with = "vec_or_default")]
    pub name: Vec<LocalizedText>,
    #[serde(rename = "ShortName", default, deserialize_with = "vec_or_default")]
    pub short_name: Vec<LocalizedText>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawStandingEntry {
    #[serde(rename = "Position", default, deserialize_with = "opt_u32")]
    pub position: Option<u32>,
    #[serde(rename = "Team", default)]
    pub team: Option<RawTeam>,
    #[serde(rename = "Played", default, deserialize_with = "opt_u32")]
    pub played: Option<u32>,
    #[serde(rename = "Won", default, deserialize_with = "opt_u32")]
    pub won: Option<u32>,
    #[serde(rename = "Drawn", default, deserialize_with = "opt_u32")]
    pub drawn: Option<u32>,
    #[serde(rename = "Lost", default, deserialize_with = "opt_u32")]
    pub lost: Option<u32>,
    #[serde(rename = "For", default, deserialize_with = "opt_u32")]
    pub goals_for: Option<u32>,
    #[serde(rename = "Against", default, deserialize_with = "opt_u32")]
    pub goals_against: Option<u32>,
    /// The provider misspells this key; the corrected spelling is accepted too.
    #[serde(rename = "GoalsDiference", alias = "GoalsDifference", default)]
    pub goal_difference: Option<Value>,
    #[serde(rename = "Points", default, deserialize_with = "opt_u32")]
    pub points: Option<u32>,
    #[serde(rename = "Group", default, deserialize_with = "vec_or_default")]
    pub group: Vec<LocalizedText>,
    #[serde(rename = "MatchResults", default, deserialize_with = "vec_or_default")]
    pub match_results: Vec<RawFormMatch>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawFormMatch {
    #[serde(rename = "IdMatch", default, deserialize_with = "opt_text")]
    pub id: Option<String>,
    #[serde(rename = "HomeTeamId", default, deserialize_with = "opt_text")]
    pub home_team_id: Option<String>,
    #[serde(rename = "AwayTeamId", default, deserialize_with = "opt_text")]
    pub away_team_id: Option<String>,
    #[serde(rename = "HomeTeamScore", default, deserialize_with = "opt_u32")]
    pub home_score: Option<u32>,
    #[serde(rename = "AwayTeamScore", default, deserialize_with = "opt_u32")]
    pub away_score: Option<u32>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawHeadToHead {
    #[serde(rename = "TeamA", default)]
    pub team_a: Option<RawTeamRecord>,
    #[serde(rename = "TeamB", default)]
    pub team_b: Option<RawTeamRecord>,
    #[serde(rename = "MatchesList", default, deserialize_with = "vec_or_default")]
    pub matches: Vec<RawMatch>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawTeamRecord {
    #[serde(rename = "IdTeam", default, deserialize_with = "opt_text")]
    pub team_id: Option<String>,
    #[serde(rename = "MatchesPlayed", default, deserialize_with = "opt_u32")]
    pub matches_played: Option<u32>,
    #[serde(rename = "Wins", default, deserialize_with = "opt_u32")]
    pub wins: Option<u32>,
    #[serde(rename = "Draws", default, deserialize_with = "opt_u32")]
    pub draws: Option<u32>,
    #[serde(rename = "Losses", default, deserialize_with = "opt_u32")]
    pub losses: Option<u32>,
}

#[derive(Debug, Deserialize)]
#[serde(bound(deserialize = "T: Deserialize<'de>"))]
struct ResultsEnvelope<T> {
    #[serde(rename = "Results", default = "Vec::new", deserialize_with = "vec_or_default")]
    results: Vec<T>,
}

pub fn parse_matches_json(raw: &str) -> Result<Vec<RawMatch>> {
    let Some(trimmed) = non_null_body(raw) else {
        return Ok(Vec::new());
    };
    let envelope: ResultsEnvelope<RawMatch> =
        serde_json::from_str(trimmed).context("invalid matches json")?;
    Ok(envelope.results)
}

pub fn parse_standings_json(raw: &str) -> Result<Vec<RawStandingEntry>> {
    let Some(trimmed) = non_null_body(raw) else {
        return Ok(Vec::new());
    };
    let envelope: ResultsEnvelope<RawStandingEntry> =
        serde_json::from_str(trimmed).context("invalid standings json")?;
    Ok(envelope.results)
}

pub fn parse_head_to_head_json(raw: &str) -> Result<RawHeadToHead> {
    let Some(trimmed) = non_null_body(raw) else {
        return Ok(RawHeadToHead::default());
    };
    serde_json::from_str(trimmed).context("invalid head-to-head json")
}

/// A `null` live payload means the provider has no detail for the match yet.
pub fn parse_match_detail_json(raw: &str) -> Result<Option<RawMatch>> {
    let Some(trimmed) = non_null_body(raw) else {
        return Ok(None);
    };
    let detail: RawMatch = serde_json::from_str(trimmed).context("invalid match detail json")?;
    Ok(Some(detail))
}

fn non_null_body(raw: &str) -> Option<&str> {
    let trimmed = raw.trim();
    if trimmed.is_empty() || trimmed == "null" {
        None
    } else {
        Some(trimmed)
    }
}

fn vec_or_default<'de, D, T>(deserializer: D) -> std::result::Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    let value = Option::<Vec<T>>::deserialize(deserializer)?;
    Ok(value.unwrap_or_default())
}

pub(crate) fn string_or_default<'de, D>(deserializer: D) -> std::result::Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(value_to_text(&value).unwrap_or_default())
}

fn opt_text<'de, D>(deserializer: D) -> std::result::Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(value_to_text(&value))
}

fn opt_u32<'de, D>(deserializer: D) -> std::result::Result<Option<u32>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(value_to_i64(&value).and_then(|n| u32::try_from(n).ok()))
}

fn opt_i64<'de, D>(deserializer: D) -> std::result::Result<Option<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(value_to_i64(&value))
}

fn value_to_text(value: &Value) -> Option<String> {
    let rendered = match value {
        Value::String(s) => s.trim().to_string(),
        Value::Number(n) => n.to_string(),
        _ => return None,
    };
    if rendered.is_empty() {
        None
    } else {
        Some(rendered)
    }
}

pub(crate) fn value_to_i64(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_f64().filter(|f| f.fract() == 0.0).map(|f| f as i64)),
        Value::String(s) => s.trim().parse::<i64>().ok(),
        _ => None,
    }
}
