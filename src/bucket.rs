use chrono::{DateTime, Duration as ChronoDuration, FixedOffset, Local, NaiveDate, TimeZone, Utc};

use crate::state::Match;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViewerZone {
    Local,
    Fixed(FixedOffset),
}

impl ViewerZone {
    pub fn local_date(&self, instant: DateTime<Utc>) -> NaiveDate {
        match self {
            ViewerZone::Local => local_calendar_date(instant, &Local),
            ViewerZone::Fixed(offset) => local_calendar_date(instant, offset),
        }
    }

    pub fn clock_label(&self, instant: DateTime<Utc>) -> String {
        match self {
            ViewerZone::Local => instant.with_timezone(&Local).format("%H:%M").to_string(),
            ViewerZone::Fixed(offset) => instant.with_timezone(offset).format("%H:%M").to_string(),
        }
    }
}

pub fn local_calendar_date<Tz: TimeZone>(instant: DateTime<Utc>, zone: &Tz) -> NaiveDate {
    instant.with_timezone(zone).date_naive()
}

pub fn is_on_local_day<Tz: TimeZone>(m: &Match, reference: &DateTime<Tz>) -> bool {
    let zone = reference.timezone();
    let day = reference.date_naive();
    m.kickoff
        .is_some_and(|kickoff| local_calendar_date(kickoff, &zone) == day)
}

pub fn bucket_matches(matches: &[Match], day: NaiveDate, zone: &ViewerZone) -> Vec<Match> {
    matches
        .iter()
        .filter(|m| m.kickoff.is_some_and(|kickoff| zone.local_date(kickoff) == day))
        .cloned()
        .collect()
}

pub fn local_date_label(day: NaiveDate) -> String {
    day.format("%Y-%m-%d").to_string()
}

/// UTC range requested from the match feed for a local `day`: the whole UTC
/// day before through the whole UTC day after, so kickoffs near midnight in
/// any zone are in the candidate set before bucketing narrows it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FetchWindow {
    pub from: DateTime<Utc>,
    pub to: DateTime<Utc>,
}

impl FetchWindow {
    pub fn around(day: NaiveDate) -> Self {
        let before = day - ChronoDuration::days(1);
        let after = day + ChronoDuration::days(1);
        let from = before.and_hms_opt(0, 0, 0).unwrap_or_default().and_utc();
        let to = after.and_hms_opt(23, 59, 59).unwrap_or_default().and_utc();
        Self { from, to }
    }

    pub fn from_param(&self) -> String {
        self.from.format("%Y-%m-%dT%H:%M:%SZ").to_string()
    }

    pub fn to_param(&self) -> String {
        self.to.format("%Y-%m-%dT%H:%M:%SZ").to_string()
    }

    pub fn contains(&self, instant: DateTime<Utc>) -> bool {
        instant >= self.from && instant <= self.to
    }
}

pub fn parse_reference_date(raw: &str) -> Option<NaiveDate> {
    let digits: String = raw.chars().filter(|c| c.is_ascii_digit()).collect();
    if digits.len() == 8 {
        NaiveDate::parse_from_str(&digits, "%Y%m%d").ok()
    } else {
        None
    }
}
