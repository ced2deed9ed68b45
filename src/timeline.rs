use crate::names::{UNKNOWN_NAME, resolve_localized, resolve_localized_opt};
use crate::normalize::{TeamShape, normalize_match};
use crate::state::{
    CardKind, GoalKind, MatchDetail, Side, TimelineEvent, TimelinePayload,
};
use crate::upstream::{RawMatch, RawPlayer, RawTeam};

pub const GOAL_TYPE_PENALTY: i64 = 1;
pub const GOAL_TYPE_REGULAR: i64 = 2;
pub const GOAL_TYPE_OWN_GOAL: i64 = 3;

pub const CARD_YELLOW: i64 = 1;
pub const CARD_RED: i64 = 2;
pub const CARD_SECOND_YELLOW: i64 = 3;

pub fn match_detail(raw: &RawMatch, locale: &str) -> Option<MatchDetail> {
    let summary = normalize_match(raw, locale)?;
    let timeline = extract_timeline(
        TeamShape::home(raw).team(),
        TeamShape::away(raw).team(),
        locale,
    );
    Some(MatchDetail { summary, timeline })
}

pub fn extract_timeline(
    home: Option<&RawTeam>,
    away: Option<&RawTeam>,
    locale: &str,
) -> Vec<TimelineEvent> {
    let mut events = Vec::new();
    if let Some(team) = home {
        side_events(team, Side::Home, locale, &mut events);
    }
    if let Some(team) = away {
        side_events(team, Side::Away, locale, &mut events);
    }
    // Stable: events sharing a (period, minute) keep the concatenation order.
    events.sort_by_key(|event| (event.period, numeric_minute(&event.minute)));
    events
}

fn side_events(team: &RawTeam, side: Side, locale: &str, out: &mut Vec<TimelineEvent>) {
    let roster = Roster {
        players: &team.players,
        locale,
    };

    for goal in &team.goals {
        out.push(TimelineEvent {
            minute: goal.minute.clone().unwrap_or_default(),
            period: goal.period.unwrap_or(0),
            side,
            payload: TimelinePayload::Goal {
                scorer: roster.name(goal.player_id.as_deref()),
                assist: goal
                    .assist_player_id
                    .as_deref()
                    .map(|id| roster.name(Some(id))),
                kind: goal_kind(goal.goal_type),
            },
        });
    }
    for booking in &team.bookings {
        out.push(TimelineEvent {
            minute: booking.minute.clone().unwrap_or_default(),
            period: booking.period.unwrap_or(0),
            side,
            payload: TimelinePayload::Card {
                player: roster.name(booking.player_id.as_deref()),
                kind: card_kind(booking.card),
            },
        });
    }
    for sub in &team.substitutions {
        out.push(TimelineEvent {
            minute: sub.minute.clone().unwrap_or_default(),
            period: sub.period.unwrap_or(0),
            side,
            payload: TimelinePayload::Substitution {
                player_off: roster.name(sub.player_off_id.as_deref()),
                player_on: roster.name(sub.player_on_id.as_deref()),
            },
        });
    }
}

struct Roster<'a> {
    players: &'a [RawPlayer],
    locale: &'a str,
}

impl Roster<'_> {
    fn name(&self, player_id: Option<&str>) -> String {
        let player = player_id.and_then(|id| {
            self.players
                .iter()
                .find(|player| player.id.as_deref() == Some(id))
        });
        let Some(player) = player else {
            return UNKNOWN_NAME.to_string();
        };
        resolve_localized_opt(&player.name, Some(self.locale))
            .unwrap_or_else(|| resolve_localized(&player.short_name, Some(self.locale)))
    }
}

/// Digits of the raw minute read as one number: `"45+2'"` is 452.
pub fn numeric_minute(raw: &str) -> u64 {
    let digits: String = raw.chars().filter(|c| c.is_ascii_digit()).collect();
    if digits.is_empty() {
        return 0;
    }
    digits.parse().unwrap_or(u64::MAX)
}

pub fn goal_kind(code: Option<i64>) -> GoalKind {
    match code {
        Some(GOAL_TYPE_PENALTY) => GoalKind::Penalty,
        Some(GOAL_TYPE_OWN_GOAL) => GoalKind::OwnGoal,
        _ => GoalKind::Regular,
    }
}

pub fn card_kind(code: Option<i64>) -> CardKind {
    match code {
        Some(CARD_RED) => CardKind::Red,
        Some(CARD_SECOND_YELLOW) => CardKind::SecondYellow,
        _ => CardKind::Yellow,
    }
}
