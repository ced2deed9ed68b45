use std::fs;
use std::path::PathBuf;

use matchday_board::state::{
    CardKind, GoalKind, Side, TimelineEventType, TimelinePayload,
};
use matchday_board::timeline::{extract_timeline, match_detail};
use matchday_board::upstream::{RawGoal, RawPlayer, RawTeam, parse_match_detail_json};

fn read_fixture(name: &str) -> String {
    let mut path = PathBuf::from(env!("CARGO_MANIFEST_DIR"));
    path.push("tests");
    path.push("fixtures");
    path.push(name);
    fs::read_to_string(path).expect("fixture file should be readable")
}

fn goal(minute: &str, period: u32) -> RawGoal {
    RawGoal {
        player_id: Some("x".to_string()),
        minute: Some(minute.to_string()),
        period: Some(period),
        ..RawGoal::default()
    }
}

#[test]
fn stoppage_time_sorts_after_the_regular_minute() {
    let home = RawTeam {
        goals: vec![goal("45+2'", 3), goal("45'", 3)],
        ..RawTeam::default()
    };
    let events = extract_timeline(Some(&home), None, "en-GB");
    let minutes: Vec<&str> = events.iter().map(|e| e.minute.as_str()).collect();
    assert_eq!(minutes, vec!["45'", "45+2'"]);
}

#[test]
fn period_orders_before_minute() {
    let home = RawTeam {
        goals: vec![goal("50'", 5), goal("90+1'", 3)],
        ..RawTeam::default()
    };
    let events = extract_timeline(Some(&home), None, "en-GB");
    let periods: Vec<u32> = events.iter().map(|e| e.period).collect();
    assert_eq!(periods, vec![3, 5]);
}

#[test]
fn live_fixture_merges_both_sides() {
    let raw = parse_match_detail_json(&read_fixture("live_match.json"))
        .expect("fixture should parse")
        .expect("detail present");
    let detail = match_detail(&raw, "en-GB").expect("has id");
    assert_eq!(detail.summary.id, "400002");

    let kinds: Vec<(Side, TimelineEventType, &str)> = detail
        .timeline
        .iter()
        .map(|e| (e.side, e.event_type(), e.minute.as_str()))
        .collect();
    assert_eq!(
        kinds,
        vec![
            (Side::Home, TimelineEventType::Goal, "12'"),
            (Side::Home, TimelineEventType::YellowCard, "45'"),
            (Side::Away, TimelineEventType::Goal, "45'"),
            (Side::Home, TimelineEventType::Goal, "45+2'"),
            (Side::Home, TimelineEventType::Substitution, "60'"),
            (Side::Away, TimelineEventType::RedCard, "90+4'"),
        ]
    );
}

#[test]
fn payloads_resolve_players_through_the_roster() {
    let raw = parse_match_detail_json(&read_fixture("live_match.json"))
        .expect("fixture should parse")
        .expect("detail present");
    let timeline = match_detail(&raw, "en-GB").expect("has id").timeline;

    assert_eq!(
        timeline[0].payload,
        TimelinePayload::Goal {
            scorer: "Kylian Mbappe".to_string(),
            assist: Some("Antoine Griezmann".to_string()),
            kind: GoalKind::Penalty,
        }
    );
    assert_eq!(
        timeline[2].payload,
        TimelinePayload::Goal {
            scorer: "Antonio Rudiger".to_string(),
            assist: None,
            kind: GoalKind::OwnGoal,
        }
    );
    assert_eq!(
        timeline[4].payload,
        TimelinePayload::Substitution {
            player_off: "Kylian Mbappe".to_string(),
            player_on: "Unknown".to_string(),
        }
    );
    assert_eq!(
        timeline[5].payload,
        TimelinePayload::Card {
            player: "Kimmich".to_string(),
            kind: CardKind::SecondYellow,
        }
    );
}

#[test]
fn rostered_player_without_names_reads_unknown() {
    let home = RawTeam {
        goals: vec![RawGoal {
            player_id: Some("p9".to_string()),
            ..goal("12'", 3)
        }],
        players: vec![RawPlayer {
            id: Some("p9".to_string()),
            ..RawPlayer::default()
        }],
        ..RawTeam::default()
    };
    let timeline = extract_timeline(Some(&home), None, "en-GB");
    match &timeline[0].payload {
        TimelinePayload::Goal { scorer, .. } => assert_eq!(scorer, "Unknown"),
        other => panic!("expected a goal, got {other:?}"),
    }
}

#[test]
fn no_teams_no_events() {
    assert!(extract_timeline(None, None, "en-GB").is_empty());
}
