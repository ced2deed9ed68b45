use std::fs;
use std::path::PathBuf;

use chrono::{FixedOffset, NaiveDate};
use matchday_board::bucket::ViewerZone;
use matchday_board::normalize::normalize_matches;
use matchday_board::reconcile::{ReconcileError, reconcile_groups};
use matchday_board::state::{
    BoardState, Delta, GroupKey, Match, MatchStatus, ProviderCommand, StandingGroup, StandingsKey,
    apply_delta,
};
use matchday_board::timeline::match_detail;
use matchday_board::upstream::{parse_match_detail_json, parse_matches_json};

fn read_fixture(name: &str) -> String {
    let mut path = PathBuf::from(env!("CARGO_MANIFEST_DIR"));
    path.push("tests");
    path.push("fixtures");
    path.push(name);
    fs::read_to_string(path).expect("fixture file should be readable")
}

fn calendar() -> Vec<Match> {
    let raw = parse_matches_json(&read_fixture("calendar_matches.json")).expect("fixture should parse");
    normalize_matches(&raw, "en-GB")
}

fn june(day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2026, 6, day).expect("valid date")
}

fn western_board() -> BoardState {
    let zone = ViewerZone::Fixed(FixedOffset::west_opt(5 * 3600).expect("valid offset"));
    let mut state = BoardState::new(zone);
    let cmd = state.begin_session(june(15));
    assert!(matches!(cmd, ProviderCommand::Watch { session: 1, .. }));
    apply_delta(
        &mut state,
        Delta::Matches {
            session: 1,
            matches: calendar(),
            full: true,
        },
    )
    .expect("initial build");
    state
}

fn keys(state: &BoardState) -> Vec<GroupKey> {
    state.groups.iter().map(|g| g.key.clone()).collect()
}

fn with_score(mut matches: Vec<Match>, id: &str, home: u32, away: u32) -> Vec<Match> {
    for m in matches.iter_mut().filter(|m| m.id == id) {
        m.home.score = Some(home);
        m.away.score = Some(away);
        m.status = MatchStatus::Live;
        m.match_time = Some("71'".to_string());
    }
    matches
}

#[test]
fn first_fetch_builds_the_board() {
    let state = western_board();
    assert_eq!(state.groups.len(), 3);
    assert!(state.last_refresh.is_some());
    assert_eq!(state.visible_standings_keys().len(), 2);
}

#[test]
fn score_tick_keeps_keys_and_order() {
    let mut state = western_board();
    let before_keys = keys(&state);
    let before = state.groups.clone();

    let mut fresh = with_score(calendar(), "400002", 2, 1);
    // Display data from a later poll must not leak into the rendered match.
    for m in fresh.iter_mut().filter(|m| m.id == "400002") {
        m.home.name = "FRANCE (renamed)".to_string();
    }
    apply_delta(
        &mut state,
        Delta::Matches {
            session: 1,
            matches: fresh,
            full: false,
        },
    )
    .expect("tick applies");

    assert_eq!(keys(&state), before_keys);
    let ticked = state.find_match("400002").expect("still rendered");
    assert_eq!(ticked.home.score, Some(2));
    assert_eq!(ticked.away.score, Some(1));
    assert_eq!(ticked.match_time.as_deref(), Some("71'"));
    assert_eq!(ticked.home.name, "France");

    // Everything else is untouched.
    for (old, new) in before.iter().zip(state.groups.iter()) {
        let old_ids: Vec<&str> = old.matches.iter().map(|m| m.id.as_str()).collect();
        let new_ids: Vec<&str> = new.matches.iter().map(|m| m.id.as_str()).collect();
        assert_eq!(old_ids, new_ids);
        for (a, b) in old.matches.iter().zip(new.matches.iter()) {
            if a.id != "400002" {
                assert_eq!(a, b);
            }
        }
    }
}

#[test]
fn repeated_match_id_renders_once_with_the_last_record() {
    let zone = ViewerZone::Fixed(FixedOffset::west_opt(5 * 3600).expect("valid offset"));
    let mut state = BoardState::new(zone);
    state.begin_session(june(15));
    let mut matches = with_score(calendar(), "400002", 0, 0);
    let mut repeat = matches
        .iter()
        .find(|m| m.id == "400002")
        .cloned()
        .expect("fixture carries 400002");
    repeat.home.score = Some(1);
    matches.push(repeat);

    apply_delta(
        &mut state,
        Delta::Matches {
            session: 1,
            matches: matches.clone(),
            full: true,
        },
    )
    .expect("initial build");
    let rendered: Vec<Option<u32>> = state
        .groups
        .iter()
        .flat_map(|g| g.matches.iter())
        .filter(|m| m.id == "400002")
        .map(|m| m.home.score)
        .collect();
    assert_eq!(rendered, vec![Some(1)]);

    apply_delta(
        &mut state,
        Delta::Matches {
            session: 1,
            matches: with_score(matches, "400002", 2, 0),
            full: false,
        },
    )
    .expect("tick applies");
    let rendered: Vec<Option<u32>> = state
        .groups
        .iter()
        .flat_map(|g| g.matches.iter())
        .filter(|m| m.id == "400002")
        .map(|m| m.home.score)
        .collect();
    assert_eq!(rendered, vec![Some(2)]);
}

#[test]
fn matches_missing_from_a_poll_stay_rendered() {
    let mut state = western_board();
    let partial: Vec<Match> = calendar().into_iter().filter(|m| m.id != "400003").collect();
    apply_delta(
        &mut state,
        Delta::Matches {
            session: 1,
            matches: partial,
            full: false,
        },
    )
    .expect("tick applies");
    assert!(state.find_match("400003").is_some());
    assert_eq!(state.groups.len(), 3);
}

#[test]
fn new_match_for_the_day_triggers_regroup() {
    let mut state = western_board();
    let mut fresh = with_score(calendar(), "400002", 3, 0);
    let mut late = fresh
        .iter()
        .find(|m| m.id == "400003")
        .cloned()
        .expect("fixture match");
    late.id = "400099".to_string();
    late.match_day = Some(3);
    fresh.push(late);

    apply_delta(
        &mut state,
        Delta::Matches {
            session: 1,
            matches: fresh,
            full: false,
        },
    )
    .expect("tick applies");
    assert_eq!(state.groups.len(), 4);
    assert!(state.find_match("400099").is_some());
    assert_eq!(
        state.find_match("400002").and_then(|m| m.home.score),
        Some(3)
    );
    assert!(state.logs.iter().any(|line| line.contains("regrouping")));
}

#[test]
fn stale_session_deltas_are_dropped() {
    let mut state = western_board();
    let before = state.groups.clone();
    state.begin_session(june(16));
    assert_eq!(state.session, 2);
    assert!(state.groups.is_empty());

    apply_delta(
        &mut state,
        Delta::Matches {
            session: 1,
            matches: with_score(calendar(), "400002", 5, 5),
            full: false,
        },
    )
    .expect("stale delta is not an error");
    assert!(state.groups.is_empty());
    assert_ne!(state.groups, before);

    let key = StandingsKey {
        competition_id: "17".to_string(),
        season_id: "285023".to_string(),
        stage_id: "289273".to_string(),
    };
    apply_delta(
        &mut state,
        Delta::Standings {
            session: 1,
            key: key.clone(),
            groups: vec![StandingGroup {
                name: "Group A".to_string(),
                rows: Vec::new(),
            }],
        },
    )
    .expect("stale delta is not an error");
    assert!(state.context.standings(&key).is_none());

    apply_delta(
        &mut state,
        Delta::Standings {
            session: 2,
            key: key.clone(),
            groups: Vec::new(),
        },
    )
    .expect("current delta applies");
    assert!(state.context.has_standings(&key));
}

#[test]
fn failed_poll_only_logs() {
    let mut state = western_board();
    let before = state.groups.clone();
    apply_delta(
        &mut state,
        Delta::Log("[WARN] Match feed: request failed".to_string()),
    )
    .expect("log applies");
    assert_eq!(state.groups, before);
    assert_eq!(
        state.logs.back().map(String::as_str),
        Some("[WARN] Match feed: request failed")
    );
}

#[test]
fn empty_first_fetch_renders_an_empty_board() {
    let mut state = BoardState::new(ViewerZone::Fixed(FixedOffset::east_opt(0).expect("utc")));
    state.begin_session(june(15));
    apply_delta(
        &mut state,
        Delta::Matches {
            session: 1,
            matches: Vec::new(),
            full: true,
        },
    )
    .expect("empty applies");
    assert!(state.groups.is_empty());
    assert!(state.last_refresh.is_some());
}

#[test]
fn match_detail_refreshes_mutable_fields_and_stores_timeline() {
    let mut state = western_board();
    let raw = parse_match_detail_json(&read_fixture("live_match.json"))
        .expect("fixture should parse")
        .expect("detail present");
    let detail = match_detail(&raw, "en-GB").expect("has id");
    apply_delta(&mut state, Delta::MatchDetail { session: 1, detail }).expect("detail applies");

    let m = state.find_match("400002").expect("rendered");
    assert_eq!(m.home.score, Some(3));
    assert_eq!(m.match_time.as_deref(), Some("90+4'"));
    assert_eq!(state.timelines.get("400002").map(Vec::len), Some(6));
}

#[test]
fn reconciling_another_date_is_a_contract_violation() {
    let state = western_board();
    let mut other_day = state.groups.clone();
    for group in &mut other_day {
        group.key.date = "2026-06-16".to_string();
    }
    let err = reconcile_groups(&state.groups, &other_day).expect_err("dates differ");
    assert_eq!(
        err,
        ReconcileError::DateMismatch {
            previous: "2026-06-15".to_string(),
            fresh: "2026-06-16".to_string(),
        }
    );
}

#[test]
fn reconcile_reports_updates_and_unseen() {
    let state = western_board();
    let mut fresh = state.groups.clone();
    fresh[1].matches[0].home.score = Some(4);
    let mut extra = fresh[2].matches[0].clone();
    extra.id = "400100".to_string();
    fresh[2].matches.push(extra);

    let outcome = reconcile_groups(&state.groups, &fresh).expect("same date");
    assert_eq!(outcome.updated, vec![fresh[1].matches[0].id.clone()]);
    assert_eq!(outcome.unseen, vec!["400100".to_string()]);
    assert_eq!(outcome.groups.len(), state.groups.len());
}
