use std::fs;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::mpsc::{self, Receiver};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Result, anyhow};
use chrono::NaiveDate;
use matchday_board::bucket::FetchWindow;
use matchday_board::config::PollerSettings;
use matchday_board::demo_feed::DemoFeed;
use matchday_board::feed_source::{FeedSource, HttpFeed};
use matchday_board::poller::{fetch_day, fetch_match_center, fetch_standings, spawn_poller};
use matchday_board::state::{Delta, MatchKey, ProviderCommand, StandingsKey};
use matchday_board::upstream::{
    RawHeadToHead, RawMatch, RawStandingEntry, parse_head_to_head_json, parse_match_detail_json,
    parse_matches_json, parse_standings_json,
};

fn read_fixture(name: &str) -> String {
    let mut path = PathBuf::from(env!("CARGO_MANIFEST_DIR"));
    path.push("tests");
    path.push("fixtures");
    path.push(name);
    fs::read_to_string(path).expect("fixture file should be readable")
}

/// Serves the fixtures; the first match poll fails, and standings for
/// competition 520 always fail.
struct FixtureFeed {
    match_polls: AtomicUsize,
}

impl FixtureFeed {
    fn new() -> Self {
        Self {
            match_polls: AtomicUsize::new(0),
        }
    }
}

impl FeedSource for FixtureFeed {
    fn fetch_matches(&self, _: &FetchWindow, _: &str, _: usize) -> Result<Vec<RawMatch>> {
        if self.match_polls.fetch_add(1, Ordering::SeqCst) == 0 {
            return Err(anyhow!("connection reset"));
        }
        parse_matches_json(&read_fixture("calendar_matches.json"))
    }

    fn fetch_standings(&self, key: &StandingsKey, _: &str) -> Result<Vec<RawStandingEntry>> {
        if key.competition_id == "520" {
            return Err(anyhow!("http 503"));
        }
        parse_standings_json(&read_fixture("standings.json"))
    }

    fn fetch_head_to_head(&self, _: &str, _: &str, _: &str, _: usize) -> Result<RawHeadToHead> {
        parse_head_to_head_json(&read_fixture("head_to_head.json"))
    }

    fn fetch_match_detail(&self, _: &MatchKey, _: &str) -> Result<Option<RawMatch>> {
        parse_match_detail_json(&read_fixture("live_match.json"))
    }
}

fn fast_settings() -> PollerSettings {
    PollerSettings {
        poll_interval: Duration::from_millis(40),
        fetch_parallelism: 2,
        ..PollerSettings::default()
    }
}

fn key(competition: &str) -> StandingsKey {
    StandingsKey {
        competition_id: competition.to_string(),
        season_id: "1".to_string(),
        stage_id: "1".to_string(),
    }
}

fn next(rx: &Receiver<Delta>) -> Delta {
    rx.recv_timeout(Duration::from_secs(5))
        .expect("poller should deliver a delta")
}

#[test]
fn failed_poll_is_logged_and_the_next_tick_runs() {
    let (tx, rx) = mpsc::channel();
    let mut poller = spawn_poller(Arc::new(FixtureFeed::new()), fast_settings(), tx);
    let date = NaiveDate::from_ymd_opt(2026, 6, 15).expect("valid date");
    assert!(poller.send(ProviderCommand::Watch { session: 7, date }));

    match next(&rx) {
        Delta::Log(line) => assert!(line.starts_with("[WARN]") && line.contains("connection reset")),
        other => panic!("expected a log line, got {other:?}"),
    }
    match next(&rx) {
        Delta::Matches {
            session,
            matches,
            full,
        } => {
            assert_eq!(session, 7);
            assert!(full, "first delivered fetch builds the board");
            assert_eq!(matches.len(), 7);
        }
        other => panic!("expected matches, got {other:?}"),
    }
    match next(&rx) {
        Delta::Matches { full, .. } => assert!(!full),
        other => panic!("expected matches, got {other:?}"),
    }
    poller.stop();
    assert!(!poller.is_running());
}

#[test]
fn unwatch_stops_polling() {
    let (tx, rx) = mpsc::channel();
    let mut poller = spawn_poller(Arc::new(DemoFeed::with_failure_rate(3, 0.0)), fast_settings(), tx);
    let date = NaiveDate::from_ymd_opt(2026, 6, 15).expect("valid date");
    poller.send(ProviderCommand::Watch { session: 1, date });
    assert!(matches!(next(&rx), Delta::Matches { session: 1, .. }));
    poller.send(ProviderCommand::Unwatch);
    // Drain anything already queued before the unwatch landed.
    std::thread::sleep(Duration::from_millis(120));
    while rx.try_recv().is_ok() {}
    assert!(rx.recv_timeout(Duration::from_millis(200)).is_err());
    poller.stop();
}

#[test]
fn dropping_the_handle_stops_the_thread() {
    let (tx, rx) = mpsc::channel();
    {
        let poller = spawn_poller(Arc::new(FixtureFeed::new()), fast_settings(), tx);
        assert!(poller.is_running());
    }
    // The sender went away with the thread.
    loop {
        match rx.recv_timeout(Duration::from_secs(5)) {
            Ok(_) => continue,
            Err(mpsc::RecvTimeoutError::Disconnected) => break,
            Err(mpsc::RecvTimeoutError::Timeout) => panic!("poller thread still alive"),
        }
    }
}

#[test]
fn one_failed_standings_table_does_not_blank_the_rest() {
    let feed = FixtureFeed::new();
    let deltas = fetch_standings(&feed, 3, &[key("17"), key("520")], "en-GB");
    assert_eq!(deltas.len(), 2);
    match &deltas[0] {
        Delta::Standings {
            session,
            key,
            groups,
        } => {
            assert_eq!(*session, 3);
            assert_eq!(key.competition_id, "17");
            assert_eq!(groups.len(), 2);
        }
        other => panic!("expected standings, got {other:?}"),
    }
    assert!(matches!(&deltas[1], Delta::Log(line) if line.contains("520")));
}

#[test]
fn match_center_fetches_detail_and_head_to_head() {
    let feed = FixtureFeed::new();
    let match_key = MatchKey {
        standings: key("17"),
        match_id: "400002".to_string(),
    };
    let deltas = fetch_match_center(&feed, 1, &match_key, "43924", "43922", &fast_settings());
    assert_eq!(deltas.len(), 2);
    assert!(matches!(&deltas[0], Delta::MatchDetail { detail, .. } if detail.timeline.len() == 6));
    assert!(matches!(
        &deltas[1],
        Delta::HeadToHead { match_id, stats, .. }
            if match_id == "400002" && stats.home.team_id.as_deref() == Some("43924")
    ));
}

#[test]
fn demo_feed_serves_a_bucketable_slate() {
    let feed = DemoFeed::with_failure_rate(11, 0.0);
    let date = NaiveDate::from_ymd_opt(2026, 6, 15).expect("valid date");
    let window = FetchWindow::around(date);
    let matches = fetch_day(&feed, &window, &fast_settings()).expect("demo never fails at rate 0");
    assert!(!matches.is_empty());
    assert!(matches.iter().all(|m| m.kickoff.is_some_and(|k| window.contains(k))));
    assert!(matches.iter().any(|m| m.competition_id.as_deref() == Some("FRIENDLY-X")));

    let again = fetch_day(&feed, &window, &fast_settings()).expect("second poll");
    let first_ids: Vec<&str> = matches.iter().map(|m| m.id.as_str()).collect();
    assert!(first_ids.iter().all(|id| again.iter().any(|m| m.id == *id)));
}

#[test]
fn http_feed_builds_provider_urls() {
    let feed = HttpFeed::new("https://api.example.test/api/v3");
    let date = NaiveDate::from_ymd_opt(2026, 6, 15).expect("valid date");
    assert_eq!(
        feed.matches_url(&FetchWindow::around(date), "en-GB", 500),
        "https://api.example.test/api/v3/calendar/matches?from=2026-06-14T00:00:00Z&to=2026-06-16T23:59:59Z&language=en-GB&count=500"
    );
    assert_eq!(
        feed.standings_url(&key("17"), "en-GB"),
        "https://api.example.test/api/v3/calendar/17/1/1/standing?language=en-GB"
    );
    assert_eq!(
        feed.head_to_head_url("43924", "43922", "fr", 10),
        "https://api.example.test/api/v3/teams/43924/43922/headtohead?language=fr&count=10"
    );
    let match_key = MatchKey {
        standings: key("17"),
        match_id: "400002".to_string(),
    };
    assert_eq!(
        feed.match_detail_url(&match_key, "en-GB"),
        "https://api.example.test/api/v3/live/football/17/1/1/400002?language=en-GB"
    );
}
