use std::collections::HashSet;
use std::fmt::Write as _;
use std::sync::Arc;
use std::sync::mpsc::{self, RecvTimeoutError};

use anyhow::{Context, Result};
use tracing_subscriber::EnvFilter;

use matchday_board::bucket::{ViewerZone, local_date_label};
use matchday_board::config::{FeedConfig, SourceKind};
use matchday_board::demo_feed::DemoFeed;
use matchday_board::feed_source::{FeedSource, HttpFeed};
use matchday_board::http_cache::cached_entries;
use matchday_board::poller::spawn_poller;
use matchday_board::standings::form_string;
use matchday_board::state::{
    BoardState, Delta, Match, MatchStatus, ProviderCommand, StandingsKey, TimelinePayload,
    apply_delta,
};

fn main() -> Result<()> {
    let _ = dotenvy::from_filename(".env.local");
    let _ = dotenvy::dotenv();
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let config = FeedConfig::from_env();
    let source: Arc<dyn FeedSource> = match config.source {
        SourceKind::Http => Arc::new(HttpFeed::new(config.base_url.clone())),
        SourceKind::Demo => Arc::new(DemoFeed::seeded(config.demo_seed)),
    };
    tracing::info!(source = ?config.source, locale = %config.locale, "starting board");

    let (tx, rx) = mpsc::channel();
    let mut poller = spawn_poller(source, config.poller_settings(), tx);
    let mut board = BoardState::new(ViewerZone::Local);
    let watch = match config.board_date {
        Some(date) => board.begin_session(date),
        None => board.begin_session_now(),
    };
    poller.send(watch);

    let mut requested_standings: HashSet<StandingsKey> = HashSet::new();
    let mut match_centre_requested = false;
    let mut refreshes = 0u64;
    let quiet_limit = config.poll_interval * 3;

    loop {
        let delta = match rx.recv_timeout(quiet_limit) {
            Ok(delta) => delta,
            Err(RecvTimeoutError::Timeout) => {
                tracing::warn!("no feed activity for {}s", quiet_limit.as_secs());
                continue;
            }
            Err(RecvTimeoutError::Disconnected) => break,
        };
        if let Delta::Log(line) = &delta {
            eprintln!("{line}");
        }
        let is_refresh = matches!(delta, Delta::Matches { .. });
        apply_delta(&mut board, delta).context("board reconciliation failed")?;
        if !is_refresh {
            continue;
        }

        refreshes += 1;
        let keys: Vec<StandingsKey> = board
            .visible_standings_keys()
            .into_iter()
            .filter(|key| requested_standings.insert(key.clone()))
            .collect();
        if !keys.is_empty() {
            poller.send(ProviderCommand::FetchStandings {
                session: board.session,
                keys,
            });
        }
        if !match_centre_requested && let Some(cmd) = match_centre_request(&board) {
            match_centre_requested = poller.send(cmd);
        }

        print!("{}", render_board(&board));
        if config.max_ticks.is_some_and(|max| refreshes >= max) {
            break;
        }
    }

    poller.stop();
    tracing::debug!(cached = cached_entries(), refreshes, "board closed");
    Ok(())
}

fn match_centre_request(board: &BoardState) -> Option<ProviderCommand> {
    let all: Vec<&Match> = board.groups.iter().flat_map(|g| g.matches.iter()).collect();
    let pick = all
        .iter()
        .find(|m| m.is_live())
        .or_else(|| all.first())?;
    Some(ProviderCommand::FetchMatchCenter {
        session: board.session,
        key: pick.detail_key()?,
        home_id: pick.home.id.clone()?,
        away_id: pick.away.id.clone()?,
    })
}

fn render_board(board: &BoardState) -> String {
    let mut out = String::new();
    let date = board.reference.map(local_date_label).unwrap_or_default();
    let _ = writeln!(out, "==== {date} ====");
    if board.groups.is_empty() {
        let _ = writeln!(out, "  no matches");
    }

    for group in &board.groups {
        let mut heading = group.name.clone();
        if let Some(season) = &group.season {
            let _ = write!(heading, " | {season}");
        }
        if let Some(day) = group.key.match_day {
            let _ = write!(heading, " | MD {day}");
        }
        let _ = writeln!(out, "{heading}");
        for m in &group.matches {
            let _ = writeln!(out, "  {}", match_line(board, m));
        }

        let standings = group
            .matches
            .first()
            .and_then(Match::standings_key)
            .and_then(|key| board.context.standings(&key));
        for table in standings.unwrap_or_default() {
            let leaders: Vec<String> = table
                .rows
                .iter()
                .take(2)
                .map(|row| {
                    format!(
                        "{}. {} {}pts {}",
                        row.position,
                        row.team_abbreviation,
                        row.points,
                        form_string(&row.form)
                    )
                })
                .collect();
            let _ = writeln!(out, "    {}: {}", table.name, leaders.join("  "));
        }
    }

    for (match_id, events) in &board.timelines {
        let Some(m) = board.find_match(match_id) else {
            continue;
        };
        let _ = writeln!(out, "-- {} v {} --", m.home.name, m.away.name);
        for event in events {
            let _ = writeln!(out, "  {:>6} {:?} {}", event.minute, event.side, describe(&event.payload));
        }
        if let Some(h2h) = board.head_to_head.get(match_id) {
            let _ = writeln!(
                out,
                "  h2h: {} W{} D{} / {} W{} D{} ({} meetings)",
                m.home.abbreviation,
                h2h.home.wins,
                h2h.home.draws,
                m.away.abbreviation,
                h2h.away.wins,
                h2h.away.draws,
                h2h.history.len()
            );
        }
    }
    out
}

fn match_line(board: &BoardState, m: &Match) -> String {
    let time = m
        .kickoff
        .map(|kickoff| board.zone.clock_label(kickoff))
        .unwrap_or_else(|| "--:--".to_string());
    let score = match (m.home.score, m.away.score) {
        (Some(h), Some(a)) => format!("{h}-{a}"),
        _ => "v".to_string(),
    };
    let status = match m.status {
        MatchStatus::Live => format!("LIVE {}", m.match_time.as_deref().unwrap_or("")),
        MatchStatus::Finished => "FT".to_string(),
        MatchStatus::Scheduled => String::new(),
    };
    format!(
        "{time}  {:<4}{score:^7}{:<4} {status}",
        m.home.abbreviation, m.away.abbreviation
    )
}

fn describe(payload: &TimelinePayload) -> String {
    match payload {
        TimelinePayload::Goal {
            scorer,
            assist,
            kind,
        } => match assist {
            Some(assist) => format!("goal {scorer} ({kind:?}, assist {assist})"),
            None => format!("goal {scorer} ({kind:?})"),
        },
        TimelinePayload::Card { player, kind } => format!("{kind:?} card {player}"),
        TimelinePayload::Substitution {
            player_off,
            player_on,
        } => format!("{player_on} on for {player_off}"),
    }
}

