use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use anyhow::Result;
use chrono::NaiveDate;
use rayon::prelude::*;

use crate::bucket::FetchWindow;
use crate::config::PollerSettings;
use crate::feed_source::FeedSource;
use crate::h2h::aggregate_head_to_head;
use crate::normalize::normalize_matches;
use crate::standings::aggregate_standings;
use crate::state::{Delta, Match, MatchKey, ProviderCommand, StandingsKey};
use crate::timeline::match_detail;

/// Upper bound on how long the thread sleeps before rechecking the stop flag.
const STOP_CHECK: Duration = Duration::from_millis(200);

pub struct PollerHandle {
    commands: Sender<ProviderCommand>,
    stop: Arc<AtomicBool>,
    join: Option<JoinHandle<()>>,
}

impl PollerHandle {
    pub fn send(&self, cmd: ProviderCommand) -> bool {
        self.commands.send(cmd).is_ok()
    }

    pub fn is_running(&self) -> bool {
        self.join
            .as_ref()
            .is_some_and(|join| !join.is_finished())
    }

    /// Cancels the polling loop and waits for the thread. Idempotent.
    pub fn stop(&mut self) {
        self.stop.store(true, Ordering::SeqCst);
        let _ = self.commands.send(ProviderCommand::Shutdown);
        if let Some(join) = self.join.take()
            && join.join().is_err()
        {
            tracing::error!("poller thread panicked");
        }
    }
}

impl Drop for PollerHandle {
    fn drop(&mut self) {
        self.stop();
    }
}

struct Watch {
    session: u64,
    date: NaiveDate,
    window: FetchWindow,
    next_due: Instant,
    delivered: bool,
}

pub fn spawn_poller(
    source: Arc<dyn FeedSource>,
    settings: PollerSettings,
    tx: Sender<Delta>,
) -> PollerHandle {
    let (commands, cmd_rx) = mpsc::channel();
    let stop = Arc::new(AtomicBool::new(false));
    let thread_stop = Arc::clone(&stop);
    let join = thread::Builder::new()
        .name("feed-poller".to_string())
        .spawn(move || run(source.as_ref(), &settings, &tx, &cmd_rx, &thread_stop));
    let join = match join {
        Ok(join) => Some(join),
        Err(err) => {
            tracing::error!(%err, "failed to spawn poller thread");
            None
        }
    };
    PollerHandle {
        commands,
        stop,
        join,
    }
}

fn run(
    source: &dyn FeedSource,
    settings: &PollerSettings,
    tx: &Sender<Delta>,
    cmd_rx: &Receiver<ProviderCommand>,
    stop: &AtomicBool,
) {
    let pool = build_fetch_pool(settings.fetch_parallelism);
    let mut watch: Option<Watch> = None;

    while !stop.load(Ordering::SeqCst) {
        let wait = watch
            .as_ref()
            .map(|w| w.next_due.saturating_duration_since(Instant::now()))
            .unwrap_or(STOP_CHECK)
            .min(STOP_CHECK);

        match cmd_rx.recv_timeout(wait) {
            Ok(ProviderCommand::Watch { session, date }) => {
                tracing::info!(session, %date, "watching date");
                watch = Some(Watch {
                    session,
                    date,
                    window: FetchWindow::around(date),
                    next_due: Instant::now(),
                    delivered: false,
                });
            }
            Ok(ProviderCommand::Unwatch) => {
                if let Some(w) = watch.take() {
                    tracing::info!(session = w.session, date = %w.date, "polling cancelled");
                }
            }
            Ok(ProviderCommand::FetchStandings { session, keys }) => {
                let deltas = with_fetch_pool(&pool, || {
                    fetch_standings(source, session, &keys, &settings.locale)
                });
                if !send_all(tx, deltas) {
                    break;
                }
            }
            Ok(ProviderCommand::FetchMatchCenter {
                session,
                key,
                home_id,
                away_id,
            }) => {
                let deltas = with_fetch_pool(&pool, || {
                    fetch_match_center(source, session, &key, &home_id, &away_id, settings)
                });
                if !send_all(tx, deltas) {
                    break;
                }
            }
            Ok(ProviderCommand::Shutdown) | Err(RecvTimeoutError::Disconnected) => break,
            Err(RecvTimeoutError::Timeout) => {}
        }

        if let Some(w) = watch.as_mut()
            && Instant::now() >= w.next_due
        {
            if !poll_tick(source, settings, w, tx) {
                break;
            }
            w.next_due = Instant::now() + settings.poll_interval;
        }
    }
    tracing::debug!("poller stopped");
}

/// One scheduled fetch. A failure is logged and the board keeps its previous
/// state; the caller schedules the next tick either way. Returns false when
/// the consumer has hung up.
fn poll_tick(
    source: &dyn FeedSource,
    settings: &PollerSettings,
    watch: &mut Watch,
    tx: &Sender<Delta>,
) -> bool {
    let started = Instant::now();
    match fetch_day(source, &watch.window, settings) {
        Ok(matches) => {
            tracing::debug!(
                session = watch.session,
                matches = matches.len(),
                elapsed_ms = started.elapsed().as_millis() as u64,
                "match feed polled"
            );
            let full = !watch.delivered;
            watch.delivered = true;
            tx.send(Delta::Matches {
                session: watch.session,
                matches,
                full,
            })
            .is_ok()
        }
        Err(err) => {
            tracing::warn!(session = watch.session, error = %err, "match poll failed");
            tx.send(Delta::Log(format!("[WARN] Match feed: {err:#}")))
                .is_ok()
        }
    }
}

pub fn fetch_day(
    source: &dyn FeedSource,
    window: &FetchWindow,
    settings: &PollerSettings,
) -> Result<Vec<Match>> {
    let raw = source.fetch_matches(window, &settings.locale, settings.match_count)?;
    Ok(normalize_matches(&raw, &settings.locale))
}

pub fn fetch_standings(
    source: &dyn FeedSource,
    session: u64,
    keys: &[StandingsKey],
    locale: &str,
) -> Vec<Delta> {
    let results: Vec<(StandingsKey, Result<_>)> = keys
        .par_iter()
        .map(|key| (key.clone(), source.fetch_standings(key, locale)))
        .collect();

    results
        .into_iter()
        .map(|(key, result)| match result {
            Ok(entries) => Delta::Standings {
                session,
                groups: aggregate_standings(&entries, locale),
                key,
            },
            Err(err) => {
                tracing::warn!(competition = %key.competition_id, error = %err, "standings fetch failed");
                Delta::Log(format!(
                    "[WARN] Standings {}: {err:#}",
                    key.competition_id
                ))
            }
        })
        .collect()
}

pub fn fetch_match_center(
    source: &dyn FeedSource,
    session: u64,
    key: &MatchKey,
    home_id: &str,
    away_id: &str,
    settings: &PollerSettings,
) -> Vec<Delta> {
    let locale = settings.locale.as_str();
    let (detail, h2h) = rayon::join(
        || source.fetch_match_detail(key, locale),
        || source.fetch_head_to_head(home_id, away_id, locale, settings.h2h_count),
    );

    let mut deltas = Vec::with_capacity(2);
    match detail {
        Ok(Some(raw)) => match match_detail(&raw, locale) {
            Some(detail) => deltas.push(Delta::MatchDetail { session, detail }),
            None => deltas.push(Delta::Log(format!(
                "[WARN] Match detail {} has no id",
                key.match_id
            ))),
        },
        Ok(None) => {}
        Err(err) => {
            tracing::warn!(match_id = %key.match_id, error = %err, "match detail fetch failed");
            deltas.push(Delta::Log(format!("[WARN] Match detail: {err:#}")));
        }
    }
    match h2h {
        Ok(raw) => deltas.push(Delta::HeadToHead {
            session,
            match_id: key.match_id.clone(),
            stats: aggregate_head_to_head(&raw, home_id, away_id, locale),
        }),
        Err(err) => {
            tracing::warn!(match_id = %key.match_id, error = %err, "head-to-head fetch failed");
            deltas.push(Delta::Log(format!("[WARN] Head-to-head: {err:#}")));
        }
    }
    deltas
}

fn send_all(tx: &Sender<Delta>, deltas: Vec<Delta>) -> bool {
    deltas.into_iter().all(|delta| tx.send(delta).is_ok())
}

fn build_fetch_pool(threads: usize) -> Option<rayon::ThreadPool> {
    rayon::ThreadPoolBuilder::new()
        .num_threads(threads)
        .thread_name(|idx| format!("feed-fetch-{idx}"))
        .build()
        .ok()
}

fn with_fetch_pool<T>(pool: &Option<rayon::ThreadPool>, action: impl FnOnce() -> T + Send) -> T
where
    T: Send,
{
    if let Some(pool) = pool.as_ref() {
        pool.install(action)
    } else {
        action()
    }
}
