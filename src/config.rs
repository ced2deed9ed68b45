use std::env;
use std::time::Duration;

use chrono::NaiveDate;

use crate::bucket::parse_reference_date;
use crate::names::DEFAULT_LOCALE;

pub const DEFAULT_BASE_URL: &str = "https://api.fifa.com/api/v3";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceKind {
    Http,
    Demo,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FeedConfig {
    pub source: SourceKind,
    pub base_url: String,
    pub locale: String,
    pub poll_interval: Duration,
    pub match_count: usize,
    pub h2h_count: usize,
    pub fetch_parallelism: usize,
    pub board_date: Option<NaiveDate>,
    pub max_ticks: Option<u64>,
    pub demo_seed: u64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PollerSettings {
    pub locale: String,
    pub poll_interval: Duration,
    pub match_count: usize,
    pub h2h_count: usize,
    pub fetch_parallelism: usize,
}

impl FeedConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let opt = |key: &str| {
            lookup(key).and_then(|val| {
                let trimmed = val.trim();
                if trimmed.is_empty() {
                    None
                } else {
                    Some(trimmed.to_string())
                }
            })
        };

        let source = match opt("FEED_SOURCE").map(|val| val.to_lowercase()).as_deref() {
            Some("demo" | "fake") => SourceKind::Demo,
            _ => SourceKind::Http,
        };
        let poll_secs = opt("POLL_SECS")
            .and_then(|val| val.parse::<u64>().ok())
            .unwrap_or(30)
            .max(5);

        Self {
            source,
            base_url: opt("FEED_BASE_URL")
                .map(|url| url.trim_end_matches('/').to_string())
                .unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
            locale: opt("FEED_LOCALE").unwrap_or_else(|| DEFAULT_LOCALE.to_string()),
            poll_interval: Duration::from_secs(poll_secs),
            match_count: opt("MATCH_COUNT")
                .and_then(|val| val.parse::<usize>().ok())
                .unwrap_or(500)
                .clamp(1, 1000),
            h2h_count: opt("H2H_COUNT")
                .and_then(|val| val.parse::<usize>().ok())
                .unwrap_or(10)
                .clamp(1, 50),
            fetch_parallelism: opt("FETCH_PARALLELISM")
                .and_then(|val| val.parse::<usize>().ok())
                .unwrap_or(6)
                .clamp(2, 32),
            board_date: opt("BOARD_DATE").and_then(|val| parse_reference_date(&val)),
            max_ticks: opt("BOARD_MAX_TICKS")
                .and_then(|val| val.parse::<u64>().ok())
                .filter(|ticks| *ticks > 0),
            demo_seed: opt("DEMO_SEED")
                .and_then(|val| val.parse::<u64>().ok())
                .unwrap_or(26),
        }
    }

    pub fn poller_settings(&self) -> PollerSettings {
        PollerSettings {
            locale: self.locale.clone(),
            poll_interval: self.poll_interval,
            match_count: self.match_count,
            h2h_count: self.h2h_count,
            fetch_parallelism: self.fetch_parallelism,
        }
    }
}

impl Default for PollerSettings {
    fn default() -> Self {
        FeedConfig::from_lookup(|_| None).poller_settings()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_without_env() {
        let config = FeedConfig::from_lookup(|_| None);
        assert_eq!(config.source, SourceKind::Http);
        assert_eq!(config.base_url, DEFAULT_BASE_URL);
        assert_eq!(config.locale, "en-GB");
        assert_eq!(config.poll_interval, Duration::from_secs(30));
        assert_eq!(config.fetch_parallelism, 6);
        assert_eq!(config.board_date, None);
        assert_eq!(config.max_ticks, None);
    }

    #[test]
    fn values_are_clamped_and_parsed() {
        let config = FeedConfig::from_lookup(|key| {
            let val = match key {
                "FEED_SOURCE" => "Demo",
                "POLL_SECS" => "1",
                "FETCH_PARALLELISM" => "99",
                "BOARD_DATE" => "20260615",
                "BOARD_MAX_TICKS" => "3",
                "FEED_BASE_URL" => "http://localhost:8080/api/",
                _ => return None,
            };
            Some(val.to_string())
        });
        assert_eq!(config.source, SourceKind::Demo);
        assert_eq!(config.poll_interval, Duration::from_secs(5));
        assert_eq!(config.fetch_parallelism, 32);
        assert_eq!(config.board_date, NaiveDate::from_ymd_opt(2026, 6, 15));
        assert_eq!(config.max_ticks, Some(3));
        assert_eq!(config.base_url, "http://localhost:8080/api");
    }
}
