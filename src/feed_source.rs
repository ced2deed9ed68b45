use anyhow::{Context, Result};

use crate::bucket::FetchWindow;
use crate::http_cache::fetch_json_cached;
use crate::http_client::http_client;
use crate::state::{MatchKey, StandingsKey};
use crate::upstream::{
    RawHeadToHead, RawMatch, RawStandingEntry, parse_head_to_head_json, parse_match_detail_json,
    parse_matches_json, parse_standings_json,
};

pub trait FeedSource: Send + Sync {
    fn fetch_matches(&self, window: &FetchWindow, locale: &str, count: usize)
    -> Result<Vec<RawMatch>>;

    fn fetch_standings(&self, key: &StandingsKey, locale: &str) -> Result<Vec<RawStandingEntry>>;

    fn fetch_head_to_head(
        &self,
        team_a: &str,
        team_b: &str,
        locale: &str,
        count: usize,
    ) -> Result<RawHeadToHead>;

    /// `Ok(None)` when the provider has no live record for the match yet.
    fn fetch_match_detail(&self, key: &MatchKey, locale: &str) -> Result<Option<RawMatch>>;
}

#[derive(Debug, Clone)]
pub struct HttpFeed {
    base_url: String,
}

impl HttpFeed {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
        }
    }

    pub fn matches_url(&self, window: &FetchWindow, locale: &str, count: usize) -> String {
        format!(
            "{}/calendar/matches?from={}&to={}&language={locale}&count={count}",
            self.base_url,
            window.from_param(),
            window.to_param(),
        )
    }

    pub fn standings_url(&self, key: &StandingsKey, locale: &str) -> String {
        format!(
            "{}/calendar/{}/{}/{}/standing?language={locale}",
            self.base_url, key.competition_id, key.season_id, key.stage_id,
        )
    }

    pub fn head_to_head_url(&self, team_a: &str, team_b: &str, locale: &str, count: usize) -> String {
        format!(
            "{}/teams/{team_a}/{team_b}/headtohead?language={locale}&count={count}",
            self.base_url,
        )
    }

    pub fn match_detail_url(&self, key: &MatchKey, locale: &str) -> String {
        let standings = &key.standings;
        format!(
            "{}/live/football/{}/{}/{}/{}?language={locale}",
            self.base_url,
            standings.competition_id,
            standings.season_id,
            standings.stage_id,
            key.match_id,
        )
    }

    fn get(&self, url: &str) -> Result<String> {
        let client = http_client()?;
        tracing::debug!(url, "fetching");
        fetch_json_cached(client, url)
    }
}

impl FeedSource for HttpFeed {
    fn fetch_matches(
        &self,
        window: &FetchWindow,
        locale: &str,
        count: usize,
    ) -> Result<Vec<RawMatch>> {
        let body = self.get(&self.matches_url(window, locale, count))?;
        parse_matches_json(&body).context("matches feed")
    }

    fn fetch_standings(&self, key: &StandingsKey, locale: &str) -> Result<Vec<RawStandingEntry>> {
        let body = self.get(&self.standings_url(key, locale))?;
        parse_standings_json(&body)
            .with_context(|| format!("standings feed for competition {}", key.competition_id))
    }

    fn fetch_head_to_head(
        &self,
        team_a: &str,
        team_b: &str,
        locale: &str,
        count: usize,
    ) -> Result<RawHeadToHead> {
        let body = self.get(&self.head_to_head_url(team_a, team_b, locale, count))?;
        parse_head_to_head_json(&body).context("head-to-head feed")
    }

    fn fetch_match_detail(&self, key: &MatchKey, locale: &str) -> Result<Option<RawMatch>> {
        let body = self.get(&self.match_detail_url(key, locale))?;
        parse_match_detail_json(&body)
            .with_context(|| format!("match detail feed for {}", key.match_id))
    }
}
