use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};
use std::time::Instant;

use anyhow::{Context, Result, anyhow};
use once_cell::sync::Lazy;
use reqwest::StatusCode;
use reqwest::blocking::Client;
use reqwest::header::{ACCEPT, ETAG, IF_MODIFIED_SINCE, IF_NONE_MATCH, LAST_MODIFIED};

const MAX_ENTRIES: usize = 512;

static CACHE: Lazy<Mutex<HashMap<String, CacheEntry>>> = Lazy::new(|| Mutex::new(HashMap::new()));

#[derive(Debug, Clone)]
struct CacheEntry {
    body: String,
    etag: Option<String>,
    last_modified: Option<String>,
    stored_at: Instant,
}

pub fn fetch_json_cached(client: &Client, url: &str) -> Result<String> {
    let cached = lookup(url);

    let mut req = client.get(url).header(ACCEPT, "application/json");
    if let Some(entry) = cached.as_ref() {
        if let Some(etag) = entry.etag.as_ref() {
            req = req.header(IF_NONE_MATCH, etag);
        }
        if let Some(last_modified) = entry.last_modified.as_ref() {
            req = req.header(IF_MODIFIED_SINCE, last_modified);
        }
    }

    let resp = req.send().with_context(|| format!("request failed: {url}"))?;
    let status = resp.status();
    if status == StatusCode::NOT_MODIFIED {
        tracing::trace!(url, "not modified");
        return cached
            .map(|entry| entry.body)
            .ok_or_else(|| anyhow!("received 304 without cache body"));
    }

    let etag = header_text(resp.headers(), ETAG);
    let last_modified = header_text(resp.headers(), LAST_MODIFIED);
    let body = resp.text().context("failed reading body")?;
    if !status.is_success() {
        return Err(anyhow!("http {status} for {url}"));
    }

    if etag.is_some() || last_modified.is_some() {
        store(
            url,
            CacheEntry {
                body: body.clone(),
                etag,
                last_modified,
                stored_at: Instant::now(),
            },
        );
    }
    Ok(body)
}

pub fn cached_entries() -> usize {
    CACHE.lock().unwrap_or_else(PoisonError::into_inner).len()
}

fn lookup(url: &str) -> Option<CacheEntry> {
    CACHE
        .lock()
        .unwrap_or_else(PoisonError::into_inner)
        .get(url)
        .cloned()
}

fn store(url: &str, entry: CacheEntry) {
    let mut cache = CACHE.lock().unwrap_or_else(PoisonError::into_inner);
    if cache.len() >= MAX_ENTRIES && !cache.contains_key(url) {
        let oldest = cache
            .iter()
            .min_by_key(|(_, entry)| entry.stored_at)
            .map(|(key, _)| key.clone());
        if let Some(oldest) = oldest {
            cache.remove(&oldest);
        }
    }
    cache.insert(url.to_string(), entry);
}

fn header_text(
    headers: &reqwest::header::HeaderMap,
    name: reqwest::header::HeaderName,
) -> Option<String> {
    headers
        .get(name)
        .and_then(|value| value.to_str().ok())
        .map(str::to_string)
}
