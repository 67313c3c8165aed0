// src/feed/mod.rs
pub mod providers;
pub mod query;
pub mod types;

use chrono::{DateTime, SecondsFormat, Utc};
use metrics::{counter, describe_counter, describe_histogram};
use once_cell::sync::{Lazy, OnceCell};
use regex::Regex;

use crate::classify::{classify, classify_deferred};
use crate::config::SentimentMode;
use crate::feed::query::FeedQuery;
use crate::feed::types::{FeedSource, HeadlineItem, Story};

/// One-time metrics registration (so series show up on /metrics).
fn ensure_metrics_described() {
    static ONCE: OnceCell<()> = OnceCell::new();
    ONCE.get_or_init(|| {
        describe_counter!("feed_fetch_total", "Feed fetch attempts.");
        describe_counter!("feed_fetch_errors_total", "Feed fetch/parse failures.");
        describe_counter!("feed_items_total", "Headline items parsed from feeds.");
        describe_histogram!("feed_parse_ms", "Feed parse time in milliseconds.");
    });
}

static RE_TAGS: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?is)</?[^>]+>").expect("tag regex"));
static RE_WS: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").expect("ws regex"));

/// Headline cleanup: decode entities, strip tags, ASCII quotes, collapse whitespace.
pub fn clean_title(s: &str) -> String {
    let decoded = html_escape::decode_html_entities(s);
    let stripped = RE_TAGS.replace_all(&decoded, "");
    let quoted = stripped
        .replace(['\u{201C}', '\u{201D}', '\u{00AB}', '\u{00BB}'], "\"")
        .replace(['\u{2018}', '\u{2019}'], "'");
    RE_WS.replace_all(&quoted, " ").trim().to_string()
}

/// Hostname without a leading `www.`; `"unknown"` when the link does not parse.
pub fn get_domain(link: &str) -> String {
    match url::Url::parse(link) {
        Ok(u) => match u.host_str() {
            Some(host) => host.strip_prefix("www.").unwrap_or(host).to_string(),
            None => "unknown".to_string(),
        },
        Err(_) => "unknown".to_string(),
    }
}

/// Humanized age: largest whole unit among y, mo, d, h, m, s.
pub fn time_since(published: DateTime<Utc>, now: DateTime<Utc>) -> String {
    let seconds = (now - published).num_seconds().max(0);
    const UNITS: [(i64, &str); 5] = [
        (31_536_000, "y"),
        (2_592_000, "mo"),
        (86_400, "d"),
        (3_600, "h"),
        (60, "m"),
    ];
    for (span, suffix) in UNITS {
        let n = seconds / span;
        if n >= 1 {
            return format!("{n}{suffix} ago");
        }
    }
    format!("{seconds}s ago")
}

pub fn story_id(guid: Option<&str>, index: usize) -> String {
    match guid {
        Some(g) => format!("{g}-{index}"),
        None => index.to_string(),
    }
}

/// Derive a display story from one feed item. Never mutates the item.
pub fn build_story(
    item: &HeadlineItem,
    index: usize,
    mode: SentimentMode,
    now: DateTime<Utc>,
) -> Story {
    let title = item.title.clone().unwrap_or_else(|| "Untitled".to_string());
    let link = item.link.clone().unwrap_or_else(|| "#".to_string());
    let cls = match mode {
        SentimentMode::Heuristic => classify(&title),
        SentimentMode::Deferred => classify_deferred(&title),
    };
    let (time_ago, iso) = match item.published_at {
        Some(ts) => (time_since(ts, now), ts),
        None => ("recently".to_string(), now),
    };

    Story {
        id: story_id(item.guid.as_deref(), index),
        domain: get_domain(&link),
        title,
        link,
        time_ago,
        factor: cls.factor,
        sentiment: cls.sentiment,
        impact_label: cls.impact_label.to_string(),
        iso_date: iso.to_rfc3339_opts(SecondsFormat::Secs, true),
        refined_score: None,
        summary: None,
    }
}

/// Take the first `max_items` entries and map each to a story.
pub fn assemble(
    items: &[HeadlineItem],
    max_items: usize,
    mode: SentimentMode,
    now: DateTime<Utc>,
) -> Vec<Story> {
    items
        .iter()
        .take(max_items)
        .enumerate()
        .map(|(i, it)| build_story(it, i, mode, now))
        .collect()
}

/// Fetch + assemble. Any provider failure degrades to an empty list.
pub async fn fetch_finance_news(
    source: &dyn FeedSource,
    query: &FeedQuery,
    max_items: usize,
    mode: SentimentMode,
) -> Vec<Story> {
    ensure_metrics_described();
    counter!("feed_fetch_total").increment(1);

    match source.fetch_items(query).await {
        Ok(items) => {
            let stories = assemble(&items, max_items, mode, Utc::now());
            tracing::info!(
                target: "feed",
                provider = source.name(),
                country = ?query.country,
                time = ?query.time,
                fetched = items.len(),
                kept = stories.len(),
                "feed assembled"
            );
            stories
        }
        Err(e) => {
            tracing::warn!(target: "feed", error = ?e, provider = source.name(), "feed fetch failed");
            counter!("feed_fetch_errors_total").increment(1);
            Vec::new()
        }
    }
}
