// src/feed/providers/bing_rss.rs
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use metrics::{counter, histogram};
use quick_xml::de::from_str;
use serde::Deserialize;
use std::time::Duration;
use time::{format_description::well_known::Rfc2822, OffsetDateTime};

use crate::feed::clean_title;
use crate::feed::query::FeedQuery;
use crate::feed::types::{FeedSource, HeadlineItem};

#[derive(Debug, Deserialize)]
struct Rss {
    channel: Channel,
}

#[derive(Debug, Deserialize)]
struct Channel {
    #[serde(rename = "item", default)]
    item: Vec<Item>,
}

#[derive(Debug, Deserialize)]
struct Item {
    title: Option<String>,
    link: Option<String>,
    #[serde(rename = "pubDate")]
    pub_date: Option<String>,
    guid: Option<Guid>,
}

// <guid isPermaLink="false">...</guid>
#[derive(Debug, Deserialize)]
struct Guid {
    #[serde(rename = "$text")]
    value: Option<String>,
}

/// RFC 2822 first (`time`), then chrono for obsolete zone names and RFC 3339.
pub(crate) fn parse_pub_date(ts: &str) -> Option<DateTime<Utc>> {
    let ts = ts.trim();
    if let Some(dt) = OffsetDateTime::parse(ts, &Rfc2822)
        .ok()
        .and_then(|dt| DateTime::<Utc>::from_timestamp(dt.unix_timestamp(), 0))
    {
        return Some(dt);
    }
    DateTime::parse_from_rfc2822(ts)
        .or_else(|_| DateTime::parse_from_rfc3339(ts))
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

pub struct BingNewsRss {
    mode: Mode,
}

enum Mode {
    Fixture(String),
    Http { client: reqwest::Client },
}

impl BingNewsRss {
    /// Parse the given XML on every fetch, ignoring the query.
    pub fn from_fixture(content: &str) -> Self {
        Self {
            mode: Mode::Fixture(content.to_string()),
        }
    }

    pub fn from_http(user_agent: &str, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(user_agent)
            .connect_timeout(Duration::from_secs(5))
            .timeout(timeout)
            .build()
            .context("building feed http client")?;
        Ok(Self {
            mode: Mode::Http { client },
        })
    }

    pub fn parse_items_from_str(s: &str) -> Result<Vec<HeadlineItem>> {
        let t0 = std::time::Instant::now();
        let rss: Rss = from_str(s).context("parsing bing news rss xml")?;

        let out: Vec<HeadlineItem> = rss
            .channel
            .item
            .into_iter()
            .map(|it| HeadlineItem {
                title: it.title.map(|t| clean_title(&t)).filter(|t| !t.is_empty()),
                link: it
                    .link
                    .map(|l| l.trim().to_string())
                    .filter(|l| !l.is_empty()),
                published_at: it.pub_date.as_deref().and_then(parse_pub_date),
                guid: it
                    .guid
                    .and_then(|g| g.value)
                    .map(|g| g.trim().to_string())
                    .filter(|g| !g.is_empty()),
            })
            .collect();

        let ms = t0.elapsed().as_secs_f64() * 1_000.0;
        histogram!("feed_parse_ms").record(ms);
        counter!("feed_items_total").increment(out.len() as u64);
        Ok(out)
    }
}

#[async_trait]
impl FeedSource for BingNewsRss {
    async fn fetch_items(&self, query: &FeedQuery) -> Result<Vec<HeadlineItem>> {
        match &self.mode {
            Mode::Fixture(s) => Self::parse_items_from_str(s),
            Mode::Http { client } => {
                let url = query.feed_url();
                tracing::debug!(target: "feed", %url, "fetching feed");
                let body = client
                    .get(&url)
                    .send()
                    .await
                    .context("bing rss http get()")?
                    .error_for_status()
                    .context("bing rss http status")?
                    .text()
                    .await
                    .context("bing rss http .text()")?;
                Self::parse_items_from_str(&body)
            }
        }
    }

    fn name(&self) -> &'static str {
        "BingNews"
    }
}
