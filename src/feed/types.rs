// src/feed/types.rs
use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::classify::{Factor, Sentiment};
use crate::feed::query::FeedQuery;

/// One raw feed entry, as handed over by a provider.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct HeadlineItem {
    pub title: Option<String>,
    pub link: Option<String>,
    pub published_at: Option<DateTime<Utc>>,
    pub guid: Option<String>,
}

/// A headline plus everything derived from it for display.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Story {
    pub id: String,
    pub title: String,
    pub link: String,
    pub domain: String,
    pub time_ago: String,
    pub factor: Factor,
    pub sentiment: Sentiment,
    pub impact_label: String,
    pub iso_date: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refined_score: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
}

#[async_trait::async_trait]
pub trait FeedSource: Send + Sync {
    async fn fetch_items(&self, query: &FeedQuery) -> Result<Vec<HeadlineItem>>;
    fn name(&self) -> &'static str;
}
