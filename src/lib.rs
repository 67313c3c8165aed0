// src/lib.rs
// Public library surface for the binaries and integration tests.

pub mod api;
pub mod article;
pub mod board;
pub mod classify;
pub mod config;
pub mod error;
pub mod feed;
pub mod inference;
pub mod metrics;

pub use crate::api::{router, AppState};
pub use crate::classify::{classify, Classification, Factor, Sentiment};
pub use crate::feed::fetch_finance_news;

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use axum::Router;
use tracing::info;

use crate::article::resolve::HttpFetcher;
use crate::config::{DashboardConfig, InferenceConfig};
use crate::feed::providers::bing_rss::BingNewsRss;
use crate::feed::types::FeedSource;
use crate::inference::providers::build_factory_from_config;
use crate::inference::SummaryParams;

/// Build the full application from config files and env: feed provider,
/// page fetcher, inference worker, dashboard routes and `/metrics`.
pub async fn app() -> anyhow::Result<Router> {
    let cfg = DashboardConfig::load_default()?;

    let feed: Arc<dyn FeedSource> = match &cfg.feed.fixture_path {
        Some(path) => {
            let xml = std::fs::read_to_string(path)
                .with_context(|| format!("reading feed fixture {}", path.display()))?;
            info!(target: "feed", path = %path.display(), "serving feed from fixture");
            Arc::new(BingNewsRss::from_fixture(&xml))
        }
        None => Arc::new(BingNewsRss::from_http(
            &cfg.article.user_agent,
            Duration::from_secs(cfg.article.timeout_secs),
        )?),
    };
    let fetcher = Arc::new(HttpFetcher::new(&cfg.article)?);

    let inference = InferenceConfig::load_default();
    let params = SummaryParams {
        max_new_tokens: inference.max_new_tokens,
        min_length: inference.min_length,
    };
    let factory = build_factory_from_config(&inference);
    info!(target: "inference", factory = factory.name(), "inference provider selected");

    let metrics = crate::metrics::Metrics::init(cfg.feed.revalidate_secs)?;
    let state = AppState::start(cfg, feed, fetcher, factory, params);

    Ok(router(state).merge(metrics.router()))
}
