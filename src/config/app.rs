// src/config/app.rs
//! Dashboard configuration (`config/dashboard.toml`).
//!
//! Every field has a default, so a missing file or section falls back to the
//! built-in values. Path override: `DASHBOARD_CONFIG_PATH`.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::{env, fs};
use tracing::{info, warn};

pub const DEFAULT_DASHBOARD_CONFIG_PATH: &str = "config/dashboard.toml";
pub const ENV_DASHBOARD_CONFIG_PATH: &str = "DASHBOARD_CONFIG_PATH";
pub const ENV_MAX_HOPS: &str = "MARKET_PULSE_MAX_HOPS";
pub const ENV_CHAR_BUDGET: &str = "MARKET_PULSE_CHAR_BUDGET";

pub const BROWSER_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/128.0.0.0 Safari/537.36";

#[derive(Debug, Clone, Deserialize, Default)]
pub struct DashboardConfig {
    #[serde(default)]
    pub feed: FeedCfg,
    #[serde(default)]
    pub article: ArticleCfg,
    #[serde(default)]
    pub worker: WorkerCfg,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum SentimentMode {
    /// Keyword heuristic assigns sentiment at fetch time.
    #[default]
    Heuristic,
    /// Sentiment stays `untagged` until the model refines it.
    Deferred,
}

#[derive(Debug, Clone, Deserialize)]
pub struct FeedCfg {
    #[serde(default = "default_max_items")]
    pub max_items: usize,
    #[serde(default = "default_revalidate_secs")]
    pub revalidate_secs: u64,
    #[serde(default)]
    pub sentiment_mode: SentimentMode,
    /// Serve a local RSS file instead of calling the feed over HTTP.
    #[serde(default)]
    pub fixture_path: Option<PathBuf>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ArticleCfg {
    #[serde(default = "default_max_hops")]
    pub max_hops: usize,
    #[serde(default = "default_char_budget")]
    pub char_budget: usize,
    #[serde(default = "default_min_article_chars")]
    pub min_article_chars: usize,
    #[serde(default = "default_min_paragraph_chars")]
    pub min_paragraph_chars: usize,
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
    #[serde(default = "default_connect_timeout_secs")]
    pub connect_timeout_secs: u64,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_max_http_redirects")]
    pub max_http_redirects: usize,
}

#[derive(Debug, Clone, Deserialize)]
pub struct WorkerCfg {
    #[serde(default = "default_pending_timeout_secs")]
    pub pending_timeout_secs: u64,
    #[serde(default = "default_error_clear_secs")]
    pub error_clear_secs: u64,
    #[serde(default = "default_neutral_band")]
    pub neutral_band: f32,
    #[serde(default = "default_feed_summary_headlines")]
    pub feed_summary_headlines: usize,
    #[serde(default = "default_queue_depth")]
    pub queue_depth: usize,
}

fn default_max_items() -> usize {
    30
}
fn default_revalidate_secs() -> u64 {
    60
}
fn default_max_hops() -> usize {
    3
}
fn default_char_budget() -> usize {
    4000
}
fn default_min_article_chars() -> usize {
    200
}
fn default_min_paragraph_chars() -> usize {
    40
}
fn default_user_agent() -> String {
    BROWSER_USER_AGENT.to_string()
}
fn default_connect_timeout_secs() -> u64 {
    5
}
fn default_timeout_secs() -> u64 {
    15
}
fn default_max_http_redirects() -> usize {
    10
}
fn default_pending_timeout_secs() -> u64 {
    60
}
fn default_error_clear_secs() -> u64 {
    3
}
fn default_neutral_band() -> f32 {
    0.6
}
fn default_feed_summary_headlines() -> usize {
    10
}
fn default_queue_depth() -> usize {
    64
}

impl Default for FeedCfg {
    fn default() -> Self {
        Self {
            max_items: default_max_items(),
            revalidate_secs: default_revalidate_secs(),
            sentiment_mode: SentimentMode::default(),
            fixture_path: None,
        }
    }
}

impl Default for ArticleCfg {
    fn default() -> Self {
        Self {
            max_hops: default_max_hops(),
            char_budget: default_char_budget(),
            min_article_chars: default_min_article_chars(),
            min_paragraph_chars: default_min_paragraph_chars(),
            user_agent: default_user_agent(),
            connect_timeout_secs: default_connect_timeout_secs(),
            timeout_secs: default_timeout_secs(),
            max_http_redirects: default_max_http_redirects(),
        }
    }
}

impl Default for WorkerCfg {
    fn default() -> Self {
        Self {
            pending_timeout_secs: default_pending_timeout_secs(),
            error_clear_secs: default_error_clear_secs(),
            neutral_band: default_neutral_band(),
            feed_summary_headlines: default_feed_summary_headlines(),
            queue_depth: default_queue_depth(),
        }
    }
}

impl DashboardConfig {
    pub fn from_toml_str(s: &str) -> Result<Self> {
        let mut cfg: DashboardConfig = toml::from_str(s).context("parsing dashboard toml")?;
        cfg.sanitize();
        Ok(cfg)
    }

    pub fn load_from_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("reading dashboard config from {}", path.display()))?;
        Self::from_toml_str(&content)
    }

    /// Resolve path from env (or default), load, then apply env overrides.
    /// A missing default file is not an error: built-in defaults are used.
    pub fn load_default() -> Result<Self> {
        let explicit = env::var(ENV_DASHBOARD_CONFIG_PATH).ok().map(PathBuf::from);
        let path = explicit
            .clone()
            .unwrap_or_else(|| PathBuf::from(DEFAULT_DASHBOARD_CONFIG_PATH));

        let mut cfg = if path.exists() {
            let cfg = Self::load_from_file(&path)?;
            info!(path = %path.display(), "dashboard config loaded");
            cfg
        } else if explicit.is_some() {
            anyhow::bail!("{ENV_DASHBOARD_CONFIG_PATH} points to non-existent path");
        } else {
            warn!(path = %path.display(), "dashboard config missing, using defaults");
            Self::default()
        };

        cfg.apply_env_overrides();
        Ok(cfg)
    }

    fn apply_env_overrides(&mut self) {
        if let Some(v) = parse_usize_env(ENV_MAX_HOPS) {
            self.article.max_hops = v;
        }
        if let Some(v) = parse_usize_env(ENV_CHAR_BUDGET) {
            self.article.char_budget = v;
        }
        self.sanitize();
    }

    fn sanitize(&mut self) {
        if self.article.max_hops == 0 {
            self.article.max_hops = default_max_hops();
        }
        if self.article.char_budget == 0 {
            self.article.char_budget = default_char_budget();
        }
        if self.feed.max_items == 0 {
            self.feed.max_items = default_max_items();
        }
        if !(0.0..=1.0).contains(&self.worker.neutral_band) {
            self.worker.neutral_band = default_neutral_band();
        }
        if self.worker.queue_depth == 0 {
            self.worker.queue_depth = default_queue_depth();
        }
    }
}

fn parse_usize_env(name: &str) -> Option<usize> {
    env::var(name).ok().and_then(|s| s.trim().parse::<usize>().ok())
}
