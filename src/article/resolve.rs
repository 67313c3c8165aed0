//! Jump-page resolver.
//!
//! Follows HTTP redirects (inside the fetcher), then meta-refresh and script
//! redirects embedded in the returned HTML, for at most `max_hops` fetches.
//!
//! Per hop:
//! 1. GET the current URL; the post-redirect URL becomes current, the body
//!    becomes the captured HTML.
//! 2. Look for the next hop: meta-refresh first, then `location.replace(..)` /
//!    `location.href = ..` inside `<script>`.
//! 3. No next hop, or a next hop equal to the current URL → resolved.
//!
//! A failed fetch keeps the last captured HTML if there is one.

use async_trait::async_trait;
use metrics::counter;
use once_cell::sync::Lazy;
use regex::Regex;
use scraper::{Html, Selector};
use serde::Serialize;
use std::time::Duration;
use tracing::{debug, warn};

use crate::config::ArticleCfg;
use crate::error::FetchError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchedPage {
    /// URL after HTTP-level redirects.
    pub final_url: String,
    pub body: String,
}

/// One HTTP GET with automatic HTTP redirect following.
#[async_trait]
pub trait PageFetcher: Send + Sync {
    async fn fetch(&self, url: &str) -> Result<FetchedPage, FetchError>;
}

/// reqwest-backed fetcher presenting itself as a desktop browser.
pub struct HttpFetcher {
    client: reqwest::Client,
}

impl HttpFetcher {
    pub fn new(cfg: &ArticleCfg) -> anyhow::Result<Self> {
        use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, ACCEPT_LANGUAGE};

        let mut headers = HeaderMap::new();
        headers.insert(
            ACCEPT,
            HeaderValue::from_static(
                "text/html,application/xhtml+xml,application/xml;q=0.9,image/webp,*/*;q=0.8",
            ),
        );
        headers.insert(ACCEPT_LANGUAGE, HeaderValue::from_static("en-US,en;q=0.5"));

        let client = reqwest::Client::builder()
            .user_agent(cfg.user_agent.as_str())
            .default_headers(headers)
            .redirect(reqwest::redirect::Policy::limited(cfg.max_http_redirects))
            .connect_timeout(Duration::from_secs(cfg.connect_timeout_secs))
            .timeout(Duration::from_secs(cfg.timeout_secs))
            .build()?;
        Ok(Self { client })
    }
}

#[async_trait]
impl PageFetcher for HttpFetcher {
    async fn fetch(&self, url: &str) -> Result<FetchedPage, FetchError> {
        let resp = self.client.get(url).send().await?;
        let status = resp.status();
        let final_url = resp.url().to_string();
        if !status.is_success() {
            return Err(FetchError::Status {
                status: status.as_u16(),
                url: final_url,
            });
        }
        let body = resp
            .text()
            .await
            .map_err(|e| FetchError::Body(e.to_string()))?;
        Ok(FetchedPage { final_url, body })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    /// Landed on a page without a further redirect (or kept the last good one).
    Resolved,
    /// First fetch failed; nothing captured.
    Failed,
    /// Stopped at the hop limit while still following.
    HopLimit,
}

impl Outcome {
    fn as_str(self) -> &'static str {
        match self {
            Outcome::Resolved => "resolved",
            Outcome::Failed => "failed",
            Outcome::HopLimit => "hop_limit",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Resolution {
    /// URL of the page `html` came from (the initial URL if nothing was fetched).
    pub final_url: String,
    /// Last captured HTML; empty on total failure.
    pub html: String,
    /// Number of fetches issued.
    pub hops: usize,
    pub outcome: Outcome,
}

enum State {
    Following,
    Done(Outcome),
}

/// Mutable trace of one resolution; dropped when it completes.
struct RedirectTrace {
    current_url: String,
    fetched_url: String,
    hops: usize,
    html: Option<String>,
}

pub async fn resolve(fetcher: &dyn PageFetcher, initial_url: &str, max_hops: usize) -> Resolution {
    let mut trace = RedirectTrace {
        current_url: initial_url.to_string(),
        fetched_url: initial_url.to_string(),
        hops: 0,
        html: None,
    };
    let mut state = State::Following;

    while let State::Following = state {
        if trace.hops >= max_hops {
            state = State::Done(Outcome::HopLimit);
            break;
        }
        trace.hops += 1;
        counter!("resolve_hops_total").increment(1);
        debug!(target: "resolve", hop = trace.hops, url = %trace.current_url, "fetching");

        let page = match fetcher.fetch(&trace.current_url).await {
            Ok(p) => p,
            Err(e) => {
                warn!(target: "resolve", error = %e, url = %trace.current_url, hop = trace.hops, "fetch failed");
                state = State::Done(if trace.html.is_some() {
                    Outcome::Resolved
                } else {
                    Outcome::Failed
                });
                break;
            }
        };

        trace.current_url = page.final_url;
        trace.fetched_url = trace.current_url.clone();
        let next = find_next_hop(&page.body);
        trace.html = Some(page.body);

        state = match next {
            None => State::Done(Outcome::Resolved),
            Some(raw) => {
                let next_url = normalize_target(&raw, &trace.current_url);
                if raw == trace.current_url || next_url == trace.current_url {
                    debug!(target: "resolve", url = %next_url, "self-referential redirect");
                    State::Done(Outcome::Resolved)
                } else {
                    debug!(target: "resolve", from = %trace.current_url, to = %next_url, "embedded redirect");
                    trace.current_url = next_url;
                    State::Following
                }
            }
        };
    }

    let outcome = match state {
        State::Done(o) => o,
        State::Following => Outcome::HopLimit,
    };
    counter!("resolve_outcome_total", "outcome" => outcome.as_str()).increment(1);

    Resolution {
        final_url: trace.fetched_url,
        html: trace.html.unwrap_or_default(),
        hops: trace.hops,
        outcome,
    }
}

static SEL_META: Lazy<Selector> =
    Lazy::new(|| Selector::parse("meta[http-equiv][content]").expect("meta selector"));
static SEL_SCRIPT: Lazy<Selector> =
    Lazy::new(|| Selector::parse("script").expect("script selector"));

// "0;url=...", "5; URL='...'", bare "URL=..."
static RE_REFRESH_CONTENT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?i)^\s*(?:\d+(?:\.\d+)?\s*[;,]?\s*)?url\s*=\s*['"]?([^'">]+?)['"]?\s*$"#)
        .expect("refresh content regex")
});
// Raw-markup fallback for meta tags the HTML parser did not surface.
static RE_REFRESH_RAW: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?i)content=["']\d+; *url=['"]?([^"'>]+)['"]?["']"#).expect("refresh raw regex")
});
static RE_JS_REPLACE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?i)(?:window\.)?location\.replace\(\s*["']([^"']+)["']\s*\)"#)
        .expect("js replace regex")
});
static RE_JS_HREF: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?i)(?:window\.)?location\.href\s*=\s*["']([^"']+)["']"#).expect("js href regex")
});

/// Target of a meta-refresh `content` attribute, if it names one.
pub fn parse_refresh_content(content: &str) -> Option<String> {
    RE_REFRESH_CONTENT
        .captures(content)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().trim().to_string())
        .filter(|s| !s.is_empty())
}

/// Next-hop URL embedded in `html`, meta-refresh taking precedence over script.
pub fn find_next_hop(html: &str) -> Option<String> {
    let doc = Html::parse_document(html);

    let meta = doc
        .select(&SEL_META)
        .filter(|el| {
            el.value()
                .attr("http-equiv")
                .is_some_and(|v| v.trim().eq_ignore_ascii_case("refresh"))
        })
        .find_map(|el| el.value().attr("content").and_then(parse_refresh_content));
    if meta.is_some() {
        return meta;
    }

    if let Some(c) = RE_REFRESH_RAW.captures(html).and_then(|c| c.get(1)) {
        return Some(c.as_str().to_string());
    }

    let scripts: Vec<String> = doc
        .select(&SEL_SCRIPT)
        .map(|s| s.text().collect::<String>())
        .collect();
    for re in [&*RE_JS_REPLACE, &*RE_JS_HREF] {
        if let Some(m) = scripts
            .iter()
            .find_map(|src| re.captures(src).and_then(|c| c.get(1)))
        {
            return Some(m.as_str().to_string());
        }
    }
    None
}

/// Unescape entities and make the target absolute against `current`.
pub fn normalize_target(raw: &str, current: &str) -> String {
    let unescaped = html_escape::decode_html_entities(raw.trim()).to_string();
    if let Ok(abs) = url::Url::parse(&unescaped) {
        return abs.to_string();
    }
    match url::Url::parse(current).and_then(|base| base.join(&unescaped)) {
        Ok(joined) => joined.to_string(),
        Err(_) => unescaped,
    }
}
