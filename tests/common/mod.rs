// tests/common/mod.rs
// Shared in-memory fetcher for resolver and article tests.
#![allow(dead_code)]

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use market_pulse::article::resolve::{FetchedPage, PageFetcher};
use market_pulse::error::FetchError;

/// Serves canned bodies by URL; unknown URLs answer 404.
/// `aliases` emulate transport-level redirects (requested → final URL).
#[derive(Default)]
pub struct FakeWeb {
    pages: HashMap<String, String>,
    aliases: HashMap<String, String>,
    calls: AtomicUsize,
    log: Mutex<Vec<String>>,
}

impl FakeWeb {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn page(mut self, url: &str, body: &str) -> Self {
        self.pages.insert(url.to_string(), body.to_string());
        self
    }

    pub fn alias(mut self, from: &str, to: &str) -> Self {
        self.aliases.insert(from.to_string(), to.to_string());
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn requested(&self) -> Vec<String> {
        self.log.lock().unwrap().clone()
    }
}

#[async_trait]
impl PageFetcher for FakeWeb {
    async fn fetch(&self, url: &str) -> Result<FetchedPage, FetchError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.log.lock().unwrap().push(url.to_string());
        let final_url = self.aliases.get(url).cloned().unwrap_or_else(|| url.to_string());
        match self.pages.get(&final_url) {
            Some(body) => Ok(FetchedPage {
                final_url,
                body: body.clone(),
            }),
            None => Err(FetchError::Status {
                status: 404,
                url: url.to_string(),
            }),
        }
    }
}

pub fn meta_jump(to: &str) -> String {
    format!(r#"<html><head><meta http-equiv="refresh" content="0;url={to}"></head><body></body></html>"#)
}

pub fn plain_page(marker: &str) -> String {
    format!("<html><body><article><p>{marker}</p></article></body></html>")
}
