//! Article text for summarization: resolve jump pages, extract, budget.

pub mod extract;
pub mod resolve;

use metrics::counter;
use serde::Serialize;

use crate::config::ArticleCfg;
use crate::error::ExtractError;
use extract::{extract_readable_text, truncate_to_budget};
use resolve::{resolve, PageFetcher, Resolution};

/// Placeholder surfaced instead of a summary when no text could be extracted.
pub const EXTRACT_FAILED: &str = "Failed to extract article text.";

#[derive(Debug, Clone, Serialize)]
pub struct ArticleText {
    pub source_url: String,
    pub hops: usize,
    pub text: String,
}

/// Resolve → extract → trim → minimum length → character budget.
pub async fn try_fetch_article_text(
    fetcher: &dyn PageFetcher,
    url: &str,
    cfg: &ArticleCfg,
) -> Result<ArticleText, ExtractError> {
    let Resolution {
        final_url,
        html,
        hops,
        outcome,
    } = resolve(fetcher, url, cfg.max_hops).await;
    tracing::debug!(target: "resolve", %url, %final_url, hops, ?outcome, "resolution finished");

    let text = extract_readable_text(&html, &final_url, cfg.min_paragraph_chars)?;
    let text = text.trim();
    let len = text.chars().count();
    if len < cfg.min_article_chars {
        return Err(ExtractError::TooShort {
            len,
            min: cfg.min_article_chars,
        });
    }

    Ok(ArticleText {
        source_url: final_url,
        hops,
        text: truncate_to_budget(text, cfg.char_budget),
    })
}

/// Same as [`try_fetch_article_text`], degrading every failure to [`EXTRACT_FAILED`].
pub async fn fetch_article_text(fetcher: &dyn PageFetcher, url: &str, cfg: &ArticleCfg) -> String {
    match try_fetch_article_text(fetcher, url, cfg).await {
        Ok(a) => a.text,
        Err(e) => {
            tracing::warn!(target: "extract", error = %e, %url, "article extraction failed");
            counter!("extract_failures_total").increment(1);
            EXTRACT_FAILED.to_string()
        }
    }
}
