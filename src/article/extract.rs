//! Readability text extraction.
//!
//! Scoring and chrome removal are delegated to `dom_smoothie`, a port of
//! Mozilla's Readability. Its formatted text is then split into paragraphs,
//! whitespace-normalized, and filtered down to lines long enough to be prose.

use dom_smoothie::{Config, Readability, TextMode};
use once_cell::sync::Lazy;
use regex::Regex;

use crate::error::ExtractError;

pub const ELLIPSIS: &str = "...";

const MAX_ELEMENTS: usize = 9000;

static RE_WS: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").expect("ws regex"));

fn readability_config() -> Config {
    Config {
        max_elements_to_parse: MAX_ELEMENTS,
        text_mode: TextMode::Formatted,
        ..Default::default()
    }
}

fn prose_paragraphs(text: &str, min_paragraph_chars: usize) -> Vec<String> {
    text.lines()
        .map(|line| RE_WS.replace_all(line, " ").trim().to_string())
        .filter(|line| line.chars().count() >= min_paragraph_chars)
        .collect()
}

/// Plain article text from `html`, paragraphs separated by blank lines.
/// `base_url` resolves relative links inside the document; pass `""` when unknown.
pub fn extract_readable_text(
    html: &str,
    base_url: &str,
    min_paragraph_chars: usize,
) -> Result<String, ExtractError> {
    if html.trim().is_empty() {
        return Err(ExtractError::EmptyDocument);
    }
    let url = Some(base_url).filter(|u| !u.is_empty());

    let article = Readability::new(html, url, Some(readability_config()))
        .and_then(|mut r| r.parse())
        .map_err(|e| {
            tracing::debug!(target: "extract", url = base_url, error = ?e, "readability failed");
            ExtractError::NoReadableContent
        })?;

    let paras = prose_paragraphs(&article.text_content, min_paragraph_chars);
    if paras.is_empty() {
        tracing::debug!(target: "extract", url = base_url, "no readable content");
        return Err(ExtractError::NoReadableContent);
    }
    tracing::debug!(
        target: "extract",
        url = base_url,
        title = %article.title,
        paragraphs = paras.len(),
        "readable content found"
    );
    Ok(paras.join("\n\n"))
}

/// Over-budget text is cut to exactly `budget` chars followed by `...`.
pub fn truncate_to_budget(text: &str, budget: usize) -> String {
    if text.chars().count() <= budget {
        return text.to_string();
    }
    let mut out: String = text.chars().take(budget).collect();
    out.push_str(ELLIPSIS);
    out
}
