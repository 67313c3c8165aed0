// tests/article_text.rs
mod common;

use common::{meta_jump, FakeWeb};
use market_pulse::article::extract::ELLIPSIS;
use market_pulse::article::{fetch_article_text, try_fetch_article_text, EXTRACT_FAILED};
use market_pulse::config::ArticleCfg;
use market_pulse::error::ExtractError;

const ARTICLE: &str = include_str!("fixtures/article.html");

fn cfg() -> ArticleCfg {
    ArticleCfg::default()
}

#[tokio::test]
async fn jump_page_to_article_text() {
    let web = FakeWeb::new()
        .page("https://jump.test/click", &meta_jump("https://news.test/fed"))
        .page("https://news.test/fed", ARTICLE);

    let article = try_fetch_article_text(&web, "https://jump.test/click", &cfg())
        .await
        .unwrap();
    assert_eq!(article.source_url, "https://news.test/fed");
    assert_eq!(article.hops, 2);

    let paras: Vec<&str> = article.text.split("\n\n").collect();
    assert!(paras.iter().any(|p| p.starts_with("WASHINGTON, Oct 15")));
    assert!(article.text.contains("Policymakers voted unanimously"));
    assert!(article.text.contains("Treasury yields eased"));
    assert!(!article.text.contains("Short caption."));
    assert!(!article.text.contains("Subscribe"));
    assert!(!article.text.contains("Related:"));
    assert!(!article.text.contains("quotes delayed"));
}

#[tokio::test]
async fn unreachable_article_degrades_to_placeholder() {
    let web = FakeWeb::new();
    let text = fetch_article_text(&web, "https://down.test/x", &cfg()).await;
    assert_eq!(text, EXTRACT_FAILED);
}

#[tokio::test]
async fn short_text_is_rejected() {
    let page = "<html><body><article><p>Only a brief wire note that says almost nothing.</p></article></body></html>";
    let web = FakeWeb::new().page("https://news.test/brief", page);

    let err = try_fetch_article_text(&web, "https://news.test/brief", &cfg())
        .await
        .unwrap_err();
    assert!(matches!(err, ExtractError::TooShort { min: 200, .. }));
    assert_eq!(
        fetch_article_text(&web, "https://news.test/brief", &cfg()).await,
        EXTRACT_FAILED
    );
}

#[tokio::test]
async fn long_text_is_cut_to_budget() {
    let para = "Markets moved sharply after the announcement, with investors repricing the outlook. ";
    let body = format!(
        "<html><body><article><p>{}</p></article></body></html>",
        para.repeat(100)
    );
    let web = FakeWeb::new().page("https://news.test/long", &body);
    let cfg = ArticleCfg {
        char_budget: 500,
        ..ArticleCfg::default()
    };

    let text = fetch_article_text(&web, "https://news.test/long", &cfg).await;
    assert_eq!(text.chars().count(), 500 + ELLIPSIS.len());
    assert!(text.ends_with(ELLIPSIS));
}
