// tests/resolver_chain.rs
mod common;

use common::{meta_jump, plain_page, FakeWeb};
use market_pulse::article::resolve::{resolve, Outcome};

#[tokio::test]
async fn short_chain_lands_on_final_page() {
    let last = plain_page("landed");
    let web = FakeWeb::new()
        .page("https://jump.test/a", &meta_jump("https://jump.test/b"))
        .page("https://jump.test/b", &meta_jump("https://news.test/story"))
        .page("https://news.test/story", &last);

    let res = resolve(&web, "https://jump.test/a", 5).await;
    assert_eq!(res.outcome, Outcome::Resolved);
    assert_eq!(res.final_url, "https://news.test/story");
    assert_eq!(res.html, last, "final HTML is returned unchanged");
    assert_eq!(res.hops, 3);
    assert_eq!(web.calls(), 3);
}

#[tokio::test]
async fn long_chain_stops_after_exactly_max_hops() {
    let mut web = FakeWeb::new();
    for i in 0..10 {
        web = web.page(
            &format!("https://jump.test/{i}"),
            &meta_jump(&format!("https://jump.test/{}", i + 1)),
        );
    }

    for max_hops in [1usize, 3, 7] {
        let before = web.calls();
        let res = resolve(&web, "https://jump.test/0", max_hops).await;
        assert_eq!(res.outcome, Outcome::HopLimit);
        assert_eq!(web.calls() - before, max_hops);
        assert_eq!(res.hops, max_hops);
        assert_eq!(res.final_url, format!("https://jump.test/{}", max_hops - 1));
        assert_eq!(res.html, meta_jump(&format!("https://jump.test/{max_hops}")));
    }
}

#[tokio::test]
async fn chain_of_exactly_max_hops_ends_on_the_limit() {
    let web = FakeWeb::new()
        .page("https://jump.test/a", &meta_jump("https://jump.test/b"))
        .page("https://jump.test/b", &meta_jump("https://news.test/story"))
        .page("https://news.test/story", &plain_page("never fetched"));

    let res = resolve(&web, "https://jump.test/a", 2).await;
    assert_eq!(web.calls(), 2);
    assert_eq!(res.outcome, Outcome::HopLimit);
    assert_eq!(res.final_url, "https://jump.test/b");
}

#[tokio::test]
async fn self_reference_stops_immediately() {
    let body = meta_jump("https://loop.test/page");
    let web = FakeWeb::new().page("https://loop.test/page", &body);

    let res = resolve(&web, "https://loop.test/page", 5).await;
    assert_eq!(web.calls(), 1);
    assert_eq!(res.outcome, Outcome::Resolved);
    assert_eq!(res.html, body);
}

#[tokio::test]
async fn relative_self_reference_is_detected_after_normalizing() {
    let body = meta_jump("/page");
    let web = FakeWeb::new().page("https://loop.test/page", &body);

    let res = resolve(&web, "https://loop.test/page", 5).await;
    assert_eq!(web.calls(), 1);
    assert_eq!(res.outcome, Outcome::Resolved);
}

#[tokio::test]
async fn first_hop_failure_yields_empty_html() {
    let web = FakeWeb::new();
    let res = resolve(&web, "https://down.test/x", 3).await;
    assert_eq!(res.outcome, Outcome::Failed);
    assert!(res.html.is_empty());
    assert_eq!(res.final_url, "https://down.test/x");
    assert_eq!(web.calls(), 1);
}

#[tokio::test]
async fn later_failure_keeps_last_good_html() {
    let jump = meta_jump("https://gone.test/404");
    let web = FakeWeb::new().page("https://jump.test/a", &jump);

    let res = resolve(&web, "https://jump.test/a", 3).await;
    assert_eq!(res.outcome, Outcome::Resolved);
    assert_eq!(res.html, jump);
    assert_eq!(res.final_url, "https://jump.test/a");
    assert_eq!(web.calls(), 2);
}

#[tokio::test]
async fn zero_hops_fetches_nothing() {
    let web = FakeWeb::new().page("https://jump.test/a", &plain_page("x"));
    let res = resolve(&web, "https://jump.test/a", 0).await;
    assert_eq!(web.calls(), 0);
    assert_eq!(res.outcome, Outcome::HopLimit);
    assert!(res.html.is_empty());
}

#[tokio::test]
async fn escaped_meta_target_is_unescaped() {
    let jump = include_str!("fixtures/jump_meta.html");
    let article = include_str!("fixtures/article.html");
    let web = FakeWeb::new()
        .page("https://www.bing.com/news/apiclick.aspx?tid=1", jump)
        .page("https://www.reuters.com/markets/story-0?src=rss&utm=bing", article);

    let res = resolve(&web, "https://www.bing.com/news/apiclick.aspx?tid=1", 3).await;
    assert_eq!(
        web.requested(),
        vec![
            "https://www.bing.com/news/apiclick.aspx?tid=1".to_string(),
            "https://www.reuters.com/markets/story-0?src=rss&utm=bing".to_string(),
        ],
        "meta refresh wins over the script redirect on the same page"
    );
    assert_eq!(res.html, article);
}

#[tokio::test]
async fn root_relative_script_target_resolves_against_host() {
    let jump = include_str!("fixtures/jump_script.html");
    let web = FakeWeb::new()
        .page("https://click.test:8443/go?id=7", jump)
        .page("https://click.test:8443/markets/story-0", &plain_page("landed"));

    let res = resolve(&web, "https://click.test:8443/go?id=7", 3).await;
    assert_eq!(res.final_url, "https://click.test:8443/markets/story-0");
    assert_eq!(res.outcome, Outcome::Resolved);
    assert!(!web.requested().iter().any(|u| u.contains("decoy")));
}

#[tokio::test]
async fn transport_redirects_move_the_base_url() {
    let web = FakeWeb::new()
        .alias("https://short.test/x", "https://jump.test/landing")
        .page("https://jump.test/landing", &meta_jump("/story"))
        .page("https://jump.test/story", &plain_page("done"));

    let res = resolve(&web, "https://short.test/x", 3).await;
    assert_eq!(res.final_url, "https://jump.test/story");
    assert_eq!(res.hops, 2);
}
