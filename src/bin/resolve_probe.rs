//! Follow a jump URL and print where it lands plus the extracted text.
//!
//! Usage: resolve_probe <url> [max_hops]

use anyhow::Context;
use market_pulse::article::resolve::{resolve, HttpFetcher};
use market_pulse::article::extract::{extract_readable_text, truncate_to_budget};
use market_pulse::config::DashboardConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();
    tracing_subscriber::fmt().with_target(false).init();

    let mut args = std::env::args().skip(1);
    let url = args.next().context("usage: resolve_probe <url> [max_hops]")?;
    let mut cfg = DashboardConfig::load_default()?;
    if let Some(hops) = args.next() {
        cfg.article.max_hops = hops.parse().context("max_hops must be a number")?;
    }

    let fetcher = HttpFetcher::new(&cfg.article)?;
    let res = resolve(&fetcher, &url, cfg.article.max_hops).await;
    println!("final_url: {}", res.final_url);
    println!("hops:      {}", res.hops);
    println!("outcome:   {:?}", res.outcome);
    println!("html:      {} bytes", res.html.len());

    match extract_readable_text(&res.html, &res.final_url, cfg.article.min_paragraph_chars) {
        Ok(text) => println!("\n{}", truncate_to_budget(text.trim(), cfg.article.char_budget)),
        Err(e) => println!("\nextraction failed: {e}"),
    }
    Ok(())
}
