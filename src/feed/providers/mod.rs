pub mod bing_rss;
