// src/config/mod.rs
pub mod app;
pub mod inference;

pub use app::{ArticleCfg, DashboardConfig, FeedCfg, SentimentMode, WorkerCfg};
pub use inference::InferenceConfig;
