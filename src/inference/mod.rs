//! Inference boundary: request/response protocol, capability traits,
//! the per-task pipeline registry and the background worker.
//!
//! Requests and responses are tagged variants carrying an explicit
//! [`Correlation`] key, so "summarize one article" (story id) and
//! "summarize the whole feed" never share a shape.

pub mod providers;
pub mod registry;
pub mod worker;

use async_trait::async_trait;
use serde::Serialize;

use crate::classify::ModelLabel;
use crate::error::InferenceError;

pub use registry::{ModelFactory, PipelineRegistry};
pub use worker::{spawn_worker, WorkerHandle};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Task {
    TextClassification,
    Summarization,
}

impl Task {
    pub fn as_str(self) -> &'static str {
        match self {
            Task::TextClassification => "text-classification",
            Task::Summarization => "summarization",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(tag = "kind", content = "id", rename_all = "snake_case")]
pub enum Correlation {
    Story(String),
    Feed,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Request {
    ClassifyHeadline { id: String, text: String },
    SummarizeArticle { id: String, text: String },
    SummarizeFeed { text: String },
}

impl Request {
    pub fn task(&self) -> Task {
        match self {
            Request::ClassifyHeadline { .. } => Task::TextClassification,
            Request::SummarizeArticle { .. } | Request::SummarizeFeed { .. } => Task::Summarization,
        }
    }

    pub fn correlation(&self) -> Correlation {
        match self {
            Request::ClassifyHeadline { id, .. } | Request::SummarizeArticle { id, .. } => {
                Correlation::Story(id.clone())
            }
            Request::SummarizeFeed { .. } => Correlation::Feed,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Response {
    Sentiment {
        id: String,
        label: ModelLabel,
        score: f32,
    },
    ArticleSummary {
        id: String,
        summary: String,
    },
    FeedSummary {
        summary: String,
    },
}

impl Response {
    pub fn correlation(&self) -> Correlation {
        match self {
            Response::Sentiment { id, .. } | Response::ArticleSummary { id, .. } => {
                Correlation::Story(id.clone())
            }
            Response::FeedSummary { .. } => Correlation::Feed,
        }
    }
}

/// Loading/run stages reported while a request is served.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Progress {
    Initiate,
    Download { file: String, loaded: u64, total: u64 },
    Ready,
    Done,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum WorkerEvent {
    Progress {
        task: Task,
        correlation: Correlation,
        stage: Progress,
    },
    Complete(Response),
    Error {
        task: Task,
        correlation: Correlation,
        error: String,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SentimentVerdict {
    pub label: ModelLabel,
    pub score: f32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SummaryParams {
    pub max_new_tokens: u32,
    pub min_length: u32,
}

impl Default for SummaryParams {
    fn default() -> Self {
        Self {
            max_new_tokens: 150,
            min_length: 30,
        }
    }
}

#[async_trait]
pub trait SentimentModel: Send + Sync {
    async fn classify_sentiment(&self, text: &str) -> Result<SentimentVerdict, InferenceError>;
    fn name(&self) -> &'static str;
}

#[async_trait]
pub trait SummaryModel: Send + Sync {
    async fn summarize(&self, text: &str, params: SummaryParams) -> Result<String, InferenceError>;
    fn name(&self) -> &'static str;
}
