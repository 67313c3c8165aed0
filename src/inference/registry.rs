//! Process-owned pipeline cache: one lazily built, shared capability per task.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::OnceCell;

use super::{Progress, SentimentModel, SummaryModel, Task};
use crate::error::InferenceError;

pub type ProgressSink<'a> = &'a (dyn Fn(Progress) + Send + Sync);

/// Builds capabilities on first use. Building may be slow (model download).
#[async_trait]
pub trait ModelFactory: Send + Sync {
    async fn build_classifier(
        &self,
        progress: ProgressSink<'_>,
    ) -> Result<Arc<dyn SentimentModel>, InferenceError>;

    async fn build_summarizer(
        &self,
        progress: ProgressSink<'_>,
    ) -> Result<Arc<dyn SummaryModel>, InferenceError>;

    fn name(&self) -> &'static str;
}

#[derive(Clone)]
pub enum Pipeline {
    Classifier(Arc<dyn SentimentModel>),
    Summarizer(Arc<dyn SummaryModel>),
}

pub struct PipelineRegistry {
    factory: Arc<dyn ModelFactory>,
    slots: HashMap<Task, OnceCell<Pipeline>>,
    builds: AtomicUsize,
}

impl PipelineRegistry {
    pub fn new(factory: Arc<dyn ModelFactory>) -> Self {
        let slots = [Task::TextClassification, Task::Summarization]
            .into_iter()
            .map(|t| (t, OnceCell::new()))
            .collect();
        Self {
            factory,
            slots,
            builds: AtomicUsize::new(0),
        }
    }

    /// Concurrent first callers share one build; a failed build leaves the slot
    /// empty so a later request tries again.
    pub async fn get(&self, task: Task, progress: ProgressSink<'_>) -> Result<Pipeline, InferenceError> {
        let slot = self
            .slots
            .get(&task)
            .ok_or_else(|| InferenceError::Unavailable(task.as_str().to_string()))?;

        let pipeline = slot
            .get_or_try_init(|| async {
                self.builds.fetch_add(1, Ordering::Relaxed);
                tracing::info!(target: "inference", task = task.as_str(), factory = self.factory.name(), "building pipeline");
                match task {
                    Task::TextClassification => self
                        .factory
                        .build_classifier(progress)
                        .await
                        .map(Pipeline::Classifier),
                    Task::Summarization => self
                        .factory
                        .build_summarizer(progress)
                        .await
                        .map(Pipeline::Summarizer),
                }
            })
            .await?;
        Ok(pipeline.clone())
    }

    pub async fn classifier(
        &self,
        progress: ProgressSink<'_>,
    ) -> Result<Arc<dyn SentimentModel>, InferenceError> {
        match self.get(Task::TextClassification, progress).await? {
            Pipeline::Classifier(c) => Ok(c),
            Pipeline::Summarizer(_) => Err(InferenceError::Unavailable(
                "classification slot holds a summarizer".into(),
            )),
        }
    }

    pub async fn summarizer(
        &self,
        progress: ProgressSink<'_>,
    ) -> Result<Arc<dyn SummaryModel>, InferenceError> {
        match self.get(Task::Summarization, progress).await? {
            Pipeline::Summarizer(s) => Ok(s),
            Pipeline::Classifier(_) => Err(InferenceError::Unavailable(
                "summarization slot holds a classifier".into(),
            )),
        }
    }

    pub fn is_loaded(&self, task: Task) -> bool {
        self.slots.get(&task).is_some_and(|s| s.initialized())
    }

    /// Number of builds started (diagnostics).
    pub fn build_count(&self) -> usize {
        self.builds.load(Ordering::Relaxed)
    }
}
