//! Long-lived inference worker.
//!
//! One tokio task owns the request channel and spawns a sub-task per request,
//! so several requests are in flight at once. Every request reports
//! `Progress::Initiate` immediately, then model-loading progress (first use
//! only), then either `Complete` or `Error`. Completions can arrive in any
//! order; callers match them by [`Correlation`], never by arrival order.
//! There is no cancellation.

use metrics::{counter, histogram};
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use super::{Correlation, PipelineRegistry, Progress, Request, Response, SummaryParams, WorkerEvent};
use crate::error::InferenceError;

#[derive(Debug, thiserror::Error)]
#[error("inference worker is not running")]
pub struct WorkerClosed;

/// Cheap, cloneable sender side of the worker.
#[derive(Clone)]
pub struct WorkerHandle {
    tx: mpsc::Sender<Request>,
}

impl WorkerHandle {
    /// Queue a request; waits when the queue is full.
    pub async fn submit(&self, req: Request) -> Result<(), WorkerClosed> {
        self.tx.send(req).await.map_err(|_| WorkerClosed)
    }
}

/// Start the worker. Events flow out through the returned receiver.
pub fn spawn_worker(
    registry: Arc<PipelineRegistry>,
    params: SummaryParams,
    queue_depth: usize,
) -> (WorkerHandle, mpsc::UnboundedReceiver<WorkerEvent>, JoinHandle<()>) {
    let (tx, mut rx) = mpsc::channel::<Request>(queue_depth.max(1));
    let (events_tx, events_rx) = mpsc::unbounded_channel::<WorkerEvent>();

    let join = tokio::spawn(async move {
        while let Some(req) = rx.recv().await {
            let task = req.task();
            let correlation = req.correlation();
            counter!("inference_requests_total", "task" => task.as_str()).increment(1);
            let _ = events_tx.send(WorkerEvent::Progress {
                task,
                correlation,
                stage: Progress::Initiate,
            });

            let registry = registry.clone();
            let events = events_tx.clone();
            tokio::spawn(async move {
                let t0 = Instant::now();
                let event = match serve(&registry, req, params, &events).await {
                    Ok(resp) => {
                        let _ = events.send(WorkerEvent::Progress {
                            task,
                            correlation: resp.correlation(),
                            stage: Progress::Done,
                        });
                        WorkerEvent::Complete(resp)
                    }
                    Err((correlation, e)) => {
                        tracing::warn!(target: "inference", task = task.as_str(), ?correlation, error = %e, "request failed");
                        counter!("inference_errors_total", "task" => task.as_str()).increment(1);
                        WorkerEvent::Error {
                            task,
                            correlation,
                            error: e.to_string(),
                        }
                    }
                };
                histogram!("inference_latency_ms").record(t0.elapsed().as_secs_f64() * 1_000.0);
                let _ = events.send(event);
            });
        }
        tracing::info!(target: "inference", "worker request channel closed");
    });

    (WorkerHandle { tx }, events_rx, join)
}

async fn serve(
    registry: &PipelineRegistry,
    req: Request,
    params: SummaryParams,
    events: &mpsc::UnboundedSender<WorkerEvent>,
) -> Result<Response, (Correlation, InferenceError)> {
    let task = req.task();
    let correlation = req.correlation();
    let progress = {
        let events = events.clone();
        let correlation = correlation.clone();
        move |stage: Progress| {
            let _ = events.send(WorkerEvent::Progress {
                task,
                correlation: correlation.clone(),
                stage,
            });
        }
    };
    let fail = |e: InferenceError| (correlation.clone(), e);

    match req {
        Request::ClassifyHeadline { id, text } => {
            let model = registry.classifier(&progress).await.map_err(fail)?;
            let v = model.classify_sentiment(&text).await.map_err(fail)?;
            Ok(Response::Sentiment {
                id,
                label: v.label,
                score: v.score,
            })
        }
        Request::SummarizeArticle { id, text } => {
            let model = registry.summarizer(&progress).await.map_err(fail)?;
            let summary = model.summarize(&text, params).await.map_err(fail)?;
            Ok(Response::ArticleSummary { id, summary })
        }
        Request::SummarizeFeed { text } => {
            let model = registry.summarizer(&progress).await.map_err(fail)?;
            let summary = model.summarize(&text, params).await.map_err(fail)?;
            Ok(Response::FeedSummary { summary })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::inference::providers::{DisabledFactory, MockFactory};
    use crate::inference::Task;

    async fn next_terminal(rx: &mut mpsc::UnboundedReceiver<WorkerEvent>) -> WorkerEvent {
        loop {
            let ev = rx.recv().await.expect("worker alive");
            if !matches!(ev, WorkerEvent::Progress { .. }) {
                return ev;
            }
        }
    }

    #[tokio::test]
    async fn classify_round_trip_carries_id() {
        let reg = Arc::new(PipelineRegistry::new(Arc::new(MockFactory::default())));
        let (h, mut rx, _j) = spawn_worker(reg, SummaryParams::default(), 4);
        h.submit(Request::ClassifyHeadline {
            id: "g-1".into(),
            text: "Stocks rally".into(),
        })
        .await
        .unwrap();

        match next_terminal(&mut rx).await {
            WorkerEvent::Complete(Response::Sentiment { id, score, .. }) => {
                assert_eq!(id, "g-1");
                assert!(score > 0.9);
            }
            other => panic!("unexpected event: {other:?}"),
        }
    }

    #[tokio::test]
    async fn feed_summary_has_no_story_id() {
        let reg = Arc::new(PipelineRegistry::new(Arc::new(MockFactory::default())));
        let (h, mut rx, _j) = spawn_worker(reg, SummaryParams::default(), 4);
        h.submit(Request::SummarizeFeed {
            text: "A. B.".into(),
        })
        .await
        .unwrap();
        let ev = next_terminal(&mut rx).await;
        assert_eq!(
            ev,
            WorkerEvent::Complete(Response::FeedSummary {
                summary: "Mock summary.".into()
            })
        );
    }

    #[tokio::test]
    async fn disabled_models_surface_errors() {
        let reg = Arc::new(PipelineRegistry::new(Arc::new(DisabledFactory)));
        let (h, mut rx, _j) = spawn_worker(reg, SummaryParams::default(), 4);
        h.submit(Request::SummarizeArticle {
            id: "7".into(),
            text: "x".into(),
        })
        .await
        .unwrap();
        match next_terminal(&mut rx).await {
            WorkerEvent::Error {
                task, correlation, ..
            } => {
                assert_eq!(task, Task::Summarization);
                assert_eq!(correlation, Correlation::Story("7".into()));
            }
            other => panic!("unexpected event: {other:?}"),
        }
    }
}
