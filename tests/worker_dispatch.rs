// tests/worker_dispatch.rs
// Out-of-order completions must land on the story they were requested for.
use async_trait::async_trait;
use std::sync::Arc;
use std::time::{Duration, Instant};

use market_pulse::board::{PendingKind, StoryBoard};
use market_pulse::classify::{ModelLabel, Sentiment};
use market_pulse::config::SentimentMode;
use market_pulse::error::InferenceError;
use market_pulse::feed::assemble;
use market_pulse::feed::query::FeedQuery;
use market_pulse::feed::types::HeadlineItem;
use market_pulse::inference::registry::ProgressSink;
use market_pulse::inference::{
    spawn_worker, Correlation, ModelFactory, PipelineRegistry, Progress, Request, Response,
    SentimentModel, SentimentVerdict, SummaryModel, SummaryParams, WorkerEvent,
};

/// Headlines containing "slow" take longer; the label follows "up"/"down".
struct Staggered;

#[async_trait]
impl SentimentModel for Staggered {
    async fn classify_sentiment(&self, text: &str) -> Result<SentimentVerdict, InferenceError> {
        let delay = if text.contains("slow") { 250 } else { 10 };
        tokio::time::sleep(Duration::from_millis(delay)).await;
        let label = if text.contains("down") {
            ModelLabel::Negative
        } else {
            ModelLabel::Positive
        };
        Ok(SentimentVerdict { label, score: 0.95 })
    }
    fn name(&self) -> &'static str {
        "staggered"
    }
}

#[async_trait]
impl SummaryModel for Staggered {
    async fn summarize(&self, text: &str, _params: SummaryParams) -> Result<String, InferenceError> {
        Ok(format!("summary of {} chars", text.len()))
    }
    fn name(&self) -> &'static str {
        "staggered"
    }
}

struct StaggeredFactory;

#[async_trait]
impl ModelFactory for StaggeredFactory {
    async fn build_classifier(
        &self,
        progress: ProgressSink<'_>,
    ) -> Result<Arc<dyn SentimentModel>, InferenceError> {
        progress(Progress::Download {
            file: "model.bin".into(),
            loaded: 50,
            total: 100,
        });
        progress(Progress::Ready);
        Ok(Arc::new(Staggered))
    }

    async fn build_summarizer(
        &self,
        _progress: ProgressSink<'_>,
    ) -> Result<Arc<dyn SummaryModel>, InferenceError> {
        Ok(Arc::new(Staggered))
    }

    fn name(&self) -> &'static str {
        "staggered"
    }
}

fn board(titles: &[&str]) -> StoryBoard {
    let items: Vec<HeadlineItem> = titles
        .iter()
        .enumerate()
        .map(|(i, t)| HeadlineItem {
            title: Some(t.to_string()),
            link: Some(format!("https://news.test/{i}")),
            published_at: None,
            guid: Some(format!("n{i}")),
        })
        .collect();
    let b = StoryBoard::new(0.6, Duration::from_secs(3));
    b.replace(
        FeedQuery::default(),
        assemble(&items, 30, SentimentMode::Deferred, chrono::Utc::now()),
        Instant::now(),
    );
    b
}

#[tokio::test]
async fn completions_out_of_order_restamp_by_id() {
    let b = board(&["slow chipmaker down day", "retailer up day", "bank slow up day"]);
    let reg = Arc::new(PipelineRegistry::new(Arc::new(StaggeredFactory)));
    let (h, mut rx, _j) = spawn_worker(reg.clone(), SummaryParams::default(), 8);

    for id in b.ids() {
        let story = b.get(&id).unwrap();
        b.mark_pending(Correlation::Story(id.clone()), PendingKind::Sentiment, Instant::now());
        h.submit(Request::ClassifyHeadline {
            id,
            text: story.title,
        })
        .await
        .unwrap();
    }

    let mut order = Vec::new();
    let mut saw_download = false;
    while order.len() < 3 {
        let ev = tokio::time::timeout(Duration::from_secs(5), rx.recv())
            .await
            .expect("worker answered in time")
            .expect("worker alive");
        if let WorkerEvent::Progress {
            stage: Progress::Download { .. },
            ..
        } = &ev
        {
            saw_download = true;
        }
        if let WorkerEvent::Complete(Response::Sentiment { id, .. }) = &ev {
            order.push(id.clone());
        }
        b.apply(&ev, Instant::now());
    }

    assert!(saw_download, "first use reports loading progress");
    assert_eq!(order[0], "n1-1", "fast request finishes first");
    assert_eq!(reg.build_count(), 1);

    assert_eq!(b.get("n0-0").unwrap().sentiment, Sentiment::Bearish);
    assert_eq!(b.get("n1-1").unwrap().sentiment, Sentiment::Bullish);
    let bank = b.get("n2-2").unwrap();
    assert_eq!(bank.sentiment, Sentiment::Bullish);
    assert_eq!(bank.impact_label, "Economic Tailwind");
    assert!(b.status().pending.is_empty());
}

#[tokio::test]
async fn results_for_replaced_board_are_dropped() {
    let b = board(&["retailer up day"]);
    let reg = Arc::new(PipelineRegistry::new(Arc::new(StaggeredFactory)));
    let (h, mut rx, _j) = spawn_worker(reg, SummaryParams::default(), 8);

    h.submit(Request::ClassifyHeadline {
        id: "n0-0".into(),
        text: "retailer up day".into(),
    })
    .await
    .unwrap();
    // selection changes before the answer arrives
    b.replace(FeedQuery::default(), Vec::new(), Instant::now());

    loop {
        let ev = rx.recv().await.unwrap();
        if matches!(ev, WorkerEvent::Complete(_)) {
            assert!(!b.apply(&ev, Instant::now()));
            break;
        }
    }
    assert!(b.get("n0-0").is_none());
}

#[tokio::test]
async fn article_and_feed_summaries_are_distinct() {
    let b = board(&["retailer up day"]);
    let reg = Arc::new(PipelineRegistry::new(Arc::new(StaggeredFactory)));
    let (h, mut rx, _j) = spawn_worker(reg, SummaryParams::default(), 8);

    h.submit(Request::SummarizeArticle {
        id: "n0-0".into(),
        text: "abcd".into(),
    })
    .await
    .unwrap();
    h.submit(Request::SummarizeFeed { text: "ab".into() }).await.unwrap();

    let mut done = 0;
    while done < 2 {
        let ev = rx.recv().await.unwrap();
        if matches!(ev, WorkerEvent::Complete(_)) {
            done += 1;
        }
        b.apply(&ev, Instant::now());
    }
    assert_eq!(
        b.get("n0-0").unwrap().summary.as_deref(),
        Some("summary of 4 chars")
    );
    assert_eq!(b.feed_summary().as_deref(), Some("summary of 2 chars"));
}
