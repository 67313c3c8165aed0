use std::str::FromStr;
use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tower_http::cors::CorsLayer;

use crate::article::resolve::PageFetcher;
use crate::article::{fetch_article_text, EXTRACT_FAILED};
use crate::board::{BoardStatus, PendingKind, StoryBoard};
use crate::config::DashboardConfig;
use crate::feed::fetch_finance_news;
use crate::feed::query::{Country, FeedQuery, TimeFilter, Topic};
use crate::feed::types::{FeedSource, Story};
use crate::inference::{
    spawn_worker, Correlation, ModelFactory, PipelineRegistry, Request, SummaryParams, WorkerHandle,
};

#[derive(Clone)]
pub struct AppState {
    cfg: Arc<DashboardConfig>,
    feed: Arc<dyn FeedSource>,
    fetcher: Arc<dyn PageFetcher>,
    board: Arc<StoryBoard>,
    worker: WorkerHandle,
    fetch_lock: Arc<Mutex<()>>,
}

impl AppState {
    /// Spawn the inference worker, the event pump and the pending sweeper.
    /// Must be called from inside a tokio runtime.
    pub fn start(
        cfg: DashboardConfig,
        feed: Arc<dyn FeedSource>,
        fetcher: Arc<dyn PageFetcher>,
        factory: Arc<dyn ModelFactory>,
        params: SummaryParams,
    ) -> Self {
        let board = Arc::new(StoryBoard::new(
            cfg.worker.neutral_band,
            Duration::from_secs(cfg.worker.error_clear_secs),
        ));
        let registry = Arc::new(PipelineRegistry::new(factory));
        let (worker, mut events, _join) = spawn_worker(registry, params, cfg.worker.queue_depth);

        let pump_board = board.clone();
        tokio::spawn(async move {
            while let Some(ev) = events.recv().await {
                pump_board.apply(&ev, Instant::now());
            }
        });

        let sweep_board = board.clone();
        let pending_timeout = Duration::from_secs(cfg.worker.pending_timeout_secs);
        tokio::spawn(async move {
            let mut tick = tokio::time::interval(Duration::from_millis(500));
            loop {
                tick.tick().await;
                let cleared = sweep_board.sweep(Instant::now(), pending_timeout);
                if cleared > 0 {
                    tracing::debug!(target: "inference", cleared, "pending indicators cleared");
                }
            }
        });

        Self {
            cfg: Arc::new(cfg),
            feed,
            fetcher,
            board,
            worker,
            fetch_lock: Arc::new(Mutex::new(())),
        }
    }

    /// Make sure the board holds `query`, fetching it when stale or different.
    async fn ensure_selection(&self, query: FeedQuery) {
        let max_age = Duration::from_secs(self.cfg.feed.revalidate_secs);
        if self.board.is_fresh(&query, max_age, Instant::now()) {
            return;
        }
        let _guard = self.fetch_lock.lock().await;
        if self.board.is_fresh(&query, max_age, Instant::now()) {
            return;
        }
        let stories = fetch_finance_news(
            self.feed.as_ref(),
            &query,
            self.cfg.feed.max_items,
            self.cfg.feed.sentiment_mode,
        )
        .await;
        self.board.replace(query, stories, Instant::now());
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(|| async { "OK" }))
        .route("/api/stories", get(list_stories))
        .route("/api/stories/refine-all", post(refine_all))
        .route("/api/stories/{id}/refine", post(refine_story))
        .route("/api/stories/{id}/summary", post(summarize_story))
        .route("/api/summary/feed", post(summarize_feed).get(feed_summary))
        .route("/api/status", get(status))
        .layer(CorsLayer::very_permissive())
        .with_state(state)
}

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("{0}")]
    BadRequest(String),
    #[error("unknown story id: {0}")]
    NotFound(String),
    #[error("no stories loaded")]
    NoStories,
    #[error("inference worker unavailable")]
    WorkerUnavailable,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::NoStories => StatusCode::CONFLICT,
            ApiError::WorkerUnavailable => StatusCode::SERVICE_UNAVAILABLE,
        };
        (status, Json(serde_json::json!({ "error": self.to_string() }))).into_response()
    }
}

/// Selectors arrive as raw strings and go through `FromStr`, which is
/// case-insensitive (`?country=US` works).
#[derive(Deserialize, Default)]
struct StoriesParams {
    country: Option<String>,
    time: Option<String>,
    topic: Option<String>,
}

fn selector<T>(raw: Option<&str>) -> Result<T, ApiError>
where
    T: FromStr<Err = anyhow::Error> + Default,
{
    match raw.map(str::trim).filter(|s| !s.is_empty()) {
        Some(s) => s.parse().map_err(|e: anyhow::Error| ApiError::BadRequest(e.to_string())),
        None => Ok(T::default()),
    }
}

#[derive(Serialize)]
struct StoriesResp {
    query: FeedQuery,
    topic: Topic,
    count: usize,
    stories: Vec<Story>,
}

async fn list_stories(
    State(state): State<AppState>,
    Query(p): Query<StoriesParams>,
) -> Result<Json<StoriesResp>, ApiError> {
    let country: Country = selector(p.country.as_deref())?;
    let time: TimeFilter = selector(p.time.as_deref())?;
    let topic: Topic = selector(p.topic.as_deref())?;
    let query = FeedQuery::new(country, time);
    state.ensure_selection(query).await;
    let stories = state.board.snapshot(topic);
    Ok(Json(StoriesResp {
        query,
        topic,
        count: stories.len(),
        stories,
    }))
}

#[derive(Serialize)]
struct Queued {
    queued: Vec<String>,
}

fn accepted(ids: Vec<String>) -> (StatusCode, Json<Queued>) {
    (StatusCode::ACCEPTED, Json(Queued { queued: ids }))
}

async fn queue_refinement(state: &AppState, story: &Story) -> Result<(), ApiError> {
    state.board.mark_pending(
        Correlation::Story(story.id.clone()),
        PendingKind::Sentiment,
        Instant::now(),
    );
    state
        .worker
        .submit(Request::ClassifyHeadline {
            id: story.id.clone(),
            text: story.title.clone(),
        })
        .await
        .map_err(|_| ApiError::WorkerUnavailable)
}

async fn refine_story(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let story = state.board.get(&id).ok_or_else(|| ApiError::NotFound(id.clone()))?;
    queue_refinement(&state, &story).await?;
    Ok(accepted(vec![id]))
}

async fn refine_all(State(state): State<AppState>) -> Result<impl IntoResponse, ApiError> {
    let stories = state.board.snapshot(Topic::All);
    let mut ids = Vec::with_capacity(stories.len());
    for story in &stories {
        queue_refinement(&state, story).await?;
        ids.push(story.id.clone());
    }
    Ok(accepted(ids))
}

async fn summarize_story(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let story = state.board.get(&id).ok_or_else(|| ApiError::NotFound(id.clone()))?;
    state.board.mark_pending(
        Correlation::Story(id.clone()),
        PendingKind::Summary,
        Instant::now(),
    );

    // Resolution and extraction can take several round trips; answer now.
    let bg = state.clone();
    tokio::spawn(async move {
        let text = fetch_article_text(bg.fetcher.as_ref(), &story.link, &bg.cfg.article).await;
        if text == EXTRACT_FAILED {
            bg.board.set_summary(&story.id, text);
            return;
        }
        let req = Request::SummarizeArticle {
            id: story.id.clone(),
            text,
        };
        if bg.worker.submit(req).await.is_err() {
            tracing::warn!(target: "inference", id = %story.id, "worker closed, summary dropped");
        }
    });

    Ok(accepted(vec![id]))
}

async fn summarize_feed(State(state): State<AppState>) -> Result<impl IntoResponse, ApiError> {
    let text = state
        .board
        .top_headlines(state.cfg.worker.feed_summary_headlines);
    if text.is_empty() {
        return Err(ApiError::NoStories);
    }
    state
        .board
        .mark_pending(Correlation::Feed, PendingKind::Summary, Instant::now());
    state
        .worker
        .submit(Request::SummarizeFeed { text })
        .await
        .map_err(|_| ApiError::WorkerUnavailable)?;
    Ok(accepted(Vec::new()))
}

#[derive(Serialize)]
struct FeedSummaryResp {
    summary: Option<String>,
    pending: bool,
}

async fn feed_summary(State(state): State<AppState>) -> Json<FeedSummaryResp> {
    Json(FeedSummaryResp {
        summary: state.board.feed_summary(),
        pending: state
            .board
            .is_pending(&Correlation::Feed, PendingKind::Summary),
    })
}

async fn status(State(state): State<AppState>) -> Json<BoardStatus> {
    Json(state.board.status())
}
