//! In-memory story collection for the current selection.
//!
//! Holds the stories of one country/time selection plus the derived state
//! written by the inference worker (refined sentiment, summaries) and the
//! pending indicators shown while requests are in flight. A new selection
//! replaces everything wholesale. Results are applied by story id; results
//! for ids that are no longer on the board are dropped.

use serde::Serialize;
use std::collections::HashMap;
use std::sync::RwLock;
use std::time::{Duration, Instant};

use crate::classify::refine;
use crate::feed::query::{FeedQuery, Topic};
use crate::feed::types::Story;
use crate::inference::{Correlation, Progress, Response, Task, WorkerEvent};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PendingKind {
    Sentiment,
    Summary,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct PendingKey {
    target: Correlation,
    kind: PendingKind,
}

#[derive(Debug, Clone, Copy)]
struct Pending {
    since: Instant,
    /// Set after a worker error: clear at this instant regardless of `since`.
    clear_at: Option<Instant>,
}

/// Status line shown to the user. Worker errors carry `clear_at` and
/// outrank progress messages until then.
#[derive(Debug, Clone)]
struct StatusLine {
    text: String,
    clear_at: Option<Instant>,
}

impl StatusLine {
    fn holds_error(&self, now: Instant) -> bool {
        self.clear_at.is_some_and(|t| now < t)
    }
}

#[derive(Debug, Default)]
struct BoardState {
    query: Option<FeedQuery>,
    fetched_at: Option<Instant>,
    stories: Vec<Story>,
    pending: HashMap<PendingKey, Pending>,
    feed_summary: Option<String>,
    status: Option<StatusLine>,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq, PartialOrd, Ord)]
pub struct PendingView {
    pub target: Correlation,
    pub kind: PendingKind,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct BoardStatus {
    pub query: Option<FeedQuery>,
    pub stories: usize,
    pub message: Option<String>,
    pub pending: Vec<PendingView>,
}

#[derive(Debug)]
pub struct StoryBoard {
    inner: RwLock<BoardState>,
    neutral_band: f32,
    error_clear: Duration,
}

impl StoryBoard {
    pub fn new(neutral_band: f32, error_clear: Duration) -> Self {
        Self {
            inner: RwLock::new(BoardState::default()),
            neutral_band,
            error_clear,
        }
    }

    /// True if `query` is on the board and was fetched less than `max_age` ago.
    /// An empty board is never fresh, so a failed fetch is retried.
    pub fn is_fresh(&self, query: &FeedQuery, max_age: Duration, now: Instant) -> bool {
        let g = self.inner.read().expect("board lock poisoned");
        g.query.as_ref() == Some(query)
            && !g.stories.is_empty()
            && g.fetched_at
                .is_some_and(|t| now.saturating_duration_since(t) < max_age)
    }

    /// Replace the whole board with a fresh selection.
    pub fn replace(&self, query: FeedQuery, stories: Vec<Story>, now: Instant) {
        let mut g = self.inner.write().expect("board lock poisoned");
        *g = BoardState {
            query: Some(query),
            fetched_at: Some(now),
            stories,
            pending: HashMap::new(),
            feed_summary: None,
            status: g.status.take(),
        };
    }

    pub fn snapshot(&self, topic: Topic) -> Vec<Story> {
        let g = self.inner.read().expect("board lock poisoned");
        g.stories
            .iter()
            .filter(|s| topic.admits(s.factor))
            .cloned()
            .collect()
    }

    pub fn get(&self, id: &str) -> Option<Story> {
        let g = self.inner.read().expect("board lock poisoned");
        g.stories.iter().find(|s| s.id == id).cloned()
    }

    pub fn ids(&self) -> Vec<String> {
        let g = self.inner.read().expect("board lock poisoned");
        g.stories.iter().map(|s| s.id.clone()).collect()
    }

    /// Titles of the first `n` stories joined into one text blob.
    pub fn top_headlines(&self, n: usize) -> String {
        let g = self.inner.read().expect("board lock poisoned");
        g.stories
            .iter()
            .take(n)
            .map(|s| s.title.trim_end_matches(['.', '!', '?', ' ']).to_string())
            .filter(|t| !t.is_empty())
            .map(|t| format!("{t}."))
            .collect::<Vec<_>>()
            .join(" ")
    }

    pub fn feed_summary(&self) -> Option<String> {
        self.inner
            .read()
            .expect("board lock poisoned")
            .feed_summary
            .clone()
    }

    /// Mark an indicator as pending. Returns false for an unknown story id.
    pub fn mark_pending(&self, target: Correlation, kind: PendingKind, now: Instant) -> bool {
        let mut g = self.inner.write().expect("board lock poisoned");
        if let Correlation::Story(id) = &target {
            if !g.stories.iter().any(|s| &s.id == id) {
                return false;
            }
        }
        g.pending.insert(
            PendingKey { target, kind },
            Pending {
                since: now,
                clear_at: None,
            },
        );
        true
    }

    pub fn is_pending(&self, target: &Correlation, kind: PendingKind) -> bool {
        let g = self.inner.read().expect("board lock poisoned");
        g.pending.contains_key(&PendingKey {
            target: target.clone(),
            kind,
        })
    }

    /// Store a summary text directly (used for the extraction placeholder).
    pub fn set_summary(&self, id: &str, summary: String) -> bool {
        let mut g = self.inner.write().expect("board lock poisoned");
        let key = PendingKey {
            target: Correlation::Story(id.to_string()),
            kind: PendingKind::Summary,
        };
        g.pending.remove(&key);
        match g.stories.iter_mut().find(|s| s.id == id) {
            Some(story) => {
                story.summary = Some(summary);
                true
            }
            None => false,
        }
    }

    /// Apply one worker event. Returns true if a story or summary changed.
    pub fn apply(&self, event: &WorkerEvent, now: Instant) -> bool {
        let mut g = self.inner.write().expect("board lock poisoned");
        match event {
            WorkerEvent::Progress { task, stage, .. } => {
                if g.status.as_ref().is_some_and(|s| s.holds_error(now)) {
                    return false;
                }
                let text = match stage {
                    Progress::Initiate => None,
                    Progress::Download {
                        file,
                        loaded,
                        total,
                    } => {
                        let pct = if *total == 0 {
                            0
                        } else {
                            loaded.saturating_mul(100) / total
                        };
                        Some(format!("Loading {} model ({file}: {pct}%)", task.as_str()))
                    }
                    Progress::Ready => Some(format!("{} model ready", task.as_str())),
                    Progress::Done => None,
                };
                g.status = text.map(|text| StatusLine {
                    text,
                    clear_at: None,
                });
                false
            }
            WorkerEvent::Complete(resp) => {
                let changed = match resp {
                    Response::Sentiment { id, label, score } => {
                        match g.stories.iter_mut().find(|s| &s.id == id) {
                            Some(story) => {
                                let cls = refine(story.factor, *label, *score, self.neutral_band);
                                story.sentiment = cls.sentiment;
                                story.impact_label = cls.impact_label.to_string();
                                story.refined_score = Some(*score);
                                true
                            }
                            None => false,
                        }
                    }
                    Response::ArticleSummary { id, summary } => {
                        match g.stories.iter_mut().find(|s| &s.id == id) {
                            Some(story) => {
                                story.summary = Some(summary.clone());
                                true
                            }
                            None => false,
                        }
                    }
                    Response::FeedSummary { summary } => {
                        g.feed_summary = Some(summary.clone());
                        true
                    }
                };
                let key = PendingKey {
                    target: resp.correlation(),
                    kind: kind_of(resp),
                };
                g.pending.remove(&key);
                if !changed {
                    tracing::debug!(target: "inference", correlation = ?key.target, "result for a story no longer on the board");
                }
                changed
            }
            WorkerEvent::Error {
                task,
                correlation,
                error,
            } => {
                let clear_at = now + self.error_clear;
                g.status = Some(StatusLine {
                    text: format!("{} failed: {error}", task.as_str()),
                    clear_at: Some(clear_at),
                });
                let key = PendingKey {
                    target: correlation.clone(),
                    kind: kind_for_task(*task),
                };
                if let Some(p) = g.pending.get_mut(&key) {
                    p.clear_at = Some(clear_at);
                }
                false
            }
        }
    }

    /// Drop pending indicators that timed out or were scheduled for clearing,
    /// and an expired error status. Returns how many indicators were removed.
    pub fn sweep(&self, now: Instant, pending_timeout: Duration) -> usize {
        let mut g = self.inner.write().expect("board lock poisoned");
        if g
            .status
            .as_ref()
            .is_some_and(|s| s.clear_at.is_some_and(|t| now >= t))
        {
            g.status = None;
        }
        let before = g.pending.len();
        g.pending.retain(|_, p| {
            let timed_out = now.saturating_duration_since(p.since) >= pending_timeout;
            let cleared = p.clear_at.is_some_and(|t| now >= t);
            !(timed_out || cleared)
        });
        before - g.pending.len()
    }

    pub fn status(&self) -> BoardStatus {
        let g = self.inner.read().expect("board lock poisoned");
        let mut pending: Vec<PendingView> = g
            .pending
            .keys()
            .map(|k| PendingView {
                target: k.target.clone(),
                kind: k.kind,
            })
            .collect();
        pending.sort();
        BoardStatus {
            query: g.query,
            stories: g.stories.len(),
            message: g.status.as_ref().map(|s| s.text.clone()),
            pending,
        }
    }
}

fn kind_for_task(task: Task) -> PendingKind {
    match task {
        Task::TextClassification => PendingKind::Sentiment,
        Task::Summarization => PendingKind::Summary,
    }
}

fn kind_of(resp: &Response) -> PendingKind {
    match resp {
        Response::Sentiment { .. } => PendingKind::Sentiment,
        Response::ArticleSummary { .. } | Response::FeedSummary { .. } => PendingKind::Summary,
    }
}
