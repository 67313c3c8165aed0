//! Capability providers: hosted inference API, offline fallbacks, mock.
//!
//! Factory selection (see [`build_factory_from_config`]):
//! * `INFERENCE_TEST_MODE=mock` → [`MockFactory`]
//! * `enabled == false` → [`DisabledFactory`] (every build fails)
//! * `provider == "hosted"` → [`HostedFactory`]
//! * otherwise → [`LocalFactory`]

use async_trait::async_trait;
use once_cell::sync::Lazy;
use serde::Serialize;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use super::registry::{ModelFactory, ProgressSink};
use super::{Progress, SentimentModel, SentimentVerdict, SummaryModel, SummaryParams};
use crate::classify::ModelLabel;
use crate::config::InferenceConfig;
use crate::error::InferenceError;

pub type DynFactory = Arc<dyn ModelFactory>;

pub fn build_factory_from_config(cfg: &InferenceConfig) -> DynFactory {
    if std::env::var("INFERENCE_TEST_MODE")
        .map(|v| v == "mock")
        .unwrap_or(false)
    {
        return Arc::new(MockFactory::default());
    }
    if !cfg.enabled {
        return Arc::new(DisabledFactory);
    }
    match cfg.provider.as_str() {
        "hosted" => match HostedFactory::new(cfg) {
            Ok(f) => Arc::new(f),
            Err(e) => {
                tracing::warn!(target: "inference", error = %e, "hosted factory unavailable, using local models");
                Arc::new(LocalFactory)
            }
        },
        _ => Arc::new(LocalFactory),
    }
}

// ------------------------------------------------------------
// Hosted inference (Hugging Face Inference API)
// ------------------------------------------------------------

pub struct HostedFactory {
    http: reqwest::Client,
    endpoint: String,
    api_key: String,
    classifier_model: String,
    summarizer_model: String,
}

impl HostedFactory {
    pub fn new(cfg: &InferenceConfig) -> Result<Self, InferenceError> {
        let http = reqwest::Client::builder()
            .user_agent("market-pulse/0.1")
            .connect_timeout(Duration::from_secs(5))
            .timeout(Duration::from_secs(60))
            .build()?;
        Ok(Self {
            http,
            endpoint: cfg.endpoint.trim_end_matches('/').to_string(),
            api_key: cfg.api_key.clone(),
            classifier_model: cfg.classifier_model.clone(),
            summarizer_model: cfg.summarizer_model.clone(),
        })
    }

    fn model_url(&self, model: &str) -> String {
        format!("{}/{}", self.endpoint, model)
    }

    fn client_for(&self, model: &str, progress: ProgressSink<'_>) -> HostedModel {
        progress(Progress::Initiate);
        // Remote models have nothing to download; report the handle as one unit.
        progress(Progress::Download {
            file: model.to_string(),
            loaded: 1,
            total: 1,
        });
        progress(Progress::Ready);
        HostedModel {
            http: self.http.clone(),
            url: self.model_url(model),
            api_key: self.api_key.clone(),
        }
    }
}

#[async_trait]
impl ModelFactory for HostedFactory {
    async fn build_classifier(
        &self,
        progress: ProgressSink<'_>,
    ) -> Result<Arc<dyn SentimentModel>, InferenceError> {
        Ok(Arc::new(self.client_for(&self.classifier_model, progress)))
    }

    async fn build_summarizer(
        &self,
        progress: ProgressSink<'_>,
    ) -> Result<Arc<dyn SummaryModel>, InferenceError> {
        Ok(Arc::new(self.client_for(&self.summarizer_model, progress)))
    }

    fn name(&self) -> &'static str {
        "hosted"
    }
}

pub struct HostedModel {
    http: reqwest::Client,
    url: String,
    api_key: String,
}

impl HostedModel {
    async fn post<B: Serialize + Sync>(&self, body: &B) -> Result<Value, InferenceError> {
        let mut req = self.http.post(&self.url).json(body);
        if !self.api_key.is_empty() {
            req = req.bearer_auth(&self.api_key);
        }
        let resp = req.send().await?;
        let status = resp.status();
        if status == reqwest::StatusCode::SERVICE_UNAVAILABLE {
            return Err(InferenceError::Unavailable(format!("{} is loading", self.url)));
        }
        if !status.is_success() {
            return Err(InferenceError::Http(format!("HTTP {status} from {}", self.url)));
        }
        Ok(resp.json::<Value>().await?)
    }
}

/// `[[{label, score}, ...]]` or `[{label, score}, ...]` → highest-scoring verdict.
pub fn parse_classification(v: &Value) -> Result<SentimentVerdict, InferenceError> {
    let rows = match v.as_array() {
        Some(outer) if outer.first().is_some_and(Value::is_array) => {
            outer.first().and_then(Value::as_array)
        }
        Some(outer) => Some(outer),
        None => None,
    }
    .ok_or_else(|| InferenceError::BadResponse(v.to_string()))?;

    rows.iter()
        .filter_map(|row| {
            let label = match row.get("label")?.as_str()?.to_ascii_uppercase().as_str() {
                "POSITIVE" | "LABEL_1" => ModelLabel::Positive,
                "NEGATIVE" | "LABEL_0" => ModelLabel::Negative,
                _ => return None,
            };
            let score = row.get("score")?.as_f64()? as f32;
            Some(SentimentVerdict { label, score })
        })
        .max_by(|a, b| a.score.total_cmp(&b.score))
        .ok_or_else(|| InferenceError::BadResponse(v.to_string()))
}

/// `[{summary_text}]` → summary.
pub fn parse_summary(v: &Value) -> Result<String, InferenceError> {
    v.as_array()
        .and_then(|a| a.first())
        .and_then(|o| o.get("summary_text"))
        .and_then(Value::as_str)
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .ok_or_else(|| InferenceError::BadResponse(v.to_string()))
}

#[async_trait]
impl SentimentModel for HostedModel {
    async fn classify_sentiment(&self, text: &str) -> Result<SentimentVerdict, InferenceError> {
        #[derive(Serialize)]
        struct Req<'a> {
            inputs: &'a str,
        }
        let v = self.post(&Req { inputs: text }).await?;
        parse_classification(&v)
    }

    fn name(&self) -> &'static str {
        "hosted-classifier"
    }
}

#[async_trait]
impl SummaryModel for HostedModel {
    async fn summarize(&self, text: &str, params: SummaryParams) -> Result<String, InferenceError> {
        #[derive(Serialize)]
        struct Params {
            max_length: u32,
            min_length: u32,
        }
        #[derive(Serialize)]
        struct Req<'a> {
            inputs: &'a str,
            parameters: Params,
        }
        let req = Req {
            inputs: text,
            parameters: Params {
                max_length: params.max_new_tokens,
                min_length: params.min_length,
            },
        };
        let v = self.post(&req).await?;
        parse_summary(&v)
    }

    fn name(&self) -> &'static str {
        "hosted-summarizer"
    }
}

// ------------------------------------------------------------
// Offline models
// ------------------------------------------------------------

static LEXICON: Lazy<HashMap<String, i32>> = Lazy::new(|| {
    let raw = include_str!("../../sentiment_lexicon.json");
    serde_json::from_str::<HashMap<String, i32>>(raw).unwrap_or_default()
});

/// Lexicon scorer with short-range negation.
#[derive(Debug, Clone, Default)]
pub struct LexiconSentiment;

impl LexiconSentiment {
    /// Returns (raw score, token count). A negator within the previous three
    /// tokens flips the sign of a word's lexicon score.
    pub fn score_text(&self, text: &str) -> (i32, usize) {
        let tokens: Vec<String> = tokenize(text).collect();
        let mut score = 0i32;
        for i in 0..tokens.len() {
            let base = *LEXICON.get(tokens[i].as_str()).unwrap_or(&0);
            if base == 0 {
                continue;
            }
            let negated = (1..=3).any(|k| i >= k && is_negator(tokens[i - k].as_str()));
            score += if negated { -base } else { base };
        }
        (score, tokens.len())
    }

    /// Raw score squashed into a (0.5..1.0) confidence.
    pub fn verdict(&self, text: &str) -> SentimentVerdict {
        let (raw, _) = self.score_text(text);
        let label = if raw < 0 {
            ModelLabel::Negative
        } else {
            ModelLabel::Positive
        };
        let score = 0.5 + 0.5 * ((raw.unsigned_abs() as f32) / 2.0).tanh();
        SentimentVerdict { label, score }
    }
}

fn tokenize(s: &str) -> impl Iterator<Item = String> + '_ {
    s.split(|c: char| !(c.is_alphanumeric() || c == '\''))
        .filter(|t| !t.is_empty())
        .map(|t| t.to_lowercase())
}

fn is_negator(tok: &str) -> bool {
    matches!(
        tok,
        "not" | "no" | "never" | "isn't" | "wasn't" | "aren't" | "won't" | "can't" | "cannot"
            | "without" | "fails" | "failed"
    )
}

#[async_trait]
impl SentimentModel for LexiconSentiment {
    async fn classify_sentiment(&self, text: &str) -> Result<SentimentVerdict, InferenceError> {
        Ok(self.verdict(text))
    }

    fn name(&self) -> &'static str {
        "lexicon"
    }
}

/// Extractive summarizer: leading sentences, word count as token proxy.
#[derive(Debug, Clone, Default)]
pub struct LeadSummarizer;

impl LeadSummarizer {
    pub fn summarize_text(&self, text: &str, params: SummaryParams) -> String {
        let max = params.max_new_tokens.max(1) as usize;
        let min = params.min_length as usize;
        let mut out: Vec<String> = Vec::new();
        let mut words = 0usize;

        for sentence in split_sentences(text) {
            let n = sentence.split_whitespace().count();
            if words >= min && words + n > max {
                break;
            }
            if words + n > max {
                // Over-long sentence below the minimum: clip it to the budget.
                let clipped: Vec<&str> = sentence.split_whitespace().take(max - words).collect();
                out.push(clipped.join(" "));
                break;
            }
            out.push(sentence.to_string());
            words += n;
        }
        out.join(" ")
    }
}

fn split_sentences(text: &str) -> Vec<&str> {
    let mut out = Vec::new();
    let mut start = 0usize;
    let bytes = text.as_bytes();
    for (i, ch) in text.char_indices() {
        if matches!(ch, '.' | '!' | '?') {
            let next = bytes.get(i + 1).copied();
            if next.is_none() || next.is_some_and(|b| b.is_ascii_whitespace()) {
                let s = text[start..=i].trim();
                if !s.is_empty() {
                    out.push(s);
                }
                start = i + 1;
            }
        }
    }
    let tail = text[start..].trim();
    if !tail.is_empty() {
        out.push(tail);
    }
    out
}

#[async_trait]
impl SummaryModel for LeadSummarizer {
    async fn summarize(&self, text: &str, params: SummaryParams) -> Result<String, InferenceError> {
        let s = self.summarize_text(text, params);
        if s.is_empty() {
            Err(InferenceError::BadResponse("nothing to summarize".into()))
        } else {
            Ok(s)
        }
    }

    fn name(&self) -> &'static str {
        "lead"
    }
}

pub struct LocalFactory;

#[async_trait]
impl ModelFactory for LocalFactory {
    async fn build_classifier(
        &self,
        progress: ProgressSink<'_>,
    ) -> Result<Arc<dyn SentimentModel>, InferenceError> {
        progress(Progress::Initiate);
        let n = LEXICON.len() as u64;
        progress(Progress::Download {
            file: "sentiment_lexicon.json".into(),
            loaded: n,
            total: n,
        });
        if n == 0 {
            return Err(InferenceError::Unavailable("empty sentiment lexicon".into()));
        }
        progress(Progress::Ready);
        Ok(Arc::new(LexiconSentiment))
    }

    async fn build_summarizer(
        &self,
        progress: ProgressSink<'_>,
    ) -> Result<Arc<dyn SummaryModel>, InferenceError> {
        progress(Progress::Initiate);
        progress(Progress::Ready);
        Ok(Arc::new(LeadSummarizer))
    }

    fn name(&self) -> &'static str {
        "local"
    }
}

pub struct DisabledFactory;

#[async_trait]
impl ModelFactory for DisabledFactory {
    async fn build_classifier(
        &self,
        _progress: ProgressSink<'_>,
    ) -> Result<Arc<dyn SentimentModel>, InferenceError> {
        Err(InferenceError::Disabled)
    }

    async fn build_summarizer(
        &self,
        _progress: ProgressSink<'_>,
    ) -> Result<Arc<dyn SummaryModel>, InferenceError> {
        Err(InferenceError::Disabled)
    }

    fn name(&self) -> &'static str {
        "disabled"
    }
}

// ------------------------------------------------------------
// Mock (tests / local runs)
// ------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct MockFactory {
    pub verdict: SentimentVerdict,
    pub summary: String,
}

impl Default for MockFactory {
    fn default() -> Self {
        Self {
            verdict: SentimentVerdict {
                label: ModelLabel::Positive,
                score: 0.99,
            },
            summary: "Mock summary.".to_string(),
        }
    }
}

#[derive(Debug, Clone)]
struct MockModel {
    verdict: SentimentVerdict,
    summary: String,
}

#[async_trait]
impl SentimentModel for MockModel {
    async fn classify_sentiment(&self, _text: &str) -> Result<SentimentVerdict, InferenceError> {
        Ok(self.verdict)
    }
    fn name(&self) -> &'static str {
        "mock"
    }
}

#[async_trait]
impl SummaryModel for MockModel {
    async fn summarize(&self, _text: &str, _params: SummaryParams) -> Result<String, InferenceError> {
        Ok(self.summary.clone())
    }
    fn name(&self) -> &'static str {
        "mock"
    }
}

#[async_trait]
impl ModelFactory for MockFactory {
    async fn build_classifier(
        &self,
        progress: ProgressSink<'_>,
    ) -> Result<Arc<dyn SentimentModel>, InferenceError> {
        progress(Progress::Initiate);
        progress(Progress::Ready);
        Ok(Arc::new(MockModel {
            verdict: self.verdict,
            summary: self.summary.clone(),
        }))
    }

    async fn build_summarizer(
        &self,
        progress: ProgressSink<'_>,
    ) -> Result<Arc<dyn SummaryModel>, InferenceError> {
        progress(Progress::Initiate);
        progress(Progress::Ready);
        Ok(Arc::new(MockModel {
            verdict: self.verdict,
            summary: self.summary.clone(),
        }))
    }

    fn name(&self) -> &'static str {
        "mock"
    }
}
