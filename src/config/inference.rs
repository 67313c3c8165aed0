// src/config/inference.rs
use serde::{Deserialize, Serialize};
use std::{env, fs, path::Path};

pub const DEFAULT_INFERENCE_CONFIG_PATH: &str = "config/inference.json";
pub const ENV_INFERENCE_CONFIG_PATH: &str = "INFERENCE_CONFIG_PATH";

fn default_provider() -> String {
    "local".to_string()
}
fn default_classifier_model() -> String {
    "distilbert-base-uncased-finetuned-sst-2-english".to_string()
}
fn default_summarizer_model() -> String {
    "sshleifer/distilbart-cnn-6-6".to_string()
}
fn default_endpoint() -> String {
    "https://api-inference.huggingface.co/models".to_string()
}
fn default_max_new_tokens() -> u32 {
    150
}
fn default_min_length() -> u32 {
    30
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InferenceConfig {
    pub enabled: bool,
    /// "hosted" | "local" (case-insensitive)
    #[serde(default = "default_provider")]
    pub provider: String,
    /// "ENV" means: read from HF_API_TOKEN
    #[serde(default)]
    pub api_key: String,
    #[serde(default = "default_endpoint")]
    pub endpoint: String,
    #[serde(default = "default_classifier_model")]
    pub classifier_model: String,
    #[serde(default = "default_summarizer_model")]
    pub summarizer_model: String,
    #[serde(default = "default_max_new_tokens")]
    pub max_new_tokens: u32,
    #[serde(default = "default_min_length")]
    pub min_length: u32,
}

impl Default for InferenceConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            provider: default_provider(),
            api_key: String::new(),
            endpoint: default_endpoint(),
            classifier_model: default_classifier_model(),
            summarizer_model: default_summarizer_model(),
            max_new_tokens: default_max_new_tokens(),
            min_length: default_min_length(),
        }
    }
}

impl InferenceConfig {
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let data = fs::read_to_string(path)?;
        Self::from_json_str(&data)
    }

    pub fn from_json_str(data: &str) -> anyhow::Result<Self> {
        let mut cfg: InferenceConfig = serde_json::from_str(data)?;

        cfg.provider = cfg.provider.trim().to_lowercase();
        match cfg.provider.as_str() {
            "hosted" | "local" => {}
            other => anyhow::bail!("Unsupported provider in config: {other}"),
        }

        if cfg.api_key.trim().eq_ignore_ascii_case("env") {
            cfg.api_key = env::var("HF_API_TOKEN").unwrap_or_default();
            // only the hosted provider needs a token
            if cfg.api_key.is_empty() && cfg.provider == "hosted" {
                anyhow::bail!("Missing HF_API_TOKEN env var");
            }
        }

        if cfg.min_length > cfg.max_new_tokens {
            std::mem::swap(&mut cfg.min_length, &mut cfg.max_new_tokens);
        }

        Ok(cfg)
    }

    /// `$INFERENCE_CONFIG_PATH` or `config/inference.json`; any failure → local defaults.
    pub fn load_default() -> Self {
        let path = env::var(ENV_INFERENCE_CONFIG_PATH)
            .unwrap_or_else(|_| DEFAULT_INFERENCE_CONFIG_PATH.to_string());
        match Self::load_from_file(&path) {
            Ok(cfg) => cfg,
            Err(e) => {
                tracing::warn!(error = %e, %path, "inference config unavailable, using local models");
                Self::default()
            }
        }
    }
}
