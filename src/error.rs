//! Typed errors for the network and model boundaries.

use thiserror::Error;

/// A single page fetch failed.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FetchError {
    /// Connection, TLS, timeout or redirect-policy failure.
    #[error("transport error: {0}")]
    Transport(String),

    /// Non-success HTTP status after redirects.
    #[error("HTTP {status} from {url}")]
    Status { status: u16, url: String },

    /// Response body could not be read as text.
    #[error("body error: {0}")]
    Body(String),
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ExtractError {
    #[error("no content captured")]
    EmptyDocument,

    #[error("no readable article body")]
    NoReadableContent,

    #[error("extracted text too short: {len} < {min} chars")]
    TooShort { len: usize, min: usize },
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum InferenceError {
    #[error("inference disabled")]
    Disabled,

    #[error("model unavailable: {0}")]
    Unavailable(String),

    #[error("inference http error: {0}")]
    Http(String),

    #[error("unexpected model output: {0}")]
    BadResponse(String),
}

impl From<reqwest::Error> for FetchError {
    fn from(e: reqwest::Error) -> Self {
        FetchError::Transport(e.to_string())
    }
}

impl From<reqwest::Error> for InferenceError {
    fn from(e: reqwest::Error) -> Self {
        InferenceError::Http(e.to_string())
    }
}
