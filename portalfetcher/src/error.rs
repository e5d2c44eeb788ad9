use dashstore::errors::DataError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum FetcherError {
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("backend returned HTTP {status}: {body}")]
    Api { status: u16, body: String },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),
}

pub type Result<T> = std::result::Result<T, FetcherError>;

const BODY_EXCERPT_CHARS: usize = 200;

impl FetcherError {
    pub fn api(status: u16, body: &str) -> Self {
        let body = body.trim();
        let body = match body.char_indices().nth(BODY_EXCERPT_CHARS) {
            Some((cut, _)) => format!("{}...", &body[..cut]),
            None => body.to_string(),
        };
        FetcherError::Api { status, body }
    }

    pub fn status(&self) -> Option<u16> {
        match self {
            FetcherError::Api { status, .. } => Some(*status),
            FetcherError::Request(err) => err.status().map(|status| status.as_u16()),
            _ => None,
        }
    }
}

impl From<FetcherError> for DataError {
    fn from(err: FetcherError) -> Self {
        match err.status() {
            Some(404) => DataError::NotFound(err.to_string()),
            _ => DataError::Network(err.to_string()),
        }
    }
}
