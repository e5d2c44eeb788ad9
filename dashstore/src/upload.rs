use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use url::Url;

use crate::backend::{BlobFetcher, MediaUpload};
use crate::errors::{DataError, Result};
use crate::models::MediaKind;

pub const FALLBACK_CONTENT_TYPE: &str = "application/octet-stream";

/// A file the caller already holds in memory.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LocalFile {
    pub file_name: String,
    #[serde(default)]
    pub content_type: Option<String>,
    pub bytes: Vec<u8>,
}

/// Where the media for an upload comes from. A local file wins over a URL.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MediaSource {
    #[serde(default)]
    pub file: Option<LocalFile>,
    #[serde(default)]
    pub url: Option<String>,
}

impl MediaSource {
    pub fn from_file(file: LocalFile) -> Self {
        Self {
            file: Some(file),
            url: None,
        }
    }

    pub fn from_url(url: impl Into<String>) -> Self {
        Self {
            file: None,
            url: Some(url.into()),
        }
    }

    fn url(&self) -> Option<&str> {
        self.url
            .as_deref()
            .map(str::trim)
            .filter(|url| !url.is_empty())
    }

    /// Fails with a validation error when neither a file nor a URL is set.
    pub fn ensure_present(&self) -> Result<()> {
        if self.file.is_some() || self.url().is_some() {
            Ok(())
        } else {
            Err(DataError::Validation("missing media source".to_string()))
        }
    }
}

/// Turns a [`MediaSource`] into a submittable [`MediaUpload`].
///
/// Never retries: one failed fetch fails the call.
#[derive(Clone)]
pub struct UploadAdapter {
    fetcher: Arc<dyn BlobFetcher>,
}

impl UploadAdapter {
    pub fn new(fetcher: Arc<dyn BlobFetcher>) -> Self {
        Self { fetcher }
    }

    pub async fn prepare(
        &self,
        source: MediaSource,
        kind: MediaKind,
        caption: Option<String>,
    ) -> Result<MediaUpload> {
        source.ensure_present()?;
        let caption = caption.filter(|value| !value.trim().is_empty());

        if let Some(file) = source.file {
            return Ok(MediaUpload {
                file_name: file.file_name,
                content_type: file
                    .content_type
                    .unwrap_or_else(|| FALLBACK_CONTENT_TYPE.to_string()),
                bytes: file.bytes,
                kind,
                caption,
            });
        }

        let url = source.url().unwrap_or_default().to_string();
        log::debug!("Fetching media from {url}");
        let blob = self
            .fetcher
            .fetch_blob(&url)
            .await
            .map_err(|err| retrieval_error(&url, &err.to_string()))?;
        if !blob.is_success() {
            return Err(retrieval_error(&url, &format!("HTTP {}", blob.status)));
        }

        Ok(MediaUpload {
            file_name: file_name_from_url(&url, Utc::now()),
            content_type: blob
                .content_type
                .filter(|value| !value.trim().is_empty())
                .unwrap_or_else(|| FALLBACK_CONTENT_TYPE.to_string()),
            bytes: blob.bytes,
            kind,
            caption,
        })
    }
}

fn retrieval_error(url: &str, reason: &str) -> DataError {
    log::warn!("Media retrieval from {url} failed: {reason}");
    DataError::Network(format!("could not retrieve media from URL ({reason})"))
}

/// Last non-empty path segment of `url`, or `media-<unix millis>`.
pub fn file_name_from_url(url: &str, now: DateTime<Utc>) -> String {
    Url::parse(url)
        .ok()
        .and_then(|parsed| {
            parsed
                .path_segments()?
                .filter(|segment| !segment.is_empty())
                .last()
                .map(str::to_string)
        })
        .unwrap_or_else(|| format!("media-{}", now.timestamp_millis()))
}
