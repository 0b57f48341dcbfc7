//! Presentation and slide-image fetching seams
//!
//! The engine talks to the coordinator through these traits so the state
//! machine can be exercised against in-memory fakes. Production wires the
//! HTTP client in for both.

use async_trait::async_trait;
use thiserror::Error;

use sw_protocol::{Presentation, PresentationId};

use crate::api::{ApiError, CoordinatorClient};

/// Fetch failures while opening a presentation
#[derive(Error, Debug, Clone)]
pub enum FetchError {
    /// Connectivity problem; the open can be retried
    #[error("Network error: {0}")]
    Network(String),

    /// The coordinator does not know this presentation
    #[error("Presentation not found")]
    NotFound,

    /// The response arrived but was not usable
    #[error("Bad response: {0}")]
    BadResponse(String),
}

/// Source of full presentations
#[async_trait]
pub trait PresentationSource: Send + Sync {
    async fn fetch(&self, id: PresentationId) -> Result<Presentation, FetchError>;
}

#[async_trait]
impl PresentationSource for CoordinatorClient {
    async fn fetch(&self, id: PresentationId) -> Result<Presentation, FetchError> {
        self.fetch_presentation(id).await.map_err(|e| match e {
            ApiError::Timeout => FetchError::Network("request timed out".to_string()),
            ApiError::Unreachable(detail) => FetchError::Network(detail),
            ApiError::Status(404) | ApiError::EndpointMissing => FetchError::NotFound,
            ApiError::Status(code) => FetchError::BadResponse(format!("status {}", code)),
            ApiError::Decode(detail) => FetchError::BadResponse(detail),
        })
    }
}

/// Slide-image load failures, recorded per slide ID
#[derive(Error, Debug, Clone)]
pub enum LoadError {
    /// Connectivity problem
    #[error("Network error: {0}")]
    Network(String),

    /// Server answered with a non-success status
    #[error("Status {0}")]
    Status(u16),

    /// The reference resolved to an empty body
    #[error("Empty image")]
    Empty,
}

/// Loads (and effectively warms) slide images
#[async_trait]
pub trait SlideLoader: Send + Sync {
    /// Fetch the image behind a slide reference. Success means the bytes
    /// arrived and are non-empty; decode and display are the renderer's
    /// concern.
    async fn load(&self, reference: &str) -> Result<(), LoadError>;
}

/// Loader resolving references against the coordinator
pub struct HttpSlideLoader {
    http: reqwest::Client,
    base_url: String,
}

impl HttpSlideLoader {
    /// Create a loader; relative references resolve against `base_url`
    pub fn new(base_url: impl Into<String>, timeout: std::time::Duration) -> Result<Self, LoadError> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| LoadError::Network(e.to_string()))?;
        Ok(Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    fn resolve(&self, reference: &str) -> String {
        if reference.starts_with("http://") || reference.starts_with("https://") {
            reference.to_string()
        } else {
            format!("{}/{}", self.base_url, reference.trim_start_matches('/'))
        }
    }
}

#[async_trait]
impl SlideLoader for HttpSlideLoader {
    async fn load(&self, reference: &str) -> Result<(), LoadError> {
        let url = self.resolve(reference);
        let response = self
            .http
            .get(&url)
            .send()
            .await
            .map_err(|e| LoadError::Network(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(LoadError::Status(status.as_u16()));
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| LoadError::Network(e.to_string()))?;
        if bytes.is_empty() {
            return Err(LoadError::Empty);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_reference_resolution() {
        let loader = HttpSlideLoader::new("http://hub:8787/", Duration::from_secs(5)).unwrap();
        assert_eq!(
            loader.resolve("slides/1.png"),
            "http://hub:8787/slides/1.png"
        );
        assert_eq!(
            loader.resolve("/slides/1.png"),
            "http://hub:8787/slides/1.png"
        );
        assert_eq!(
            loader.resolve("https://cdn.example.com/a.png"),
            "https://cdn.example.com/a.png"
        );
    }
}
