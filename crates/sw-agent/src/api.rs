//! HTTP client for the coordinator API
//!
//! Every request carries the configured timeout so a wedged network cannot
//! block the agent's event loop; expiry surfaces as [`ApiError::Timeout`].
//! A 404 on a probe endpoint is not a transient fault - it means the
//! coordinator does not speak that dialect, and the caller disables the
//! dependent poll loop for the rest of the session.

use std::time::Duration;

use thiserror::Error;

use sw_protocol::{
    AssignmentProbeResponse, CommandAck, DefaultProbeResponse, HeartbeatRequest,
    HeartbeatResponse, Presentation, PresentationFetchResponse, PresentationId,
};

/// Errors from coordinator round-trips
#[derive(Error, Debug)]
pub enum ApiError {
    /// Request exceeded the bounded timeout
    #[error("Request timed out")]
    Timeout,

    /// Coordinator unreachable (connect/DNS/transport failure)
    #[error("Coordinator unreachable: {0}")]
    Unreachable(String),

    /// Probe endpoint does not exist on this coordinator (capability
    /// signal, permanent for the session)
    #[error("Endpoint not found")]
    EndpointMissing,

    /// Unexpected HTTP status
    #[error("Unexpected status: {0}")]
    Status(u16),

    /// Response body did not match the expected shape
    #[error("Malformed response: {0}")]
    Decode(String),
}

impl ApiError {
    /// Whether this error is a connectivity problem worth plain retrying
    pub fn is_transient(&self) -> bool {
        matches!(self, ApiError::Timeout | ApiError::Unreachable(_))
    }

    fn from_transport(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            ApiError::Timeout
        } else if e.is_decode() {
            ApiError::Decode(e.to_string())
        } else {
            ApiError::Unreachable(e.to_string())
        }
    }
}

/// Client for the coordinator's HTTP API
pub struct CoordinatorClient {
    http: reqwest::Client,
    base_url: String,
}

impl CoordinatorClient {
    /// Create a client with the given base URL and request timeout
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, ApiError> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ApiError::Unreachable(e.to_string()))?;
        Ok(Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    /// Coordinator base URL (no trailing slash)
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// WebSocket URL of the push relay
    pub fn relay_url(&self) -> String {
        let ws_base = if let Some(rest) = self.base_url.strip_prefix("https://") {
            format!("wss://{}", rest)
        } else if let Some(rest) = self.base_url.strip_prefix("http://") {
            format!("ws://{}", rest)
        } else {
            format!("ws://{}", self.base_url)
        };
        format!("{}/ws", ws_base)
    }

    /// Post a heartbeat; returns pending commands in creation order
    pub async fn heartbeat(&self, request: &HeartbeatRequest) -> Result<HeartbeatResponse, ApiError> {
        let response = self
            .http
            .post(format!("{}/api/heartbeat", self.base_url))
            .json(request)
            .send()
            .await
            .map_err(ApiError::from_transport)?;

        let status = response.status();
        if !status.is_success() {
            return Err(ApiError::Status(status.as_u16()));
        }
        response
            .json()
            .await
            .map_err(|e| ApiError::Decode(e.to_string()))
    }

    /// Acknowledge a command. Idempotent on the coordinator side; a replay
    /// is accepted silently.
    pub async fn acknowledge(&self, ack: &CommandAck) -> Result<(), ApiError> {
        let response = self
            .http
            .post(format!("{}/api/commands/ack", self.base_url))
            .json(ack)
            .send()
            .await
            .map_err(ApiError::from_transport)?;

        let status = response.status();
        if !status.is_success() {
            return Err(ApiError::Status(status.as_u16()));
        }
        Ok(())
    }

    /// Probe for an explicit assignment
    pub async fn probe_assignment(&self, device_id: &str) -> Result<AssignmentProbeResponse, ApiError> {
        self.get_probe(&format!("{}/api/devices/{}/assignment", self.base_url, device_id))
            .await
    }

    /// Probe for the fleet default presentation
    pub async fn probe_default(&self) -> Result<DefaultProbeResponse, ApiError> {
        self.get_probe(&format!("{}/api/default-presentation", self.base_url))
            .await
    }

    /// Fetch a full presentation by ID
    pub async fn fetch_presentation(&self, id: PresentationId) -> Result<Presentation, ApiError> {
        let response = self
            .http
            .get(format!("{}/api/presentations/{}", self.base_url, id.as_u64()))
            .send()
            .await
            .map_err(ApiError::from_transport)?;

        let status = response.status();
        if !status.is_success() {
            return Err(ApiError::Status(status.as_u16()));
        }
        let body: PresentationFetchResponse = response
            .json()
            .await
            .map_err(|e| ApiError::Decode(e.to_string()))?;
        Ok(body.presentation)
    }

    /// Tell the coordinator the assignment was seen. Callers treat this as
    /// fire-and-forget; a failure must never block playback.
    pub async fn mark_viewed(&self, device_id: &str) -> Result<(), ApiError> {
        let response = self
            .http
            .post(format!(
                "{}/api/devices/{}/assignment/viewed",
                self.base_url, device_id
            ))
            .send()
            .await
            .map_err(ApiError::from_transport)?;

        let status = response.status();
        if !status.is_success() {
            return Err(ApiError::Status(status.as_u16()));
        }
        Ok(())
    }

    async fn get_probe<T: serde::de::DeserializeOwned>(&self, url: &str) -> Result<T, ApiError> {
        let response = self
            .http
            .get(url)
            .send()
            .await
            .map_err(ApiError::from_transport)?;

        let status = response.status();
        if status.as_u16() == 404 {
            return Err(ApiError::EndpointMissing);
        }
        if !status.is_success() {
            return Err(ApiError::Status(status.as_u16()));
        }
        response
            .json()
            .await
            .map_err(|e| ApiError::Decode(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_relay_url_schemes() {
        let client = CoordinatorClient::new("http://hub:8787", Duration::from_secs(5)).unwrap();
        assert_eq!(client.relay_url(), "ws://hub:8787/ws");

        let client = CoordinatorClient::new("https://hub:8787/", Duration::from_secs(5)).unwrap();
        assert_eq!(client.relay_url(), "wss://hub:8787/ws");
    }

    #[test]
    fn test_transient_classification() {
        assert!(ApiError::Timeout.is_transient());
        assert!(ApiError::Unreachable("connection refused".into()).is_transient());
        assert!(!ApiError::EndpointMissing.is_transient());
        assert!(!ApiError::Status(500).is_transient());
    }
}
