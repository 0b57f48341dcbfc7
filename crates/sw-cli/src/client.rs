//! Admin client for the coordinator API

use std::time::Duration;

use anyhow::{bail, Context, Result};
use serde::Deserialize;

use sw_core::types::PresenceStatus;
use sw_protocol::{Presentation, PresentationId, StatusSnapshot, WireCommand};

/// Device row as served by the coordinator, presence pre-derived
#[derive(Debug, Clone, Deserialize)]
pub struct DeviceRow {
    pub id: String,
    pub display_name: String,
    pub presence: PresenceStatus,
    pub last_heartbeat_at: u64,
    pub reported: StatusSnapshot,
}

#[derive(Debug, Deserialize)]
struct DeviceListResponse {
    devices: Vec<DeviceRow>,
}

#[derive(Debug, Deserialize)]
struct EnqueueResponse {
    command: WireCommand,
    pushed: bool,
}

/// HTTP client for operator commands
pub struct AdminClient {
    http: reqwest::Client,
    base_url: String,
}

impl AdminClient {
    /// Create a client for the given coordinator
    pub fn new(base_url: &str) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .context("Failed to build HTTP client")?;
        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
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

    /// List devices with derived presence
    pub async fn list_devices(&self) -> Result<Vec<DeviceRow>> {
        let response = self
            .http
            .get(format!("{}/api/devices", self.base_url))
            .send()
            .await
            .context("Is the coordinator running?")?;
        let body: DeviceListResponse = Self::parse(response).await?;
        Ok(body.devices)
    }

    /// Enqueue a command; returns (command, was it pushed live)
    pub async fn send_command(
        &self,
        device_id: &str,
        kind: &str,
        parameters: Option<serde_json::Value>,
    ) -> Result<(WireCommand, bool)> {
        let response = self
            .http
            .post(format!("{}/api/devices/{}/commands", self.base_url, device_id))
            .json(&serde_json::json!({ "kind": kind, "parameters": parameters }))
            .send()
            .await
            .context("Is the coordinator running?")?;
        let body: EnqueueResponse = Self::parse(response).await?;
        Ok((body.command, body.pushed))
    }

    /// Bind a device to a presentation
    pub async fn assign(&self, device_id: &str, presentation_id: u64) -> Result<()> {
        let response = self
            .http
            .put(format!("{}/api/devices/{}/assignment", self.base_url, device_id))
            .json(&serde_json::json!({ "presentation_id": presentation_id }))
            .send()
            .await
            .context("Is the coordinator running?")?;
        Self::check(response).await
    }

    /// Remove a device's assignment
    pub async fn unassign(&self, device_id: &str) -> Result<()> {
        let response = self
            .http
            .delete(format!("{}/api/devices/{}/assignment", self.base_url, device_id))
            .send()
            .await
            .context("Is the coordinator running?")?;
        Self::check(response).await
    }

    /// Set or clear the fleet default presentation
    pub async fn set_default(&self, presentation_id: Option<u64>) -> Result<()> {
        let response = self
            .http
            .put(format!("{}/api/default-presentation", self.base_url))
            .json(&serde_json::json!({ "presentation_id": presentation_id }))
            .send()
            .await
            .context("Is the coordinator running?")?;
        Self::check(response).await
    }

    /// Fetch a presentation from the catalog
    pub async fn get_presentation(&self, id: u64) -> Result<Presentation> {
        #[derive(Deserialize)]
        struct Fetch {
            presentation: Presentation,
        }
        let response = self
            .http
            .get(format!("{}/api/presentations/{}", self.base_url, id))
            .send()
            .await
            .context("Is the coordinator running?")?;
        let body: Fetch = Self::parse(response).await?;
        Ok(body.presentation)
    }

    /// Upload a presentation into the catalog
    pub async fn put_presentation(&self, presentation: &Presentation) -> Result<PresentationId> {
        let response = self
            .http
            .put(format!(
                "{}/api/presentations/{}",
                self.base_url,
                presentation.id.as_u64()
            ))
            .json(presentation)
            .send()
            .await
            .context("Is the coordinator running?")?;
        Self::check(response).await?;
        Ok(presentation.id)
    }

    async fn parse<T: serde::de::DeserializeOwned>(response: reqwest::Response) -> Result<T> {
        let status = response.status();
        if !status.is_success() {
            bail!("{}", Self::error_body(response).await);
        }
        response.json().await.context("Malformed coordinator response")
    }

    async fn check(response: reqwest::Response) -> Result<()> {
        let status = response.status();
        if !status.is_success() {
            bail!("{}", Self::error_body(response).await);
        }
        Ok(())
    }

    async fn error_body(response: reqwest::Response) -> String {
        let status = response.status();
        match response.json::<serde_json::Value>().await {
            Ok(body) => body["error"]
                .as_str()
                .map(str::to_string)
                .unwrap_or_else(|| format!("Coordinator returned {}", status)),
            Err(_) => format!("Coordinator returned {}", status),
        }
    }
}
