//! Coordinator configuration

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

use super::serde_utils::duration_secs;
use crate::types::PresenceThresholds;

/// Configuration for the coordinator daemon
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CoordinatorConfig {
    /// Address to bind the HTTP/WebSocket server to
    pub bind_address: String,

    /// Elapsed heartbeat age below which a device counts as online
    #[serde(with = "duration_secs")]
    pub online_threshold: Duration,

    /// Elapsed heartbeat age below which a device counts as idle
    #[serde(with = "duration_secs")]
    pub idle_threshold: Duration,

    /// Ping interval on relay sockets (dead-socket detection)
    #[serde(with = "duration_secs")]
    pub keepalive_interval: Duration,

    /// Directory of TOML presentation files loaded into the catalog at startup
    pub presentations_dir: Option<PathBuf>,
}

impl Default for CoordinatorConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8787".to_string(),
            online_threshold: Duration::from_secs(120),
            idle_threshold: Duration::from_secs(600),
            keepalive_interval: Duration::from_secs(30),
            presentations_dir: None,
        }
    }
}

impl CoordinatorConfig {
    /// Presence thresholds as used by status derivation
    pub fn presence_thresholds(&self) -> PresenceThresholds {
        PresenceThresholds {
            online: self.online_threshold,
            idle: self.idle_threshold,
        }
    }
}
