//! Heartbeat payloads
//!
//! The heartbeat is the pull half of command delivery: a device posts its
//! status snapshot and receives every still-pending command for it in the
//! same round-trip, in creation order. There is no disconnect signal in the
//! protocol; a device is offline purely because its snapshots stopped
//! arriving.

use serde::{Deserialize, Serialize};

use crate::command::WireCommand;
use crate::presentation::PresentationId;

/// Playback status as reported by a device
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReportedStatus {
    /// No presentation open
    #[default]
    Idle,
    /// Fetching or validating a presentation
    Loading,
    /// Slides advancing
    Playing,
    /// Countdown frozen
    Paused,
    /// Ran off the end of a non-looping deck
    Finished,
    /// Presentation failed to load
    Error,
}

/// Feature flags reported by a device on first contact
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CapabilitySet {
    /// Device polls for explicit assignments
    pub assignments: bool,
    /// Device polls for the fleet default presentation
    pub default_presentation: bool,
    /// Device keeps a push socket open
    pub push: bool,
}

impl Default for CapabilitySet {
    fn default() -> Self {
        Self {
            assignments: true,
            default_presentation: true,
            push: true,
        }
    }
}

/// Status snapshot carried by every heartbeat
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatusSnapshot {
    pub status: ReportedStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_presentation_id: Option<PresentationId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_presentation_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub slide_index: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_slides: Option<usize>,
    #[serde(default)]
    pub is_looping: bool,
    #[serde(default)]
    pub auto_play: bool,
    pub uptime_seconds: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub memory_pct: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub wifi_pct: Option<f32>,
    pub app_version: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub local_ip: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub external_ip: Option<String>,
}

impl StatusSnapshot {
    /// Snapshot for a device that is up but not showing anything
    pub fn idle(app_version: impl Into<String>, uptime_seconds: u64) -> Self {
        Self {
            status: ReportedStatus::Idle,
            current_presentation_id: None,
            current_presentation_name: None,
            slide_index: None,
            total_slides: None,
            is_looping: false,
            auto_play: false,
            uptime_seconds,
            memory_pct: None,
            wifi_pct: None,
            app_version: app_version.into(),
            local_ip: None,
            external_ip: None,
        }
    }
}

/// Heartbeat request (device → coordinator)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HeartbeatRequest {
    pub device_id: String,
    /// Human-facing name; only honored on first contact
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    #[serde(default)]
    pub capabilities: CapabilitySet,
    pub snapshot: StatusSnapshot,
}

/// Heartbeat response carrying pending commands in creation order
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HeartbeatResponse {
    pub success: bool,
    #[serde(default)]
    pub commands: Vec<WireCommand>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::{CommandId, CommandKind};

    #[test]
    fn test_snapshot_roundtrip() {
        let snapshot = StatusSnapshot {
            status: ReportedStatus::Playing,
            current_presentation_id: Some(PresentationId::new(7)),
            current_presentation_name: Some("lobby loop".to_string()),
            slide_index: Some(2),
            total_slides: Some(9),
            is_looping: true,
            auto_play: true,
            uptime_seconds: 86400,
            memory_pct: Some(41.5),
            wifi_pct: Some(88.0),
            app_version: "0.1.0".to_string(),
            local_ip: Some("10.0.0.17".to_string()),
            external_ip: None,
        };
        let json = serde_json::to_string(&snapshot).unwrap();
        let back: StatusSnapshot = serde_json::from_str(&json).unwrap();
        assert_eq!(back, snapshot);
    }

    #[test]
    fn test_heartbeat_response_commands_in_order() {
        let response = HeartbeatResponse {
            success: true,
            commands: vec![
                WireCommand { id: CommandId::new(1), kind: CommandKind::NextSlide, created_at: 100 },
                WireCommand { id: CommandId::new(2), kind: CommandKind::Restart, created_at: 200 },
            ],
        };
        let json = serde_json::to_value(&response).unwrap();
        assert_eq!(json["commands"][0]["id"], 1);
        assert_eq!(json["commands"][1]["id"], 2);
    }

    #[test]
    fn test_minimal_snapshot_deserializes() {
        // Older agents omit every optional field.
        let json = r#"{"status":"idle","uptime_seconds":12,"app_version":"0.0.9"}"#;
        let snapshot: StatusSnapshot = serde_json::from_str(json).unwrap();
        assert_eq!(snapshot.status, ReportedStatus::Idle);
        assert!(!snapshot.is_looping);
        assert!(snapshot.memory_pct.is_none());
    }
}
