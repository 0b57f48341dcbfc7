//! Core domain types

use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// Unique identifier for a kiosk device
///
/// Identity is immutable after first heartbeat; devices are auto-provisioned
/// on first contact.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DeviceId(pub String);

impl DeviceId {
    /// Create a new device ID
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Derive a device ID from a hostname (lowercased, alphanumeric + dashes)
    pub fn from_hostname(hostname: &str) -> Self {
        let id = hostname
            .chars()
            .map(|c| if c.is_alphanumeric() || c == '-' { c } else { '-' })
            .collect::<String>()
            .to_lowercase();
        Self(id)
    }

    /// Get the raw ID string
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DeviceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for DeviceId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for DeviceId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Elapsed-time thresholds for presence derivation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PresenceThresholds {
    /// Heartbeats younger than this mean the device is online
    pub online: Duration,
    /// Heartbeats younger than this (but past `online`) mean idle
    pub idle: Duration,
}

impl Default for PresenceThresholds {
    fn default() -> Self {
        Self {
            online: Duration::from_secs(120),
            idle: Duration::from_secs(600),
        }
    }
}

/// Derived presence of a device
///
/// Presence is never stored: it is a pure function of the time elapsed since
/// the last heartbeat, computed at query time. There is no disconnect
/// signal; a device is offline because its snapshots stopped arriving.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PresenceStatus {
    /// Heartbeat seen within the online threshold
    Online,
    /// Heartbeat seen within the idle threshold
    Idle,
    /// No recent heartbeat
    Offline,
}

impl PresenceStatus {
    /// Derive presence from the elapsed time since the last heartbeat
    pub fn from_elapsed(elapsed: Duration, thresholds: PresenceThresholds) -> Self {
        if elapsed < thresholds.online {
            PresenceStatus::Online
        } else if elapsed < thresholds.idle {
            PresenceStatus::Idle
        } else {
            PresenceStatus::Offline
        }
    }
}

impl fmt::Display for PresenceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PresenceStatus::Online => write!(f, "online"),
            PresenceStatus::Idle => write!(f, "idle"),
            PresenceStatus::Offline => write!(f, "offline"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_device_id_from_hostname() {
        let id = DeviceId::from_hostname("Lobby Kiosk.local");
        assert_eq!(id.as_str(), "lobby-kiosk-local");
    }

    #[test]
    fn test_presence_boundaries() {
        let t = PresenceThresholds::default();
        assert_eq!(
            PresenceStatus::from_elapsed(Duration::from_secs(0), t),
            PresenceStatus::Online
        );
        assert_eq!(
            PresenceStatus::from_elapsed(Duration::from_secs(119), t),
            PresenceStatus::Online
        );
        // The boundary itself tips over.
        assert_eq!(
            PresenceStatus::from_elapsed(Duration::from_secs(120), t),
            PresenceStatus::Idle
        );
        assert_eq!(
            PresenceStatus::from_elapsed(Duration::from_secs(599), t),
            PresenceStatus::Idle
        );
        assert_eq!(
            PresenceStatus::from_elapsed(Duration::from_secs(600), t),
            PresenceStatus::Offline
        );
        assert_eq!(
            PresenceStatus::from_elapsed(Duration::from_secs(86400), t),
            PresenceStatus::Offline
        );
    }

    #[test]
    fn test_presence_display() {
        assert_eq!(format!("{}", PresenceStatus::Online), "online");
        assert_eq!(format!("{}", PresenceStatus::Offline), "offline");
    }
}
