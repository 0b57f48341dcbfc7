//! Presence registry
//!
//! Devices are auto-provisioned on first heartbeat and their identity is
//! immutable afterwards. Presence is never stored: it is derived from the
//! age of the last heartbeat at query time.

use dashmap::DashMap;
use rand::distributions::Alphanumeric;
use rand::Rng;
use serde::Serialize;

use sw_core::time;
use sw_core::types::{DeviceId, PresenceStatus, PresenceThresholds};
use sw_protocol::{CapabilitySet, HeartbeatRequest, StatusSnapshot};

/// Length of generated registration tokens
const REGISTRATION_TOKEN_LENGTH: usize = 24;

/// Stored device row
#[derive(Debug, Clone)]
pub struct DeviceRecord {
    /// Device identifier (immutable after first heartbeat)
    pub id: DeviceId,
    /// Human-facing name, taken from the first heartbeat that carried one
    pub display_name: String,
    /// Token minted at auto-provisioning time
    pub registration_token: String,
    /// Feature flags reported by the device
    pub capabilities: CapabilitySet,
    /// Unix millis of the most recent heartbeat
    pub last_heartbeat_at: u64,
    /// Most recently reported status snapshot
    pub reported: StatusSnapshot,
    /// Unix millis of the first contact
    pub first_seen_at: u64,
}

/// Device row with presence derived at read time, as served to operators
#[derive(Debug, Clone, Serialize)]
pub struct DeviceView {
    pub id: String,
    pub display_name: String,
    pub presence: PresenceStatus,
    pub last_heartbeat_at: u64,
    pub reported: StatusSnapshot,
}

/// Registry of every device that has ever reported
pub struct DeviceRegistry {
    devices: DashMap<DeviceId, DeviceRecord>,
}

impl DeviceRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self {
            devices: DashMap::new(),
        }
    }

    /// Upsert a device row from a heartbeat, auto-provisioning on first
    /// contact. Returns whether this was the device's first heartbeat.
    pub fn record_heartbeat(&self, request: &HeartbeatRequest) -> bool {
        let id = DeviceId::new(&request.device_id);
        let now = time::now_millis();

        match self.devices.get_mut(&id) {
            Some(mut record) => {
                record.last_heartbeat_at = now;
                record.reported = request.snapshot.clone();
                record.capabilities = request.capabilities;
                false
            }
            None => {
                let display_name = request
                    .display_name
                    .clone()
                    .unwrap_or_else(|| id.as_str().to_string());
                tracing::info!("Auto-provisioning device {} ({})", id, display_name);
                self.devices.insert(
                    id.clone(),
                    DeviceRecord {
                        id,
                        display_name,
                        registration_token: generate_token(),
                        capabilities: request.capabilities,
                        last_heartbeat_at: now,
                        reported: request.snapshot.clone(),
                        first_seen_at: now,
                    },
                );
                true
            }
        }
    }

    /// Look up a device row
    pub fn get(&self, id: &DeviceId) -> Option<DeviceRecord> {
        self.devices.get(id).map(|r| r.clone())
    }

    /// Whether a device has ever reported
    pub fn contains(&self, id: &DeviceId) -> bool {
        self.devices.contains_key(id)
    }

    /// Derived presence for one device; `None` for unknown devices
    pub fn presence_of(&self, id: &DeviceId, thresholds: PresenceThresholds) -> Option<PresenceStatus> {
        self.devices.get(id).map(|record| {
            PresenceStatus::from_elapsed(time::elapsed_since(record.last_heartbeat_at), thresholds)
        })
    }

    /// All devices with presence derived now, sorted by ID for stable output
    pub fn list(&self, thresholds: PresenceThresholds) -> Vec<DeviceView> {
        let mut views: Vec<DeviceView> = self
            .devices
            .iter()
            .map(|record| DeviceView {
                id: record.id.as_str().to_string(),
                display_name: record.display_name.clone(),
                presence: PresenceStatus::from_elapsed(
                    time::elapsed_since(record.last_heartbeat_at),
                    thresholds,
                ),
                last_heartbeat_at: record.last_heartbeat_at,
                reported: record.reported.clone(),
            })
            .collect();
        views.sort_by(|a, b| a.id.cmp(&b.id));
        views
    }

    /// Number of known devices
    pub fn len(&self) -> usize {
        self.devices.len()
    }

    /// Check if the registry is empty
    pub fn is_empty(&self) -> bool {
        self.devices.is_empty()
    }
}

impl Default for DeviceRegistry {
    fn default() -> Self {
        Self::new()
    }
}

fn generate_token() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(REGISTRATION_TOKEN_LENGTH)
        .map(char::from)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use sw_protocol::StatusSnapshot;

    fn heartbeat(device_id: &str) -> HeartbeatRequest {
        HeartbeatRequest {
            device_id: device_id.to_string(),
            display_name: Some(format!("{} display", device_id)),
            capabilities: CapabilitySet::default(),
            snapshot: StatusSnapshot::idle("0.1.0", 60),
        }
    }

    #[test]
    fn test_first_heartbeat_auto_provisions() {
        let registry = DeviceRegistry::new();
        assert!(registry.record_heartbeat(&heartbeat("kiosk-1")));
        assert!(!registry.record_heartbeat(&heartbeat("kiosk-1")));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_registration_token_is_stable() {
        let registry = DeviceRegistry::new();
        registry.record_heartbeat(&heartbeat("kiosk-1"));
        let token = registry.get(&DeviceId::new("kiosk-1")).unwrap().registration_token;
        assert_eq!(token.len(), REGISTRATION_TOKEN_LENGTH);

        registry.record_heartbeat(&heartbeat("kiosk-1"));
        let again = registry.get(&DeviceId::new("kiosk-1")).unwrap().registration_token;
        assert_eq!(token, again);
    }

    #[test]
    fn test_display_name_fixed_at_first_contact() {
        let registry = DeviceRegistry::new();
        registry.record_heartbeat(&heartbeat("kiosk-1"));

        let mut renamed = heartbeat("kiosk-1");
        renamed.display_name = Some("something else".to_string());
        registry.record_heartbeat(&renamed);

        let record = registry.get(&DeviceId::new("kiosk-1")).unwrap();
        assert_eq!(record.display_name, "kiosk-1 display");
    }

    #[test]
    fn test_fresh_heartbeat_derives_online() {
        let registry = DeviceRegistry::new();
        registry.record_heartbeat(&heartbeat("kiosk-1"));
        let presence = registry
            .presence_of(&DeviceId::new("kiosk-1"), PresenceThresholds::default())
            .unwrap();
        assert_eq!(presence, PresenceStatus::Online);
    }

    #[test]
    fn test_list_sorted_by_id() {
        let registry = DeviceRegistry::new();
        registry.record_heartbeat(&heartbeat("kiosk-b"));
        registry.record_heartbeat(&heartbeat("kiosk-a"));
        let views = registry.list(PresenceThresholds::default());
        assert_eq!(views[0].id, "kiosk-a");
        assert_eq!(views[1].id, "kiosk-b");
    }
}
