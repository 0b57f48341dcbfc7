//! Assignment store
//!
//! At most one active assignment exists per device; creating a new one
//! supersedes the prior. The fleet-wide default presentation lives here too
//! and has strictly lower precedence than any assignment.

use dashmap::DashMap;
use std::sync::Mutex;

use sw_core::time;
use sw_core::types::DeviceId;
use sw_protocol::{AssignedPresentation, PresentationId};

/// Stored assignment row
#[derive(Debug, Clone)]
pub struct AssignmentRecord {
    pub device_id: DeviceId,
    pub presentation_id: PresentationId,
    pub auto_play: bool,
    pub loop_mode: bool,
    pub created_at: u64,
    pub viewed: bool,
}

impl AssignmentRecord {
    /// Wire form served by the assignment probe
    pub fn to_wire(&self) -> AssignedPresentation {
        AssignedPresentation {
            presentation_id: self.presentation_id,
            auto_play: self.auto_play,
            loop_mode: self.loop_mode,
            created_at: self.created_at,
            viewed: self.viewed,
        }
    }
}

/// Current assignments plus the fleet default
pub struct AssignmentStore {
    assignments: DashMap<DeviceId, AssignmentRecord>,
    default_presentation: Mutex<Option<PresentationId>>,
}

impl AssignmentStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self {
            assignments: DashMap::new(),
            default_presentation: Mutex::new(None),
        }
    }

    /// Bind a device to a presentation, superseding any prior assignment
    pub fn assign(
        &self,
        device_id: DeviceId,
        presentation_id: PresentationId,
        auto_play: bool,
        loop_mode: bool,
    ) -> AssignmentRecord {
        let record = AssignmentRecord {
            device_id: device_id.clone(),
            presentation_id,
            auto_play,
            loop_mode,
            created_at: time::now_millis(),
            viewed: false,
        };
        if self.assignments.insert(device_id.clone(), record.clone()).is_some() {
            tracing::info!("Superseded assignment for {} with {}", device_id, presentation_id);
        } else {
            tracing::info!("Assigned {} to {}", presentation_id, device_id);
        }
        record
    }

    /// Current assignment for a device
    pub fn get(&self, device_id: &DeviceId) -> Option<AssignmentRecord> {
        self.assignments.get(device_id).map(|r| r.clone())
    }

    /// Remove a device's assignment; returns the removed row
    pub fn clear(&self, device_id: &DeviceId) -> Option<AssignmentRecord> {
        self.assignments.remove(device_id).map(|(_, record)| record)
    }

    /// Flag the assignment as seen by the device. A no-op when no
    /// assignment exists - the notification is best-effort.
    pub fn mark_viewed(&self, device_id: &DeviceId) -> bool {
        match self.assignments.get_mut(device_id) {
            Some(mut record) => {
                record.viewed = true;
                true
            }
            None => false,
        }
    }

    /// Set or clear the fleet default presentation
    pub fn set_default(&self, presentation_id: Option<PresentationId>) {
        let mut guard = self.default_presentation.lock().expect("default lock poisoned");
        *guard = presentation_id;
    }

    /// The fleet default presentation, if configured
    pub fn default(&self) -> Option<PresentationId> {
        *self.default_presentation.lock().expect("default lock poisoned")
    }
}

impl Default for AssignmentStore {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_assignment_supersedes() {
        let store = AssignmentStore::new();
        let device = DeviceId::new("kiosk-1");
        store.assign(device.clone(), PresentationId::new(1), true, true);
        store.assign(device.clone(), PresentationId::new(2), false, false);

        let record = store.get(&device).unwrap();
        assert_eq!(record.presentation_id, PresentationId::new(2));
        assert!(!record.viewed);
    }

    #[test]
    fn test_mark_viewed() {
        let store = AssignmentStore::new();
        let device = DeviceId::new("kiosk-1");
        assert!(!store.mark_viewed(&device));

        store.assign(device.clone(), PresentationId::new(1), true, true);
        assert!(store.mark_viewed(&device));
        assert!(store.get(&device).unwrap().viewed);
    }

    #[test]
    fn test_default_round_trip() {
        let store = AssignmentStore::new();
        assert!(store.default().is_none());
        store.set_default(Some(PresentationId::new(9)));
        assert_eq!(store.default(), Some(PresentationId::new(9)));
        store.set_default(None);
        assert!(store.default().is_none());
    }
}
