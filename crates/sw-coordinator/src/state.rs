//! Global coordinator state

use std::sync::Arc;

use sw_core::config::CoordinatorConfig;

use crate::relay::RelayRegistry;
use crate::store::{AssignmentStore, CommandQueue, DeviceRegistry, PresentationStore};

/// Shared state for the coordinator daemon
pub struct CoordinatorState {
    /// Configuration
    pub config: CoordinatorConfig,
    /// Presence registry
    pub devices: DeviceRegistry,
    /// Per-device command queue
    pub commands: CommandQueue,
    /// Assignments and the fleet default
    pub assignments: AssignmentStore,
    /// Presentation catalog
    pub presentations: PresentationStore,
    /// Live push-relay connections
    pub relay: RelayRegistry,
}

impl CoordinatorState {
    /// Create fresh state from configuration
    pub fn new(config: CoordinatorConfig) -> Self {
        Self {
            config,
            devices: DeviceRegistry::new(),
            commands: CommandQueue::new(),
            assignments: AssignmentStore::new(),
            presentations: PresentationStore::new(),
            relay: RelayRegistry::new(),
        }
    }

    /// Create state wrapped for handler sharing
    pub fn shared(config: CoordinatorConfig) -> Arc<Self> {
        Arc::new(Self::new(config))
    }
}
