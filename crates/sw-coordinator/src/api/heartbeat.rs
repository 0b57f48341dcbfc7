//! Heartbeat endpoint
//!
//! The single round-trip that keeps a device alive: upsert its presence
//! row, hand back every pending command in creation order, and fan the
//! fresh status out to watching administrators.

use std::sync::Arc;

use axum::extract::State;
use axum::Json;

use sw_core::types::DeviceId;
use sw_protocol::{Envelope, HeartbeatRequest, HeartbeatResponse};

use crate::state::CoordinatorState;

pub async fn receive_heartbeat(
    State(state): State<Arc<CoordinatorState>>,
    Json(request): Json<HeartbeatRequest>,
) -> Json<HeartbeatResponse> {
    let device_id = DeviceId::new(&request.device_id);
    let first_contact = state.devices.record_heartbeat(&request);
    if first_contact {
        tracing::info!("First heartbeat from {}", device_id);
    }

    let commands = state.commands.pending_for(&device_id);
    if !commands.is_empty() {
        tracing::debug!("Delivering {} pending commands to {}", commands.len(), device_id);
    }

    state.relay.broadcast_admins(Envelope::DeviceStatus {
        device_id: request.device_id.clone(),
        snapshot: request.snapshot,
    });

    Json(HeartbeatResponse { success: true, commands })
}
