//! Command enqueue and acknowledgment endpoints

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::Json;
use serde::{Deserialize, Serialize};

use sw_core::types::DeviceId;
use sw_protocol::{CommandAck, CommandKind, Envelope, WireCommand};

use super::ApiError;
use crate::state::CoordinatorState;

/// Raw enqueue body; the kind/parameters pair is validated against the
/// command vocabulary before anything is queued
#[derive(Debug, Deserialize)]
pub struct EnqueueRequest {
    pub kind: String,
    #[serde(default)]
    pub parameters: Option<serde_json::Value>,
}

#[derive(Debug, Serialize)]
pub struct EnqueueResponse {
    pub command: WireCommand,
    /// Whether the command was also pushed over a live socket
    pub pushed: bool,
}

pub async fn enqueue(
    State(state): State<Arc<CoordinatorState>>,
    Path(id): Path<String>,
    Json(request): Json<EnqueueRequest>,
) -> Result<Json<EnqueueResponse>, ApiError> {
    let device_id = DeviceId::new(&id);
    if !state.devices.contains(&device_id) {
        return Err(ApiError::not_found(format!("Unknown device: {}", id)));
    }

    let kind = CommandKind::parse(&request.kind, request.parameters.as_ref())?;

    // An assignment command is also durable coordinator intent: record it
    // so the assignment probe agrees with what the command will do.
    if let CommandKind::AssignPresentation { presentation_id, auto_play, loop_mode } = &kind {
        state
            .assignments
            .assign(device_id.clone(), *presentation_id, *auto_play, *loop_mode);
    }

    let wire = state.commands.enqueue(device_id.clone(), kind);
    let pushed = state
        .relay
        .push_to_device(&device_id, Envelope::from_wire_command(&wire));

    Ok(Json(EnqueueResponse { command: wire, pushed }))
}

#[derive(Debug, Serialize)]
pub struct AckResponse {
    pub success: bool,
}

pub async fn acknowledge(
    State(state): State<Arc<CoordinatorState>>,
    Json(ack): Json<CommandAck>,
) -> Result<Json<AckResponse>, ApiError> {
    state
        .commands
        .acknowledge(ack.command_id, ack.status, ack.result)
        .map_err(|e| ApiError::not_found(e.to_string()))?;

    Ok(Json(AckResponse { success: true }))
}
