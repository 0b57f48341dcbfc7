//! Assignment and default-presentation endpoints

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::Json;
use serde::{Deserialize, Serialize};

use sw_core::types::DeviceId;
use sw_protocol::{AssignmentProbeResponse, DefaultProbeResponse, PresentationId};

use super::ApiError;
use crate::state::CoordinatorState;

pub async fn probe_assignment(
    State(state): State<Arc<CoordinatorState>>,
    Path(id): Path<String>,
) -> Json<AssignmentProbeResponse> {
    let record = state.assignments.get(&DeviceId::new(&id));
    Json(AssignmentProbeResponse {
        assigned_presentation: record.map(|r| r.to_wire()),
    })
}

#[derive(Debug, Deserialize)]
pub struct PutAssignmentRequest {
    pub presentation_id: PresentationId,
    #[serde(default = "default_true")]
    pub auto_play: bool,
    #[serde(default = "default_true")]
    pub loop_mode: bool,
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Serialize)]
pub struct PutAssignmentResponse {
    pub success: bool,
}

pub async fn put_assignment(
    State(state): State<Arc<CoordinatorState>>,
    Path(id): Path<String>,
    Json(request): Json<PutAssignmentRequest>,
) -> Result<Json<PutAssignmentResponse>, ApiError> {
    if !state.presentations.contains(request.presentation_id) {
        return Err(ApiError::not_found(format!(
            "Unknown presentation: {}",
            request.presentation_id
        )));
    }

    state.assignments.assign(
        DeviceId::new(&id),
        request.presentation_id,
        request.auto_play,
        request.loop_mode,
    );
    Ok(Json(PutAssignmentResponse { success: true }))
}

pub async fn delete_assignment(
    State(state): State<Arc<CoordinatorState>>,
    Path(id): Path<String>,
) -> Json<PutAssignmentResponse> {
    let removed = state.assignments.clear(&DeviceId::new(&id));
    Json(PutAssignmentResponse { success: removed.is_some() })
}

/// Best-effort viewed flag; succeeds even when no assignment is active so
/// a racing unassign never turns the notification into an error
pub async fn mark_viewed(
    State(state): State<Arc<CoordinatorState>>,
    Path(id): Path<String>,
) -> Json<PutAssignmentResponse> {
    let marked = state.assignments.mark_viewed(&DeviceId::new(&id));
    Json(PutAssignmentResponse { success: marked })
}

pub async fn probe_default(
    State(state): State<Arc<CoordinatorState>>,
) -> Json<DefaultProbeResponse> {
    let default_presentation = state
        .assignments
        .default()
        .and_then(|id| state.presentations.get(id));
    Json(DefaultProbeResponse { default_presentation })
}

#[derive(Debug, Deserialize)]
pub struct PutDefaultRequest {
    /// `null` clears the fleet default
    pub presentation_id: Option<PresentationId>,
}

pub async fn put_default(
    State(state): State<Arc<CoordinatorState>>,
    Json(request): Json<PutDefaultRequest>,
) -> Result<Json<PutAssignmentResponse>, ApiError> {
    if let Some(id) = request.presentation_id {
        if !state.presentations.contains(id) {
            return Err(ApiError::not_found(format!("Unknown presentation: {}", id)));
        }
    }
    state.assignments.set_default(request.presentation_id);
    Ok(Json(PutAssignmentResponse { success: true }))
}
