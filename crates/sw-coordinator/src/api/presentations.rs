//! Presentation catalog endpoints

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::Json;
use serde::Serialize;

use sw_protocol::{Presentation, PresentationFetchResponse, PresentationId};

use super::ApiError;
use crate::state::CoordinatorState;

pub async fn fetch(
    State(state): State<Arc<CoordinatorState>>,
    Path(id): Path<u64>,
) -> Result<Json<PresentationFetchResponse>, ApiError> {
    let presentation = state
        .presentations
        .get(PresentationId::new(id))
        .ok_or_else(|| ApiError::not_found(format!("Unknown presentation: presentation-{}", id)))?;
    Ok(Json(PresentationFetchResponse { presentation }))
}

#[derive(Debug, Serialize)]
pub struct UpsertResponse {
    pub success: bool,
}

pub async fn upsert(
    State(state): State<Arc<CoordinatorState>>,
    Path(id): Path<u64>,
    Json(presentation): Json<Presentation>,
) -> Result<Json<UpsertResponse>, ApiError> {
    if presentation.id != PresentationId::new(id) {
        return Err(ApiError::bad_request(format!(
            "Body id {} does not match path id {}",
            presentation.id, id
        )));
    }
    state.presentations.upsert(presentation);
    Ok(Json(UpsertResponse { success: true }))
}
