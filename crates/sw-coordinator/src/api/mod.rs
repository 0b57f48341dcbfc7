//! HTTP API
//!
//! Stateless request handlers over the shared stores. Malformed payloads
//! map to 400, unknown identifiers to 404 - except a heartbeat from an
//! unknown device, which auto-provisions instead of rejecting.

mod assignments;
mod commands;
mod devices;
mod heartbeat;
mod presentations;

use std::sync::Arc;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};

use crate::relay;
use crate::state::CoordinatorState;

/// Build the coordinator router
pub fn router(state: Arc<CoordinatorState>) -> Router {
    Router::new()
        .route("/api/heartbeat", post(heartbeat::receive_heartbeat))
        .route("/api/commands/ack", post(commands::acknowledge))
        .route("/api/devices", get(devices::list_devices))
        .route("/api/devices/:id/commands", post(commands::enqueue))
        .route(
            "/api/devices/:id/assignment",
            get(assignments::probe_assignment)
                .put(assignments::put_assignment)
                .delete(assignments::delete_assignment),
        )
        .route(
            "/api/devices/:id/assignment/viewed",
            post(assignments::mark_viewed),
        )
        .route(
            "/api/default-presentation",
            get(assignments::probe_default).put(assignments::put_default),
        )
        .route(
            "/api/presentations/:id",
            get(presentations::fetch).put(presentations::upsert),
        )
        .route("/ws", get(relay::ws_handler))
        .with_state(state)
}

/// API error with its HTTP mapping
#[derive(Debug)]
pub enum ApiError {
    /// 400 - malformed or invalid payload
    BadRequest(String),
    /// 404 - unknown device/command/presentation
    NotFound(String),
}

impl ApiError {
    pub fn not_found(what: impl Into<String>) -> Self {
        ApiError::NotFound(what.into())
    }

    pub fn bad_request(why: impl Into<String>) -> Self {
        ApiError::BadRequest(why.into())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::BadRequest(message) => (StatusCode::BAD_REQUEST, message),
            ApiError::NotFound(message) => (StatusCode::NOT_FOUND, message),
        };
        (status, Json(serde_json::json!({ "error": message }))).into_response()
    }
}

impl From<sw_protocol::ProtocolError> for ApiError {
    fn from(e: sw_protocol::ProtocolError) -> Self {
        ApiError::BadRequest(e.to_string())
    }
}
