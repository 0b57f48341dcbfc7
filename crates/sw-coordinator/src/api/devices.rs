//! Device listing endpoint

use std::sync::Arc;

use axum::extract::State;
use axum::Json;
use serde::Serialize;

use crate::state::CoordinatorState;
use crate::store::DeviceView;

#[derive(Debug, Serialize)]
pub struct DeviceListResponse {
    pub devices: Vec<DeviceView>,
}

pub async fn list_devices(
    State(state): State<Arc<CoordinatorState>>,
) -> Json<DeviceListResponse> {
    let devices = state.devices.list(state.config.presence_thresholds());
    Json(DeviceListResponse { devices })
}
