//! Anonymous device trial handlers.
//!
//! Visitors without an account get one report per browser fingerprint.

use std::sync::Arc;

use axum::extract::State;
use axum::Json;
use serde::Serialize;

use estate_credits_core::{trial_available, DEVICE_TRIAL_USES};

use crate::auth::DeviceFingerprint;
use crate::error::ApiError;
use crate::state::AppState;

/// Device trial status.
#[derive(Debug, Serialize)]
pub struct DeviceTrialResponse {
    /// Trial reports used by this device.
    pub uses: u32,
    /// Trial reports a device gets.
    pub limit: u32,
    /// Whether the device can still run a trial report.
    pub available: bool,
}

impl DeviceTrialResponse {
    fn new(uses: u32) -> Self {
        Self {
            uses,
            limit: DEVICE_TRIAL_USES,
            available: trial_available(uses),
        }
    }
}

/// Get the trial status for the calling device.
pub async fn get_device_trial(
    State(state): State<Arc<AppState>>,
    DeviceFingerprint(device_id): DeviceFingerprint,
) -> Result<Json<DeviceTrialResponse>, ApiError> {
    let uses = state.store.device_trial_uses(&device_id)?;
    Ok(Json(DeviceTrialResponse::new(uses)))
}

/// Claim the calling device's trial report.
pub async fn consume_device_trial(
    State(state): State<Arc<AppState>>,
    DeviceFingerprint(device_id): DeviceFingerprint,
) -> Result<Json<DeviceTrialResponse>, ApiError> {
    let uses = state.store.claim_device_trial(&device_id).map_err(|e| {
        tracing::info!(device_id = %device_id, "Device trial refused");
        ApiError::from(e)
    })?;

    tracing::info!(device_id = %device_id, uses, "Device trial consumed");

    Ok(Json(DeviceTrialResponse::new(uses)))
}
