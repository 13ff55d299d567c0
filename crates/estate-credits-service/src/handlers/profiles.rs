//! Profile registration handlers.
//!
//! Profiles are never deleted: the lifetime allowance is granted once per user.

use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use chrono::Utc;
use serde::Serialize;

use estate_credits_core::ProfileRecord;

use crate::auth::AuthUser;
use crate::error::ApiError;
use crate::handlers::credits::CreditSummary;
use crate::state::AppState;

/// Profile response.
#[derive(Debug, Serialize)]
pub struct ProfileResponse {
    /// User ID.
    pub user_id: String,
    /// Created timestamp.
    pub created_at: String,
    /// Last write timestamp.
    pub updated_at: String,
    /// Credit summary derived from the row.
    pub credits: CreditSummary,
}

impl ProfileResponse {
    fn new(state: &AppState, profile: &ProfileRecord) -> Self {
        let now = Utc::now();
        let credit_state = state.ledger.derive_state(Some(profile), now);

        Self {
            user_id: profile.user_id.to_string(),
            created_at: profile.created_at.to_rfc3339(),
            updated_at: profile.updated_at.to_rfc3339(),
            credits: CreditSummary::new(&state.ledger, &credit_state, now),
        }
    }
}

/// Register a profile for the authenticated user.
pub async fn create_profile(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
) -> Result<(StatusCode, Json<ProfileResponse>), ApiError> {
    let profile = ProfileRecord::new(auth.user_id, Utc::now());
    state.store.create_profile(&profile)?;

    tracing::info!(user_id = %auth.user_id, "Profile created");

    Ok((
        StatusCode::CREATED,
        Json(ProfileResponse::new(&state, &profile)),
    ))
}

/// Get the current user's profile.
pub async fn get_profile(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
) -> Result<Json<ProfileResponse>, ApiError> {
    let profile = state
        .store
        .get_profile(&auth.user_id)?
        .ok_or_else(|| ApiError::NotFound("Profile not found".into()))?;

    Ok(Json(ProfileResponse::new(&state, &profile)))
}
