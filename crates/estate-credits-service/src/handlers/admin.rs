//! Operator handlers for purchase grants.

use std::sync::Arc;

use axum::extract::State;
use axum::Json;
use chrono::Utc;
use serde::{Deserialize, Serialize};

use estate_credits_core::{Purchase, UserId};

use crate::auth::AdminAuth;
use crate::error::ApiError;
use crate::handlers::credits::CreditSummary;
use crate::state::AppState;

/// Purchase grant request.
#[derive(Debug, Deserialize)]
pub struct PurchaseRequest {
    /// User to credit.
    pub user_id: String,
    /// What was bought.
    pub purchase: Purchase,
    /// Payment reference for the audit log.
    #[serde(default)]
    pub reference: Option<String>,
}

/// Purchase grant response.
#[derive(Debug, Serialize)]
pub struct PurchaseResponse {
    /// Whether the grant was applied.
    pub success: bool,
    /// User ID.
    pub user_id: String,
    /// Top-up credits added.
    pub credits_added: u32,
    /// Summary after the grant.
    pub credits: CreditSummary,
}

/// Apply a purchase to a user's profile (admin only).
pub async fn apply_purchase(
    State(state): State<Arc<AppState>>,
    admin: AdminAuth,
    Json(body): Json<PurchaseRequest>,
) -> Result<Json<PurchaseResponse>, ApiError> {
    let user_id: UserId = body
        .user_id
        .parse()
        .map_err(|_| ApiError::BadRequest("Invalid user_id".into()))?;

    let now = Utc::now();
    let profile = state.store.apply_purchase(&user_id, &body.purchase, now)?;

    tracing::info!(
        admin_id = %admin.admin_id,
        user_id = %user_id,
        purchase = ?body.purchase,
        reference = ?body.reference,
        plan = %profile.plan(),
        "Purchase applied"
    );

    let credit_state = state.ledger.derive_state(Some(&profile), now);

    Ok(Json(PurchaseResponse {
        success: true,
        user_id: user_id.to_string(),
        credits_added: body.purchase.credits(),
        credits: CreditSummary::new(&state.ledger, &credit_state, now),
    }))
}
