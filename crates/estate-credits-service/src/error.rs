//! API error types and responses.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

use estate_credits_core::PlanType;
use estate_credits_store::StoreError;

/// API error type.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// Unauthorized - missing or invalid credentials.
    #[error("unauthorized")]
    Unauthorized,

    /// Resource not found.
    #[error("not found: {0}")]
    NotFound(String),

    /// Bad request - invalid input.
    #[error("bad request: {0}")]
    BadRequest(String),

    /// Conflict - resource already exists or the update lost a race.
    #[error("conflict: {0}")]
    Conflict(String),

    /// No credit source is left for the gated action.
    #[error("insufficient credits on plan {plan}")]
    InsufficientCredits {
        /// Plan in effect.
        plan: PlanType,
        /// Lifetime free allowance for the actor.
        free_limit: u32,
        /// Top-up credits needed to run the action.
        required_topups: u32,
    },

    /// The device already used its anonymous trial.
    #[error("device trial already used")]
    TrialExhausted,

    /// Internal server error.
    #[error("internal error: {0}")]
    Internal(String),
}

/// JSON error response body.
#[derive(Debug, Serialize)]
struct ErrorResponse {
    error: ErrorBody,
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    code: String,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<serde_json::Value>,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code, message, details) = match &self {
            Self::Unauthorized => (
                StatusCode::UNAUTHORIZED,
                "unauthorized",
                self.to_string(),
                None,
            ),
            Self::NotFound(msg) => (StatusCode::NOT_FOUND, "not_found", msg.clone(), None),
            Self::BadRequest(msg) => (StatusCode::BAD_REQUEST, "bad_request", msg.clone(), None),
            Self::Conflict(msg) => (StatusCode::CONFLICT, "conflict", msg.clone(), None),
            Self::InsufficientCredits {
                plan,
                free_limit,
                required_topups,
            } => (
                StatusCode::PAYMENT_REQUIRED,
                "insufficient_credits",
                self.to_string(),
                Some(serde_json::json!({
                    "plan": plan,
                    "free_limit": free_limit,
                    "required_topups": required_topups
                })),
            ),
            Self::TrialExhausted => (
                StatusCode::PAYMENT_REQUIRED,
                "trial_exhausted",
                "This device has already used its free trial".to_string(),
                None,
            ),
            Self::Internal(msg) => {
                tracing::error!(error = %msg, "Internal server error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal_error",
                    "An internal error occurred".to_string(),
                    None,
                )
            }
        };

        let body = ErrorResponse {
            error: ErrorBody {
                code: code.to_string(),
                message,
                details,
            },
        };

        (status, Json(body)).into_response()
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound { entity, id } => Self::NotFound(format!("{entity} not found: {id}")),
            StoreError::AlreadyExists { entity, id } => {
                Self::Conflict(format!("{entity} already exists: {id}"))
            }
            StoreError::Conflict { user_id } => {
                Self::Conflict(format!("concurrent update on profile {user_id}"))
            }
            StoreError::TrialExhausted { .. } => Self::TrialExhausted,
            StoreError::InvalidPurchase(msg) => Self::BadRequest(msg),
            StoreError::Database(msg) | StoreError::Serialization(msg) => Self::Internal(msg),
        }
    }
}
