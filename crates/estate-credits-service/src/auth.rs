//! Authentication extractors.
//!
//! This module provides extractors for:
//! - `AuthUser` - End-user authentication via auth-provider JWT
//! - `MaybeAuthUser` - Same, but anonymous requests are allowed
//! - `AdminAuth` - Admin authentication for purchase grants
//! - `DeviceFingerprint` - The `X-Device-Id` header for anonymous trials

use std::sync::Arc;

use async_trait::async_trait;
use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use serde::{Deserialize, Serialize};

use estate_credits_core::{DeviceId, UserId};

use crate::error::ApiError;
use crate::state::AppState;

/// An authenticated user extracted from a JWT.
#[derive(Debug, Clone)]
pub struct AuthUser {
    /// The user ID.
    pub user_id: UserId,
}

#[async_trait]
impl FromRequestParts<Arc<AppState>> for AuthUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let token = bearer_token(parts)?.ok_or(ApiError::Unauthorized)?;
        authenticate(token, state)
    }
}

/// A user that may be anonymous.
///
/// No `Authorization` header yields `None`; a header with a bad token is still rejected.
#[derive(Debug, Clone)]
pub struct MaybeAuthUser(pub Option<AuthUser>);

#[async_trait]
impl FromRequestParts<Arc<AppState>> for MaybeAuthUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        match bearer_token(parts)? {
            Some(token) => Ok(Self(Some(authenticate(token, state)?))),
            None => Ok(Self(None)),
        }
    }
}

/// Admin authentication via API key.
///
/// Requires the `X-Admin-Key` header to match the configured admin key.
#[derive(Debug, Clone)]
pub struct AdminAuth {
    /// Admin identifier (for audit logging).
    pub admin_id: String,
}

#[async_trait]
impl FromRequestParts<Arc<AppState>> for AdminAuth {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let admin_key = parts
            .headers
            .get("x-admin-key")
            .and_then(|v| v.to_str().ok())
            .ok_or(ApiError::Unauthorized)?;

        let expected_key = state
            .config
            .admin_api_key
            .as_ref()
            .ok_or(ApiError::Unauthorized)?;

        if admin_key != expected_key {
            return Err(ApiError::Unauthorized);
        }

        let admin_id = parts
            .headers
            .get("x-admin-id")
            .and_then(|v| v.to_str().ok())
            .unwrap_or("admin")
            .to_string();

        tracing::info!(admin_id = %admin_id, "Admin authenticated");

        Ok(Self { admin_id })
    }
}

/// The browser fingerprint sent in `X-Device-Id`.
#[derive(Debug, Clone)]
pub struct DeviceFingerprint(pub DeviceId);

#[async_trait]
impl<S: Send + Sync> FromRequestParts<S> for DeviceFingerprint {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let raw = parts
            .headers
            .get("x-device-id")
            .and_then(|v| v.to_str().ok())
            .ok_or_else(|| ApiError::BadRequest("Missing X-Device-Id header".into()))?;

        raw.parse()
            .map(Self)
            .map_err(|_| ApiError::BadRequest("Invalid device id".into()))
    }
}

/// JWT claims issued by the auth provider.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JwtClaims {
    /// Subject (user ID).
    pub sub: String,
    /// Audience (can be string or array).
    #[serde(default)]
    pub aud: Option<serde_json::Value>,
    /// Expiration time.
    pub exp: i64,
}

/// The bearer token, if an `Authorization` header is present.
fn bearer_token(parts: &Parts) -> Result<Option<&str>, ApiError> {
    let Some(header) = parts.headers.get("authorization") else {
        return Ok(None);
    };

    header
        .to_str()
        .ok()
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(Some)
        .ok_or(ApiError::Unauthorized)
}

/// Validate an HS256 token and extract the user.
fn authenticate(token: &str, state: &AppState) -> Result<AuthUser, ApiError> {
    let secret = state
        .config
        .jwt_secret
        .as_ref()
        .ok_or(ApiError::Unauthorized)?;

    let mut validation = Validation::new(Algorithm::HS256);
    validation.set_audience(&[&state.config.jwt_audience]);

    let token_data = decode::<JwtClaims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &validation,
    )
    .map_err(|e| {
        tracing::debug!(error = %e, "JWT validation failed");
        ApiError::Unauthorized
    })?;

    let user_id = token_data
        .claims
        .sub
        .parse::<UserId>()
        .map_err(|_| ApiError::Unauthorized)?;

    Ok(AuthUser { user_id })
}
