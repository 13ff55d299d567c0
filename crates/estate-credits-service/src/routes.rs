//! Router configuration.
//!
//! This module sets up the Axum router with all routes and middleware.

use std::sync::Arc;
use std::time::Duration;

use axum::routing::{get, post};
use axum::Router;
use tower::limit::ConcurrencyLimitLayer;
use tower_http::cors::{Any, CorsLayer};
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

use crate::handlers::{admin, credits, device_trial, health, profiles};
use crate::state::AppState;

// ============================================================================
// Concurrency Limiting Constants
// ============================================================================

/// Maximum concurrent requests for anonymous device trial endpoints.
const DEVICE_TRIAL_MAX_CONCURRENT_REQUESTS: usize = 20;

/// Maximum concurrent requests for general API endpoints.
const API_MAX_CONCURRENT_REQUESTS: usize = 50;

/// Create the service router with all routes and middleware.
///
/// # Routes
///
/// ## Public
/// - `GET /health` - Health check
///
/// ## Profiles (user JWT)
/// - `POST /v1/profiles` - Register a profile
/// - `GET /v1/profiles/me` - Get the current user's profile
///
/// ## Credits (user JWT; summary also works anonymously)
/// - `GET /v1/credits` - Credit summary
/// - `POST /v1/credits/consume` - Consume one credit
/// - `GET /v1/credits/usage` - Usage log
///
/// ## Device trial (`X-Device-Id`, rate-limited)
/// - `GET /v1/device-trial` - Trial status
/// - `POST /v1/device-trial/consume` - Claim the trial report
///
/// ## Admin (`X-Admin-Key`)
/// - `POST /v1/admin/purchases` - Apply a purchase grant
pub fn create_router(state: AppState) -> Router {
    // Extract config values before moving state
    let cors_origins = state.config.cors_origins.clone();
    let max_body_bytes = state.config.max_body_bytes;
    let request_timeout_seconds = state.config.request_timeout_seconds;

    let cors = build_cors_layer(&cors_origins);

    let state = Arc::new(state);

    // Device trial routes are unauthenticated, so they get a tighter limit.
    let device_trial_routes = Router::new()
        .route("/", get(device_trial::get_device_trial))
        .route("/consume", post(device_trial::consume_device_trial))
        .layer(ConcurrencyLimitLayer::new(
            DEVICE_TRIAL_MAX_CONCURRENT_REQUESTS,
        ));

    let api_routes = Router::new()
        // Profiles
        .route("/profiles", post(profiles::create_profile))
        .route("/profiles/me", get(profiles::get_profile))
        // Credits
        .route("/credits", get(credits::get_credits))
        .route("/credits/consume", post(credits::consume_credit))
        .route("/credits/usage", get(credits::list_usage))
        // Admin
        .route("/admin/purchases", post(admin::apply_purchase))
        // Device trial (with its own concurrency limit)
        .nest("/device-trial", device_trial_routes)
        .layer(ConcurrencyLimitLayer::new(API_MAX_CONCURRENT_REQUESTS));

    Router::new()
        // Health (public, no rate limit)
        .route("/health", get(health::health))
        // API v1 routes (rate limited)
        .nest("/v1", api_routes)
        // Global middleware
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .layer(RequestBodyLimitLayer::new(max_body_bytes))
        .layer(TimeoutLayer::new(Duration::from_secs(
            request_timeout_seconds,
        )))
        .with_state(state)
}

/// Build the CORS layer from configured origins.
fn build_cors_layer(origins: &[String]) -> CorsLayer {
    if origins.iter().any(|o| o == "*") {
        CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any)
    } else {
        let origins: Vec<_> = origins.iter().filter_map(|o| o.parse().ok()).collect();

        CorsLayer::new()
            .allow_origin(origins)
            .allow_methods(Any)
            .allow_headers(Any)
    }
}
