//! Estate-Credits HTTP API Service.
//!
//! This crate is the calling layer around the credit ledger:
//!
//! - Profile registration
//! - Credit summaries and one-unit consumption with 402 on exhaustion
//! - Anonymous device trials
//! - Operator-applied purchases
//!
//! # Authentication
//!
//! 1. **Auth-provider JWTs** (HS256, `sub` = user id) - for end-user requests
//! 2. **Admin API key** - for purchase grants
//!
//! Device trial routes are unauthenticated and keyed by the `X-Device-Id` header.

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
// Allow some pedantic lints that are noisy for Axum handler functions
#![allow(clippy::missing_errors_doc)] // Axum handlers all return Result
#![allow(clippy::unused_async)] // Handlers over the sync store stay async for the router

pub mod auth;
pub mod config;
pub mod error;
pub mod handlers;
pub mod routes;
pub mod state;

pub use config::ServiceConfig;
pub use error::ApiError;
pub use routes::create_router;
pub use state::AppState;
