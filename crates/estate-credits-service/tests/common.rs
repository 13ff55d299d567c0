//! Common test utilities for estate-credits integration tests.

#![allow(dead_code)] // Some utilities are used by different test files

use std::sync::Arc;

use axum::http::header::AUTHORIZATION;
use axum::http::{HeaderName, HeaderValue, StatusCode};
use axum::Router;
use axum_test::{TestResponse, TestServer};
use jsonwebtoken::{encode, EncodingKey, Header};
use serde_json::json;

use estate_credits_core::{CreditPolicy, UserId};
use estate_credits_service::{create_router, AppState, ServiceConfig};
use estate_credits_store::{MemoryStore, Store};

pub const JWT_SECRET: &str = "test-secret";
pub const ADMIN_KEY: &str = "test-admin-key";

/// Test harness containing everything needed for integration tests.
pub struct TestHarness {
    /// The test server for making HTTP requests.
    pub server: TestServer,
    /// Direct handle on the backing store.
    pub store: Arc<MemoryStore>,
    /// A test user ID for authenticated requests.
    pub test_user_id: UserId,
}

impl TestHarness {
    /// Create a new test harness with an empty store.
    pub fn new() -> Self {
        Self::with_config(test_config())
    }

    /// Create a harness with custom configuration.
    pub fn with_config(config: ServiceConfig) -> Self {
        let store = Arc::new(MemoryStore::new());
        let dyn_store: Arc<dyn Store> = store.clone();

        let state = AppState::new(dyn_store, config);
        let router: Router = create_router(state);

        let server = TestServer::new(router).expect("Failed to create test server");

        Self {
            server,
            store,
            test_user_id: UserId::generate(),
        }
    }

    /// Get the authorization header for the test user.
    pub fn user_auth_header(&self) -> HeaderValue {
        auth_header_for(&self.test_user_id)
    }

    /// Register the test user's profile.
    pub async fn register(&self) {
        self.server
            .post("/v1/profiles")
            .add_header(AUTHORIZATION, self.user_auth_header())
            .await
            .assert_status(StatusCode::CREATED);
    }

    /// Apply a purchase to the test user.
    pub async fn purchase(&self, purchase: serde_json::Value) {
        self.server
            .post("/v1/admin/purchases")
            .add_header(admin_key_header(), HeaderValue::from_static(ADMIN_KEY))
            .json(&json!({
                "user_id": self.test_user_id.to_string(),
                "purchase": purchase,
            }))
            .await
            .assert_status_ok();
    }

    /// Consume one credit for the test user.
    pub async fn consume(&self) -> TestResponse {
        self.server
            .post("/v1/credits/consume")
            .add_header(AUTHORIZATION, self.user_auth_header())
            .json(&json!({}))
            .await
    }

    /// Fetch the test user's credit summary.
    pub async fn credits(&self) -> serde_json::Value {
        let response = self
            .server
            .get("/v1/credits")
            .add_header(AUTHORIZATION, self.user_auth_header())
            .await;
        response.assert_status_ok();
        response.json()
    }
}

impl Default for TestHarness {
    fn default() -> Self {
        Self::new()
    }
}

/// Configuration with known secrets and the default policy.
pub fn test_config() -> ServiceConfig {
    ServiceConfig {
        listen_addr: "127.0.0.1:0".into(),
        data_dir: "unused".into(),
        jwt_secret: Some(JWT_SECRET.into()),
        jwt_audience: "authenticated".into(),
        admin_api_key: Some(ADMIN_KEY.into()),
        cors_origins: vec!["*".into()],
        max_body_bytes: 64 * 1024,
        request_timeout_seconds: 30,
        credit_policy: CreditPolicy::default(),
        consume_max_attempts: 5,
    }
}

/// The admin key header name.
pub fn admin_key_header() -> HeaderName {
    HeaderName::from_static("x-admin-key")
}

/// The device fingerprint header name.
pub fn device_header() -> HeaderName {
    HeaderName::from_static("x-device-id")
}

/// Mint a bearer header signed with the test secret.
pub fn auth_header_for(user_id: &UserId) -> HeaderValue {
    let claims = json!({
        "sub": user_id.to_string(),
        "aud": "authenticated",
        "exp": chrono::Utc::now().timestamp() + 3600,
    });
    let token = encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(JWT_SECRET.as_bytes()),
    )
    .expect("Failed to sign token");
    HeaderValue::from_str(&format!("Bearer {token}")).expect("Invalid header value")
}
