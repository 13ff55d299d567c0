//! Credit summary and consumption integration tests.

mod common;

use axum::http::header::AUTHORIZATION;
use axum::http::StatusCode;
use chrono::Utc;
use common::{auth_header_for, test_config, TestHarness};
use serde_json::json;

use estate_credits_core::{BillingMonth, CreditPolicy, PlanType, ProfileRecord, UserId};
use estate_credits_store::Store;

// ============================================================================
// Summary
// ============================================================================

#[tokio::test]
async fn anonymous_summary_has_no_credits() {
    let harness = TestHarness::new();

    let response = harness.server.get("/v1/credits").await;

    response.assert_status_ok();
    let body: serde_json::Value = response.json();
    assert_eq!(body["has_account"], false);
    assert_eq!(body["plan"], "FREE_TRIAL");
    assert_eq!(body["remaining_credits"], 0);
    assert_eq!(body["can_perform_action"], false);
    assert_eq!(body["pro_month"], BillingMonth::of(Utc::now()).to_string());
}

#[tokio::test]
async fn summary_rejects_bad_token() {
    let harness = TestHarness::new();

    let response = harness
        .server
        .get("/v1/credits")
        .add_header(
            AUTHORIZATION,
            axum::http::HeaderValue::from_static("Bearer garbage"),
        )
        .await;

    response.assert_status_unauthorized();
}

// ============================================================================
// Free Plan
// ============================================================================

#[tokio::test]
async fn free_plan_consumes_lifetime_allowance_then_refuses() {
    let harness = TestHarness::new();
    harness.register().await;

    for expected_remaining in [1, 0] {
        let response = harness.consume().await;
        response.assert_status_ok();
        let body: serde_json::Value = response.json();
        assert_eq!(body["success"], true);
        assert_eq!(body["source"], "lifetime_allowance");
        assert_eq!(body["credits"]["remaining_credits"], expected_remaining);
    }

    let response = harness.consume().await;
    response.assert_status(StatusCode::PAYMENT_REQUIRED);
    let body: serde_json::Value = response.json();
    assert_eq!(body["error"]["code"], "insufficient_credits");
    assert_eq!(body["error"]["details"]["plan"], "FREE_TRIAL");
    assert_eq!(body["error"]["details"]["free_limit"], 2);
    assert_eq!(body["error"]["details"]["required_topups"], 1);
}

#[tokio::test]
async fn consumption_reports_written_fields() {
    let harness = TestHarness::new();
    harness.register().await;

    let response = harness.consume().await;

    response.assert_status_ok();
    let body: serde_json::Value = response.json();
    assert_eq!(body["updated_fields"], json!({ "search_count": 1 }));
    assert!(body["usage_id"].as_str().is_some_and(|id| !id.is_empty()));
}

#[tokio::test]
async fn unregistered_user_cannot_consume() {
    let harness = TestHarness::new();

    let response = harness.consume().await;

    response.assert_status(StatusCode::PAYMENT_REQUIRED);
    let body: serde_json::Value = response.json();
    assert_eq!(body["error"]["details"]["free_limit"], 0);
}

#[tokio::test]
async fn top_ups_are_drawn_after_allowance() {
    let harness = TestHarness::new();
    harness.register().await;
    harness.purchase(json!({ "type": "top_up", "credits": 1 })).await;

    assert_eq!(harness.credits().await["remaining_credits"], 3);

    let sources: Vec<String> = {
        let mut sources = Vec::new();
        for _ in 0..3 {
            let response = harness.consume().await;
            response.assert_status_ok();
            let body: serde_json::Value = response.json();
            sources.push(body["source"].as_str().unwrap_or_default().to_string());
        }
        sources
    };
    assert_eq!(
        sources,
        ["lifetime_allowance", "lifetime_allowance", "top_up"]
    );

    harness
        .consume()
        .await
        .assert_status(StatusCode::PAYMENT_REQUIRED);
}

#[tokio::test]
async fn starter_pack_adds_top_ups() {
    let harness = TestHarness::new();
    harness.register().await;
    harness.purchase(json!({ "type": "starter_pack" })).await;

    let credits = harness.credits().await;
    assert_eq!(credits["plan"], "STARTER_PACK");
    assert_eq!(credits["credit_topups"], 5);
    assert_eq!(credits["remaining_credits"], 7);
}

// ============================================================================
// Subscriptions
// ============================================================================

#[tokio::test]
async fn pro_plan_uses_monthly_allowance() {
    let harness = TestHarness::new();
    harness.register().await;
    harness.purchase(json!({ "type": "pro_subscription" })).await;

    let credits = harness.credits().await;
    assert_eq!(credits["plan"], "PRO");
    assert_eq!(credits["remaining_credits"], 10);
    assert_eq!(credits["pro_monthly_limit"], 10);

    let response = harness.consume().await;
    response.assert_status_ok();
    let body: serde_json::Value = response.json();
    assert_eq!(body["source"], "monthly_allowance");
    assert_eq!(body["updated_fields"], json!({ "pro_used": 1 }));
    assert_eq!(body["credits"]["remaining_credits"], 9);
}

#[tokio::test]
async fn pro_plan_rolls_over_stale_month() {
    let harness = TestHarness::new();
    let mut profile = ProfileRecord::new(harness.test_user_id, Utc::now());
    profile.set_plan(PlanType::Pro);
    profile.pro_month = Some("2001-01".into());
    profile.pro_used = Some(10);
    harness.store.put_profile(&profile).unwrap();

    assert_eq!(harness.credits().await["remaining_credits"], 10);

    let response = harness.consume().await;
    response.assert_status_ok();
    let body: serde_json::Value = response.json();
    assert_eq!(body["source"], "monthly_allowance");
    assert_eq!(
        body["updated_fields"],
        json!({
            "pro_used": 1,
            "pro_month": BillingMonth::of(Utc::now()).to_string(),
        })
    );
    assert_eq!(body["credits"]["pro_used"], 1);
    assert_eq!(body["credits"]["remaining_credits"], 9);
}

#[tokio::test]
async fn consumption_repairs_missing_month_tag() {
    let harness = TestHarness::new();
    let now = Utc::now();
    let mut profile = ProfileRecord::new(harness.test_user_id, now);
    profile.set_plan(PlanType::Pro);
    profile.pro_month = None;
    profile.pro_used = Some(10);
    harness.store.put_profile(&profile).unwrap();

    harness
        .consume()
        .await
        .assert_status(StatusCode::PAYMENT_REQUIRED);

    let stored = harness
        .store
        .get_profile(&harness.test_user_id)
        .unwrap()
        .unwrap();
    assert_eq!(
        stored.pro_month,
        Some(BillingMonth::of(Utc::now()).to_string())
    );
}

#[tokio::test]
async fn exhausted_pro_month_falls_back_to_top_ups() {
    let harness = TestHarness::new();
    let now = Utc::now();
    let mut profile = ProfileRecord::new(harness.test_user_id, now);
    profile.set_plan(PlanType::Pro);
    profile.pro_used = Some(10);
    profile.credit_topups = Some(1);
    harness.store.put_profile(&profile).unwrap();

    let response = harness.consume().await;
    response.assert_status_ok();
    let body: serde_json::Value = response.json();
    assert_eq!(body["source"], "top_up");

    let response = harness.consume().await;
    response.assert_status(StatusCode::PAYMENT_REQUIRED);
    let body: serde_json::Value = response.json();
    assert_eq!(body["error"]["details"]["plan"], "PRO");
}

#[tokio::test]
async fn unlimited_plan_is_never_gated() {
    let harness = TestHarness::new();
    harness.register().await;
    harness
        .purchase(json!({ "type": "unlimited_subscription" }))
        .await;

    for _ in 0..5 {
        let response = harness.consume().await;
        response.assert_status_ok();
        let body: serde_json::Value = response.json();
        assert_eq!(body["source"], "unlimited");
        assert_eq!(body["credits"]["unlimited"], true);
        assert_eq!(body["credits"]["remaining_credits"], 999_999);
    }

    assert_eq!(harness.credits().await["free_used"], 5);
}

#[tokio::test]
async fn cancellation_keeps_purchased_top_ups() {
    let harness = TestHarness::new();
    harness.register().await;
    harness.purchase(json!({ "type": "pro_subscription" })).await;
    harness.purchase(json!({ "type": "top_up", "credits": 3 })).await;
    harness.purchase(json!({ "type": "cancellation" })).await;

    let credits = harness.credits().await;
    assert_eq!(credits["plan"], "FREE_TRIAL");
    assert_eq!(credits["credit_topups"], 3);
    assert_eq!(credits["remaining_credits"], 5);
}

// ============================================================================
// Concurrency and Policy
// ============================================================================

#[tokio::test]
async fn concurrent_requests_never_overspend() {
    let harness = TestHarness::new();
    harness.register().await;
    harness.purchase(json!({ "type": "top_up", "credits": 1 })).await;

    let (a, b, c, d) = tokio::join!(
        harness.consume(),
        harness.consume(),
        harness.consume(),
        harness.consume()
    );

    let granted = [a, b, c, d]
        .iter()
        .filter(|response| response.status_code() == StatusCode::OK)
        .count();
    assert_eq!(granted, 3);
    assert_eq!(harness.credits().await["remaining_credits"], 0);
}

#[tokio::test]
async fn configured_policy_changes_allowance() {
    let mut config = test_config();
    config.credit_policy = CreditPolicy {
        free_lifetime_allowance: 3,
        pro_monthly_allowance: 10,
    };
    let harness = TestHarness::with_config(config);
    harness.register().await;

    let credits = harness.credits().await;
    assert_eq!(credits["remaining_credits"], 3);
    assert_eq!(credits["free_limit"], 3);
}

// ============================================================================
// Usage Log
// ============================================================================

#[tokio::test]
async fn usage_log_lists_newest_first() {
    let harness = TestHarness::new();
    harness.register().await;
    harness.purchase(json!({ "type": "top_up", "credits": 1 })).await;

    for action in ["property_report", "renovation_image", "comparables"] {
        harness
            .server
            .post("/v1/credits/consume")
            .add_header(AUTHORIZATION, harness.user_auth_header())
            .json(&json!({ "action": action }))
            .await
            .assert_status_ok();
    }

    let response = harness
        .server
        .get("/v1/credits/usage")
        .add_query_param("limit", 2)
        .add_header(AUTHORIZATION, harness.user_auth_header())
        .await;

    response.assert_status_ok();
    let body: serde_json::Value = response.json();
    let usage = body["usage"].as_array().unwrap();
    assert_eq!(usage.len(), 2);
    assert_eq!(usage[0]["action"], "comparables");
    assert_eq!(usage[0]["source"], "top_up");
    assert_eq!(usage[1]["action"], "renovation_image");
    assert_eq!(body["limit"], 2);
}

#[tokio::test]
async fn usage_log_is_per_user() {
    let harness = TestHarness::new();
    harness.register().await;
    harness.consume().await.assert_status_ok();

    let other = UserId::generate();
    let response = harness
        .server
        .get("/v1/credits/usage")
        .add_header(AUTHORIZATION, auth_header_for(&other))
        .await;

    response.assert_status_ok();
    let body: serde_json::Value = response.json();
    assert!(body["usage"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn invalid_action_label_is_rejected() {
    let harness = TestHarness::new();
    harness.register().await;

    let response = harness
        .server
        .post("/v1/credits/consume")
        .add_header(AUTHORIZATION, harness.user_auth_header())
        .json(&json!({ "action": "drop table" }))
        .await;

    response.assert_status_bad_request();
    assert_eq!(harness.credits().await["free_used"], 0);
}
