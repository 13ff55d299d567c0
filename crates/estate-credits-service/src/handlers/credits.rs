//! Credit summary and consumption handlers.

use std::sync::Arc;

use axum::extract::{Query, State};
use axum::Json;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use estate_credits_core::{
    BillingMonth, CreditLedger, CreditSource, CreditState, PlanType, UsageRecord,
};
use estate_credits_store::StoreError;

use crate::auth::{AuthUser, MaybeAuthUser};
use crate::error::ApiError;
use crate::state::AppState;

// ============================================================================
// Constants
// ============================================================================

/// Action label recorded when the client does not name one.
const DEFAULT_ACTION: &str = "property_report";

/// Longest accepted action label.
const MAX_ACTION_LEN: usize = 64;

/// Default page size for the usage log.
const DEFAULT_USAGE_LIMIT: usize = 50;

/// Largest page size for the usage log.
const MAX_USAGE_LIMIT: usize = 200;

/// Credit summary for one actor.
#[derive(Debug, Serialize)]
pub struct CreditSummary {
    /// Whether the actor has a profile.
    pub has_account: bool,
    /// Current plan.
    pub plan: PlanType,
    /// Credits left (a sentinel for unlimited plans; check `unlimited`).
    pub remaining_credits: u64,
    /// Whether the plan is never gated.
    pub unlimited: bool,
    /// Whether a gated action may run now.
    pub can_perform_action: bool,
    /// Lifetime free actions used.
    pub free_used: u32,
    /// Lifetime free allowance for this actor.
    pub free_limit: u32,
    /// Purchased top-up balance.
    pub credit_topups: u32,
    /// Current billing month.
    pub pro_month: BillingMonth,
    /// PRO actions used this month.
    pub pro_used: u32,
    /// PRO monthly allowance, for PRO plans.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pro_monthly_limit: Option<u32>,
}

impl CreditSummary {
    /// Summarize `state` as of `now`.
    #[must_use]
    pub fn new(ledger: &CreditLedger, state: &CreditState, now: DateTime<Utc>) -> Self {
        let month = BillingMonth::of(now);
        let pro_used = if state.pro_month == month {
            state.pro_used
        } else {
            0
        };

        Self {
            has_account: state.has_account,
            plan: state.plan,
            remaining_credits: ledger.remaining_credits(state, now),
            unlimited: state.is_unlimited(),
            can_perform_action: ledger.can_perform_action(state, now),
            free_used: state.free_used,
            free_limit: free_limit(ledger, state),
            credit_topups: state.credit_topups,
            pro_month: month,
            pro_used,
            pro_monthly_limit: state
                .plan
                .has_monthly_allowance()
                .then_some(ledger.policy().pro_monthly_allowance),
        }
    }
}

/// Get the caller's credit summary (anonymous defaults without a token).
pub async fn get_credits(
    State(state): State<Arc<AppState>>,
    MaybeAuthUser(auth): MaybeAuthUser,
) -> Result<Json<CreditSummary>, ApiError> {
    let now = Utc::now();
    let profile = match &auth {
        Some(user) => state.store.get_profile(&user.user_id)?,
        None => None,
    };

    let credit_state = state.ledger.derive_state(profile.as_ref(), now);
    Ok(Json(CreditSummary::new(&state.ledger, &credit_state, now)))
}

/// Consume request.
#[derive(Debug, Default, Deserialize)]
pub struct ConsumeRequest {
    /// What the credit pays for (default: `property_report`).
    #[serde(default)]
    pub action: Option<String>,
}

/// Consume response.
#[derive(Debug, Serialize)]
pub struct ConsumeResponse {
    /// Whether a credit was consumed.
    pub success: bool,
    /// Pool the credit was drawn from.
    pub source: CreditSource,
    /// Usage log entry ID.
    pub usage_id: String,
    /// Columns written on the profile.
    pub updated_fields: serde_json::Map<String, serde_json::Value>,
    /// Summary after consumption.
    pub credits: CreditSummary,
}

/// Consume one credit for a gated action.
///
/// Plans the write, applies it as a compare-and-swap and re-plans when another
/// request for the same profile got there first.
pub async fn consume_credit(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    Json(body): Json<ConsumeRequest>,
) -> Result<Json<ConsumeResponse>, ApiError> {
    let action = parse_action(body.action)?;
    let max_attempts = state.config.consume_max_attempts;

    for attempt in 1..=max_attempts {
        let now = Utc::now();
        let profile = state.store.settle_profile(&auth.user_id, now)?;
        let credit_state = state.ledger.derive_state(profile.as_ref(), now);

        let Some(instruction) = state.ledger.plan_consumption(&credit_state, now) else {
            tracing::info!(
                user_id = %auth.user_id,
                plan = %credit_state.plan,
                has_account = credit_state.has_account,
                "Credits exhausted"
            );
            return Err(insufficient_credits(&state.ledger, &credit_state));
        };

        let source = instruction.source(credit_state.plan);
        let usage = UsageRecord::new(auth.user_id, source, credit_state.plan, action.clone(), now);

        match state
            .store
            .apply_consumption(&auth.user_id, &instruction, &usage, now)
        {
            Ok(updated) => {
                let after = state.ledger.derive_state(Some(&updated), now);

                tracing::info!(
                    user_id = %auth.user_id,
                    source = source.as_str(),
                    action = %action,
                    usage_id = %usage.id,
                    "Credit consumed"
                );

                return Ok(Json(ConsumeResponse {
                    success: true,
                    source,
                    usage_id: usage.id.to_string(),
                    updated_fields: instruction.field_updates(),
                    credits: CreditSummary::new(&state.ledger, &after, now),
                }));
            }
            Err(StoreError::Conflict { .. }) => {
                tracing::debug!(
                    user_id = %auth.user_id,
                    attempt,
                    "Concurrent profile update, re-planning consumption"
                );
                tokio::task::yield_now().await;
            }
            Err(e) => return Err(e.into()),
        }
    }

    tracing::warn!(
        user_id = %auth.user_id,
        attempts = max_attempts,
        "Consumption abandoned after repeated conflicts"
    );
    Err(ApiError::Conflict(
        "Too many concurrent updates, please retry".into(),
    ))
}

/// Usage log query parameters.
#[derive(Debug, Deserialize)]
pub struct UsageQuery {
    /// Page size.
    pub limit: Option<usize>,
    /// Records to skip.
    pub offset: Option<usize>,
}

/// Usage log response.
#[derive(Debug, Serialize)]
pub struct UsageListResponse {
    /// Records, newest first.
    pub usage: Vec<UsageRecord>,
    /// Page size applied.
    pub limit: usize,
    /// Offset applied.
    pub offset: usize,
}

/// List the caller's usage log.
pub async fn list_usage(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    Query(query): Query<UsageQuery>,
) -> Result<Json<UsageListResponse>, ApiError> {
    let limit = query
        .limit
        .unwrap_or(DEFAULT_USAGE_LIMIT)
        .clamp(1, MAX_USAGE_LIMIT);
    let offset = query.offset.unwrap_or(0);

    let usage = state
        .store
        .list_usage_by_user(&auth.user_id, limit, offset)?;

    Ok(Json(UsageListResponse {
        usage,
        limit,
        offset,
    }))
}

// ============================================================================
// Helper Functions
// ============================================================================

fn parse_action(action: Option<String>) -> Result<String, ApiError> {
    let Some(action) = action else {
        return Ok(DEFAULT_ACTION.to_string());
    };

    let action = action.trim();
    if action.is_empty()
        || action.len() > MAX_ACTION_LEN
        || !action
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
    {
        return Err(ApiError::BadRequest("Invalid action label".into()));
    }
    Ok(action.to_string())
}

fn free_limit(ledger: &CreditLedger, state: &CreditState) -> u32 {
    if state.plan.has_lifetime_allowance() {
        ledger.lifetime_allowance(state)
    } else {
        0
    }
}

fn insufficient_credits(ledger: &CreditLedger, state: &CreditState) -> ApiError {
    ApiError::InsufficientCredits {
        plan: state.plan,
        free_limit: free_limit(ledger, state),
        required_topups: 1,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn action_defaults_and_validates() {
        assert_eq!(parse_action(None).unwrap(), "property_report");
        assert_eq!(
            parse_action(Some(" renovation_image ".into())).unwrap(),
            "renovation_image"
        );
        assert!(parse_action(Some(String::new())).is_err());
        assert!(parse_action(Some("drop table".into())).is_err());
        assert!(parse_action(Some("a".repeat(65))).is_err());
    }

    #[test]
    fn summary_reports_effective_monthly_usage() {
        let ledger = CreditLedger::default();
        let now = Utc::now();
        let state = CreditState {
            free_used: 0,
            has_account: true,
            credit_topups: 1,
            plan: PlanType::Pro,
            pro_month: "2001-01".parse().unwrap(),
            pro_used: 10,
        };

        let summary = CreditSummary::new(&ledger, &state, now);
        assert_eq!(summary.pro_used, 0);
        assert_eq!(summary.remaining_credits, 11);
        assert_eq!(summary.pro_monthly_limit, Some(10));
        assert_eq!(summary.free_limit, 0);
        assert!(summary.can_perform_action);
    }
}
