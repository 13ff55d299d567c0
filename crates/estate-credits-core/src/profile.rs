//! Persisted profile rows.
//!
//! A `ProfileRecord` mirrors the `profiles` table as the hosted database hands
//! it over: every credit column is optional and may hold values written by
//! older clients. Normalization happens in [`crate::ledger::derive_state`], not here.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{BillingMonth, PlanType, UserId};

/// A user's profile row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProfileRecord {
    /// The owning user.
    pub user_id: UserId,

    /// Lifetime count of gated actions (free allowance usage, analytics for unlimited plans).
    #[serde(default)]
    pub search_count: Option<i64>,

    /// Purchased top-up balance.
    #[serde(default)]
    pub credit_topups: Option<i64>,

    /// Stored plan name (`FREE_TRIAL`, `STARTER_PACK`, `PRO`, `UNLIMITED_PRO`).
    #[serde(default)]
    pub plan_type: Option<String>,

    /// Month tag (`YYYY-MM`) that `pro_used` belongs to.
    #[serde(default)]
    pub pro_month: Option<String>,

    /// PRO reports consumed during `pro_month`.
    #[serde(default)]
    pub pro_used: Option<i64>,

    /// When the row was created.
    pub created_at: DateTime<Utc>,

    /// When the row was last written.
    pub updated_at: DateTime<Utc>,
}

impl ProfileRecord {
    /// A freshly registered profile on the free plan.
    #[must_use]
    pub fn new(user_id: UserId, now: DateTime<Utc>) -> Self {
        Self {
            user_id,
            search_count: Some(0),
            credit_topups: Some(0),
            plan_type: Some(PlanType::FreeTrial.as_str().to_string()),
            pro_month: Some(BillingMonth::of(now).to_string()),
            pro_used: Some(0),
            created_at: now,
            updated_at: now,
        }
    }

    /// The stored plan, falling back to `FreeTrial` for unknown values.
    #[must_use]
    pub fn plan(&self) -> PlanType {
        PlanType::from_stored(self.plan_type.as_deref())
    }

    /// Overwrite the stored plan.
    pub fn set_plan(&mut self, plan: PlanType) {
        self.plan_type = Some(plan.as_str().to_string());
    }

    /// Record a write at `now`.
    pub fn touch(&mut self, now: DateTime<Utc>) {
        self.updated_at = now;
    }
}
