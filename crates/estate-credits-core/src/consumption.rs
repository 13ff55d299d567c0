//! Consumption instructions.
//!
//! The ledger never writes. When an action is allowed it returns the single
//! field change that records one unit of use; the caller persists it. Every
//! instruction carries the value it expects to overwrite so the write can be
//! applied as a compare-and-swap against concurrent consumers of the same profile.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::{BillingMonth, CreditState, PlanType, ProfileRecord};

/// Column names of the profile row touched by instructions.
pub mod columns {
    /// Lifetime usage counter.
    pub const SEARCH_COUNT: &str = "search_count";
    /// Purchased top-up balance.
    pub const CREDIT_TOPUPS: &str = "credit_topups";
    /// PRO month tag.
    pub const PRO_MONTH: &str = "pro_month";
    /// PRO monthly usage counter.
    pub const PRO_USED: &str = "pro_used";
}

/// The single persisted change recording one unit of consumption.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ConsumptionInstruction {
    /// First PRO use in a new month: `pro_used = 1` and `pro_month = month`, together.
    StartProMonth {
        /// The stale month currently stored.
        previous_month: BillingMonth,
        /// The month being started.
        month: BillingMonth,
    },

    /// `pro_used = next`.
    ProUsed {
        /// Expected stored value.
        previous: u32,
        /// Value to write.
        next: u32,
    },

    /// `credit_topups = next`.
    CreditTopups {
        /// Expected stored value.
        previous: u32,
        /// Value to write.
        next: u32,
    },

    /// `search_count = next`.
    SearchCount {
        /// Expected stored value.
        previous: u32,
        /// Value to write.
        next: u32,
    },
}

impl ConsumptionInstruction {
    /// Whether the values this instruction expects to overwrite still hold in `state`.
    ///
    /// A store applying the instruction must reject it when this returns false;
    /// another writer got there first and the caller has to plan again.
    #[must_use]
    pub fn holds_for(&self, state: &CreditState) -> bool {
        match *self {
            Self::StartProMonth { previous_month, .. } => state.pro_month == previous_month,
            Self::ProUsed { previous, .. } => state.pro_used == previous,
            Self::CreditTopups { previous, .. } => state.credit_topups == previous,
            Self::SearchCount { previous, .. } => state.free_used == previous,
        }
    }

    /// Project the instruction onto a snapshot.
    #[must_use]
    pub fn apply(&self, state: &CreditState) -> CreditState {
        let mut next_state = state.clone();
        match *self {
            Self::StartProMonth { month, .. } => {
                next_state.pro_month = month;
                next_state.pro_used = 1;
            }
            Self::ProUsed { next, .. } => next_state.pro_used = next,
            Self::CreditTopups { next, .. } => next_state.credit_topups = next,
            Self::SearchCount { next, .. } => next_state.free_used = next,
        }
        next_state
    }

    /// Write the instruction into a profile row.
    pub fn apply_to(&self, record: &mut ProfileRecord) {
        match *self {
            Self::StartProMonth { month, .. } => {
                record.pro_month = Some(month.to_string());
                record.pro_used = Some(1);
            }
            Self::ProUsed { next, .. } => record.pro_used = Some(i64::from(next)),
            Self::CreditTopups { next, .. } => record.credit_topups = Some(i64::from(next)),
            Self::SearchCount { next, .. } => record.search_count = Some(i64::from(next)),
        }
    }

    /// Column values to write, for callers that patch a remote row.
    #[must_use]
    pub fn field_updates(&self) -> Map<String, Value> {
        let mut fields = Map::new();
        match *self {
            Self::StartProMonth { month, .. } => {
                fields.insert(columns::PRO_USED.into(), Value::from(1));
                fields.insert(columns::PRO_MONTH.into(), Value::from(month.to_string()));
            }
            Self::ProUsed { next, .. } => {
                fields.insert(columns::PRO_USED.into(), Value::from(next));
            }
            Self::CreditTopups { next, .. } => {
                fields.insert(columns::CREDIT_TOPUPS.into(), Value::from(next));
            }
            Self::SearchCount { next, .. } => {
                fields.insert(columns::SEARCH_COUNT.into(), Value::from(next));
            }
        }
        fields
    }

    /// Which pool the unit is drawn from, given the plan it was planned under.
    #[must_use]
    pub const fn source(&self, plan: PlanType) -> CreditSource {
        match self {
            Self::StartProMonth { .. } | Self::ProUsed { .. } => CreditSource::MonthlyAllowance,
            Self::CreditTopups { .. } => CreditSource::TopUp,
            Self::SearchCount { .. } => {
                if plan.is_unlimited() {
                    CreditSource::Unlimited
                } else {
                    CreditSource::LifetimeAllowance
                }
            }
        }
    }
}

/// The pool a consumed unit was drawn from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CreditSource {
    /// PRO monthly allowance.
    MonthlyAllowance,

    /// Lifetime registration allowance.
    LifetimeAllowance,

    /// Purchased top-up credit.
    TopUp,

    /// Unlimited plan; tracked, never gated.
    Unlimited,
}

impl CreditSource {
    /// Get the source name as a string.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::MonthlyAllowance => "monthly_allowance",
            Self::LifetimeAllowance => "lifetime_allowance",
            Self::TopUp => "top_up",
            Self::Unlimited => "unlimited",
        }
    }
}
