//! The credit ledger calculator.
//!
//! Everything here is pure: the caller supplies the profile snapshot and the
//! current time, and gets back numbers or a [`ConsumptionInstruction`]. A
//! denied action is `false` / `None`, never an error.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{
    BillingMonth, ConsumptionInstruction, PlanType, ProfileRecord, FREE_LIFETIME_ALLOWANCE,
    PRO_MONTHLY_ALLOWANCE,
};

/// Sentinel returned by `remaining_credits` for `UNLIMITED_PRO`.
///
/// It is not a real balance. Check [`CreditState::is_unlimited`] rather than
/// comparing against this number.
pub const UNLIMITED_CREDITS: u64 = 999_999;

/// Normalized credit snapshot derived from a profile row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreditState {
    /// Lifetime free actions already consumed (`search_count`).
    pub free_used: u32,

    /// Whether the actor has a profile row.
    pub has_account: bool,

    /// Purchased top-up balance.
    pub credit_topups: u32,

    /// Current plan.
    pub plan: PlanType,

    /// Month that `pro_used` applies to.
    pub pro_month: BillingMonth,

    /// PRO actions consumed during `pro_month`.
    pub pro_used: u32,
}

impl CreditState {
    /// The state of an actor without a profile.
    #[must_use]
    pub fn anonymous(now: DateTime<Utc>) -> Self {
        Self {
            free_used: 0,
            has_account: false,
            credit_topups: 0,
            plan: PlanType::FreeTrial,
            pro_month: BillingMonth::of(now),
            pro_used: 0,
        }
    }

    /// Whether the plan is never gated.
    #[must_use]
    pub const fn is_unlimited(&self) -> bool {
        self.plan.is_unlimited()
    }
}

/// Allowance sizes the ledger applies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreditPolicy {
    /// Lifetime free actions granted on registration.
    pub free_lifetime_allowance: u32,

    /// PRO actions available per calendar month.
    pub pro_monthly_allowance: u32,
}

impl Default for CreditPolicy {
    fn default() -> Self {
        Self {
            free_lifetime_allowance: FREE_LIFETIME_ALLOWANCE,
            pro_monthly_allowance: PRO_MONTHLY_ALLOWANCE,
        }
    }
}

/// Credit ledger bound to a [`CreditPolicy`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CreditLedger {
    policy: CreditPolicy,
}

impl CreditLedger {
    /// Create a ledger applying `policy`.
    #[must_use]
    pub const fn new(policy: CreditPolicy) -> Self {
        Self { policy }
    }

    /// The policy in effect.
    #[must_use]
    pub const fn policy(&self) -> &CreditPolicy {
        &self.policy
    }

    /// Build a snapshot from a profile row, or the anonymous default when absent.
    ///
    /// Missing counters read as zero, negative counters are clamped to zero,
    /// an unknown plan reads as `FREE_TRIAL` and a missing or malformed month
    /// tag reads as the month of `now`. This never fails.
    #[must_use]
    pub fn derive_state(&self, profile: Option<&ProfileRecord>, now: DateTime<Utc>) -> CreditState {
        let Some(profile) = profile else {
            return CreditState::anonymous(now);
        };

        CreditState {
            free_used: counter(profile.search_count),
            has_account: true,
            credit_topups: counter(profile.credit_topups),
            plan: profile.plan(),
            pro_month: profile
                .pro_month
                .as_deref()
                .and_then(|tag| tag.parse().ok())
                .unwrap_or_else(|| BillingMonth::of(now)),
            pro_used: counter(profile.pro_used),
        }
    }

    /// Credits the actor can still spend.
    ///
    /// Returns [`UNLIMITED_CREDITS`] for `UNLIMITED_PRO`.
    #[must_use]
    pub fn remaining_credits(&self, state: &CreditState, now: DateTime<Utc>) -> u64 {
        let topups = u64::from(state.credit_topups);
        match state.plan {
            PlanType::Pro => u64::from(self.monthly_remaining(state, now)) + topups,
            PlanType::UnlimitedPro => UNLIMITED_CREDITS,
            PlanType::FreeTrial | PlanType::StarterPack => {
                u64::from(self.lifetime_remaining(state)) + topups
            }
        }
    }

    /// Whether at least one credit is available.
    #[must_use]
    pub fn can_perform_action(&self, state: &CreditState, now: DateTime<Utc>) -> bool {
        self.remaining_credits(state, now) > 0
    }

    /// The write that records one unit of consumption, or `None` if nothing is left.
    ///
    /// Tier allowances are drawn before top-ups. The caller must apply the
    /// instruction atomically with respect to other consumers of the same profile.
    #[must_use]
    pub fn plan_consumption(
        &self,
        state: &CreditState,
        now: DateTime<Utc>,
    ) -> Option<ConsumptionInstruction> {
        match state.plan {
            PlanType::Pro => {
                let month = BillingMonth::of(now);
                if self.policy.pro_monthly_allowance == 0 {
                    return Self::draw_topup(state);
                }
                if state.pro_month != month {
                    return Some(ConsumptionInstruction::StartProMonth {
                        previous_month: state.pro_month,
                        month,
                    });
                }
                if state.pro_used < self.policy.pro_monthly_allowance {
                    return Some(ConsumptionInstruction::ProUsed {
                        previous: state.pro_used,
                        next: state.pro_used + 1,
                    });
                }
                Self::draw_topup(state)
            }
            PlanType::UnlimitedPro => Some(ConsumptionInstruction::SearchCount {
                previous: state.free_used,
                next: state.free_used.saturating_add(1),
            }),
            PlanType::FreeTrial | PlanType::StarterPack => {
                if state.free_used < self.lifetime_allowance(state) {
                    return Some(ConsumptionInstruction::SearchCount {
                        previous: state.free_used,
                        next: state.free_used + 1,
                    });
                }
                Self::draw_topup(state)
            }
        }
    }

    /// Lifetime allowance: the registration bonus, or nothing for anonymous actors.
    #[must_use]
    pub const fn lifetime_allowance(&self, state: &CreditState) -> u32 {
        if state.has_account {
            self.policy.free_lifetime_allowance
        } else {
            0
        }
    }

    fn lifetime_remaining(&self, state: &CreditState) -> u32 {
        self.lifetime_allowance(state).saturating_sub(state.free_used)
    }

    fn monthly_remaining(&self, state: &CreditState, now: DateTime<Utc>) -> u32 {
        // A stale month tag means the stored counter belongs to an earlier month.
        let used = if state.pro_month.is_current(now) {
            state.pro_used
        } else {
            0
        };
        self.policy.pro_monthly_allowance.saturating_sub(used)
    }

    fn draw_topup(state: &CreditState) -> Option<ConsumptionInstruction> {
        (state.credit_topups > 0).then(|| ConsumptionInstruction::CreditTopups {
            previous: state.credit_topups,
            next: state.credit_topups - 1,
        })
    }
}

/// [`CreditLedger::derive_state`] under the default policy.
#[must_use]
pub fn derive_state(profile: Option<&ProfileRecord>, now: DateTime<Utc>) -> CreditState {
    CreditLedger::default().derive_state(profile, now)
}

/// [`CreditLedger::remaining_credits`] under the default policy.
#[must_use]
pub fn remaining_credits(state: &CreditState, now: DateTime<Utc>) -> u64 {
    CreditLedger::default().remaining_credits(state, now)
}

/// [`CreditLedger::can_perform_action`] under the default policy.
#[must_use]
pub fn can_perform_action(state: &CreditState, now: DateTime<Utc>) -> bool {
    CreditLedger::default().can_perform_action(state, now)
}

/// [`CreditLedger::plan_consumption`] under the default policy.
#[must_use]
pub fn plan_consumption(state: &CreditState, now: DateTime<Utc>) -> Option<ConsumptionInstruction> {
    CreditLedger::default().plan_consumption(state, now)
}

fn counter(value: Option<i64>) -> u32 {
    u32::try_from(value.unwrap_or(0).max(0)).unwrap_or(u32::MAX)
}
