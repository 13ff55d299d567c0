//! Placeholder purchases.
//!
//! Payments are not processed here. A purchase is the plan or balance change
//! an operator grants once payment has been confirmed elsewhere.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::LedgerError;
use crate::{BillingMonth, PlanType, ProfileRecord};

/// Top-up credits bundled with a starter pack.
pub const STARTER_PACK_CREDITS: u32 = 5;

/// A plan or balance change granted to a profile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Purchase {
    /// One-off starter pack: moves free users to `STARTER_PACK` and adds bundled top-ups.
    StarterPack,

    /// Bare top-up credits.
    TopUp {
        /// Credits to add.
        credits: u32,
    },

    /// Monthly PRO subscription, starting a fresh month.
    ProSubscription,

    /// Unlimited subscription.
    UnlimitedSubscription,

    /// Subscription cancelled; purchased top-ups are kept.
    Cancellation,
}

impl Purchase {
    /// Reject purchases that would not change anything.
    ///
    /// # Errors
    ///
    /// Returns `LedgerError::InvalidPurchase` for a zero-credit top-up.
    pub fn validate(&self) -> Result<(), LedgerError> {
        match self {
            Self::TopUp { credits: 0 } => Err(LedgerError::InvalidPurchase(
                "top-up must add at least one credit".into(),
            )),
            _ => Ok(()),
        }
    }

    /// Top-up credits this purchase adds.
    #[must_use]
    pub const fn credits(&self) -> u32 {
        match self {
            Self::StarterPack => STARTER_PACK_CREDITS,
            Self::TopUp { credits } => *credits,
            Self::ProSubscription | Self::UnlimitedSubscription | Self::Cancellation => 0,
        }
    }

    /// Apply the grant to a profile row.
    ///
    /// Stored counters are normalized on the way through, so a malformed
    /// negative balance is reset to zero before credits are added.
    ///
    /// # Errors
    ///
    /// Returns `LedgerError::InvalidPurchase` if the purchase is invalid.
    pub fn apply_to(&self, record: &mut ProfileRecord, now: DateTime<Utc>) -> Result<(), LedgerError> {
        self.validate()?;

        let credits = self.credits();
        if credits > 0 {
            let balance = record.credit_topups.unwrap_or(0).max(0);
            record.credit_topups = Some(balance.saturating_add(i64::from(credits)));
        }

        match self {
            Self::StarterPack => {
                // Never downgrade a subscriber who also buys a pack.
                if record.plan().has_lifetime_allowance() {
                    record.set_plan(PlanType::StarterPack);
                }
            }
            Self::ProSubscription => {
                record.set_plan(PlanType::Pro);
                record.pro_month = Some(BillingMonth::of(now).to_string());
                record.pro_used = Some(0);
            }
            Self::UnlimitedSubscription => record.set_plan(PlanType::UnlimitedPro),
            Self::Cancellation => record.set_plan(PlanType::FreeTrial),
            Self::TopUp { .. } => {}
        }

        record.touch(now);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{derive_state, remaining_credits, UserId};

    fn profile(now: DateTime<Utc>) -> ProfileRecord {
        ProfileRecord::new(UserId::generate(), now)
    }

    #[test]
    fn starter_pack_adds_bundled_credits() {
        let now = Utc::now();
        let mut record = profile(now);
        record.search_count = Some(2);

        Purchase::StarterPack.apply_to(&mut record, now).unwrap();

        assert_eq!(record.plan(), PlanType::StarterPack);
        assert_eq!(record.credit_topups, Some(5));
        let state = derive_state(Some(&record), now);
        assert_eq!(remaining_credits(&state, now), 5);
    }

    #[test]
    fn starter_pack_keeps_subscription_plan() {
        let now = Utc::now();
        let mut record = profile(now);
        record.set_plan(PlanType::Pro);

        Purchase::StarterPack.apply_to(&mut record, now).unwrap();

        assert_eq!(record.plan(), PlanType::Pro);
        assert_eq!(record.credit_topups, Some(5));
    }

    #[test]
    fn top_up_repairs_negative_balance() {
        let now = Utc::now();
        let mut record = profile(now);
        record.credit_topups = Some(-4);

        Purchase::TopUp { credits: 3 }.apply_to(&mut record, now).unwrap();

        assert_eq!(record.credit_topups, Some(3));
    }

    #[test]
    fn zero_top_up_is_rejected() {
        let now = Utc::now();
        let mut record = profile(now);
        let err = Purchase::TopUp { credits: 0 }
            .apply_to(&mut record, now)
            .unwrap_err();
        assert!(matches!(err, LedgerError::InvalidPurchase(_)));
        assert_eq!(record.credit_topups, Some(0));
    }

    #[test]
    fn pro_subscription_starts_fresh_month() {
        let now = Utc::now();
        let mut record = profile(now);
        record.pro_month = Some("2020-01".into());
        record.pro_used = Some(10);

        Purchase::ProSubscription.apply_to(&mut record, now).unwrap();

        assert_eq!(record.plan(), PlanType::Pro);
        assert_eq!(record.pro_used, Some(0));
        assert_eq!(record.pro_month, Some(BillingMonth::of(now).to_string()));
    }

    #[test]
    fn cancellation_keeps_topups() {
        let now = Utc::now();
        let mut record = profile(now);
        record.set_plan(PlanType::UnlimitedPro);
        record.credit_topups = Some(6);

        Purchase::Cancellation.apply_to(&mut record, now).unwrap();

        assert_eq!(record.plan(), PlanType::FreeTrial);
        assert_eq!(record.credit_topups, Some(6));
    }

    #[test]
    fn purchase_request_shape() {
        let purchase: Purchase =
            serde_json::from_value(serde_json::json!({"type": "top_up", "credits": 10})).unwrap();
        assert_eq!(purchase, Purchase::TopUp { credits: 10 });
    }
}
