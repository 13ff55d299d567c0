//! Subscription tiers.

use std::fmt;

use serde::{Deserialize, Serialize};

// ============================================================================
// Constants
// ============================================================================

/// Lifetime free reports granted once on registration.
pub const FREE_LIFETIME_ALLOWANCE: u32 = 2;

/// PRO reports available per calendar month.
pub const PRO_MONTHLY_ALLOWANCE: u32 = 10;

/// Subscription tier governing which allowance formula applies.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PlanType {
    /// Registered or anonymous user without a paid plan.
    #[default]
    FreeTrial,

    /// One-off pack purchase: lifetime allowance plus bundled top-ups.
    StarterPack,

    /// Monthly subscription with a fixed per-month allowance.
    Pro,

    /// Subscription that is never gated.
    UnlimitedPro,
}

impl PlanType {
    /// Interpret a stored `plan_type` column.
    ///
    /// Unknown or empty values fall back to `FreeTrial`, the least privileged tier.
    #[must_use]
    pub fn from_stored(value: Option<&str>) -> Self {
        match value.map(str::trim) {
            Some("STARTER_PACK") => Self::StarterPack,
            Some("PRO") => Self::Pro,
            Some("UNLIMITED_PRO") => Self::UnlimitedPro,
            _ => Self::FreeTrial,
        }
    }

    /// The stored column value for this plan.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::FreeTrial => "FREE_TRIAL",
            Self::StarterPack => "STARTER_PACK",
            Self::Pro => "PRO",
            Self::UnlimitedPro => "UNLIMITED_PRO",
        }
    }

    /// Whether usage draws from a monthly allowance.
    #[must_use]
    pub const fn has_monthly_allowance(&self) -> bool {
        matches!(self, Self::Pro)
    }

    /// Whether usage draws from the lifetime registration allowance.
    #[must_use]
    pub const fn has_lifetime_allowance(&self) -> bool {
        matches!(self, Self::FreeTrial | Self::StarterPack)
    }

    /// Whether the plan is never gated.
    #[must_use]
    pub const fn is_unlimited(&self) -> bool {
        matches!(self, Self::UnlimitedPro)
    }
}

impl fmt::Display for PlanType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stored_values_map_to_plans() {
        assert_eq!(PlanType::from_stored(Some("PRO")), PlanType::Pro);
        assert_eq!(PlanType::from_stored(Some("STARTER_PACK")), PlanType::StarterPack);
        assert_eq!(PlanType::from_stored(Some("UNLIMITED_PRO")), PlanType::UnlimitedPro);
        assert_eq!(PlanType::from_stored(Some("FREE_TRIAL")), PlanType::FreeTrial);
    }

    #[test]
    fn unknown_or_missing_plan_is_free_trial() {
        assert_eq!(PlanType::from_stored(None), PlanType::FreeTrial);
        assert_eq!(PlanType::from_stored(Some("")), PlanType::FreeTrial);
        assert_eq!(PlanType::from_stored(Some("pro")), PlanType::FreeTrial);
        assert_eq!(PlanType::from_stored(Some("ENTERPRISE")), PlanType::FreeTrial);
    }

    #[test]
    fn serde_uses_stored_names() {
        let json = serde_json::to_string(&PlanType::UnlimitedPro).unwrap();
        assert_eq!(json, "\"UNLIMITED_PRO\"");
        let plan: PlanType = serde_json::from_str("\"STARTER_PACK\"").unwrap();
        assert_eq!(plan, PlanType::StarterPack);
    }

    #[test]
    fn allowance_kinds_are_exclusive() {
        for plan in [
            PlanType::FreeTrial,
            PlanType::StarterPack,
            PlanType::Pro,
            PlanType::UnlimitedPro,
        ] {
            let kinds = [
                plan.has_monthly_allowance(),
                plan.has_lifetime_allowance(),
                plan.is_unlimited(),
            ];
            assert_eq!(kinds.iter().filter(|k| **k).count(), 1, "{plan}");
        }
    }
}
