//! Usage log entries.
//!
//! Every unit a profile consumes is also appended to a per-user log, kept for
//! analytics and support (unlimited plans are never gated but still show up here).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{CreditSource, PlanType, UsageId, UserId};

/// One consumed unit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UsageRecord {
    /// Unique, time-ordered ID.
    pub id: UsageId,

    /// The user charged.
    pub user_id: UserId,

    /// Pool the unit was drawn from.
    pub source: CreditSource,

    /// Plan in effect when the unit was consumed.
    pub plan: PlanType,

    /// What the unit paid for (e.g. `property_report`, `renovation_image`).
    pub action: String,

    /// When the unit was consumed.
    pub created_at: DateTime<Utc>,
}

impl UsageRecord {
    /// Create a new usage record.
    #[must_use]
    pub fn new(
        user_id: UserId,
        source: CreditSource,
        plan: PlanType,
        action: impl Into<String>,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: UsageId::generate(),
            user_id,
            source,
            plan,
            action: action.into(),
            created_at,
        }
    }
}
