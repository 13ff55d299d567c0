//! Profile storage for estate-credits.
//!
//! The ledger in `estate-credits-core` only computes what should change; this
//! crate persists profiles and applies those changes so that concurrent
//! consumers of one profile never double-spend a credit.
//!
//! # Atomicity
//!
//! [`Store::apply_consumption`] is a compare-and-swap: the store re-derives the
//! credit state from its current row, checks that the values the instruction
//! expects to overwrite are still there, and only then writes. A stale
//! instruction yields [`StoreError::Conflict`]; the caller re-reads, re-plans
//! and tries again.
//!
//! # Backends
//!
//! - [`MemoryStore`]: process-local, for tests and single-instance deployments
//! - [`RocksStore`]: `RocksDB` with column families (feature `rocksdb-backend`)
//!
//! # Example
//!
//! ```
//! use chrono::Utc;
//! use estate_credits_core::{derive_state, plan_consumption, ProfileRecord, UsageRecord, UserId};
//! use estate_credits_store::{MemoryStore, Store};
//!
//! let store = MemoryStore::new();
//! let now = Utc::now();
//! let user_id = UserId::generate();
//! store.create_profile(&ProfileRecord::new(user_id, now)).unwrap();
//!
//! let profile = store.get_profile(&user_id).unwrap();
//! let state = derive_state(profile.as_ref(), now);
//! let instruction = plan_consumption(&state, now).unwrap();
//! let usage = UsageRecord::new(user_id, instruction.source(state.plan), state.plan, "property_report", now);
//! let updated = store.apply_consumption(&user_id, &instruction, &usage, now).unwrap();
//! assert_eq!(updated.search_count, Some(1));
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod error;
#[cfg(feature = "rocksdb-backend")]
pub mod keys;
pub mod memory;
#[cfg(feature = "rocksdb-backend")]
pub mod rocks;
pub mod schema;

pub use error::{Result, StoreError};
pub use memory::MemoryStore;
#[cfg(feature = "rocksdb-backend")]
pub use rocks::RocksStore;

use chrono::{DateTime, Utc};
use estate_credits_core::{
    derive_state, BillingMonth, ConsumptionInstruction, DeviceId, PlanType, ProfileRecord,
    Purchase, UsageRecord, UserId,
};

/// The storage trait defining all database operations.
///
/// This trait abstracts the storage layer, allowing for different implementations
/// (e.g., `RocksDB`, in-memory for testing).
pub trait Store: Send + Sync {
    // =========================================================================
    // Profile Operations
    // =========================================================================

    /// Insert or replace a profile record.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn put_profile(&self, profile: &ProfileRecord) -> Result<()>;

    /// Insert a new profile record.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::AlreadyExists` if the user already has a profile.
    fn create_profile(&self, profile: &ProfileRecord) -> Result<()>;

    /// Get a profile by user ID.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn get_profile(&self, user_id: &UserId) -> Result<Option<ProfileRecord>>;

    /// Get a profile by user ID, first rewriting a missing or malformed month tag
    /// to the month of `now`.
    ///
    /// Consumers should read through this before planning, so a row whose tag
    /// never parsed still rolls over once the calendar moves on.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn settle_profile(
        &self,
        user_id: &UserId,
        now: DateTime<Utc>,
    ) -> Result<Option<ProfileRecord>>;

    // =========================================================================
    // Compound Operations
    // =========================================================================

    /// Apply a consumption instruction and append its usage record atomically.
    ///
    /// `usage.plan` must be the plan the instruction was planned under; the
    /// write is refused if the stored plan has changed since.
    ///
    /// Returns the updated profile.
    ///
    /// # Errors
    ///
    /// - `StoreError::NotFound` if the profile doesn't exist.
    /// - `StoreError::Conflict` if the profile changed since the instruction was planned.
    fn apply_consumption(
        &self,
        user_id: &UserId,
        instruction: &ConsumptionInstruction,
        usage: &UsageRecord,
        now: DateTime<Utc>,
    ) -> Result<ProfileRecord>;

    /// Apply a purchase grant to a profile.
    ///
    /// Returns the updated profile.
    ///
    /// # Errors
    ///
    /// - `StoreError::NotFound` if the profile doesn't exist.
    /// - `StoreError::InvalidPurchase` if the purchase is rejected.
    fn apply_purchase(
        &self,
        user_id: &UserId,
        purchase: &Purchase,
        now: DateTime<Utc>,
    ) -> Result<ProfileRecord>;

    // =========================================================================
    // Usage Log Operations
    // =========================================================================

    /// List usage records for a user, newest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn list_usage_by_user(
        &self,
        user_id: &UserId,
        limit: usize,
        offset: usize,
    ) -> Result<Vec<UsageRecord>>;

    // =========================================================================
    // Device Trial Operations
    // =========================================================================

    /// Number of trial reports a device has used.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn device_trial_uses(&self, device_id: &DeviceId) -> Result<u32>;

    /// Claim one trial report for a device.
    ///
    /// Returns the device's use count after the claim.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::TrialExhausted` if the device has no trial left.
    fn claim_device_trial(&self, device_id: &DeviceId) -> Result<u32>;
}

/// Check an instruction against the current row and write it.
///
/// Callers must hold the backend's write lock for the profile.
pub(crate) fn consume_in_place(
    record: &mut ProfileRecord,
    instruction: &ConsumptionInstruction,
    planned_under: PlanType,
    now: DateTime<Utc>,
) -> Result<()> {
    let current = derive_state(Some(record), now);
    if current.plan != planned_under || !instruction.holds_for(&current) {
        tracing::debug!(
            user_id = %record.user_id,
            instruction = ?instruction,
            planned_under = %planned_under,
            plan = %current.plan,
            "Consumption instruction is stale"
        );
        return Err(StoreError::Conflict {
            user_id: record.user_id.to_string(),
        });
    }

    instruction.apply_to(record);
    repair_month_tag(record, now);
    record.touch(now);
    Ok(())
}

/// Rewrite a missing or unparseable `pro_month` to the month of `now`.
///
/// Returns whether the row changed.
pub(crate) fn repair_month_tag(record: &mut ProfileRecord, now: DateTime<Utc>) -> bool {
    let parses = record
        .pro_month
        .as_deref()
        .is_some_and(|tag| tag.parse::<BillingMonth>().is_ok());
    if parses {
        return false;
    }

    let month = BillingMonth::of(now);
    tracing::info!(
        user_id = %record.user_id,
        stored = ?record.pro_month,
        month = %month,
        "Repairing month tag"
    );
    record.pro_month = Some(month.to_string());
    true
}

/// Apply a purchase to a row, mapping ledger rejections.
pub(crate) fn purchase_in_place(
    record: &mut ProfileRecord,
    purchase: &Purchase,
    now: DateTime<Utc>,
) -> Result<()> {
    purchase
        .apply_to(record, now)
        .map_err(|e| StoreError::InvalidPurchase(e.to_string()))?;
    repair_month_tag(record, now);
    Ok(())
}
