//! In-memory storage implementation.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use chrono::{DateTime, Utc};
use estate_credits_core::{
    trial_available, ConsumptionInstruction, DeviceId, ProfileRecord, Purchase, UsageRecord,
    UserId,
};

use crate::error::{Result, StoreError};
use crate::{consume_in_place, purchase_in_place, repair_month_tag, Store};

#[derive(Default)]
struct Tables {
    profiles: HashMap<UserId, ProfileRecord>,
    usage: HashMap<UserId, Vec<UsageRecord>>,
    device_trials: HashMap<DeviceId, u32>,
}

/// Process-local storage behind a single mutex.
#[derive(Default)]
pub struct MemoryStore {
    tables: Mutex<Tables>,
}

impl MemoryStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, Tables>> {
        self.tables
            .lock()
            .map_err(|_| StoreError::Database("memory store lock poisoned".into()))
    }
}

impl Store for MemoryStore {
    fn put_profile(&self, profile: &ProfileRecord) -> Result<()> {
        self.lock()?
            .profiles
            .insert(profile.user_id, profile.clone());
        Ok(())
    }

    fn create_profile(&self, profile: &ProfileRecord) -> Result<()> {
        let mut tables = self.lock()?;
        if tables.profiles.contains_key(&profile.user_id) {
            return Err(StoreError::AlreadyExists {
                entity: "profile",
                id: profile.user_id.to_string(),
            });
        }
        tables.profiles.insert(profile.user_id, profile.clone());
        Ok(())
    }

    fn get_profile(&self, user_id: &UserId) -> Result<Option<ProfileRecord>> {
        Ok(self.lock()?.profiles.get(user_id).cloned())
    }

    fn settle_profile(
        &self,
        user_id: &UserId,
        now: DateTime<Utc>,
    ) -> Result<Option<ProfileRecord>> {
        let mut tables = self.lock()?;
        let Some(record) = tables.profiles.get_mut(user_id) else {
            return Ok(None);
        };

        if repair_month_tag(record, now) {
            record.touch(now);
        }
        Ok(Some(record.clone()))
    }

    fn apply_consumption(
        &self,
        user_id: &UserId,
        instruction: &ConsumptionInstruction,
        usage: &UsageRecord,
        now: DateTime<Utc>,
    ) -> Result<ProfileRecord> {
        let mut tables = self.lock()?;
        let record = tables
            .profiles
            .get_mut(user_id)
            .ok_or_else(|| StoreError::profile_not_found(user_id))?;

        consume_in_place(record, instruction, usage.plan, now)?;
        let updated = record.clone();

        tables.usage.entry(*user_id).or_default().push(usage.clone());
        Ok(updated)
    }

    fn apply_purchase(
        &self,
        user_id: &UserId,
        purchase: &Purchase,
        now: DateTime<Utc>,
    ) -> Result<ProfileRecord> {
        let mut tables = self.lock()?;
        let record = tables
            .profiles
            .get_mut(user_id)
            .ok_or_else(|| StoreError::profile_not_found(user_id))?;

        purchase_in_place(record, purchase, now)?;
        Ok(record.clone())
    }

    fn list_usage_by_user(
        &self,
        user_id: &UserId,
        limit: usize,
        offset: usize,
    ) -> Result<Vec<UsageRecord>> {
        let tables = self.lock()?;
        let Some(records) = tables.usage.get(user_id) else {
            return Ok(Vec::new());
        };

        // Appended in commit order, which also orders records sharing a millisecond.
        Ok(records
            .iter()
            .rev()
            .skip(offset)
            .take(limit)
            .cloned()
            .collect())
    }

    fn device_trial_uses(&self, device_id: &DeviceId) -> Result<u32> {
        Ok(self
            .lock()?
            .device_trials
            .get(device_id)
            .copied()
            .unwrap_or(0))
    }

    fn claim_device_trial(&self, device_id: &DeviceId) -> Result<u32> {
        let mut tables = self.lock()?;
        let uses = tables.device_trials.entry(device_id.clone()).or_insert(0);
        if !trial_available(*uses) {
            return Err(StoreError::TrialExhausted {
                device_id: device_id.to_string(),
            });
        }
        *uses += 1;
        Ok(*uses)
    }
}
