//! `RocksDB` storage implementation.
//!
//! This module provides the `RocksStore` implementation of the `Store` trait.
//! Read-modify-write operations are serialized through a process-wide write
//! lock, which makes the compare-and-swap in `apply_consumption` atomic for
//! every writer sharing this handle.

use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};

use chrono::{DateTime, Utc};
use rocksdb::{
    BoundColumnFamily, ColumnFamilyDescriptor, DBWithThreadMode, IteratorMode, MultiThreaded,
    Options, WriteBatch,
};

use estate_credits_core::{
    trial_available, ConsumptionInstruction, DeviceId, ProfileRecord, Purchase, UsageRecord,
    UserId,
};

use crate::error::{Result, StoreError};
use crate::keys;
use crate::schema::{all_column_families, cf};
use crate::{consume_in_place, purchase_in_place, repair_month_tag, Store};

/// RocksDB-backed storage implementation.
pub struct RocksStore {
    db: Arc<DBWithThreadMode<MultiThreaded>>,
    write_lock: Mutex<()>,
}

impl RocksStore {
    /// Open or create a `RocksDB` database at the given path.
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be opened or created.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut opts = Options::default();
        opts.create_if_missing(true);
        opts.create_missing_column_families(true);

        let cf_descriptors: Vec<_> = all_column_families()
            .into_iter()
            .map(|name| ColumnFamilyDescriptor::new(name, Options::default()))
            .collect();

        let db = DBWithThreadMode::open_cf_descriptors(&opts, path, cf_descriptors)
            .map_err(|e| StoreError::Database(e.to_string()))?;

        Ok(Self {
            db: Arc::new(db),
            write_lock: Mutex::new(()),
        })
    }

    /// Get a column family handle.
    fn cf(&self, name: &str) -> Result<Arc<BoundColumnFamily<'_>>> {
        self.db
            .cf_handle(name)
            .ok_or_else(|| StoreError::Database(format!("column family not found: {name}")))
    }

    fn lock_writes(&self) -> Result<MutexGuard<'_, ()>> {
        self.write_lock
            .lock()
            .map_err(|_| StoreError::Database("write lock poisoned".into()))
    }

    /// Serialize a value using CBOR.
    fn serialize<T: serde::Serialize>(value: &T) -> Result<Vec<u8>> {
        let mut buf = Vec::new();
        ciborium::into_writer(value, &mut buf)
            .map_err(|e| StoreError::Serialization(e.to_string()))?;
        Ok(buf)
    }

    /// Deserialize a value from CBOR.
    fn deserialize<T: serde::de::DeserializeOwned>(data: &[u8]) -> Result<T> {
        ciborium::from_reader(data).map_err(|e| StoreError::Serialization(e.to_string()))
    }

    fn load_profile(&self, user_id: &UserId) -> Result<ProfileRecord> {
        self.get_profile(user_id)?
            .ok_or_else(|| StoreError::profile_not_found(user_id))
    }
}

impl Store for RocksStore {
    // =========================================================================
    // Profile Operations
    // =========================================================================

    fn put_profile(&self, profile: &ProfileRecord) -> Result<()> {
        let cf = self.cf(cf::PROFILES)?;
        let key = keys::profile_key(&profile.user_id);
        let value = Self::serialize(profile)?;

        let _guard = self.lock_writes()?;
        self.db
            .put_cf(&cf, key, value)
            .map_err(|e| StoreError::Database(e.to_string()))
    }

    fn create_profile(&self, profile: &ProfileRecord) -> Result<()> {
        let cf = self.cf(cf::PROFILES)?;
        let key = keys::profile_key(&profile.user_id);
        let value = Self::serialize(profile)?;

        let _guard = self.lock_writes()?;
        if self.get_profile(&profile.user_id)?.is_some() {
            return Err(StoreError::AlreadyExists {
                entity: "profile",
                id: profile.user_id.to_string(),
            });
        }

        self.db
            .put_cf(&cf, key, value)
            .map_err(|e| StoreError::Database(e.to_string()))
    }

    fn get_profile(&self, user_id: &UserId) -> Result<Option<ProfileRecord>> {
        let cf = self.cf(cf::PROFILES)?;
        let key = keys::profile_key(user_id);

        self.db
            .get_cf(&cf, key)
            .map_err(|e| StoreError::Database(e.to_string()))?
            .map(|data| Self::deserialize(&data))
            .transpose()
    }

    fn settle_profile(
        &self,
        user_id: &UserId,
        now: DateTime<Utc>,
    ) -> Result<Option<ProfileRecord>> {
        let cf = self.cf(cf::PROFILES)?;

        let _guard = self.lock_writes()?;
        let Some(mut profile) = self.get_profile(user_id)? else {
            return Ok(None);
        };

        if repair_month_tag(&mut profile, now) {
            profile.touch(now);
            self.db
                .put_cf(&cf, keys::profile_key(user_id), Self::serialize(&profile)?)
                .map_err(|e| StoreError::Database(e.to_string()))?;
        }

        Ok(Some(profile))
    }

    // =========================================================================
    // Compound Operations
    // =========================================================================

    fn apply_consumption(
        &self,
        user_id: &UserId,
        instruction: &ConsumptionInstruction,
        usage: &UsageRecord,
        now: DateTime<Utc>,
    ) -> Result<ProfileRecord> {
        let cf_profiles = self.cf(cf::PROFILES)?;
        let cf_usage = self.cf(cf::USAGE_LOG)?;

        let _guard = self.lock_writes()?;
        let mut profile = self.load_profile(user_id)?;
        consume_in_place(&mut profile, instruction, usage.plan, now)?;

        let mut batch = WriteBatch::default();
        batch.put_cf(
            &cf_profiles,
            keys::profile_key(user_id),
            Self::serialize(&profile)?,
        );
        batch.put_cf(
            &cf_usage,
            keys::usage_key(user_id, &usage.id),
            Self::serialize(usage)?,
        );

        self.db
            .write(batch)
            .map_err(|e| StoreError::Database(e.to_string()))?;

        Ok(profile)
    }

    fn apply_purchase(
        &self,
        user_id: &UserId,
        purchase: &Purchase,
        now: DateTime<Utc>,
    ) -> Result<ProfileRecord> {
        let cf = self.cf(cf::PROFILES)?;

        let _guard = self.lock_writes()?;
        let mut profile = self.load_profile(user_id)?;
        purchase_in_place(&mut profile, purchase, now)?;

        self.db
            .put_cf(&cf, keys::profile_key(user_id), Self::serialize(&profile)?)
            .map_err(|e| StoreError::Database(e.to_string()))?;

        Ok(profile)
    }

    // =========================================================================
    // Usage Log Operations
    // =========================================================================

    fn list_usage_by_user(
        &self,
        user_id: &UserId,
        limit: usize,
        offset: usize,
    ) -> Result<Vec<UsageRecord>> {
        let cf = self.cf(cf::USAGE_LOG)?;
        let prefix = keys::user_usage_prefix(user_id);
        let end = keys::user_usage_end(user_id);

        // ULID suffixes sort oldest first, so walk the user's range backwards.
        let iter = self.db.iterator_cf(
            &cf,
            IteratorMode::From(&end, rocksdb::Direction::Reverse),
        );

        let mut records = Vec::new();
        for item in iter.skip(offset) {
            if records.len() >= limit {
                break;
            }
            let (key, value) = item.map_err(|e| StoreError::Database(e.to_string()))?;
            if !key.starts_with(&prefix) {
                break;
            }
            records.push(Self::deserialize(&value)?);
        }

        Ok(records)
    }

    // =========================================================================
    // Device Trial Operations
    // =========================================================================

    fn device_trial_uses(&self, device_id: &DeviceId) -> Result<u32> {
        let cf = self.cf(cf::DEVICE_TRIALS)?;

        self.db
            .get_cf(&cf, keys::device_trial_key(device_id))
            .map_err(|e| StoreError::Database(e.to_string()))?
            .map_or(Ok(0), |data| Self::deserialize(&data))
    }

    fn claim_device_trial(&self, device_id: &DeviceId) -> Result<u32> {
        let cf = self.cf(cf::DEVICE_TRIALS)?;

        let _guard = self.lock_writes()?;
        let uses = self.device_trial_uses(device_id)?;
        if !trial_available(uses) {
            return Err(StoreError::TrialExhausted {
                device_id: device_id.to_string(),
            });
        }

        let uses = uses + 1;
        self.db
            .put_cf(&cf, keys::device_trial_key(device_id), Self::serialize(&uses)?)
            .map_err(|e| StoreError::Database(e.to_string()))?;

        tracing::debug!(device_id = %device_id, uses, "Device trial claimed");
        Ok(uses)
    }
}
