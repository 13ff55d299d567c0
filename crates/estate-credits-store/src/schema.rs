//! Database schema definitions and column families.
//!
//! This module defines the column families used in `RocksDB` storage.

/// Column family names for the `RocksDB` database.
pub mod cf {
    /// Profile rows, keyed by `user_id`.
    pub const PROFILES: &str = "profiles";

    /// Usage log, keyed by `user_id || usage_id` (ULID) so a prefix scan is time-ordered.
    pub const USAGE_LOG: &str = "usage_log";

    /// Device trial counters, keyed by fingerprint visitor id.
    pub const DEVICE_TRIALS: &str = "device_trials";
}

/// Returns all column family names for database initialization.
#[must_use]
pub fn all_column_families() -> Vec<&'static str> {
    vec![cf::PROFILES, cf::USAGE_LOG, cf::DEVICE_TRIALS]
}
