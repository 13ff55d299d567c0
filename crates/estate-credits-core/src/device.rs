//! Anonymous device trial.
//!
//! Actors without a profile have no lifetime allowance. Each browser
//! fingerprint instead gets a fixed number of trial reports, tracked apart from
//! the profile ledger.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::LedgerError;

/// Trial reports granted per device.
pub const DEVICE_TRIAL_USES: u32 = 1;

/// Longest accepted fingerprint visitor id.
const MAX_DEVICE_ID_LEN: usize = 128;

/// Whether a device that has used `uses` trial reports may run another.
#[must_use]
pub const fn trial_available(uses: u32) -> bool {
    uses < DEVICE_TRIAL_USES
}

/// A browser fingerprint visitor id.
#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct DeviceId(String);

impl DeviceId {
    /// The raw identifier.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl FromStr for DeviceId {
    type Err = LedgerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.is_empty()
            || s.len() > MAX_DEVICE_ID_LEN
            || !s.chars().all(|c| c.is_ascii_graphic())
        {
            return Err(LedgerError::InvalidDeviceId(s.chars().take(32).collect()));
        }
        Ok(Self(s.to_string()))
    }
}

impl fmt::Debug for DeviceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "DeviceId({})", self.0)
    }
}

impl fmt::Display for DeviceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for DeviceId {
    type Error = LedgerError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<DeviceId> for String {
    fn from(id: DeviceId) -> Self {
        id.0
    }
}
