//! Calendar month tags for PRO monthly quotas.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Datelike, Utc};
use serde::{Deserialize, Serialize};

use crate::error::LedgerError;

/// A UTC calendar month, serialized as `"YYYY-MM"`.
///
/// Stored next to `pro_used` so that a counter written in an earlier month can
/// be recognised as stale.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct BillingMonth {
    year: i32,
    month: u32,
}

impl BillingMonth {
    /// Build a month from its parts.
    ///
    /// # Errors
    ///
    /// Returns `LedgerError::InvalidMonth` if `month` is outside `1..=12` or the
    /// year does not fit in four digits.
    pub fn new(year: i32, month: u32) -> Result<Self, LedgerError> {
        if !(1..=12).contains(&month) || !(0..=9999).contains(&year) {
            return Err(LedgerError::InvalidMonth(format!("{year}-{month}")));
        }
        Ok(Self { year, month })
    }

    /// The month containing `instant`.
    #[must_use]
    pub fn of(instant: DateTime<Utc>) -> Self {
        Self {
            year: instant.year(),
            month: instant.month(),
        }
    }

    /// Calendar year.
    #[must_use]
    pub const fn year(&self) -> i32 {
        self.year
    }

    /// Month number, 1-based.
    #[must_use]
    pub const fn month(&self) -> u32 {
        self.month
    }

    /// Whether this tag refers to the month containing `now`.
    #[must_use]
    pub fn is_current(&self, now: DateTime<Utc>) -> bool {
        *self == Self::of(now)
    }
}

impl FromStr for BillingMonth {
    type Err = LedgerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || LedgerError::InvalidMonth(s.to_string());

        let (year, month) = s.trim().split_once('-').ok_or_else(invalid)?;
        if year.len() != 4 || month.len() != 2 {
            return Err(invalid());
        }
        let year = year.parse::<i32>().map_err(|_| invalid())?;
        let month = month.parse::<u32>().map_err(|_| invalid())?;

        Self::new(year, month).map_err(|_| invalid())
    }
}

impl fmt::Display for BillingMonth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}", self.year, self.month)
    }
}

impl fmt::Debug for BillingMonth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "BillingMonth({self})")
    }
}

impl TryFrom<String> for BillingMonth {
    type Error = LedgerError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<BillingMonth> for String {
    fn from(month: BillingMonth) -> Self {
        month.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn parses_and_formats_zero_padded() {
        let month: BillingMonth = "2024-02".parse().unwrap();
        assert_eq!(month.year(), 2024);
        assert_eq!(month.month(), 2);
        assert_eq!(month.to_string(), "2024-02");
    }

    #[test]
    fn rejects_malformed_tags() {
        for input in ["", "2024", "2024-2", "2024-13", "2024-00", "24-01", "2024/01", "abcd-ef"] {
            assert!(
                input.parse::<BillingMonth>().is_err(),
                "{input:?} should be rejected"
            );
        }
    }

    #[test]
    fn month_of_instant_uses_utc() {
        let now = Utc.with_ymd_and_hms(2024, 1, 31, 23, 59, 59).unwrap();
        assert_eq!(BillingMonth::of(now).to_string(), "2024-01");

        let later = Utc.with_ymd_and_hms(2024, 2, 1, 0, 0, 0).unwrap();
        assert!(!BillingMonth::of(now).is_current(later));
    }

    #[test]
    fn ordering_follows_calendar() {
        let dec: BillingMonth = "2023-12".parse().unwrap();
        let jan: BillingMonth = "2024-01".parse().unwrap();
        assert!(dec < jan);
    }
}
