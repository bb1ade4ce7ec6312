//! Version stamps identifying a store's schema/data generation.
//!
//! Stamps are plain ordered integers. Release-derived stamps encode the
//! product version that introduced the migration, e.g. `140200010` for the
//! tenth migration of 14.2.0, but the engine only relies on ordering.

use crate::error::{CoreError, CoreResult};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Ordered identifier of a store's schema/data generation.
///
/// [`VersionStamp::LEGACY`] (`0`) is reserved for stores that predate version
/// tracking: they hold content but no version record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct VersionStamp(u64);

impl VersionStamp {
    /// Stamp of a populated store that has never recorded a version.
    pub const LEGACY: VersionStamp = VersionStamp(0);

    /// Wrap a raw stamp value.
    pub const fn new(value: u64) -> Self {
        Self(value)
    }

    /// The raw stamp value.
    pub const fn get(self) -> u64 {
        self.0
    }

    /// Whether this is the legacy (pre-versioning) stamp.
    pub const fn is_legacy(self) -> bool {
        self.0 == 0
    }

    /// Convert a value read from a store column.
    ///
    /// Negative values cannot come from a stamp this engine wrote.
    pub fn from_db(value: i64) -> CoreResult<Self> {
        u64::try_from(value)
            .map(Self)
            .map_err(|_| CoreError::InvalidVersion {
                value: value.to_string(),
                reason: "version stamps are never negative".to_string(),
            })
    }

    /// Value to persist in a signed BIGINT column.
    pub fn to_db(self) -> CoreResult<i64> {
        i64::try_from(self.0).map_err(|_| CoreError::InvalidVersion {
            value: self.0.to_string(),
            reason: "stamp does not fit a BIGINT column".to_string(),
        })
    }

    /// Whether `self` lies in the half-open window `[start, end)`.
    pub fn in_window(self, start: VersionStamp, end: VersionStamp) -> bool {
        self >= start && self < end
    }
}

impl fmt::Display for VersionStamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for VersionStamp {
    fn from(value: u64) -> Self {
        Self(value)
    }
}

impl FromStr for VersionStamp {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim()
            .parse::<u64>()
            .map(Self)
            .map_err(|e| CoreError::InvalidVersion {
                value: s.to_string(),
                reason: e.to_string(),
            })
    }
}

#[cfg(test)]
#[path = "version_test.rs"]
mod tests;
