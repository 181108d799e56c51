//! Retention windows and sweep bookkeeping.

use serde::{Deserialize, Serialize};

use crate::domain::foundation::{TenantId, Timestamp, ValidationError};

/// A day window for retention and purge thresholds, bounded to 7..=365.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "i64")]
pub struct RetentionDays(i64);

impl RetentionDays {
    pub const MIN: i64 = 7;
    pub const MAX: i64 = 365;
    pub const DEFAULT_OPERATIONAL: i64 = 90;
    pub const DEFAULT_PURGE_THRESHOLD: i64 = 31;

    /// Creates a window.
    ///
    /// # Errors
    ///
    /// Returns `OutOfRange` outside 7..=365.
    pub fn new(days: i64) -> Result<Self, ValidationError> {
        if !(Self::MIN..=Self::MAX).contains(&days) {
            return Err(ValidationError::out_of_range("days", Self::MIN, Self::MAX, days));
        }
        Ok(Self(days))
    }

    pub fn days(&self) -> i64 {
        self.0
    }

    /// Oldest instant still inside the window.
    pub fn cutoff(&self, now: Timestamp) -> Timestamp {
        now.minus_days(self.0)
    }
}

impl Default for RetentionDays {
    fn default() -> Self {
        Self(Self::DEFAULT_OPERATIONAL)
    }
}

impl TryFrom<i64> for RetentionDays {
    type Error = ValidationError;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        RetentionDays::new(value)
    }
}

impl From<RetentionDays> for i64 {
    fn from(days: RetentionDays) -> Self {
        days.0
    }
}

impl std::fmt::Display for RetentionDays {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} days", self.0)
    }
}

/// Rows removed by an operational data purge.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DataPurgeCounts {
    pub orders: u64,
    pub payments: u64,
    pub events: u64,
}

impl DataPurgeCounts {
    pub fn total(&self) -> u64 {
        self.orders + self.payments + self.events
    }
}

/// Audit row written after each operational purge.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DataDeletionLog {
    pub counts: DataPurgeCounts,
    pub days_retained: i64,
    pub cutoff: Timestamp,
    pub deleted_at: Timestamp,
}

/// What a confirmed tenant purge removed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PurgedTenant {
    pub tenant_id: TenantId,
    pub slug: String,
    pub orders: u64,
    pub menu_items: u64,
    pub tables: u64,
}

/// Per-run tally of a sweep sub-job.
///
/// `affected` counts tenants or rows changed, `skipped` counts candidates
/// that no longer qualified when rechecked, `failed` counts candidates whose
/// processing errored and was logged.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SweepOutcome {
    pub affected: u64,
    pub skipped: u64,
    pub failed: u64,
}

/// Result of one full sweep run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SweepReport {
    pub trials_expired: SweepOutcome,
    pub subscriptions_expired: SweepOutcome,
    pub tenants_purged: SweepOutcome,
    pub data_purged: Option<DataPurgeCounts>,
}

impl SweepReport {
    pub fn has_failures(&self) -> bool {
        self.trials_expired.failed > 0
            || self.subscriptions_expired.failed > 0
            || self.tenants_purged.failed > 0
            || self.data_purged.is_none()
    }
}
