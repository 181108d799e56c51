//! Subscription lifecycle windows

use serde::Deserialize;

use super::error::ValidationError;
use crate::domain::retention::RetentionDays;

/// Trial, purge, retention and OTP windows.
#[derive(Debug, Clone, Deserialize)]
pub struct LifecycleConfig {
    #[serde(default = "default_trial_days")]
    pub trial_days: i64,

    /// Days after trial end before a never-paying tenant is deleted
    #[serde(default = "default_purge_threshold_days")]
    pub purge_threshold_days: i64,

    /// Operational data (orders, payment logs, events) kept this long
    #[serde(default = "default_retention_days")]
    pub retention_days: i64,

    #[serde(default = "default_otp_ttl_minutes")]
    pub otp_ttl_minutes: i64,
}

impl LifecycleConfig {
    /// The operational retention window. Falls back to the default when
    /// out of range; `validate` rejects that case at startup.
    pub fn retention_window(&self) -> RetentionDays {
        RetentionDays::new(self.retention_days).unwrap_or_default()
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        check_range("LIFECYCLE__TRIAL_DAYS", self.trial_days, 1, 90)?;
        check_range(
            "LIFECYCLE__PURGE_THRESHOLD_DAYS",
            self.purge_threshold_days,
            RetentionDays::MIN,
            RetentionDays::MAX,
        )?;
        check_range(
            "LIFECYCLE__RETENTION_DAYS",
            self.retention_days,
            RetentionDays::MIN,
            RetentionDays::MAX,
        )?;
        check_range("LIFECYCLE__OTP_TTL_MINUTES", self.otp_ttl_minutes, 1, 60)?;
        Ok(())
    }
}

fn check_range(field: &'static str, actual: i64, min: i64, max: i64) -> Result<(), ValidationError> {
    if (min..=max).contains(&actual) {
        Ok(())
    } else {
        Err(ValidationError::OutOfRange {
            field,
            min,
            max,
            actual,
        })
    }
}

impl Default for LifecycleConfig {
    fn default() -> Self {
        Self {
            trial_days: default_trial_days(),
            purge_threshold_days: default_purge_threshold_days(),
            retention_days: default_retention_days(),
            otp_ttl_minutes: default_otp_ttl_minutes(),
        }
    }
}

fn default_trial_days() -> i64 {
    7
}

fn default_purge_threshold_days() -> i64 {
    RetentionDays::DEFAULT_PURGE_THRESHOLD
}

fn default_retention_days() -> i64 {
    RetentionDays::DEFAULT_OPERATIONAL
}

fn default_otp_ttl_minutes() -> i64 {
    10
}
