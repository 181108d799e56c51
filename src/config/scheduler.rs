//! Background scheduler configuration

use serde::Deserialize;
use std::time::Duration;

use super::error::ValidationError;
use crate::application::{DailySchedule, SchedulerConfig as Schedule};

/// Daily trigger times (UTC, `HH:MM`) for the background jobs.
#[derive(Debug, Clone, Deserialize)]
pub struct SchedulerConfig {
    #[serde(default = "default_enabled")]
    pub enabled: bool,

    #[serde(default = "default_report_time")]
    pub report_time: String,

    #[serde(default = "default_sweep_time")]
    pub sweep_time: String,

    /// Wait after a failed run, in seconds
    #[serde(default = "default_error_retry")]
    pub error_retry_secs: u64,
}

impl SchedulerConfig {
    /// Parsed trigger times for the scheduler service.
    pub fn schedule(&self) -> Result<Schedule, ValidationError> {
        Ok(Schedule {
            report_at: parse_time("SCHEDULER__REPORT_TIME", &self.report_time)?,
            sweep_at: parse_time("SCHEDULER__SWEEP_TIME", &self.sweep_time)?,
            retry_delay: Duration::from_secs(self.error_retry_secs),
        })
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        self.schedule()?;
        if self.error_retry_secs == 0 {
            return Err(ValidationError::InvalidTimeout("scheduler error retry"));
        }
        Ok(())
    }
}

fn parse_time(field: &'static str, value: &str) -> Result<DailySchedule, ValidationError> {
    DailySchedule::parse(value).map_err(|_| ValidationError::InvalidScheduleTime {
        field,
        value: value.to_string(),
    })
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            enabled: default_enabled(),
            report_time: default_report_time(),
            sweep_time: default_sweep_time(),
            error_retry_secs: default_error_retry(),
        }
    }
}

fn default_enabled() -> bool {
    true
}

fn default_report_time() -> String {
    "23:59".to_string()
}

fn default_sweep_time() -> String {
    "02:00".to_string()
}

fn default_error_retry() -> u64 {
    3600
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scheduler_defaults() {
        let config = SchedulerConfig::default();
        assert!(config.enabled);
        let schedule = config.schedule().unwrap();
        assert_eq!(schedule.report_at.to_string(), "23:59");
        assert_eq!(schedule.sweep_at.to_string(), "02:00");
        assert_eq!(schedule.retry_delay, Duration::from_secs(3600));
    }

    #[test]
    fn test_invalid_time_rejected() {
        let config = SchedulerConfig {
            sweep_time: "2am".to_string(),
            ..Default::default()
        };
        assert_eq!(
            config.validate(),
            Err(ValidationError::InvalidScheduleTime {
                field: "SCHEDULER__SWEEP_TIME",
                value: "2am".to_string(),
            })
        );
    }

    #[test]
    fn test_zero_retry_rejected() {
        let config = SchedulerConfig {
            error_retry_secs: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }
}
