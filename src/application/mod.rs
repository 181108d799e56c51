//! Application layer - Commands, Queries, Handlers and background services.
//!
//! Handlers orchestrate domain operations through the ports. The services
//! below are long-lived components built once at startup:
//!
//! - `NotificationDispatcher` - OTP mail and daily owner reports
//! - `OtpManager` - Email verification codes
//! - `RetentionSweeper` - Lifecycle expiry, tenant purge, data retention
//! - `Scheduler` - Drives the sweeper and reports on daily triggers

pub mod handlers;
mod notification_dispatcher;
mod otp_manager;
mod retention_sweeper;
mod scheduler;

pub use handlers::*;
pub use notification_dispatcher::{DispatchError, NotificationDispatcher, ReportRunSummary};
pub use otp_manager::{OtpManager, DEFAULT_OTP_TTL_MINUTES};
pub use retention_sweeper::RetentionSweeper;
pub use scheduler::{DailySchedule, Scheduler, SchedulerConfig, SchedulerError, SchedulerStatus};
