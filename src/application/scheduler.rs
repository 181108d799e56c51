//! Scheduler - Background service driving the daily jobs.
//!
//! Two independent loops, each on its own tokio task so a long sweep never
//! blocks request handling:
//!
//! 1. Daily owner reports at `report_at` (UTC)
//! 2. Retention sweep at `sweep_at` (UTC)
//!
//! Each loop sleeps until the next wall-clock trigger, runs its job, and
//! recomputes the next trigger. After a failed run it waits `retry_delay`
//! first. A missed trigger is never replayed; the loop simply aims at the
//! next one.
//!
//! ## Graceful Shutdown
//!
//! `shutdown()` signals both loops through a watch channel. A job already
//! running completes before its loop exits.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use serde::Serialize;
use thiserror::Error;
use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::domain::foundation::{Timestamp, ValidationError};
use crate::domain::retention::SweepReport;
use crate::domain::subscription::SubscriptionError;
use crate::ports::Clock;

use super::{NotificationDispatcher, ReportRunSummary, RetentionSweeper};

/// A time of day in UTC, parsed from `HH:MM`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DailySchedule {
    hour: u32,
    minute: u32,
}

impl DailySchedule {
    /// Parses `HH:MM` (24-hour).
    ///
    /// # Errors
    ///
    /// Returns `InvalidFormat` for anything else.
    pub fn parse(value: &str) -> Result<Self, ValidationError> {
        let invalid = || ValidationError::invalid_format("time", format!("expected HH:MM, got '{}'", value));
        let (h, m) = value.trim().split_once(':').ok_or_else(invalid)?;
        if h.len() != 2 || m.len() != 2 {
            return Err(invalid());
        }
        let hour: u32 = h.parse().map_err(|_| invalid())?;
        let minute: u32 = m.parse().map_err(|_| invalid())?;
        if hour > 23 || minute > 59 {
            return Err(invalid());
        }
        Ok(Self { hour, minute })
    }

    pub fn hour(&self) -> u32 {
        self.hour
    }

    pub fn minute(&self) -> u32 {
        self.minute
    }

    /// First trigger strictly after `now`: today if still ahead, else tomorrow.
    pub fn next_run_after(&self, now: Timestamp) -> Timestamp {
        let today = now.as_datetime().date_naive();
        let at = |date: chrono::NaiveDate| {
            date.and_hms_opt(self.hour, self.minute, 0)
                .map(|naive| Timestamp::from_datetime(naive.and_utc()))
        };
        match at(today) {
            Some(candidate) if candidate > now => candidate,
            Some(candidate) => candidate.add_days(1),
            None => now.add_days(1),
        }
    }
}

impl std::fmt::Display for DailySchedule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:02}:{:02}", self.hour, self.minute)
    }
}

/// Trigger times and error backoff.
#[derive(Debug, Clone)]
pub struct SchedulerConfig {
    pub report_at: DailySchedule,
    pub sweep_at: DailySchedule,
    /// Wait after a failed run before aiming at the next trigger.
    pub retry_delay: Duration,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            report_at: DailySchedule { hour: 23, minute: 59 },
            sweep_at: DailySchedule { hour: 2, minute: 0 },
            retry_delay: Duration::from_secs(3600),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SchedulerError {
    #[error("Scheduler already started")]
    AlreadyStarted,
}

/// Snapshot of what the scheduler has done so far.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SchedulerStatus {
    pub started: bool,
    pub last_sweep_at: Option<Timestamp>,
    pub last_report_at: Option<Timestamp>,
    pub last_error: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Job {
    Reports,
    Sweep,
}

impl Job {
    fn name(self) -> &'static str {
        match self {
            Job::Reports => "daily_reports",
            Job::Sweep => "retention_sweep",
        }
    }
}

struct Inner {
    sweeper: Arc<RetentionSweeper>,
    dispatcher: Arc<NotificationDispatcher>,
    clock: Arc<dyn Clock>,
    config: SchedulerConfig,
    status: Mutex<SchedulerStatus>,
}

impl Inner {
    fn status(&self) -> std::sync::MutexGuard<'_, SchedulerStatus> {
        self.status.lock().unwrap_or_else(|e| e.into_inner())
    }

    async fn run_sweep(&self) -> SweepReport {
        let report = self.sweeper.run_all().await;
        let mut status = self.status();
        status.last_sweep_at = Some(self.clock.now());
        if report.has_failures() {
            status.last_error = Some("retention sweep finished with failures".to_string());
        }
        report
    }

    async fn run_reports(&self) -> Result<ReportRunSummary, SubscriptionError> {
        let result = self.dispatcher.send_daily_reports().await;
        let mut status = self.status();
        status.last_report_at = Some(self.clock.now());
        match &result {
            Ok(summary) if summary.failed > 0 => {
                status.last_error = Some(format!("{} daily reports failed", summary.failed));
            }
            Ok(_) => {}
            Err(e) => status.last_error = Some(e.to_string()),
        }
        result
    }

    /// Runs one job; true when it succeeded without failures.
    async fn run_job(&self, job: Job) -> bool {
        match job {
            Job::Sweep => !self.run_sweep().await.has_failures(),
            Job::Reports => match self.run_reports().await {
                Ok(summary) => summary.failed == 0,
                Err(e) => {
                    tracing::error!(job = job.name(), error = %e, "Scheduled job failed");
                    false
                }
            },
        }
    }

    fn schedule_for(&self, job: Job) -> DailySchedule {
        match job {
            Job::Reports => self.config.report_at,
            Job::Sweep => self.config.sweep_at,
        }
    }

    async fn run_loop(self: Arc<Self>, job: Job, mut shutdown: watch::Receiver<bool>) {
        let schedule = self.schedule_for(job);
        tracing::info!(job = job.name(), at = %schedule, "Scheduler loop started");

        let mut last_trigger: Option<Timestamp> = None;
        loop {
            let now = self.clock.now();
            // Never aim at a trigger that already fired.
            let from = last_trigger.map_or(now, |fired| fired.max(now));
            let next = schedule.next_run_after(from);
            let wait = next.duration_since(&now).to_std().unwrap_or(Duration::ZERO);
            tracing::debug!(job = job.name(), next_run = %next, "Waiting for next trigger");

            if !sleep_or_shutdown(wait, &mut shutdown).await {
                break;
            }

            last_trigger = Some(next);
            tracing::info!(job = job.name(), trigger = %next, "Running scheduled job");
            if !self.run_job(job).await {
                tracing::warn!(
                    job = job.name(),
                    retry_in_secs = self.config.retry_delay.as_secs(),
                    "Scheduled job had failures"
                );
                if !sleep_or_shutdown(self.config.retry_delay, &mut shutdown).await {
                    break;
                }
            }
        }

        tracing::info!(job = job.name(), "Scheduler loop stopped");
    }
}

/// Sleeps for `wait`. Returns false if shutdown was signalled first.
async fn sleep_or_shutdown(wait: Duration, shutdown: &mut watch::Receiver<bool>) -> bool {
    if *shutdown.borrow() {
        return false;
    }
    tokio::select! {
        _ = tokio::time::sleep(wait) => true,
        changed = shutdown.changed() => {
            // A dropped sender also means stop.
            changed.is_ok() && !*shutdown.borrow()
        }
    }
}

/// Owns both daily loops and their state. Created once at startup.
pub struct Scheduler {
    inner: Arc<Inner>,
    shutdown_tx: watch::Sender<bool>,
    handles: Mutex<Vec<JoinHandle<()>>>,
}

impl Scheduler {
    pub fn new(
        sweeper: Arc<RetentionSweeper>,
        dispatcher: Arc<NotificationDispatcher>,
        clock: Arc<dyn Clock>,
        config: SchedulerConfig,
    ) -> Self {
        let (shutdown_tx, _) = watch::channel(false);
        Self {
            inner: Arc::new(Inner {
                sweeper,
                dispatcher,
                clock,
                config,
                status: Mutex::new(SchedulerStatus::default()),
            }),
            shutdown_tx,
            handles: Mutex::new(Vec::new()),
        }
    }

    /// Spawns the report and sweep loops. Must be called from within a
    /// tokio runtime.
    ///
    /// # Errors
    ///
    /// `AlreadyStarted` on a second call.
    pub fn start(&self) -> Result<(), SchedulerError> {
        {
            let mut status = self.inner.status();
            if status.started {
                return Err(SchedulerError::AlreadyStarted);
            }
            status.started = true;
        }

        let mut handles = self.handles.lock().unwrap_or_else(|e| e.into_inner());
        for job in [Job::Reports, Job::Sweep] {
            let inner = Arc::clone(&self.inner);
            let shutdown = self.shutdown_tx.subscribe();
            handles.push(tokio::spawn(inner.run_loop(job, shutdown)));
        }
        tracing::info!(
            report_at = %self.inner.config.report_at,
            sweep_at = %self.inner.config.sweep_at,
            "Scheduler started"
        );
        Ok(())
    }

    /// Signals both loops and waits for them to finish.
    pub async fn shutdown(&self) {
        let _ = self.shutdown_tx.send(true);
        let handles: Vec<_> = {
            let mut guard = self.handles.lock().unwrap_or_else(|e| e.into_inner());
            guard.drain(..).collect()
        };
        for result in futures::future::join_all(handles).await {
            if let Err(e) = result {
                tracing::error!(error = %e, "Scheduler loop panicked");
            }
        }
        tracing::info!("Scheduler stopped");
    }

    /// Runs the retention sweep immediately, outside the schedule.
    pub async fn run_sweep_now(&self) -> SweepReport {
        self.inner.run_sweep().await
    }

    /// Sends the daily reports immediately, outside the schedule.
    pub async fn run_reports_now(&self) -> Result<ReportRunSummary, SubscriptionError> {
        self.inner.run_reports().await
    }

    pub fn status(&self) -> SchedulerStatus {
        self.inner.status().clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::{InMemoryStore, ManualClock, RecordingMailTransport};
    use crate::domain::subscription::{Slug, SubscriptionStatus, Tenant};
    use crate::ports::{MailTransport, TenantRepository};
    use chrono::{TimeZone, Utc};

    fn at(y: i32, mo: u32, d: u32, h: u32, mi: u32, s: u32) -> Timestamp {
        Timestamp::from_datetime(Utc.with_ymd_and_hms(y, mo, d, h, mi, s).unwrap())
    }

    struct Fixture {
        store: InMemoryStore,
        clock: ManualClock,
        mail: RecordingMailTransport,
        scheduler: Scheduler,
    }

    fn fixture(start: Timestamp, config: SchedulerConfig) -> Fixture {
        let store = InMemoryStore::new();
        let clock = ManualClock::new(start);
        let mail = RecordingMailTransport::new();
        let transport: Arc<dyn MailTransport> = Arc::new(mail.clone());
        let sweeper = Arc::new(RetentionSweeper::new(
            Arc::new(store.clone()),
            Arc::new(store.clone()),
            Arc::new(clock.clone()),
        ));
        let dispatcher = Arc::new(NotificationDispatcher::new(
            Arc::new(store.clone()),
            Arc::new(store.clone()),
            Some(transport),
            Arc::new(clock.clone()),
        ));
        let scheduler = Scheduler::new(sweeper, dispatcher, Arc::new(clock.clone()), config);
        Fixture { store, clock, mail, scheduler }
    }

    fn seed_expired_trial(f: &Fixture) -> Tenant {
        let tenant = Tenant::register(
            "Cafe",
            Slug::parse("cafe").unwrap(),
            "owner@cafe.in",
            "h",
            7,
            f.clock.now().minus_days(8),
        );
        f.store.seed_tenant(tenant.clone());
        tenant
    }

    #[test]
    fn parses_valid_times() {
        let s = DailySchedule::parse("23:59").unwrap();
        assert_eq!((s.hour(), s.minute()), (23, 59));
        assert_eq!(DailySchedule::parse("02:00").unwrap().to_string(), "02:00");
    }

    #[test]
    fn rejects_malformed_times() {
        for bad in ["24:00", "12:60", "2:00", "noon", "12-00", ""] {
            assert!(DailySchedule::parse(bad).is_err(), "{} should fail", bad);
        }
    }

    #[test]
    fn next_run_is_today_when_still_ahead() {
        let s = DailySchedule::parse("02:00").unwrap();
        assert_eq!(s.next_run_after(at(2024, 5, 1, 1, 30, 0)), at(2024, 5, 1, 2, 0, 0));
    }

    #[test]
    fn next_run_rolls_to_tomorrow_once_passed() {
        let s = DailySchedule::parse("02:00").unwrap();
        assert_eq!(s.next_run_after(at(2024, 5, 1, 2, 0, 0)), at(2024, 5, 2, 2, 0, 0));
        assert_eq!(s.next_run_after(at(2024, 12, 31, 23, 0, 0)), at(2025, 1, 1, 2, 0, 0));
    }

    #[tokio::test]
    async fn start_twice_fails() {
        let f = fixture(Timestamp::now(), SchedulerConfig::default());
        f.scheduler.start().unwrap();
        assert_eq!(f.scheduler.start(), Err(SchedulerError::AlreadyStarted));
        f.scheduler.shutdown().await;
    }

    #[tokio::test]
    async fn sweep_loop_fires_at_trigger_time() {
        // 100ms before the sweep trigger; the report trigger is hours away
        let start = Timestamp::from_datetime(
            *at(2024, 5, 1, 1, 59, 59).as_datetime() + chrono::Duration::milliseconds(900),
        );
        let f = fixture(start, SchedulerConfig::default());
        let tenant = seed_expired_trial(&f);

        f.scheduler.start().unwrap();
        tokio::time::sleep(Duration::from_millis(500)).await;
        f.scheduler.shutdown().await;

        let stored = f.store.find_by_id(&tenant.id).await.unwrap().unwrap();
        assert_eq!(stored.status, SubscriptionStatus::TrialExpired);
        assert!(f.scheduler.status().last_sweep_at.is_some());
        assert!(f.scheduler.status().last_report_at.is_none());
    }

    #[tokio::test]
    async fn shutdown_stops_idle_loops_promptly() {
        let f = fixture(at(2024, 5, 1, 12, 0, 0), SchedulerConfig::default());
        f.scheduler.start().unwrap();

        let stopped = tokio::time::timeout(Duration::from_secs(1), f.scheduler.shutdown()).await;

        assert!(stopped.is_ok());
        assert!(f.scheduler.status().last_sweep_at.is_none());
    }

    #[tokio::test]
    async fn manual_runs_record_status() {
        let f = fixture(Timestamp::now(), SchedulerConfig::default());
        let tenant = Tenant::register(
            "Cafe",
            Slug::parse("cafe").unwrap(),
            "owner@cafe.in",
            "h",
            7,
            f.clock.now(),
        );
        f.store.seed_tenant(tenant);

        let summary = f.scheduler.run_reports_now().await.unwrap();
        let report = f.scheduler.run_sweep_now().await;

        assert_eq!(summary.sent, 1);
        assert_eq!(f.mail.sent_to("owner@cafe.in").len(), 1);
        assert!(!report.has_failures());
        let status = f.scheduler.status();
        assert!(status.last_report_at.is_some());
        assert!(status.last_sweep_at.is_some());
        assert!(status.last_error.is_none());
        assert!(!status.started);
    }
}
