//! Application configuration module
//!
//! This module provides type-safe configuration loading from environment variables
//! using the `config` and `dotenvy` crates. Configuration is loaded with the
//! `TABLESIDE` prefix and nested values use double underscores as separators.
//!
//! # Example
//!
//! ```no_run
//! use tableside::config::AppConfig;
//!
//! let config = AppConfig::load().expect("Failed to load configuration");
//! config.validate().expect("Invalid configuration");
//!
//! println!("Trial length: {} days", config.lifecycle.trial_days);
//! ```

mod database;
mod email;
mod environment;
mod error;
mod lifecycle;
mod payment;
mod scheduler;

pub use database::DatabaseConfig;
pub use email::EmailConfig;
pub use environment::Environment;
pub use error::{ConfigError, ValidationError};
pub use lifecycle::LifecycleConfig;
pub use payment::PaymentConfig;
pub use scheduler::SchedulerConfig;

use serde::Deserialize;

/// Root application configuration
///
/// Load using [`AppConfig::load()`] which reads from environment variables.
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    /// Deployment environment; selects log format
    #[serde(default)]
    pub environment: Environment,

    /// Database configuration (PostgreSQL connection, lock retries)
    pub database: DatabaseConfig,

    /// Payment configuration (Razorpay)
    pub payment: PaymentConfig,

    /// Email configuration (Resend); optional
    #[serde(default)]
    pub email: EmailConfig,

    /// Trial, purge, retention and OTP windows
    #[serde(default)]
    pub lifecycle: LifecycleConfig,

    /// Background job triggers
    #[serde(default)]
    pub scheduler: SchedulerConfig,
}

impl AppConfig {
    /// Load configuration from environment variables
    ///
    /// This function:
    /// 1. Loads `.env` file if present (for development)
    /// 2. Reads environment variables with `TABLESIDE` prefix
    /// 3. Uses `__` (double underscore) to separate nested values
    /// 4. Deserializes into typed configuration structs
    ///
    /// # Environment Variable Format
    ///
    /// - `TABLESIDE__DATABASE__URL=...` -> `database.url = ...`
    /// - `TABLESIDE__LIFECYCLE__TRIAL_DAYS=14` -> `lifecycle.trial_days = 14`
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if:
    /// - Required environment variables are missing
    /// - Values cannot be parsed into expected types
    pub fn load() -> Result<Self, ConfigError> {
        // Load .env file if present (development)
        dotenvy::dotenv().ok();

        let config = config::Config::builder()
            .add_source(
                config::Environment::default()
                    .prefix("TABLESIDE")
                    .separator("__"),
            )
            .build()?
            .try_deserialize()?;

        Ok(config)
    }

    /// Validate all configuration values
    ///
    /// # Errors
    ///
    /// Returns `ValidationError` for the first invalid section.
    pub fn validate(&self) -> Result<(), ValidationError> {
        self.database.validate()?;
        self.payment.validate()?;
        self.email.validate()?;
        self.lifecycle.validate()?;
        self.scheduler.validate()?;
        Ok(())
    }

    /// Check if running in production environment
    pub fn is_production(&self) -> bool {
        self.environment.is_production()
    }
}
