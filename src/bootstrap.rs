//! Wiring: builds adapters from configuration and assembles the services.
//!
//! `Backends` is the set of port implementations. `Services` is everything
//! the web layer and the process entry point call into. Tests wire
//! `Services` over the in-memory store with `Backends::in_memory`.

use std::sync::Arc;

use secrecy::SecretString;
use thiserror::Error;

use crate::adapters::postgres::{
    self, PostgresOrderReader, PostgresOtpRepository, PostgresPaymentRepository,
    PostgresRetentionStore, PostgresTenantRepository,
};
use crate::adapters::{
    InMemoryStore, RazorpayConfig, RazorpayGateway, ResendConfig, ResendMailTransport,
    RetryPolicy, SystemClock,
};
use crate::application::{
    ActivateSubscriptionHandler, CheckEntitlementHandler, ConfirmOwnerEmailHandler,
    ConfirmPaymentHandler, CreateCheckoutOrderHandler, GetSubscriptionEventsHandler,
    GetSubscriptionStatusHandler, NotificationDispatcher, OtpManager, RegisterTenantHandler,
    RetentionSweeper, Scheduler, SchedulerConfig, VerifyPaymentHandler,
};
use crate::config::{self, AppConfig};
use crate::domain::foundation::DomainError;
use crate::domain::retention::RetentionDays;
use crate::ports::{
    Clock, MailError, MailTransport, OrderReader, OtpRepository, PaymentError, PaymentGateway,
    PaymentRepository, RetentionStore, TenantRepository,
};

#[derive(Debug, Error)]
pub enum BootstrapError {
    #[error("Invalid configuration: {0}")]
    Config(#[from] config::ValidationError),

    #[error("Storage setup failed: {0}")]
    Storage(#[from] DomainError),

    #[error("Payment gateway setup failed: {0}")]
    Payment(#[from] PaymentError),

    #[error("Mail transport setup failed: {0}")]
    Mail(#[from] MailError),
}

/// Port implementations the services run on.
#[derive(Clone)]
pub struct Backends {
    pub tenants: Arc<dyn TenantRepository>,
    pub otps: Arc<dyn OtpRepository>,
    pub payments: Arc<dyn PaymentRepository>,
    pub retention: Arc<dyn RetentionStore>,
    pub orders: Arc<dyn OrderReader>,
    pub gateway: Arc<dyn PaymentGateway>,
    pub mail: Option<Arc<dyn MailTransport>>,
    pub clock: Arc<dyn Clock>,
}

impl Backends {
    /// Connects to Postgres (running migrations when configured) and builds
    /// the Razorpay and Resend clients.
    pub async fn connect(config: &AppConfig) -> Result<Self, BootstrapError> {
        let db = &config.database;
        tracing::info!(max_connections = db.max_connections, "Connecting to PostgreSQL");
        let pool = postgres::connect(&db.url, db.max_connections, db.acquire_timeout()).await?;
        if db.run_migrations {
            postgres::run_migrations(&pool).await?;
            tracing::info!("Migrations applied");
        }
        let retry = RetryPolicy::new(db.retry_attempts, db.retry_base_delay());

        let payment = &config.payment;
        let gateway = RazorpayGateway::new(
            RazorpayConfig::new(payment.key_id.clone(), payment.key_secret.clone())
                .with_base_url(payment.api_base_url.clone())
                .with_timeout(payment.timeout()),
        )?;

        let mail: Option<Arc<dyn MailTransport>> = match &config.email.resend_api_key {
            Some(key) if config.email.is_configured() => {
                let transport = ResendMailTransport::new(
                    ResendConfig::new(key.clone(), config.email.from_header())
                        .with_base_url(config.email.api_base_url.clone())
                        .with_timeout(config.email.timeout()),
                )?;
                Some(Arc::new(transport))
            }
            _ => {
                tracing::warn!("Mail not configured; codes will not be delivered and reports are off");
                None
            }
        };

        Ok(Self {
            tenants: Arc::new(PostgresTenantRepository::new(pool.clone(), retry)),
            otps: Arc::new(PostgresOtpRepository::new(pool.clone(), retry)),
            payments: Arc::new(PostgresPaymentRepository::new(pool.clone(), retry)),
            retention: Arc::new(PostgresRetentionStore::new(pool.clone(), retry)),
            orders: Arc::new(PostgresOrderReader::new(pool, retry)),
            gateway: Arc::new(gateway),
            mail,
            clock: Arc::new(SystemClock),
        })
    }

    /// Every persistence port backed by one shared in-memory store.
    pub fn in_memory(
        store: &InMemoryStore,
        gateway: Arc<dyn PaymentGateway>,
        mail: Option<Arc<dyn MailTransport>>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            tenants: Arc::new(store.clone()),
            otps: Arc::new(store.clone()),
            payments: Arc::new(store.clone()),
            retention: Arc::new(store.clone()),
            orders: Arc::new(store.clone()),
            gateway,
            mail,
            clock,
        }
    }
}

/// Tunables the services need beyond their ports.
#[derive(Clone)]
pub struct ServiceSettings {
    pub trial_days: i64,
    pub purge_threshold_days: i64,
    pub retention_window: RetentionDays,
    pub otp_ttl_minutes: i64,
    pub payment_key_secret: SecretString,
    pub schedule: SchedulerConfig,
}

impl ServiceSettings {
    pub fn from_config(config: &AppConfig) -> Result<Self, config::ValidationError> {
        Ok(Self {
            trial_days: config.lifecycle.trial_days,
            purge_threshold_days: config.lifecycle.purge_threshold_days,
            retention_window: config.lifecycle.retention_window(),
            otp_ttl_minutes: config.lifecycle.otp_ttl_minutes,
            payment_key_secret: config.payment.key_secret.clone(),
            schedule: config.scheduler.schedule()?,
        })
    }

    /// Default windows with the given signing secret.
    pub fn with_secret(payment_key_secret: SecretString) -> Self {
        let lifecycle = config::LifecycleConfig::default();
        Self {
            trial_days: lifecycle.trial_days,
            purge_threshold_days: lifecycle.purge_threshold_days,
            retention_window: lifecycle.retention_window(),
            otp_ttl_minutes: lifecycle.otp_ttl_minutes,
            payment_key_secret,
            schedule: SchedulerConfig::default(),
        }
    }
}

/// Every operation the engine exposes.
pub struct Services {
    pub register_tenant: RegisterTenantHandler,
    pub confirm_owner_email: ConfirmOwnerEmailHandler,
    pub subscription_status: GetSubscriptionStatusHandler,
    pub entitlement: CheckEntitlementHandler,
    pub subscription_events: GetSubscriptionEventsHandler,
    pub activate_subscription: ActivateSubscriptionHandler,
    pub verify_payment: VerifyPaymentHandler,
    pub create_checkout_order: CreateCheckoutOrderHandler,
    pub confirm_payment: ConfirmPaymentHandler,
    pub otp: Arc<OtpManager>,
    pub dispatcher: Arc<NotificationDispatcher>,
    pub sweeper: Arc<RetentionSweeper>,
    pub scheduler: Scheduler,
}

impl Services {
    pub fn wire(backends: Backends, settings: ServiceSettings) -> Self {
        let Backends {
            tenants,
            otps,
            payments,
            retention,
            orders,
            gateway,
            mail,
            clock,
        } = backends;

        let dispatcher = Arc::new(NotificationDispatcher::new(
            tenants.clone(),
            orders,
            mail,
            clock.clone(),
        ));
        let otp = Arc::new(OtpManager::new(
            otps,
            dispatcher.clone(),
            clock.clone(),
            settings.otp_ttl_minutes,
        ));
        let sweeper = Arc::new(
            RetentionSweeper::new(tenants.clone(), retention, clock.clone())
                .with_purge_threshold_days(settings.purge_threshold_days)
                .with_retention_window(settings.retention_window),
        );
        let verify_payment = || {
            VerifyPaymentHandler::new(
                payments.clone(),
                clock.clone(),
                settings.payment_key_secret.clone(),
            )
        };
        let activate = || ActivateSubscriptionHandler::new(tenants.clone(), clock.clone());

        Self {
            register_tenant: RegisterTenantHandler::new(
                tenants.clone(),
                otp.clone(),
                clock.clone(),
                settings.trial_days,
            ),
            confirm_owner_email: ConfirmOwnerEmailHandler::new(tenants.clone(), otp.clone()),
            subscription_status: GetSubscriptionStatusHandler::new(tenants.clone(), clock.clone()),
            entitlement: CheckEntitlementHandler::new(tenants.clone(), clock.clone()),
            subscription_events: GetSubscriptionEventsHandler::new(tenants.clone()),
            activate_subscription: activate(),
            verify_payment: verify_payment(),
            create_checkout_order: CreateCheckoutOrderHandler::new(
                tenants.clone(),
                payments.clone(),
                gateway,
                clock.clone(),
            ),
            confirm_payment: ConfirmPaymentHandler::new(
                tenants.clone(),
                payments.clone(),
                clock.clone(),
                verify_payment(),
                activate(),
            ),
            scheduler: Scheduler::new(sweeper.clone(), dispatcher.clone(), clock, settings.schedule),
            otp,
            dispatcher,
            sweeper,
        }
    }
}
