//! RegisterTenantHandler - Signup: creates a trial tenant and sends the
//! owner a verification code.

use std::sync::Arc;

use crate::application::OtpManager;
use crate::domain::foundation::ErrorCode;
use crate::domain::otp::OtpDelivery;
use crate::domain::subscription::{normalize_email, Slug, SubscriptionError, Tenant};
use crate::ports::{Clock, TenantRepository};

/// Command to register a restaurant.
#[derive(Debug, Clone)]
pub struct RegisterTenantCommand {
    pub name: String,
    /// Requested slug. Derived from `name` when absent.
    pub slug: Option<String>,
    pub owner_email: String,
    /// Already hashed by the web layer.
    pub password_hash: String,
}

#[derive(Debug, Clone)]
pub struct RegisterTenantResult {
    pub tenant: Tenant,
    pub verification: OtpDelivery,
}

pub struct RegisterTenantHandler {
    tenants: Arc<dyn TenantRepository>,
    otp: Arc<OtpManager>,
    clock: Arc<dyn Clock>,
    trial_days: i64,
}

impl RegisterTenantHandler {
    pub fn new(
        tenants: Arc<dyn TenantRepository>,
        otp: Arc<OtpManager>,
        clock: Arc<dyn Clock>,
        trial_days: i64,
    ) -> Self {
        Self {
            tenants,
            otp,
            clock,
            trial_days,
        }
    }

    pub async fn handle(
        &self,
        cmd: RegisterTenantCommand,
    ) -> Result<RegisterTenantResult, SubscriptionError> {
        // 1. Validate
        let name = cmd.name.trim();
        if name.is_empty() {
            return Err(SubscriptionError::invalid_input("Restaurant name is required"));
        }
        let email = normalize_email(&cmd.owner_email);
        if !email.contains('@') {
            return Err(SubscriptionError::invalid_input("A valid email address is required"));
        }
        if cmd.password_hash.is_empty() {
            return Err(SubscriptionError::invalid_input("Password is required"));
        }
        let slug = match cmd.slug.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
            Some(raw) => Slug::parse(raw)?,
            None => Slug::from_name(name)?,
        };

        // 2. Friendly pre-checks; the insert below is what actually decides
        if self.tenants.find_by_slug(slug.as_str()).await?.is_some() {
            return Err(SubscriptionError::Conflict {
                code: ErrorCode::SlugTaken,
                reason: format!("The URL '{}' is already taken", slug),
            });
        }
        if self.tenants.find_by_owner_email(&email).await?.is_some() {
            return Err(SubscriptionError::Conflict {
                code: ErrorCode::EmailTaken,
                reason: "An account with this email already exists".to_string(),
            });
        }

        // 3. Insert
        let tenant = Tenant::register(
            name,
            slug,
            &email,
            cmd.password_hash,
            self.trial_days,
            self.clock.now(),
        );
        self.tenants.insert(&tenant).await?;
        tracing::info!(
            tenant_id = %tenant.id,
            slug = %tenant.slug,
            trial_ends_at = %tenant.trial_ends_at,
            "Tenant registered"
        );

        // 4. Verification code; signup stands even if this fails
        let verification = match self.otp.generate_and_send(&email).await {
            Ok(delivery) => delivery,
            Err(e) => {
                tracing::warn!(tenant_id = %tenant.id, error = %e, "Could not issue verification code");
                OtpDelivery::NotSent
            }
        };

        Ok(RegisterTenantResult {
            tenant,
            verification,
        })
    }
}
