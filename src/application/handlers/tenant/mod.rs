//! Tenant onboarding handlers.
//!
//! - Registering a restaurant (signup with trial)
//! - Confirming the owner's email with a one-time code

mod confirm_owner_email;
mod register_tenant;

pub use confirm_owner_email::{ConfirmOwnerEmailCommand, ConfirmOwnerEmailHandler};
pub use register_tenant::{RegisterTenantCommand, RegisterTenantHandler, RegisterTenantResult};
