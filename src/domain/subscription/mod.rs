//! Subscription domain module.
//!
//! Tenant lifecycle, entitlement rules, plan catalog and payment
//! signature verification.
//!
//! # Module Structure
//!
//! - `tenant` - Tenant aggregate and entitlement rules
//! - `status` - SubscriptionStatus state machine
//! - `plan` - SubscriptionPlan catalog
//! - `slug` - Slug value object
//! - `events` - Append-only audit events
//! - `payment` - HMAC signature verification and payment records
//! - `errors` - SubscriptionError taxonomy

mod errors;
mod events;
mod payment;
mod plan;
mod slug;
mod status;
mod tenant;

pub use errors::SubscriptionError;
pub use events::{SubscriptionEvent, SubscriptionEventType};
pub use payment::{
    compute_signature, signing_string, verify_signature, CheckoutIntent, PaymentRecord,
    PaymentVerificationStatus, SignatureCheck,
};
pub use plan::{SubscriptionPlan, PLAN_CURRENCY};
pub use slug::Slug;
pub use status::SubscriptionStatus;
pub use tenant::{normalize_email, Tenant};
