//! Subscription handlers.
//!
//! ## Commands
//! - Activating a paid plan
//! - Verifying a payment signature
//! - Creating a checkout order
//! - Confirming a completed payment
//!
//! ## Queries
//! - Subscription status
//! - Entitlement and purchase guard
//! - Audit events

mod activate_subscription;
mod check_entitlement;
mod confirm_payment;
mod create_checkout_order;
mod get_subscription_events;
mod get_subscription_status;
mod verify_payment;

// Commands
pub use activate_subscription::{
    ActivateSubscriptionCommand, ActivateSubscriptionHandler, ActivateSubscriptionResult,
};
pub use confirm_payment::{ConfirmPaymentCommand, ConfirmPaymentHandler};
pub use create_checkout_order::{
    checkout_receipt, CheckoutOrder, CreateCheckoutOrderCommand, CreateCheckoutOrderHandler,
};
pub use verify_payment::{VerifyPaymentCommand, VerifyPaymentHandler};

// Queries
pub use check_entitlement::{CheckEntitlementHandler, PaidPlanGuard};
pub use get_subscription_events::{GetSubscriptionEventsHandler, GetSubscriptionEventsQuery};
pub use get_subscription_status::{
    GetSubscriptionStatusHandler, GetSubscriptionStatusQuery, SubscriptionStatusView,
};
