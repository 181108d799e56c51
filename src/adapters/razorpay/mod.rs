//! Razorpay payment gateway adapter.
//!
//! Implements the `PaymentGateway` port for order creation. Payment
//! signatures are verified in the domain layer with the same key secret.
//!
//! # Configuration
//!
//! - `TABLESIDE__PAYMENT__KEY_ID`: public key id sent to the checkout widget
//! - `TABLESIDE__PAYMENT__KEY_SECRET`: API secret and signature key

mod mock_payment_gateway;
mod razorpay_gateway;

pub use mock_payment_gateway::MockPaymentGateway;
pub use razorpay_gateway::{RazorpayConfig, RazorpayGateway};
