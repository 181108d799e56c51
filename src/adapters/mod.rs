//! Adapters - Implementations of port interfaces.
//!
//! Adapters connect the domain to external systems:
//! - `postgres` - PostgreSQL persistence
//! - `memory` - In-memory persistence with the same atomicity rules
//! - `razorpay` - Payment gateway order API
//! - `email` - Mail transports
//! - `clock` - System and manual clocks
//! - `retry` - Bounded retry for storage contention

pub mod clock;
pub mod email;
pub mod memory;
pub mod postgres;
pub mod razorpay;
pub mod retry;

pub use clock::{ManualClock, SystemClock};
pub use email::{RecordingMailTransport, ResendConfig, ResendMailTransport};
pub use memory::InMemoryStore;
pub use razorpay::{MockPaymentGateway, RazorpayConfig, RazorpayGateway};
pub use retry::RetryPolicy;
