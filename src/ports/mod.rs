//! Ports - Interfaces for external dependencies.
//!
//! Following hexagonal architecture, ports define the contracts between
//! the domain and the outside world. Adapters implement these ports.
//!
//! ## Persistence Ports
//!
//! - `TenantRepository` - Tenant records and the subscription audit log
//! - `OtpRepository` - Email verification codes
//! - `PaymentRepository` - Write-once verified payments
//! - `RetentionStore` - Bulk operational data housekeeping
//! - `OrderReader` - Read-only order projection for reports
//!
//! ## External Service Ports
//!
//! - `PaymentGateway` - Order creation for checkout
//! - `MailTransport` - Outbound email
//!
//! ## Time
//!
//! - `Clock` - Current time for every lifecycle decision

mod clock;
mod mail_transport;
mod order_reader;
mod otp_repository;
mod payment_gateway;
mod payment_repository;
mod retention_store;
mod tenant_repository;

pub use clock::Clock;
pub use mail_transport::{EmailAttachment, MailError, MailTransport, OutboundEmail};
pub use order_reader::OrderReader;
pub use otp_repository::OtpRepository;
pub use payment_gateway::{
    CreateOrderRequest, GatewayOrder, PaymentError, PaymentErrorCode, PaymentGateway,
};
pub use payment_repository::PaymentRepository;
pub use retention_store::RetentionStore;
pub use tenant_repository::TenantRepository;
