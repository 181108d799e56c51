//! Mail transports.
//!
//! - `ResendMailTransport` - Resend HTTP API
//! - `RecordingMailTransport` - In-memory, for tests and unconfigured mail

mod recording_transport;
mod resend_transport;

pub use recording_transport::RecordingMailTransport;
pub use resend_transport::{ResendConfig, ResendMailTransport};
