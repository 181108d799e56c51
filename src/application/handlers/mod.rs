//! Command and query handlers.
//!
//! - `subscription` - Entitlement, purchases and activation
//! - `tenant` - Signup and owner email verification

pub mod subscription;
pub mod tenant;

pub use subscription::*;
pub use tenant::*;
