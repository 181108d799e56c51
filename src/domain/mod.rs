//! Domain layer containing business logic and domain types.
//!
//! # Module Organization
//!
//! - `foundation` - Shared domain primitives (IDs, timestamps, errors)
//! - `subscription` - Tenant lifecycle, entitlement and payment verification
//! - `otp` - Email verification codes
//! - `retention` - Retention windows and sweep bookkeeping
//! - `reporting` - Daily owner report content

pub mod foundation;
pub mod otp;
pub mod reporting;
pub mod retention;
pub mod subscription;
