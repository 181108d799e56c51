//! Clock port - the only source of "now" for lifecycle decisions.

use crate::domain::foundation::Timestamp;

/// Supplies the current time.
///
/// Every entitlement and expiry rule is a pure function of stored
/// timestamps and this clock, so tests drive time explicitly.
pub trait Clock: Send + Sync {
    fn now(&self) -> Timestamp;
}
