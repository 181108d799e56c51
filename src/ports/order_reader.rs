//! Order reader port (read side) for owner reports.

use async_trait::async_trait;

use crate::domain::foundation::{DomainError, TenantId, Timestamp};
use crate::domain::reporting::ReportOrder;

#[async_trait]
pub trait OrderReader: Send + Sync {
    /// Orders of one tenant created in `[since, until)`, newest first.
    /// Never returns another tenant's orders.
    async fn orders_between(
        &self,
        tenant_id: &TenantId,
        since: Timestamp,
        until: Timestamp,
    ) -> Result<Vec<ReportOrder>, DomainError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn order_reader_is_object_safe() {
        fn _accepts_dyn(_reader: &dyn OrderReader) {}
    }
}
