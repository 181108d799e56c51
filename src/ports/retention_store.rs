//! Operational data retention port.

use async_trait::async_trait;

use crate::domain::foundation::{DomainError, Timestamp};
use crate::domain::retention::{DataDeletionLog, DataPurgeCounts};

/// Bulk housekeeping over orders, payment logs and subscription events.
#[async_trait]
pub trait RetentionStore: Send + Sync {
    /// Delete orders, payment logs and subscription events created before
    /// `cutoff`. Returns per-table counts.
    async fn purge_operational_data(&self, cutoff: Timestamp)
        -> Result<DataPurgeCounts, DomainError>;

    async fn record_data_deletion(&self, log: &DataDeletionLog) -> Result<(), DomainError>;

    /// Return freed space to the storage engine. May be a no-op.
    async fn reclaim_storage(&self) -> Result<(), DomainError>;
}
