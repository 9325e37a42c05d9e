//! Change history and summary read models.

use chrono::{DateTime, Utc};

use customer_registry_core::{CustomerId, HistoryId, HistoryOperation};

/// Snapshot of a customer taken when its row was updated or deleted.
///
/// There is no foreign key back to the customer, so records outlive it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangeHistoryRecord {
    pub id: HistoryId,
    pub customer_id: CustomerId,
    pub name: String,
    pub registered_at: DateTime<Utc>,
    /// Set by the database when the record is written.
    pub changed_at: DateTime<Utc>,
    pub operation: HistoryOperation,
}

/// Per-customer counts of owned addresses and contacts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CustomerSummary {
    pub customer_id: CustomerId,
    pub name: String,
    pub registered_at: DateTime<Utc>,
    pub address_count: i64,
    pub contact_count: i64,
}
