//! Change history inspection.
//!
//! Reads `registry.customer_history` through the same repository the API
//! uses. Records are kept after a customer is deleted, so this works for
//! removed customers too.

use customer_registry_api::db::{self, CustomerStore, PgCustomerRepository};
use customer_registry_core::CustomerId;

use super::{CommandError, database_url};

/// Log every history record of a customer, oldest first.
///
/// # Errors
///
/// Returns an error if the database URL is missing or the query fails.
pub async fn show(customer_id: i32) -> Result<(), CommandError> {
    let customer_id = CustomerId::new(customer_id);
    let pool = db::create_pool(&database_url()?).await?;
    let repository = PgCustomerRepository::new(pool);

    let records = repository.history(customer_id).await?;
    let exists = repository.exists(customer_id).await?;

    if records.is_empty() {
        tracing::info!(%customer_id, exists, "no history recorded");
        return Ok(());
    }

    for record in &records {
        tracing::info!(
            history_id = %record.id,
            %customer_id,
            operation = %record.operation,
            name = %record.name,
            registered_at = %record.registered_at,
            changed_at = %record.changed_at,
            "history record"
        );
    }

    tracing::info!(
        %customer_id,
        exists,
        count = records.len(),
        "history listed"
    );
    Ok(())
}
