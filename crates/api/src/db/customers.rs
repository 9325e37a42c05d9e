//! Customer repository.
//!
//! A customer is always read and written together with its addresses and
//! contacts. Every mutation of the `customer` row that must be audited
//! (update, delete) writes its `customer_history` row inside the same
//! transaction, so the change and its snapshot commit or roll back together.

use std::collections::HashMap;
use std::future::Future;

use chrono::{DateTime, Utc};
use sqlx::{PgConnection, PgPool};
use tracing::instrument;

use customer_registry_core::{
    AddressId, ContactId, ContactKind, CustomerId, HistoryId, HistoryOperation,
};

use super::RepositoryError;
use crate::models::{
    Address, ChangeHistoryRecord, Contact, Customer, CustomerSummary, NewCustomer,
};

/// Persistence operations the customer service depends on.
///
/// Implemented by [`PgCustomerRepository`]; tests substitute an in-memory
/// store.
pub trait CustomerStore: Send + Sync {
    /// Persist a new customer with its children and return the assigned ID.
    fn add(
        &self,
        customer: &NewCustomer,
    ) -> impl Future<Output = Result<CustomerId, RepositoryError>> + Send;

    /// Load one customer with its children.
    fn get_by_id(
        &self,
        id: CustomerId,
    ) -> impl Future<Output = Result<Option<Customer>, RepositoryError>> + Send;

    /// Load every customer with its children, in ID order.
    fn list_all(&self) -> impl Future<Output = Result<Vec<Customer>, RepositoryError>> + Send;

    /// Write the aggregate back and record an `ALTERACAO` snapshot.
    ///
    /// Children present in storage but absent from the aggregate are deleted.
    /// Returns [`RepositoryError::NotFound`] if the customer does not exist.
    fn update(
        &self,
        customer: &Customer,
    ) -> impl Future<Output = Result<(), RepositoryError>> + Send;

    /// Delete a customer (children cascade) and record a `REMOCAO` snapshot.
    ///
    /// Returns `false` without writing anything if the customer does not
    /// exist.
    fn remove(&self, id: CustomerId)
    -> impl Future<Output = Result<bool, RepositoryError>> + Send;

    /// Whether a customer with this ID exists.
    fn exists(&self, id: CustomerId)
    -> impl Future<Output = Result<bool, RepositoryError>> + Send;

    /// History records for a customer, oldest first.
    fn history(
        &self,
        id: CustomerId,
    ) -> impl Future<Output = Result<Vec<ChangeHistoryRecord>, RepositoryError>> + Send;

    /// Address and contact counts for every customer, in ID order.
    fn summaries(
        &self,
    ) -> impl Future<Output = Result<Vec<CustomerSummary>, RepositoryError>> + Send;
}

// =============================================================================
// Rows
// =============================================================================

#[derive(sqlx::FromRow)]
struct CustomerRow {
    id: CustomerId,
    name: String,
    registered_at: DateTime<Utc>,
}

#[derive(sqlx::FromRow)]
struct AddressRow {
    id: AddressId,
    customer_id: CustomerId,
    postal_code: String,
    street: String,
    number: String,
    neighborhood: String,
    city: String,
    state: String,
}

impl From<AddressRow> for Address {
    fn from(row: AddressRow) -> Self {
        Self {
            id: row.id,
            customer_id: row.customer_id,
            postal_code: row.postal_code,
            street: row.street,
            number: row.number,
            neighborhood: row.neighborhood,
            city: row.city,
            state: row.state,
        }
    }
}

#[derive(sqlx::FromRow)]
struct ContactRow {
    id: ContactId,
    customer_id: CustomerId,
    kind: ContactKind,
    value: String,
}

impl From<ContactRow> for Contact {
    fn from(row: ContactRow) -> Self {
        Self {
            id: row.id,
            customer_id: row.customer_id,
            kind: row.kind,
            value: row.value,
        }
    }
}

#[derive(sqlx::FromRow)]
struct HistoryRow {
    id: HistoryId,
    customer_id: CustomerId,
    name: String,
    registered_at: DateTime<Utc>,
    changed_at: DateTime<Utc>,
    operation: HistoryOperation,
}

impl From<HistoryRow> for ChangeHistoryRecord {
    fn from(row: HistoryRow) -> Self {
        Self {
            id: row.id,
            customer_id: row.customer_id,
            name: row.name,
            registered_at: row.registered_at,
            changed_at: row.changed_at,
            operation: row.operation,
        }
    }
}

#[derive(sqlx::FromRow)]
struct SummaryRow {
    customer_id: CustomerId,
    name: String,
    registered_at: DateTime<Utc>,
    address_count: i64,
    contact_count: i64,
}

impl From<SummaryRow> for CustomerSummary {
    fn from(row: SummaryRow) -> Self {
        Self {
            customer_id: row.customer_id,
            name: row.name,
            registered_at: row.registered_at,
            address_count: row.address_count,
            contact_count: row.contact_count,
        }
    }
}

fn assemble(row: CustomerRow, addresses: Vec<Address>, contacts: Vec<Contact>) -> Customer {
    Customer {
        id: row.id,
        name: row.name,
        registered_at: row.registered_at,
        addresses,
        contacts,
    }
}

// =============================================================================
// Repository
// =============================================================================

/// `PostgreSQL`-backed [`CustomerStore`].
#[derive(Debug, Clone)]
pub struct PgCustomerRepository {
    pool: PgPool,
}

impl PgCustomerRepository {
    /// Create a new repository over a connection pool.
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

impl CustomerStore for PgCustomerRepository {
    #[instrument(skip(self, customer), fields(name = %customer.name))]
    async fn add(&self, customer: &NewCustomer) -> Result<CustomerId, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let id = sqlx::query_scalar::<_, CustomerId>(
            r"
            INSERT INTO registry.customer (name, registered_at)
            VALUES ($1, $2)
            RETURNING id
            ",
        )
        .bind(&customer.name)
        .bind(customer.registered_at)
        .fetch_one(&mut *tx)
        .await?;

        for address in &customer.addresses {
            sqlx::query(
                r"
                INSERT INTO registry.address (
                    customer_id, postal_code, street, number, neighborhood, city, state
                )
                VALUES ($1, $2, $3, $4, $5, $6, $7)
                ",
            )
            .bind(id)
            .bind(&address.postal_code)
            .bind(&address.street)
            .bind(&address.number)
            .bind(&address.neighborhood)
            .bind(&address.city)
            .bind(&address.state)
            .execute(&mut *tx)
            .await?;
        }

        for contact in &customer.contacts {
            sqlx::query(
                r"
                INSERT INTO registry.contact (customer_id, kind, value)
                VALUES ($1, $2, $3)
                ",
            )
            .bind(id)
            .bind(contact.kind)
            .bind(&contact.value)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;

        tracing::debug!(customer_id = %id, "customer inserted");
        Ok(id)
    }

    #[instrument(skip(self))]
    async fn get_by_id(&self, id: CustomerId) -> Result<Option<Customer>, RepositoryError> {
        let Some(row) = sqlx::query_as::<_, CustomerRow>(
            r"
            SELECT id, name, registered_at
            FROM registry.customer
            WHERE id = $1
            ",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?
        else {
            return Ok(None);
        };

        let addresses = sqlx::query_as::<_, AddressRow>(
            r"
            SELECT id, customer_id, postal_code, street, number, neighborhood, city, state
            FROM registry.address
            WHERE customer_id = $1
            ORDER BY id
            ",
        )
        .bind(id)
        .fetch_all(&self.pool)
        .await?;

        let contacts = sqlx::query_as::<_, ContactRow>(
            r"
            SELECT id, customer_id, kind, value
            FROM registry.contact
            WHERE customer_id = $1
            ORDER BY id
            ",
        )
        .bind(id)
        .fetch_all(&self.pool)
        .await?;

        Ok(Some(assemble(
            row,
            addresses.into_iter().map(Address::from).collect(),
            contacts.into_iter().map(Contact::from).collect(),
        )))
    }

    #[instrument(skip(self))]
    async fn list_all(&self) -> Result<Vec<Customer>, RepositoryError> {
        let rows = sqlx::query_as::<_, CustomerRow>(
            r"
            SELECT id, name, registered_at
            FROM registry.customer
            ORDER BY id
            ",
        )
        .fetch_all(&self.pool)
        .await?;

        if rows.is_empty() {
            return Ok(Vec::new());
        }

        let ids: Vec<CustomerId> = rows.iter().map(|row| row.id).collect();

        let mut addresses: HashMap<CustomerId, Vec<Address>> = HashMap::new();
        for row in sqlx::query_as::<_, AddressRow>(
            r"
            SELECT id, customer_id, postal_code, street, number, neighborhood, city, state
            FROM registry.address
            WHERE customer_id = ANY($1)
            ORDER BY id
            ",
        )
        .bind(&ids)
        .fetch_all(&self.pool)
        .await?
        {
            addresses.entry(row.customer_id).or_default().push(row.into());
        }

        let mut contacts: HashMap<CustomerId, Vec<Contact>> = HashMap::new();
        for row in sqlx::query_as::<_, ContactRow>(
            r"
            SELECT id, customer_id, kind, value
            FROM registry.contact
            WHERE customer_id = ANY($1)
            ORDER BY id
            ",
        )
        .bind(&ids)
        .fetch_all(&self.pool)
        .await?
        {
            contacts.entry(row.customer_id).or_default().push(row.into());
        }

        Ok(rows
            .into_iter()
            .map(|row| {
                let id = row.id;
                assemble(
                    row,
                    addresses.remove(&id).unwrap_or_default(),
                    contacts.remove(&id).unwrap_or_default(),
                )
            })
            .collect())
    }

    #[instrument(skip(self, customer), fields(customer_id = %customer.id))]
    async fn update(&self, customer: &Customer) -> Result<(), RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let snapshot = sqlx::query_as::<_, CustomerRow>(
            r"
            UPDATE registry.customer
            SET name = $2
            WHERE id = $1
            RETURNING id, name, registered_at
            ",
        )
        .bind(customer.id)
        .bind(&customer.name)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or(RepositoryError::NotFound)?;

        for address in &customer.addresses {
            sqlx::query(
                r"
                UPDATE registry.address
                SET postal_code = $3, street = $4, number = $5,
                    neighborhood = $6, city = $7, state = $8
                WHERE id = $1 AND customer_id = $2
                ",
            )
            .bind(address.id)
            .bind(customer.id)
            .bind(&address.postal_code)
            .bind(&address.street)
            .bind(&address.number)
            .bind(&address.neighborhood)
            .bind(&address.city)
            .bind(&address.state)
            .execute(&mut *tx)
            .await?;
        }

        let kept_addresses: Vec<AddressId> = customer.addresses.iter().map(|a| a.id).collect();
        sqlx::query(
            r"
            DELETE FROM registry.address
            WHERE customer_id = $1 AND id <> ALL($2)
            ",
        )
        .bind(customer.id)
        .bind(&kept_addresses)
        .execute(&mut *tx)
        .await?;

        for contact in &customer.contacts {
            sqlx::query(
                r"
                UPDATE registry.contact
                SET kind = $3, value = $4
                WHERE id = $1 AND customer_id = $2
                ",
            )
            .bind(contact.id)
            .bind(customer.id)
            .bind(contact.kind)
            .bind(&contact.value)
            .execute(&mut *tx)
            .await?;
        }

        let kept_contacts: Vec<ContactId> = customer.contacts.iter().map(|c| c.id).collect();
        sqlx::query(
            r"
            DELETE FROM registry.contact
            WHERE customer_id = $1 AND id <> ALL($2)
            ",
        )
        .bind(customer.id)
        .bind(&kept_contacts)
        .execute(&mut *tx)
        .await?;

        record_history(&mut tx, &snapshot, HistoryOperation::Update).await?;
        tx.commit().await?;

        Ok(())
    }

    #[instrument(skip(self))]
    async fn remove(&self, id: CustomerId) -> Result<bool, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let deleted = sqlx::query_as::<_, CustomerRow>(
            r"
            DELETE FROM registry.customer
            WHERE id = $1
            RETURNING id, name, registered_at
            ",
        )
        .bind(id)
        .fetch_optional(&mut *tx)
        .await?;

        let Some(snapshot) = deleted else {
            tx.rollback().await?;
            return Ok(false);
        };

        record_history(&mut tx, &snapshot, HistoryOperation::Delete).await?;
        tx.commit().await?;

        tracing::debug!(customer_id = %id, "customer deleted");
        Ok(true)
    }

    async fn exists(&self, id: CustomerId) -> Result<bool, RepositoryError> {
        let exists = sqlx::query_scalar::<_, bool>(
            r"SELECT EXISTS (SELECT 1 FROM registry.customer WHERE id = $1)",
        )
        .bind(id)
        .fetch_one(&self.pool)
        .await?;

        Ok(exists)
    }

    #[instrument(skip(self))]
    async fn history(&self, id: CustomerId) -> Result<Vec<ChangeHistoryRecord>, RepositoryError> {
        let rows = sqlx::query_as::<_, HistoryRow>(
            r"
            SELECT id, customer_id, name, registered_at, changed_at, operation
            FROM registry.customer_history
            WHERE customer_id = $1
            ORDER BY id
            ",
        )
        .bind(id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(ChangeHistoryRecord::from).collect())
    }

    #[instrument(skip(self))]
    async fn summaries(&self) -> Result<Vec<CustomerSummary>, RepositoryError> {
        let rows = sqlx::query_as::<_, SummaryRow>(
            r"
            SELECT customer_id, name, registered_at, address_count, contact_count
            FROM registry.customer_summary
            ORDER BY customer_id
            ",
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(CustomerSummary::from).collect())
    }
}

/// Append a snapshot of the customer row to `customer_history`.
async fn record_history(
    conn: &mut PgConnection,
    snapshot: &CustomerRow,
    operation: HistoryOperation,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        r"
        INSERT INTO registry.customer_history (customer_id, name, registered_at, operation)
        VALUES ($1, $2, $3, $4)
        ",
    )
    .bind(snapshot.id)
    .bind(&snapshot.name)
    .bind(snapshot.registered_at)
    .bind(operation)
    .execute(conn)
    .await?;

    tracing::info!(
        customer_id = %snapshot.id,
        operation = %operation,
        "customer history recorded"
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    fn registered() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 6, 21, 15, 0, 0)
            .single()
            .unwrap_or_default()
    }

    #[test]
    fn test_assemble_keeps_children() {
        let row = CustomerRow {
            id: CustomerId::new(1),
            name: "João Silva".to_owned(),
            registered_at: registered(),
        };
        let contact = Contact::from(ContactRow {
            id: ContactId::new(3),
            customer_id: CustomerId::new(1),
            kind: ContactKind::Phone,
            value: "11999999999".to_owned(),
        });

        let customer = assemble(row, Vec::new(), vec![contact.clone()]);

        assert_eq!(customer.id, CustomerId::new(1));
        assert_eq!(customer.name, "João Silva");
        assert!(customer.addresses.is_empty());
        assert_eq!(customer.contacts, vec![contact]);
    }

    #[test]
    fn test_history_row_conversion() {
        let record = ChangeHistoryRecord::from(HistoryRow {
            id: HistoryId::new(9),
            customer_id: CustomerId::new(1),
            name: "Ana".to_owned(),
            registered_at: registered(),
            changed_at: registered(),
            operation: HistoryOperation::Delete,
        });

        assert_eq!(record.id, HistoryId::new(9));
        assert_eq!(record.operation, HistoryOperation::Delete);
        assert_eq!(record.registered_at, registered());
    }
}
