//! Customer registration use cases.
//!
//! [`CustomerService`] owns the business rules: input validation, the postal
//! code lookup, and assembling the aggregate before a single repository call.
//! It is generic over its store and lookup so the rules can be exercised
//! without a database or network.

use chrono::Utc;
use thiserror::Error;
use tracing::instrument;

use customer_registry_core::{ContactInfo, CustomerId};

use crate::db::{CustomerStore, RepositoryError};
use crate::models::customer::MAX_NAME_LENGTH;
use crate::models::{ChangeHistoryRecord, Customer, CustomerSummary, NewCustomer};
use crate::services::postal_code::PostalCodeLookup;

/// Errors returned by [`CustomerService`].
#[derive(Debug, Error)]
pub enum ServiceError {
    /// The input is malformed; the message is safe to show to clients.
    #[error("{0}")]
    Validation(String),

    /// The input is well-formed but violates a business rule.
    #[error("{0}")]
    BusinessRule(String),

    /// Persistence failed.
    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

/// Input for [`CustomerService::create_customer`].
#[derive(Debug, Clone)]
pub struct NewCustomerRequest {
    pub name: String,
    /// Postal code as typed by the client, separators included.
    pub postal_code: String,
    pub number: Option<String>,
    /// Accepted for compatibility; not stored.
    pub complement: Option<String>,
    pub contacts: Vec<ContactInfo>,
}

/// Customer registration service.
#[derive(Debug, Clone)]
pub struct CustomerService<S, P> {
    store: S,
    postal_codes: P,
}

impl<S, P> CustomerService<S, P>
where
    S: CustomerStore,
    P: PostalCodeLookup,
{
    /// Create a service over a store and a postal code lookup.
    #[must_use]
    pub const fn new(store: S, postal_codes: P) -> Self {
        Self {
            store,
            postal_codes,
        }
    }

    /// Register a new customer and return its ID.
    ///
    /// Validates the name and contacts, resolves the postal code, and
    /// persists the customer with one address and all contacts in a single
    /// repository call. Nothing is written if any step fails.
    ///
    /// # Errors
    ///
    /// - [`ServiceError::Validation`] for a blank or too long name, or no contacts.
    /// - [`ServiceError::BusinessRule`] if the postal code cannot be resolved.
    /// - [`ServiceError::Repository`] if persistence fails.
    #[instrument(skip(self, request), fields(postal_code = %request.postal_code))]
    pub async fn create_customer(
        &self,
        request: NewCustomerRequest,
    ) -> Result<CustomerId, ServiceError> {
        let name = validate_name(&request.name)?;

        if request.contacts.is_empty() {
            return Err(ServiceError::Validation(
                "Pelo menos um contato é obrigatório".to_owned(),
            ));
        }

        let Some(postal_address) = self.postal_codes.lookup(&request.postal_code).await else {
            return Err(ServiceError::BusinessRule(format!(
                "CEP {} não encontrado.",
                request.postal_code
            )));
        };

        let customer = NewCustomer::assemble(
            name,
            request.number.as_deref(),
            request.contacts,
            postal_address,
            Utc::now(),
        );

        let id = self.store.add(&customer).await?;

        tracing::info!(customer_id = %id, "customer created");
        Ok(id)
    }

    /// Load a customer with its addresses and contacts.
    ///
    /// # Errors
    ///
    /// Returns [`ServiceError::Validation`] if `id` is not positive.
    pub async fn get_by_id(&self, id: CustomerId) -> Result<Option<Customer>, ServiceError> {
        validate_id(id)?;
        Ok(self.store.get_by_id(id).await?)
    }

    /// Every customer with addresses and contacts, in ID order.
    ///
    /// # Errors
    ///
    /// Returns [`ServiceError::Repository`] if the query fails.
    pub async fn list_all(&self) -> Result<Vec<Customer>, ServiceError> {
        Ok(self.store.list_all().await?)
    }

    /// Change a customer's name, recording an `ALTERACAO` history entry.
    ///
    /// Returns `Ok(None)` if the customer does not exist.
    ///
    /// # Errors
    ///
    /// Returns [`ServiceError::Validation`] for a non-positive ID or an
    /// invalid name.
    #[instrument(skip(self, name))]
    pub async fn rename_customer(
        &self,
        id: CustomerId,
        name: &str,
    ) -> Result<Option<Customer>, ServiceError> {
        validate_id(id)?;
        let name = validate_name(name)?;

        let Some(mut customer) = self.store.get_by_id(id).await? else {
            return Ok(None);
        };

        name.clone_into(&mut customer.name);

        match self.store.update(&customer).await {
            Ok(()) => {
                tracing::info!(customer_id = %id, "customer renamed");
                Ok(Some(customer))
            }
            // Deleted between the read and the update.
            Err(RepositoryError::NotFound) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Delete a customer with its addresses and contacts.
    ///
    /// Returns whether a customer was actually deleted; deleting an absent
    /// customer is not an error.
    ///
    /// # Errors
    ///
    /// Returns [`ServiceError::Validation`] if `id` is not positive.
    #[instrument(skip(self))]
    pub async fn remove_customer(&self, id: CustomerId) -> Result<bool, ServiceError> {
        validate_id(id)?;

        let removed = self.store.remove(id).await?;
        if removed {
            tracing::info!(customer_id = %id, "customer removed");
        }
        Ok(removed)
    }

    /// Change history of a customer, oldest first. Survives deletion.
    ///
    /// # Errors
    ///
    /// Returns [`ServiceError::Validation`] if `id` is not positive.
    pub async fn history(&self, id: CustomerId) -> Result<Vec<ChangeHistoryRecord>, ServiceError> {
        validate_id(id)?;
        Ok(self.store.history(id).await?)
    }

    /// Address and contact counts for every customer.
    ///
    /// # Errors
    ///
    /// Returns [`ServiceError::Repository`] if the query fails.
    pub async fn summaries(&self) -> Result<Vec<CustomerSummary>, ServiceError> {
        Ok(self.store.summaries().await?)
    }
}

fn validate_id(id: CustomerId) -> Result<(), ServiceError> {
    if id.is_positive() {
        Ok(())
    } else {
        Err(ServiceError::Validation(
            "ID deve ser maior que zero".to_owned(),
        ))
    }
}

/// Returns the trimmed name.
fn validate_name(name: &str) -> Result<&str, ServiceError> {
    let name = name.trim();

    if name.is_empty() {
        return Err(ServiceError::Validation("Nome é obrigatório".to_owned()));
    }
    if name.chars().count() > MAX_NAME_LENGTH {
        return Err(ServiceError::Validation(format!(
            "Nome deve ter no máximo {MAX_NAME_LENGTH} caracteres"
        )));
    }

    Ok(name)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
pub(crate) mod tests {
    use std::collections::BTreeMap;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};

    use customer_registry_core::{
        AddressId, ContactId, ContactKind, Email, HistoryId, HistoryOperation, Phone,
    };

    use super::*;
    use crate::models::{Address, Contact, PostalAddress};

    // =========================================================================
    // Fakes
    // =========================================================================

    #[derive(Default)]
    struct StoreState {
        next_id: i32,
        customers: BTreeMap<CustomerId, Customer>,
        history: Vec<ChangeHistoryRecord>,
    }

    impl StoreState {
        fn next(&mut self) -> i32 {
            self.next_id += 1;
            self.next_id
        }
    }

    /// In-memory [`CustomerStore`] with the same history semantics as the
    /// database repository.
    #[derive(Clone, Default)]
    pub(crate) struct InMemoryStore {
        state: Arc<Mutex<StoreState>>,
    }

    impl InMemoryStore {
        fn history_len(&self) -> usize {
            self.state.lock().unwrap().history.len()
        }

        fn customer_count(&self) -> usize {
            self.state.lock().unwrap().customers.len()
        }

        fn record(state: &mut StoreState, customer: &Customer, operation: HistoryOperation) {
            let id = HistoryId::new(state.next());
            state.history.push(ChangeHistoryRecord {
                id,
                customer_id: customer.id,
                name: customer.name.clone(),
                registered_at: customer.registered_at,
                changed_at: Utc::now(),
                operation,
            });
        }
    }

    impl CustomerStore for InMemoryStore {
        async fn add(&self, customer: &NewCustomer) -> Result<CustomerId, RepositoryError> {
            let mut state = self.state.lock().unwrap();
            let id = CustomerId::new(state.next());

            let addresses = customer
                .addresses
                .iter()
                .map(|a| Address {
                    id: AddressId::new(state.next()),
                    customer_id: id,
                    postal_code: a.postal_code.clone(),
                    street: a.street.clone(),
                    number: a.number.clone(),
                    neighborhood: a.neighborhood.clone(),
                    city: a.city.clone(),
                    state: a.state.clone(),
                })
                .collect();
            let contacts = customer
                .contacts
                .iter()
                .map(|c| Contact {
                    id: ContactId::new(state.next()),
                    customer_id: id,
                    kind: c.kind,
                    value: c.value.clone(),
                })
                .collect();

            state.customers.insert(
                id,
                Customer {
                    id,
                    name: customer.name.clone(),
                    registered_at: customer.registered_at,
                    addresses,
                    contacts,
                },
            );
            Ok(id)
        }

        async fn get_by_id(&self, id: CustomerId) -> Result<Option<Customer>, RepositoryError> {
            Ok(self.state.lock().unwrap().customers.get(&id).cloned())
        }

        async fn list_all(&self) -> Result<Vec<Customer>, RepositoryError> {
            Ok(self.state.lock().unwrap().customers.values().cloned().collect())
        }

        async fn update(&self, customer: &Customer) -> Result<(), RepositoryError> {
            let mut state = self.state.lock().unwrap();
            let Some(stored) = state.customers.get_mut(&customer.id) else {
                return Err(RepositoryError::NotFound);
            };
            stored.name.clone_from(&customer.name);
            stored.addresses.clone_from(&customer.addresses);
            stored.contacts.clone_from(&customer.contacts);
            let snapshot = stored.clone();
            Self::record(&mut state, &snapshot, HistoryOperation::Update);
            Ok(())
        }

        async fn remove(&self, id: CustomerId) -> Result<bool, RepositoryError> {
            let mut state = self.state.lock().unwrap();
            let Some(removed) = state.customers.remove(&id) else {
                return Ok(false);
            };
            Self::record(&mut state, &removed, HistoryOperation::Delete);
            Ok(true)
        }

        async fn exists(&self, id: CustomerId) -> Result<bool, RepositoryError> {
            Ok(self.state.lock().unwrap().customers.contains_key(&id))
        }

        async fn history(
            &self,
            id: CustomerId,
        ) -> Result<Vec<ChangeHistoryRecord>, RepositoryError> {
            Ok(self
                .state
                .lock()
                .unwrap()
                .history
                .iter()
                .filter(|record| record.customer_id == id)
                .cloned()
                .collect())
        }

        async fn summaries(&self) -> Result<Vec<CustomerSummary>, RepositoryError> {
            Ok(self
                .state
                .lock()
                .unwrap()
                .customers
                .values()
                .map(|c| CustomerSummary {
                    customer_id: c.id,
                    name: c.name.clone(),
                    registered_at: c.registered_at,
                    address_count: i64::try_from(c.addresses.len()).unwrap(),
                    contact_count: i64::try_from(c.contacts.len()).unwrap(),
                })
                .collect())
        }
    }

    /// Lookup that knows a fixed set of normalized postal codes.
    #[derive(Clone, Default)]
    pub(crate) struct FakeLookup {
        known: BTreeMap<String, PostalAddress>,
        calls: Arc<AtomicUsize>,
    }

    impl FakeLookup {
        pub(crate) fn with_paulista() -> Self {
            let mut known = BTreeMap::new();
            known.insert("01310100".to_owned(), paulista());
            Self {
                known,
                calls: Arc::default(),
            }
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    impl PostalCodeLookup for FakeLookup {
        async fn lookup(&self, postal_code: &str) -> Option<PostalAddress> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let normalized = customer_registry_core::PostalCode::normalize(postal_code)?;
            self.known.get(normalized.as_str()).cloned()
        }
    }

    pub(crate) fn paulista() -> PostalAddress {
        PostalAddress {
            postal_code: "01310-100".to_owned(),
            street: "Avenida Paulista".to_owned(),
            neighborhood: "Bela Vista".to_owned(),
            city: "São Paulo".to_owned(),
            state: "SP".to_owned(),
        }
    }

    fn service() -> (
        CustomerService<InMemoryStore, FakeLookup>,
        InMemoryStore,
        FakeLookup,
    ) {
        let store = InMemoryStore::default();
        let lookup = FakeLookup::with_paulista();
        (
            CustomerService::new(store.clone(), lookup.clone()),
            store,
            lookup,
        )
    }

    fn joao() -> NewCustomerRequest {
        NewCustomerRequest {
            name: "João Silva".to_owned(),
            postal_code: "01310-100".to_owned(),
            number: Some("123".to_owned()),
            complement: None,
            contacts: vec![
                Email::parse("joao@x.com").unwrap().into(),
                Phone::parse("11999999999").unwrap().into(),
            ],
        }
    }

    fn validation_message(err: ServiceError) -> String {
        match err {
            ServiceError::Validation(message) => message,
            other => panic!("expected validation error, got {other:?}"),
        }
    }

    // =========================================================================
    // create_customer
    // =========================================================================

    #[tokio::test]
    async fn test_create_customer_persists_aggregate() {
        let (service, _, _) = service();
        let before = Utc::now();

        let id = service.create_customer(joao()).await.unwrap();
        assert!(id.is_positive());

        let customer = service.get_by_id(id).await.unwrap().unwrap();
        assert_eq!(customer.name, "João Silva");
        assert!(customer.registered_at >= before && customer.registered_at <= Utc::now());

        assert_eq!(customer.addresses.len(), 1);
        let address = &customer.addresses[0];
        assert_eq!(address.customer_id, id);
        assert_eq!(address.postal_code, "01310-100");
        assert_eq!(address.street, "Avenida Paulista");
        assert_eq!(address.number, "123");
        assert_eq!(address.neighborhood, "Bela Vista");
        assert_eq!(address.city, "São Paulo");
        assert_eq!(address.state, "SP");

        let contacts: Vec<_> = customer
            .contacts
            .iter()
            .map(|c| (c.kind, c.value.as_str()))
            .collect();
        assert_eq!(
            contacts,
            vec![
                (ContactKind::Email, "joao@x.com"),
                (ContactKind::Phone, "11999999999"),
            ]
        );
    }

    #[tokio::test]
    async fn test_create_customer_unknown_postal_code() {
        let (service, store, _) = service();
        let request = NewCustomerRequest {
            postal_code: "00000-000".to_owned(),
            ..joao()
        };

        let err = service.create_customer(request).await.unwrap_err();

        match err {
            ServiceError::BusinessRule(message) => {
                assert_eq!(message, "CEP 00000-000 não encontrado.");
            }
            other => panic!("expected business rule error, got {other:?}"),
        }
        assert_eq!(store.customer_count(), 0);
    }

    #[tokio::test]
    async fn test_create_customer_requires_name() {
        let (service, store, lookup) = service();

        for name in ["", "   "] {
            let request = NewCustomerRequest {
                name: name.to_owned(),
                ..joao()
            };
            let err = service.create_customer(request).await.unwrap_err();
            assert_eq!(validation_message(err), "Nome é obrigatório");
        }

        assert_eq!(lookup.calls(), 0);
        assert_eq!(store.customer_count(), 0);
    }

    #[tokio::test]
    async fn test_create_customer_rejects_long_name() {
        let (service, _, lookup) = service();
        let request = NewCustomerRequest {
            name: "a".repeat(MAX_NAME_LENGTH + 1),
            ..joao()
        };

        let err = service.create_customer(request).await.unwrap_err();
        assert!(matches!(err, ServiceError::Validation(_)));
        assert_eq!(lookup.calls(), 0);
    }

    #[tokio::test]
    async fn test_create_customer_requires_contact() {
        let (service, store, lookup) = service();
        let request = NewCustomerRequest {
            contacts: Vec::new(),
            ..joao()
        };

        let err = service.create_customer(request).await.unwrap_err();

        assert_eq!(
            validation_message(err),
            "Pelo menos um contato é obrigatório"
        );
        assert_eq!(lookup.calls(), 0);
        assert_eq!(store.customer_count(), 0);
    }

    #[tokio::test]
    async fn test_create_customer_defaults_number() {
        let (service, _, _) = service();
        let request = NewCustomerRequest {
            number: None,
            complement: Some("Apto 12".to_owned()),
            ..joao()
        };

        let id = service.create_customer(request).await.unwrap();
        let customer = service.get_by_id(id).await.unwrap().unwrap();

        assert_eq!(customer.addresses[0].number, "S/N");
    }

    #[tokio::test]
    async fn test_create_customer_records_no_history() {
        let (service, store, _) = service();

        let id = service.create_customer(joao()).await.unwrap();

        assert!(service.history(id).await.unwrap().is_empty());
        assert_eq!(store.history_len(), 0);
    }

    // =========================================================================
    // reads
    // =========================================================================

    #[tokio::test]
    async fn test_get_by_id_rejects_non_positive_id() {
        let (service, _, _) = service();

        for id in [0, -1] {
            let err = service.get_by_id(CustomerId::new(id)).await.unwrap_err();
            assert_eq!(validation_message(err), "ID deve ser maior que zero");
        }
    }

    #[tokio::test]
    async fn test_get_by_id_missing_customer() {
        let (service, _, _) = service();
        assert!(service.get_by_id(CustomerId::new(999)).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_list_all_empty() {
        let (service, _, _) = service();
        assert!(service.list_all().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_list_all_in_id_order() {
        let (service, _, _) = service();
        let first = service.create_customer(joao()).await.unwrap();
        let second = service
            .create_customer(NewCustomerRequest {
                name: "Maria Santos".to_owned(),
                ..joao()
            })
            .await
            .unwrap();

        let ids: Vec<_> = service
            .list_all()
            .await
            .unwrap()
            .iter()
            .map(|c| c.id)
            .collect();
        assert_eq!(ids, vec![first, second]);
    }

    #[tokio::test]
    async fn test_summaries_count_children() {
        let (service, _, _) = service();
        let id = service.create_customer(joao()).await.unwrap();

        let summaries = service.summaries().await.unwrap();

        assert_eq!(summaries.len(), 1);
        assert_eq!(summaries[0].customer_id, id);
        assert_eq!(summaries[0].address_count, 1);
        assert_eq!(summaries[0].contact_count, 2);
    }

    // =========================================================================
    // mutations
    // =========================================================================

    #[tokio::test]
    async fn test_rename_records_update() {
        let (service, _, _) = service();
        let id = service.create_customer(joao()).await.unwrap();

        let renamed = service
            .rename_customer(id, " João P. Silva ")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(renamed.name, "João P. Silva");

        let history = service.history(id).await.unwrap();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].operation, HistoryOperation::Update);
        assert_eq!(history[0].name, "João P. Silva");
        assert_eq!(history[0].registered_at, renamed.registered_at);
    }

    #[tokio::test]
    async fn test_rename_missing_customer() {
        let (service, store, _) = service();

        let result = service
            .rename_customer(CustomerId::new(42), "Ana")
            .await
            .unwrap();

        assert!(result.is_none());
        assert_eq!(store.history_len(), 0);
    }

    #[tokio::test]
    async fn test_rename_validates_name() {
        let (service, _, _) = service();
        let id = service.create_customer(joao()).await.unwrap();

        let err = service.rename_customer(id, " ").await.unwrap_err();
        assert_eq!(validation_message(err), "Nome é obrigatório");
    }

    #[tokio::test]
    async fn test_remove_cascades_and_records_delete_once() {
        let (service, store, _) = service();
        let id = service.create_customer(joao()).await.unwrap();

        assert!(service.remove_customer(id).await.unwrap());
        assert!(service.get_by_id(id).await.unwrap().is_none());
        assert!(!store.exists(id).await.unwrap());

        let history = service.history(id).await.unwrap();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].operation, HistoryOperation::Delete);
        assert_eq!(history[0].customer_id, id);
        assert_eq!(history[0].name, "João Silva");
    }

    #[tokio::test]
    async fn test_remove_is_idempotent() {
        let (service, store, _) = service();
        let id = service.create_customer(joao()).await.unwrap();

        assert!(service.remove_customer(id).await.unwrap());
        assert!(!service.remove_customer(id).await.unwrap());
        assert!(!service.remove_customer(CustomerId::new(999)).await.unwrap());

        assert_eq!(store.history_len(), 1);
    }

    #[tokio::test]
    async fn test_remove_rejects_non_positive_id() {
        let (service, _, _) = service();
        let err = service.remove_customer(CustomerId::new(0)).await.unwrap_err();
        assert!(matches!(err, ServiceError::Validation(_)));
    }
}
