//! Customer API routes.
//!
//! JSON field names are the registry's public Portuguese names; the Rust
//! side keeps English names and maps them with `serde(rename)`.

use axum::{
    Json,
    extract::{
        Path, State,
        rejection::{JsonRejection, PathRejection},
    },
    http::{StatusCode, header},
    response::IntoResponse,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use customer_registry_core::{
    AddressId, ContactId, ContactInfo, ContactKind, CustomerId, Email, HistoryId,
    HistoryOperation, Phone,
};

use crate::db::CustomerStore;
use crate::error::{AppError, Result};
use crate::models::{Address, ChangeHistoryRecord, Contact, Customer, CustomerSummary};
use crate::services::{NewCustomerRequest, PostalCodeLookup};
use crate::state::AppState;

/// Message for a missing customer.
pub const CUSTOMER_NOT_FOUND: &str = "Cliente não encontrado";

// =============================================================================
// Request bodies
// =============================================================================

/// Body of `POST /api/clientes`.
#[derive(Debug, Deserialize)]
pub struct CreateCustomerRequest {
    #[serde(rename = "nome", default)]
    pub name: String,
    #[serde(rename = "cep", default)]
    pub postal_code: String,
    #[serde(rename = "numero")]
    pub number: Option<String>,
    #[serde(rename = "complemento")]
    pub complement: Option<String>,
    #[serde(rename = "contatos", default)]
    pub contacts: Vec<ContactRequest>,
}

/// A contact as sent by clients: `{"tipo": "Email", "valor": "..."}`.
#[derive(Debug, Deserialize)]
pub struct ContactRequest {
    #[serde(rename = "tipo")]
    pub kind: String,
    #[serde(rename = "valor", default)]
    pub value: String,
}

impl TryFrom<ContactRequest> for ContactInfo {
    type Error = String;

    /// `tipo` is matched case-insensitively, then the value is checked
    /// against that kind's format.
    fn try_from(contact: ContactRequest) -> std::result::Result<Self, Self::Error> {
        let kind = contact
            .kind
            .parse::<ContactKind>()
            .map_err(|e| e.to_string())?;

        match kind {
            ContactKind::Email => Email::parse(&contact.value)
                .map(Self::Email)
                .map_err(|e| e.to_string()),
            ContactKind::Phone => Phone::parse(&contact.value)
                .map(Self::Phone)
                .map_err(|e| e.to_string()),
        }
    }
}

impl TryFrom<CreateCustomerRequest> for NewCustomerRequest {
    type Error = AppError;

    fn try_from(body: CreateCustomerRequest) -> Result<Self> {
        let contacts = body
            .contacts
            .into_iter()
            .map(ContactInfo::try_from)
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(AppError::BadRequest)?;

        Ok(Self {
            name: body.name,
            postal_code: body.postal_code,
            number: body.number,
            complement: body.complement,
            contacts,
        })
    }
}

/// Body of `PUT /api/clientes/{id}`.
#[derive(Debug, Deserialize)]
pub struct RenameCustomerRequest {
    #[serde(rename = "nome", default)]
    pub name: String,
}

// =============================================================================
// Response bodies
// =============================================================================

/// Body of a successful `POST /api/clientes`.
#[derive(Debug, Serialize)]
pub struct CreatedResponse {
    pub id: CustomerId,
}

#[derive(Debug, Serialize)]
pub struct CustomerResponse {
    #[serde(rename = "clienteId")]
    pub id: CustomerId,
    #[serde(rename = "nome")]
    pub name: String,
    #[serde(rename = "dataCadastroUtc")]
    pub registered_at: DateTime<Utc>,
    #[serde(rename = "enderecos")]
    pub addresses: Vec<AddressResponse>,
    #[serde(rename = "contatos")]
    pub contacts: Vec<ContactResponse>,
}

#[derive(Debug, Serialize)]
pub struct AddressResponse {
    #[serde(rename = "enderecoId")]
    pub id: AddressId,
    #[serde(rename = "cep")]
    pub postal_code: String,
    #[serde(rename = "logradouro")]
    pub street: String,
    #[serde(rename = "numero")]
    pub number: String,
    #[serde(rename = "bairro")]
    pub neighborhood: String,
    #[serde(rename = "cidade")]
    pub city: String,
    #[serde(rename = "estado")]
    pub state: String,
    #[serde(rename = "clienteId")]
    pub customer_id: CustomerId,
}

#[derive(Debug, Serialize)]
pub struct ContactResponse {
    #[serde(rename = "contatoId")]
    pub id: ContactId,
    #[serde(rename = "tipo")]
    pub kind: ContactKind,
    #[serde(rename = "valor")]
    pub value: String,
    #[serde(rename = "clienteId")]
    pub customer_id: CustomerId,
}

#[derive(Debug, Serialize)]
pub struct HistoryResponse {
    #[serde(rename = "historicoId")]
    pub id: HistoryId,
    #[serde(rename = "clienteId")]
    pub customer_id: CustomerId,
    #[serde(rename = "nome")]
    pub name: String,
    #[serde(rename = "dataCadastroUtc")]
    pub registered_at: DateTime<Utc>,
    #[serde(rename = "dataAlteracaoUtc")]
    pub changed_at: DateTime<Utc>,
    #[serde(rename = "operacao")]
    pub operation: HistoryOperation,
}

#[derive(Debug, Serialize)]
pub struct SummaryResponse {
    #[serde(rename = "clienteId")]
    pub customer_id: CustomerId,
    #[serde(rename = "nome")]
    pub name: String,
    #[serde(rename = "dataCadastroUtc")]
    pub registered_at: DateTime<Utc>,
    #[serde(rename = "totalEnderecos")]
    pub address_count: i64,
    #[serde(rename = "totalContatos")]
    pub contact_count: i64,
}

impl From<Customer> for CustomerResponse {
    fn from(customer: Customer) -> Self {
        Self {
            id: customer.id,
            name: customer.name,
            registered_at: customer.registered_at,
            addresses: customer
                .addresses
                .into_iter()
                .map(AddressResponse::from)
                .collect(),
            contacts: customer
                .contacts
                .into_iter()
                .map(ContactResponse::from)
                .collect(),
        }
    }
}

impl From<Address> for AddressResponse {
    fn from(address: Address) -> Self {
        Self {
            id: address.id,
            postal_code: address.postal_code,
            street: address.street,
            number: address.number,
            neighborhood: address.neighborhood,
            city: address.city,
            state: address.state,
            customer_id: address.customer_id,
        }
    }
}

impl From<Contact> for ContactResponse {
    fn from(contact: Contact) -> Self {
        Self {
            id: contact.id,
            kind: contact.kind,
            value: contact.value,
            customer_id: contact.customer_id,
        }
    }
}

impl From<ChangeHistoryRecord> for HistoryResponse {
    fn from(record: ChangeHistoryRecord) -> Self {
        Self {
            id: record.id,
            customer_id: record.customer_id,
            name: record.name,
            registered_at: record.registered_at,
            changed_at: record.changed_at,
            operation: record.operation,
        }
    }
}

impl From<CustomerSummary> for SummaryResponse {
    fn from(summary: CustomerSummary) -> Self {
        Self {
            customer_id: summary.customer_id,
            name: summary.name,
            registered_at: summary.registered_at,
            address_count: summary.address_count,
            contact_count: summary.contact_count,
        }
    }
}

// =============================================================================
// Extraction helpers
// =============================================================================

fn json_body<T>(payload: std::result::Result<Json<T>, JsonRejection>) -> Result<T> {
    payload
        .map(|Json(body)| body)
        .map_err(|rejection| AppError::BadRequest(rejection.body_text()))
}

fn customer_id(path: std::result::Result<Path<i32>, PathRejection>) -> Result<CustomerId> {
    path.map(|Path(id)| CustomerId::new(id))
        .map_err(|_| AppError::BadRequest("ID inválido".to_string()))
}

fn not_found() -> AppError {
    AppError::NotFound(CUSTOMER_NOT_FOUND.to_string())
}

// =============================================================================
// Handlers
// =============================================================================

/// Register a customer.
///
/// `POST /api/clientes` → 201 with `Location` and `{"id": n}`.
pub async fn create<S, P>(
    State(state): State<AppState<S, P>>,
    payload: std::result::Result<Json<CreateCustomerRequest>, JsonRejection>,
) -> Result<impl IntoResponse>
where
    S: CustomerStore + 'static,
    P: PostalCodeLookup + 'static,
{
    let request = NewCustomerRequest::try_from(json_body(payload)?)?;
    let id = state.customers().create_customer(request).await?;

    Ok((
        StatusCode::CREATED,
        [(header::LOCATION, format!("/api/clientes/{id}"))],
        Json(CreatedResponse { id }),
    ))
}

/// `GET /api/clientes/{id}`.
pub async fn show<S, P>(
    State(state): State<AppState<S, P>>,
    path: std::result::Result<Path<i32>, PathRejection>,
) -> Result<Json<CustomerResponse>>
where
    S: CustomerStore + 'static,
    P: PostalCodeLookup + 'static,
{
    let id = customer_id(path)?;

    state
        .customers()
        .get_by_id(id)
        .await?
        .map(|customer| Json(customer.into()))
        .ok_or_else(not_found)
}

/// `GET /api/clientes`.
pub async fn list<S, P>(State(state): State<AppState<S, P>>) -> Result<Json<Vec<CustomerResponse>>>
where
    S: CustomerStore + 'static,
    P: PostalCodeLookup + 'static,
{
    let customers = state.customers().list_all().await?;
    Ok(Json(customers.into_iter().map(Into::into).collect()))
}

/// Rename a customer.
///
/// `PUT /api/clientes/{id}` with `{"nome": "..."}`.
pub async fn rename<S, P>(
    State(state): State<AppState<S, P>>,
    path: std::result::Result<Path<i32>, PathRejection>,
    payload: std::result::Result<Json<RenameCustomerRequest>, JsonRejection>,
) -> Result<Json<CustomerResponse>>
where
    S: CustomerStore + 'static,
    P: PostalCodeLookup + 'static,
{
    let id = customer_id(path)?;
    let body = json_body(payload)?;

    state
        .customers()
        .rename_customer(id, &body.name)
        .await?
        .map(|customer| Json(customer.into()))
        .ok_or_else(not_found)
}

/// Delete a customer.
///
/// `DELETE /api/clientes/{id}` → 204 whether or not the customer existed.
pub async fn remove<S, P>(
    State(state): State<AppState<S, P>>,
    path: std::result::Result<Path<i32>, PathRejection>,
) -> Result<StatusCode>
where
    S: CustomerStore + 'static,
    P: PostalCodeLookup + 'static,
{
    let id = customer_id(path)?;
    state.customers().remove_customer(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// `GET /api/clientes/{id}/historico`.
pub async fn history<S, P>(
    State(state): State<AppState<S, P>>,
    path: std::result::Result<Path<i32>, PathRejection>,
) -> Result<Json<Vec<HistoryResponse>>>
where
    S: CustomerStore + 'static,
    P: PostalCodeLookup + 'static,
{
    let id = customer_id(path)?;
    let records = state.customers().history(id).await?;
    Ok(Json(records.into_iter().map(Into::into).collect()))
}

/// `GET /api/clientes/resumo`.
pub async fn summaries<S, P>(
    State(state): State<AppState<S, P>>,
) -> Result<Json<Vec<SummaryResponse>>>
where
    S: CustomerStore + 'static,
    P: PostalCodeLookup + 'static,
{
    let summaries = state.customers().summaries().await?;
    Ok(Json(summaries.into_iter().map(Into::into).collect()))
}
