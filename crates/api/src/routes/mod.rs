//! HTTP route handlers for the registry API.
//!
//! # Route Structure
//!
//! ```text
//! GET    /health                      - Liveness check
//! GET    /health/ready                - Readiness check (database)
//!
//! # Customers
//! POST   /api/clientes                - Register a customer
//! GET    /api/clientes                - List customers with addresses and contacts
//! GET    /api/clientes/resumo         - Address and contact counts per customer
//! GET    /api/clientes/{id}           - Customer detail
//! PUT    /api/clientes/{id}           - Rename a customer
//! DELETE /api/clientes/{id}           - Delete a customer
//! GET    /api/clientes/{id}/historico - Change history
//! ```

pub mod customers;

use axum::{Router, extract::State, http::StatusCode, routing::get};

use crate::db::CustomerStore;
use crate::services::PostalCodeLookup;
use crate::state::AppState;

/// Create the main router with all routes.
pub fn routes<S, P>() -> Router<AppState<S, P>>
where
    S: CustomerStore + 'static,
    P: PostalCodeLookup + 'static,
{
    Router::new()
        .route("/health", get(health))
        .route("/health/ready", get(readiness::<S, P>))
        .route(
            "/api/clientes",
            get(customers::list::<S, P>).post(customers::create::<S, P>),
        )
        .route("/api/clientes/resumo", get(customers::summaries::<S, P>))
        .route(
            "/api/clientes/{id}",
            get(customers::show::<S, P>)
                .put(customers::rename::<S, P>)
                .delete(customers::remove::<S, P>),
        )
        .route(
            "/api/clientes/{id}/historico",
            get(customers::history::<S, P>),
        )
}

/// Liveness health check endpoint.
///
/// Returns "ok" if the server is running. Does not check dependencies.
pub async fn health() -> &'static str {
    "ok"
}

/// Readiness health check endpoint.
///
/// Returns 503 Service Unavailable if the database is not reachable.
pub async fn readiness<S, P>(State(state): State<AppState<S, P>>) -> StatusCode
where
    S: CustomerStore + 'static,
    P: PostalCodeLookup + 'static,
{
    match sqlx::query("SELECT 1").fetch_one(state.pool()).await {
        Ok(_) => StatusCode::OK,
        Err(e) => {
            tracing::warn!(error = %e, "readiness check failed");
            StatusCode::SERVICE_UNAVAILABLE
        }
    }
}
