//! Customer registry API library.
//!
//! This crate provides the registry HTTP service as a library, allowing it
//! to be tested in-process and reused by the CLI and integration tests.

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod config;
pub mod db;
pub mod error;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
pub mod state;

use axum::Router;
use tower_http::trace::{DefaultOnResponse, OnResponse, TraceLayer};
use tracing::Span;

use crate::db::CustomerStore;
use crate::services::PostalCodeLookup;
use crate::state::AppState;

/// Build the full application: routes, middleware, and Sentry layers.
pub fn app<S, P>(state: AppState<S, P>) -> Router
where
    S: CustomerStore + 'static,
    P: PostalCodeLookup + 'static,
{
    routes::routes::<S, P>()
        .layer(axum::middleware::from_fn(middleware::request_id_middleware))
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(|request: &axum::http::Request<_>| {
                    tracing::info_span!(
                        "http_request",
                        method = %request.method(),
                        uri = %request.uri(),
                        request_id = tracing::field::Empty,
                        status = tracing::field::Empty,
                        latency_ms = tracing::field::Empty,
                    )
                })
                .on_response(
                    |response: &axum::http::Response<_>,
                     latency: std::time::Duration,
                     span: &Span| {
                        span.record("status", response.status().as_u16());
                        span.record(
                            "latency_ms",
                            u64::try_from(latency.as_millis()).unwrap_or(u64::MAX),
                        );
                        DefaultOnResponse::default().on_response(response, latency, span);
                    },
                ),
        )
        .with_state(state)
        // Sentry layers (outermost for full request coverage)
        .layer(sentry_tower::NewSentryLayer::new_from_top())
        .layer(sentry_tower::SentryHttpLayer::new().enable_transaction())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::time::Duration;

    use axum::body::Body;
    use axum::http::{Request, StatusCode, header};
    use serde_json::{Value, json};
    use sqlx::postgres::PgPoolOptions;
    use tower::ServiceExt;

    use super::*;
    use crate::config::ApiConfig;
    use crate::middleware::REQUEST_ID_HEADER;
    use crate::services::CustomerService;
    use crate::services::customers::tests::{FakeLookup, InMemoryStore};

    const UNREACHABLE_DATABASE: &str = "postgres://registry@127.0.0.1:1/registry";

    /// App over in-memory fakes. The pool is never connected; it points at a
    /// closed port so the readiness check fails fast.
    fn test_app() -> Router {
        let config = ApiConfig::from_lookup(|key| {
            (key == "REGISTRY_DATABASE_URL").then(|| UNREACHABLE_DATABASE.to_owned())
        })
        .unwrap();
        let pool = PgPoolOptions::new()
            .acquire_timeout(Duration::from_secs(1))
            .connect_lazy(UNREACHABLE_DATABASE)
            .unwrap();
        let service =
            CustomerService::new(InMemoryStore::default(), FakeLookup::with_paulista());

        app(AppState::with_service(config, pool, service))
    }

    async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Option<Value>) {
        let response = app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let body = (!bytes.is_empty()).then(|| serde_json::from_slice(&bytes).unwrap());
        (status, body)
    }

    fn get(uri: &str) -> Request<Body> {
        Request::builder().uri(uri).body(Body::empty()).unwrap()
    }

    fn json_request(method: &str, uri: &str, body: &Value) -> Request<Body> {
        Request::builder()
            .method(method)
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    fn joao() -> Value {
        json!({
            "nome": "João Silva",
            "cep": "01310-100",
            "numero": "123",
            "contatos": [
                { "tipo": "Email", "valor": "joao@x.com" },
                { "tipo": "Telefone", "valor": "11999999999" }
            ]
        })
    }

    #[tokio::test]
    async fn test_health() {
        let response = test_app().oneshot(get("/health")).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert!(response.headers().contains_key(REQUEST_ID_HEADER));
        assert!(
            response.headers()[header::CONTENT_TYPE]
                .to_str()
                .unwrap()
                .starts_with("text/plain")
        );
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        assert_eq!(bytes.as_ref(), b"ok");
    }

    #[tokio::test]
    async fn test_api_responses_are_json() {
        let app = test_app();

        for request in [
            get("/api/clientes"),
            get("/api/clientes/999"),
            json_request("POST", "/api/clientes", &json!({ "nome": "" })),
        ] {
            let response = app.clone().oneshot(request).await.unwrap();
            assert_eq!(
                response.headers()[header::CONTENT_TYPE],
                "application/json"
            );
        }
    }

    #[tokio::test]
    async fn test_readiness_without_database() {
        let response = test_app().oneshot(get("/health/ready")).await.unwrap();
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    }

    #[tokio::test]
    async fn test_create_then_get() {
        let app = test_app();

        let response = app
            .clone()
            .oneshot(json_request("POST", "/api/clientes", &joao()))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);
        let location = response.headers()[header::LOCATION].to_str().unwrap().to_owned();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let created: Value = serde_json::from_slice(&bytes).unwrap();
        let id = created["id"].as_i64().unwrap();
        assert!(id > 0);
        assert_eq!(location, format!("/api/clientes/{id}"));

        let (status, body) = send(&app, get(&location)).await;
        let body = body.unwrap();
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["clienteId"], id);
        assert_eq!(body["nome"], "João Silva");
        assert_eq!(body["enderecos"][0]["logradouro"], "Avenida Paulista");
        assert_eq!(body["enderecos"][0]["numero"], "123");
        assert_eq!(body["enderecos"][0]["cidade"], "São Paulo");
        assert_eq!(body["enderecos"][0]["estado"], "SP");
        assert_eq!(body["contatos"].as_array().unwrap().len(), 2);
        assert_eq!(body["contatos"][1]["tipo"], "Telefone");
    }

    #[tokio::test]
    async fn test_create_unknown_postal_code() {
        let mut request = joao();
        request["cep"] = json!("00000-000");

        let (status, body) =
            send(&test_app(), json_request("POST", "/api/clientes", &request)).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body.unwrap(), json!({ "erro": "CEP 00000-000 não encontrado." }));
    }

    #[tokio::test]
    async fn test_create_validation_errors() {
        let app = test_app();

        let mut no_name = joao();
        no_name["nome"] = json!("");
        let (status, body) = send(&app, json_request("POST", "/api/clientes", &no_name)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body.unwrap()["erro"], "Nome é obrigatório");

        let mut no_contacts = joao();
        no_contacts["contatos"] = json!([]);
        let (status, body) = send(&app, json_request("POST", "/api/clientes", &no_contacts)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body.unwrap()["erro"], "Pelo menos um contato é obrigatório");

        let mut bad_phone = joao();
        bad_phone["contatos"] = json!([{ "tipo": "telefone", "valor": "123" }]);
        let (status, body) = send(&app, json_request("POST", "/api/clientes", &bad_phone)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(
            body.unwrap()["erro"],
            "Telefone inválido. Deve conter apenas dígitos e ter 10 ou 11 caracteres."
        );
    }

    #[tokio::test]
    async fn test_malformed_json() {
        let request = Request::builder()
            .method("POST")
            .uri("/api/clientes")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from("{\"nome\": "))
            .unwrap();

        let (status, body) = send(&test_app(), request).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body.unwrap()["erro"].is_string());
    }

    #[tokio::test]
    async fn test_get_errors() {
        let app = test_app();

        let (status, body) = send(&app, get("/api/clientes/999")).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body.unwrap(), json!({ "erro": "Cliente não encontrado" }));

        let (status, body) = send(&app, get("/api/clientes/0")).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body.unwrap(), json!({ "erro": "ID deve ser maior que zero" }));

        let (status, body) = send(&app, get("/api/clientes/abc")).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body.unwrap()["erro"].is_string());
    }

    #[tokio::test]
    async fn test_list_empty() {
        let (status, body) = send(&test_app(), get("/api/clientes")).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body.unwrap(), json!([]));
    }

    #[tokio::test]
    async fn test_rename_delete_and_history() {
        let app = test_app();
        let (_, created) = send(&app, json_request("POST", "/api/clientes", &joao())).await;
        let id = created.unwrap()["id"].as_i64().unwrap();
        let uri = format!("/api/clientes/{id}");

        let (status, body) = send(
            &app,
            json_request("PUT", &uri, &json!({ "nome": "João P. Silva" })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body.unwrap()["nome"], "João P. Silva");

        let delete = || {
            Request::builder()
                .method("DELETE")
                .uri(&uri)
                .body(Body::empty())
                .unwrap()
        };
        let (status, body) = send(&app, delete()).await;
        assert_eq!(status, StatusCode::NO_CONTENT);
        assert!(body.is_none());

        // Deleting again is still a success.
        let (status, _) = send(&app, delete()).await;
        assert_eq!(status, StatusCode::NO_CONTENT);

        let (status, _) = send(&app, get(&uri)).await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (status, body) = send(&app, get(&format!("{uri}/historico"))).await;
        assert_eq!(status, StatusCode::OK);
        let operations: Vec<_> = body
            .unwrap()
            .as_array()
            .unwrap()
            .iter()
            .map(|record| record["operacao"].as_str().unwrap().to_owned())
            .collect();
        assert_eq!(operations, vec!["ALTERACAO", "REMOCAO"]);
    }

    #[tokio::test]
    async fn test_rename_missing_customer() {
        let (status, body) = send(
            &test_app(),
            json_request("PUT", "/api/clientes/42", &json!({ "nome": "Ana" })),
        )
        .await;

        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body.unwrap()["erro"], "Cliente não encontrado");
    }

    #[tokio::test]
    async fn test_summary() {
        let app = test_app();
        send(&app, json_request("POST", "/api/clientes", &joao())).await;

        let (status, body) = send(&app, get("/api/clientes/resumo")).await;
        let body = body.unwrap();

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body[0]["nome"], "João Silva");
        assert_eq!(body[0]["totalEnderecos"], 1);
        assert_eq!(body[0]["totalContatos"], 2);
    }
}
