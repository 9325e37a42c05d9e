//! Postal code lookup against the ViaCEP API.
//!
//! Lookups never fail from the caller's point of view: transport errors,
//! non-success statuses, undecodable bodies and the "unknown code" sentinel
//! are logged at `warn` and collapsed into `None`.

use std::future::Future;

use serde::Deserialize;
use thiserror::Error;
use tracing::instrument;
use url::Url;

use customer_registry_core::PostalCode;

use crate::config::PostalCodeConfig;
use crate::models::PostalAddress;

/// User agent sent with every lookup.
const USER_AGENT: &str = concat!("customer-registry/", env!("CARGO_PKG_VERSION"));

/// Resolves a postal code to a street address.
pub trait PostalCodeLookup: Send + Sync {
    /// Look up `postal_code`, returning `None` if it cannot be resolved.
    fn lookup(&self, postal_code: &str) -> impl Future<Output = Option<PostalAddress>> + Send;
}

/// Errors that can occur when calling the postal code service.
#[derive(Debug, Error)]
pub enum PostalCodeError {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Service returned a non-success status.
    #[error("API error: {status}")]
    Api { status: u16 },

    /// Failed to parse response.
    #[error("Parse error: {0}")]
    Parse(String),
}

/// ViaCEP API client.
#[derive(Debug, Clone)]
pub struct ViaCepClient {
    client: reqwest::Client,
    base_url: Url,
}

impl ViaCepClient {
    /// Create a new ViaCEP client.
    ///
    /// # Errors
    ///
    /// Returns error if the HTTP client fails to build.
    pub fn new(config: &PostalCodeConfig) -> Result<Self, PostalCodeError> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .user_agent(USER_AGENT)
            .build()?;

        Ok(Self {
            client,
            base_url: config.base_url.clone(),
        })
    }

    fn url_for(&self, postal_code: &PostalCode) -> String {
        format!(
            "{}/{postal_code}/json/",
            self.base_url.as_str().trim_end_matches('/')
        )
    }

    /// Fetch and decode one postal code.
    ///
    /// `Ok(None)` means the service answered but does not know the code.
    async fn fetch(
        &self,
        postal_code: &PostalCode,
    ) -> Result<Option<PostalAddress>, PostalCodeError> {
        let response = self.client.get(self.url_for(postal_code)).send().await?;
        let status = response.status();

        if !status.is_success() {
            return Err(PostalCodeError::Api {
                status: status.as_u16(),
            });
        }

        let body: ViaCepResponse = response
            .json()
            .await
            .map_err(|e| PostalCodeError::Parse(e.to_string()))?;

        Ok(body.into_address(postal_code))
    }
}

impl PostalCodeLookup for ViaCepClient {
    #[instrument(skip(self))]
    async fn lookup(&self, postal_code: &str) -> Option<PostalAddress> {
        let normalized = PostalCode::normalize(postal_code)?;

        match self.fetch(&normalized).await {
            Ok(Some(address)) => Some(address),
            Ok(None) => {
                tracing::warn!(postal_code = %normalized, "postal code not found");
                None
            }
            Err(e) => {
                tracing::warn!(
                    postal_code = %normalized,
                    error = %e,
                    "postal code lookup failed"
                );
                None
            }
        }
    }
}

/// ViaCEP response body.
///
/// Unknown codes come back with status 200 and `{"erro": true}` (or
/// `"true"` on newer deployments), so every field is optional.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ViaCepResponse {
    cep: String,
    logradouro: String,
    bairro: String,
    localidade: String,
    uf: String,
    erro: Option<serde_json::Value>,
}

impl ViaCepResponse {
    fn is_not_found(&self) -> bool {
        let flagged = match &self.erro {
            Some(serde_json::Value::Bool(flag)) => *flag,
            Some(serde_json::Value::String(flag)) => flag.eq_ignore_ascii_case("true"),
            _ => false,
        };

        flagged
            || [
                &self.cep,
                &self.logradouro,
                &self.bairro,
                &self.localidade,
                &self.uf,
            ]
            .iter()
            .all(|field| field.trim().is_empty())
    }

    fn into_address(self, requested: &PostalCode) -> Option<PostalAddress> {
        if self.is_not_found() {
            return None;
        }

        let postal_code = if self.cep.trim().is_empty() {
            requested.as_str().to_owned()
        } else {
            self.cep
        };

        Some(PostalAddress {
            postal_code,
            street: self.logradouro,
            neighborhood: self.bairro,
            city: self.localidade,
            state: self.uf,
        })
    }
}
