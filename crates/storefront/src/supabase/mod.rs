//! Supabase REST client.
//!
//! # Architecture
//!
//! - Plain `reqwest` calls against `PostgREST` (`/rest/v1`) and Storage
//!   (`/storage/v1`); no generated bindings
//! - Every request carries the `apikey` header and a matching bearer token
//! - The anon key is used for catalog reads; the service-role key is only
//!   loaded for admin operations
//!
//! # Example
//!
//! ```rust,ignore
//! use techmart_storefront::supabase::SupabaseClient;
//! use techmart_storefront::backend::CatalogBackend;
//!
//! let client = SupabaseClient::new(&config.supabase);
//! let rows = client.list_products().await?;
//! ```

mod products;
mod rest;
mod storage;

use std::sync::Arc;

use reqwest::{Method, RequestBuilder, StatusCode};
use secrecy::{ExposeSecret, SecretString};
use serde::de::DeserializeOwned;
use url::Url;

use crate::backend::BackendError;
use crate::config::SupabaseConfig;

/// Which project key a client authenticates with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyRole {
    /// Public key, subject to row-level security.
    Anon,
    /// Privileged key used by admin operations.
    ServiceRole,
}

/// Client for one Supabase project.
///
/// Cheap to clone; clones share the HTTP connection pool.
#[derive(Clone)]
pub struct SupabaseClient {
    inner: Arc<SupabaseClientInner>,
}

struct SupabaseClientInner {
    client: reqwest::Client,
    base_url: Url,
    api_key: SecretString,
    role: KeyRole,
    image_bucket: String,
}

impl SupabaseClient {
    /// Create a client that authenticates with the anon key.
    #[must_use]
    pub fn new(config: &SupabaseConfig) -> Self {
        Self::with_key(config, config.anon_key.clone(), KeyRole::Anon)
    }

    /// Create a client that authenticates with the service-role key.
    ///
    /// Returns `None` if `SUPABASE_SERVICE_ROLE_KEY` is not configured.
    #[must_use]
    pub fn service_role(config: &SupabaseConfig) -> Option<Self> {
        config
            .service_role_key
            .clone()
            .map(|key| Self::with_key(config, key, KeyRole::ServiceRole))
    }

    fn with_key(config: &SupabaseConfig, api_key: SecretString, role: KeyRole) -> Self {
        Self {
            inner: Arc::new(SupabaseClientInner {
                client: reqwest::Client::new(),
                base_url: config.url.clone(),
                api_key,
                role,
                image_bucket: config.image_bucket.clone(),
            }),
        }
    }

    /// Key role this client was built with.
    #[must_use]
    pub fn role(&self) -> KeyRole {
        self.inner.role
    }

    /// `PostgREST` endpoint for a table.
    fn table_url(&self, table: &str) -> Url {
        rest::endpoint(&self.inner.base_url, &["rest", "v1", table])
    }

    /// Start a request with the project's auth headers.
    fn request(&self, method: Method, url: Url) -> RequestBuilder {
        let key = self.inner.api_key.expose_secret();
        self.inner
            .client
            .request(method, url)
            .header("apikey", key)
            .bearer_auth(key)
    }

    /// Send a request and return the body of a successful response.
    async fn send(&self, request: RequestBuilder) -> Result<String, BackendError> {
        let response = request.send().await?;
        let status = response.status();

        if status == StatusCode::TOO_MANY_REQUESTS {
            let retry_after = rest::retry_after_secs(
                response
                    .headers()
                    .get("Retry-After")
                    .and_then(|v| v.to_str().ok()),
            );
            return Err(BackendError::RateLimited(retry_after));
        }

        // Get response body as text first for better error diagnostics
        let body = response.text().await?;

        if !status.is_success() {
            let err = rest::classify_error(status.as_u16(), &body);
            if matches!(err, BackendError::NotFound(_)) {
                tracing::debug!(status = %status, "Supabase returned no matching row");
            } else {
                tracing::error!(
                    status = %status,
                    body = %rest::truncate(&body, 500),
                    "Supabase API returned non-success status"
                );
            }
            return Err(err);
        }

        Ok(body)
    }

    /// Send a request and parse the JSON body.
    async fn send_json<T: DeserializeOwned>(
        &self,
        request: RequestBuilder,
    ) -> Result<T, BackendError> {
        let body = self.send(request).await?;
        serde_json::from_str(&body).map_err(|e| {
            tracing::error!(
                error = %e,
                body = %rest::truncate(&body, 500),
                "Failed to parse Supabase response"
            );
            BackendError::Parse(e)
        })
    }
}

impl std::fmt::Debug for SupabaseClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SupabaseClient")
            .field("base_url", &self.inner.base_url.as_str())
            .field("role", &self.inner.role)
            .field("image_bucket", &self.inner.image_bucket)
            .finish_non_exhaustive()
    }
}
