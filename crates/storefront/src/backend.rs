//! Data-source seam between the catalog service and the hosted backend.
//!
//! The catalog only needs two reads, both returning raw JSON rows that the
//! core normalizer turns into products. [`crate::supabase::SupabaseClient`]
//! is the production implementation; tests substitute in-memory fakes.

use std::future::Future;

use serde_json::Value;
use thiserror::Error;

use techmart_core::ProductId;

/// Errors that can occur when talking to the backend.
#[derive(Debug, Error)]
pub enum BackendError {
    /// The requested row does not exist.
    #[error("Not found: {0}")]
    NotFound(String),

    /// The request never completed (connect failure, timeout, broken body).
    #[error("Connection error: {0}")]
    Connection(#[from] reqwest::Error),

    /// The backend answered with a non-success status.
    #[error("Backend error (HTTP {status}): {message}")]
    Backend {
        status: u16,
        /// Backend error code, e.g. a `PostgREST` `PGRST...` code.
        code: Option<String>,
        message: String,
    },

    /// The response body was not the JSON we expected.
    #[error("JSON parse error: {0}")]
    Parse(#[from] serde_json::Error),

    /// Rate limited by the backend.
    #[error("Rate limited, retry after {0} seconds")]
    RateLimited(u64),
}

impl BackendError {
    /// Whether asking the user to try again can help.
    ///
    /// Nothing in the storefront retries automatically.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        !matches!(self, Self::NotFound(_))
    }
}

/// Read access to raw product rows.
///
/// Rows carry either an embedded `product_images` collection or a scalar
/// `image_url`; normalization happens downstream.
pub trait CatalogBackend: Send + Sync {
    /// All products, newest first, with their images embedded.
    fn list_products(&self) -> impl Future<Output = Result<Vec<Value>, BackendError>> + Send;

    /// One product by id.
    ///
    /// Returns [`BackendError::NotFound`] when no row matches.
    fn get_product(
        &self,
        id: &ProductId,
    ) -> impl Future<Output = Result<Value, BackendError>> + Send;
}
