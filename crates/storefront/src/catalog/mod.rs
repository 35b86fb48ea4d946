//! Catalog service: backend reads, normalization and caching.
//!
//! Raw rows come from a [`CatalogBackend`] and go through the core
//! normalizer. Listings and single products are cached with `moka` until
//! the TTL expires or [`Catalog::invalidate_all`] is called after an admin
//! mutation.

mod cache;
mod fetch_guard;

pub use fetch_guard::{FetchGuard, FetchTicket};

use std::sync::Arc;
use std::time::Duration;

use moka::future::Cache;
use thiserror::Error;
use tracing::{debug, instrument, warn};

use techmart_core::catalog::{normalize_listing, normalize_product, sort_newest_first};
use techmart_core::{CatalogPage, MalformedRecordError, Product, ProductId};

use crate::backend::{BackendError, CatalogBackend};
use cache::{CacheKey, CacheValue};

/// Errors returned by catalog reads.
#[derive(Debug, Error)]
pub enum CatalogError {
    /// No product has this id.
    #[error("Product not found: {0}")]
    NotFound(ProductId),

    /// The product exists but its row cannot be displayed.
    #[error(transparent)]
    Malformed(#[from] MalformedRecordError),

    /// The backend could not be reached or refused the request.
    #[error(transparent)]
    Backend(#[from] BackendError),
}

impl CatalogError {
    /// Whether asking the user to try again can help.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        match self {
            Self::Backend(e) => e.is_retryable(),
            Self::NotFound(_) | Self::Malformed(_) => false,
        }
    }
}

/// Cached, normalized view of the product catalog.
///
/// Cheap to clone; clones share the backend and the cache.
pub struct Catalog<B> {
    inner: Arc<CatalogInner<B>>,
}

struct CatalogInner<B> {
    backend: B,
    cache: Cache<CacheKey, CacheValue>,
}

impl<B> Clone for Catalog<B> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<B: CatalogBackend> Catalog<B> {
    /// Wrap a backend. Entries live for `ttl`.
    #[must_use]
    pub fn new(backend: B, ttl: Duration) -> Self {
        let cache = Cache::builder()
            .max_capacity(1000)
            .time_to_live(ttl)
            .build();

        Self {
            inner: Arc::new(CatalogInner { backend, cache }),
        }
    }

    /// The wrapped backend.
    #[must_use]
    pub fn backend(&self) -> &B {
        &self.inner.backend
    }

    /// All displayable products, newest first.
    ///
    /// Malformed rows are logged and reported in [`CatalogPage::rejected`];
    /// they never fail the listing.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend request fails.
    #[instrument(skip(self))]
    pub async fn list_products(&self) -> Result<CatalogPage, CatalogError> {
        if let Some(CacheValue::Products(page)) = self.inner.cache.get(&CacheKey::Products).await {
            debug!("Cache hit for product listing");
            return Ok(page);
        }

        let rows = self.inner.backend.list_products().await?;
        let mut page = normalize_listing(&rows);

        for rejected in &page.rejected {
            warn!(
                product_id = rejected.product_id.as_deref().unwrap_or("<unknown>"),
                reason = %rejected.reason,
                "Skipping malformed product record"
            );
        }
        sort_newest_first(&mut page.products);

        debug!(
            products = page.products.len(),
            rejected = page.rejected.len(),
            "Loaded product listing"
        );

        self.inner
            .cache
            .insert(CacheKey::Products, CacheValue::Products(page.clone()))
            .await;

        Ok(page)
    }

    /// One product by id.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::NotFound` if the id does not exist,
    /// `CatalogError::Malformed` if its row cannot be normalized, or
    /// `CatalogError::Backend` if the request fails.
    #[instrument(skip(self), fields(product_id = %id))]
    pub async fn get_product(&self, id: &ProductId) -> Result<Product, CatalogError> {
        let cache_key = CacheKey::Product(id.clone());

        if let Some(CacheValue::Product(product)) = self.inner.cache.get(&cache_key).await {
            debug!("Cache hit for product");
            return Ok(*product);
        }

        let raw = match self.inner.backend.get_product(id).await {
            Ok(raw) => raw,
            Err(BackendError::NotFound(_)) => return Err(CatalogError::NotFound(id.clone())),
            Err(e) => return Err(e.into()),
        };

        let product = normalize_product(&raw).inspect_err(|e| {
            warn!(reason = %e.reason, "Product record is malformed");
        })?;

        self.inner
            .cache
            .insert(cache_key, CacheValue::Product(Box::new(product.clone())))
            .await;

        Ok(product)
    }

    /// Fetch a product for a view that may navigate away meanwhile.
    ///
    /// Returns `None` if another fetch was started on `guard` before this
    /// one finished.
    pub async fn get_product_latest(
        &self,
        guard: &FetchGuard,
        id: &ProductId,
    ) -> Option<Result<Product, CatalogError>> {
        let ticket = guard.begin();
        let result = self.get_product(id).await;
        guard.accept(ticket, result)
    }

    /// Drop every cached entry.
    pub fn invalidate_all(&self) {
        self.inner.cache.invalidate_all();
    }
}

impl<B> std::fmt::Debug for Catalog<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Catalog")
            .field("cached_entries", &self.inner.cache.entry_count())
            .finish_non_exhaustive()
    }
}
