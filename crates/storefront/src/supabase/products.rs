//! `products` and `product_images` tables.

use reqwest::Method;
use reqwest::header::ACCEPT;
use serde::Serialize;
use serde_json::{Value, json};
use tracing::instrument;
use url::Url;

use techmart_core::ProductId;

use super::SupabaseClient;
use super::rest::{INVALID_TEXT_CODE, SINGLE_OBJECT};
use crate::backend::{BackendError, CatalogBackend};

/// Columns fetched for every product, images embedded in insertion order.
const PRODUCT_SELECT: &str = "*,product_images(id,image_url)";
const IMAGES_ORDER: &str = "id.asc";

const PREFER: &str = "Prefer";
const RETURN_REPRESENTATION: &str = "return=representation";
const RETURN_MINIMAL: &str = "return=minimal";

impl SupabaseClient {
    fn products_url(&self) -> Url {
        let mut url = self.table_url("products");
        url.query_pairs_mut()
            .append_pair("select", PRODUCT_SELECT)
            .append_pair("product_images.order", IMAGES_ORDER);
        url
    }

    fn product_url(&self, id: &ProductId) -> Url {
        let mut url = self.products_url();
        url.query_pairs_mut().append_pair("id", &format!("eq.{id}"));
        url
    }

    /// Insert a product row and return it with its (empty) images embedded.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the backend rejects the row.
    #[instrument(skip(self, row))]
    pub async fn insert_product<T>(&self, row: &T) -> Result<Value, BackendError>
    where
        T: Serialize + Sync + ?Sized,
    {
        let request = self
            .request(Method::POST, self.products_url())
            .header(PREFER, RETURN_REPRESENTATION)
            .header(ACCEPT, SINGLE_OBJECT)
            .json(row);
        self.send_json(request).await
    }

    /// Apply a partial update to one product and return the updated row.
    ///
    /// # Errors
    ///
    /// Returns `BackendError::NotFound` if no product has this id.
    #[instrument(skip(self, patch), fields(product_id = %id))]
    pub async fn update_product<T>(&self, id: &ProductId, patch: &T) -> Result<Value, BackendError>
    where
        T: Serialize + Sync + ?Sized,
    {
        let request = self
            .request(Method::PATCH, self.product_url(id))
            .header(PREFER, RETURN_REPRESENTATION)
            .header(ACCEPT, SINGLE_OBJECT)
            .json(patch);
        not_found_for(id, self.send_json(request).await)
    }

    /// Delete one product. Image rows go with it through the foreign key.
    ///
    /// # Errors
    ///
    /// Returns `BackendError::NotFound` if no product has this id.
    #[instrument(skip(self), fields(product_id = %id))]
    pub async fn delete_product(&self, id: &ProductId) -> Result<(), BackendError> {
        let request = self
            .request(Method::DELETE, self.product_url(id))
            .header(PREFER, RETURN_REPRESENTATION)
            .header(ACCEPT, SINGLE_OBJECT);
        not_found_for(id, self.send_json::<Value>(request).await).map(drop)
    }

    /// Insert one `product_images` row per URL.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails, e.g. the product does not exist.
    #[instrument(skip(self, urls), fields(product_id = %id, count = urls.len()))]
    pub async fn insert_product_images(
        &self,
        id: &ProductId,
        urls: &[String],
    ) -> Result<(), BackendError> {
        if urls.is_empty() {
            return Ok(());
        }

        let rows: Vec<Value> = urls
            .iter()
            .map(|url| json!({ "product_id": id, "image_url": url }))
            .collect();

        let request = self
            .request(Method::POST, self.table_url("product_images"))
            .header(PREFER, RETURN_MINIMAL)
            .json(&rows);
        self.send(request).await.map(drop)
    }
}

impl CatalogBackend for SupabaseClient {
    #[instrument(skip(self))]
    async fn list_products(&self) -> Result<Vec<Value>, BackendError> {
        let mut url = self.products_url();
        url.query_pairs_mut().append_pair("order", "created_at.desc");

        let rows: Vec<Value> = self.send_json(self.request(Method::GET, url)).await?;
        tracing::debug!(count = rows.len(), "Fetched product rows");
        Ok(rows)
    }

    #[instrument(skip(self), fields(product_id = %id))]
    async fn get_product(&self, id: &ProductId) -> Result<Value, BackendError> {
        let request = self
            .request(Method::GET, self.product_url(id))
            .header(ACCEPT, SINGLE_OBJECT);
        not_found_for(id, self.send_json(request).await)
    }
}

/// Normalize "no such row" answers for a single-product request.
///
/// A malformed id cannot match any row, so it is reported the same way.
fn not_found_for<T>(id: &ProductId, result: Result<T, BackendError>) -> Result<T, BackendError> {
    match result {
        Err(BackendError::NotFound(_)) => Err(BackendError::NotFound(format!("product {id}"))),
        Err(BackendError::Backend {
            code: Some(code), ..
        }) if code == INVALID_TEXT_CODE => Err(BackendError::NotFound(format!("product {id}"))),
        other => other,
    }
}
