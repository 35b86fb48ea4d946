//! Storage bucket uploads.

use reqwest::Method;
use reqwest::header::{CACHE_CONTROL, CONTENT_TYPE};
use tracing::instrument;
use url::Url;

use techmart_core::ObjectKey;

use super::SupabaseClient;
use super::rest;
use crate::backend::BackendError;

impl SupabaseClient {
    /// Name of the bucket product images are stored in.
    #[must_use]
    pub fn image_bucket(&self) -> &str {
        &self.inner.image_bucket
    }

    /// Upload an object into the image bucket. Existing objects are never
    /// overwritten.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the key already exists.
    #[instrument(skip(self, bytes), fields(key = %key, size = bytes.len()))]
    pub async fn upload_object(
        &self,
        key: &ObjectKey,
        bytes: Vec<u8>,
        content_type: &str,
    ) -> Result<(), BackendError> {
        let url = rest::endpoint(
            &self.inner.base_url,
            &["storage", "v1", "object", self.image_bucket(), key.as_str()],
        );

        let request = self
            .request(Method::POST, url)
            .header(CONTENT_TYPE, content_type)
            .header(CACHE_CONTROL, "max-age=3600")
            .header("x-upsert", "false")
            .body(bytes);

        self.send(request).await.map(drop)
    }

    /// Public URL for an object in the image bucket.
    #[must_use]
    pub fn public_url(&self, key: &ObjectKey) -> Url {
        rest::endpoint(
            &self.inner.base_url,
            &[
                "storage",
                "v1",
                "object",
                "public",
                self.image_bucket(),
                key.as_str(),
            ],
        )
    }
}
