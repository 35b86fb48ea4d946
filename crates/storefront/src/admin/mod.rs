//! Catalog administration: product rows and image uploads.
//!
//! Every operation here needs the service-role key. Writes go straight to
//! the backend; the shared [`Catalog`] cache (if attached) is invalidated
//! after each successful mutation.

mod upload;

pub use upload::{ImageRejection, ImageUpload, MAX_IMAGE_BYTES, check_image, object_key};

use std::path::PathBuf;

use serde::Serialize;
use thiserror::Error;
use tracing::{info, instrument};

use techmart_core::catalog::normalize_product;
use techmart_core::{MalformedRecordError, Price, Product, ProductId};

use crate::backend::{BackendError, CatalogBackend};
use crate::catalog::Catalog;
use crate::config::SupabaseConfig;
use crate::supabase::{KeyRole, SupabaseClient};

/// Errors that can occur during admin operations.
#[derive(Debug, Error)]
pub enum AdminError {
    #[error("Admin operations need SUPABASE_SERVICE_ROLE_KEY")]
    NotConfigured,

    #[error("Invalid product: {0}")]
    Validation(String),

    #[error("Invalid image {}: {reason}", path.display())]
    InvalidImage {
        path: PathBuf,
        reason: ImageRejection,
    },

    #[error("Could not read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Product not found: {0}")]
    NotFound(ProductId),

    #[error(transparent)]
    Backend(#[from] BackendError),

    #[error(transparent)]
    Malformed(#[from] MalformedRecordError),
}

// =============================================================================
// Inputs
// =============================================================================

/// Fields of a product to create.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NewProduct {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub price: Price,
}

impl NewProduct {
    /// Build a validated product. Names are trimmed; a blank description is
    /// treated as absent.
    ///
    /// # Errors
    ///
    /// Returns `AdminError::Validation` if the name is blank.
    pub fn new(
        name: impl Into<String>,
        description: Option<String>,
        price: Price,
    ) -> Result<Self, AdminError> {
        Ok(Self {
            name: required_name(name.into())?,
            description: description.and_then(non_blank),
            price,
        })
    }
}

/// Partial update of a product. `None` leaves a field unchanged.
///
/// `description: Some(None)` clears the description.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ProductUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<Option<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub price: Option<Price>,
}

impl ProductUpdate {
    /// Build a validated update from optional inputs.
    ///
    /// A blank `description` means "clear it".
    ///
    /// # Errors
    ///
    /// Returns `AdminError::Validation` if a name is given but blank.
    pub fn new(
        name: Option<String>,
        description: Option<String>,
        price: Option<Price>,
    ) -> Result<Self, AdminError> {
        Ok(Self {
            name: name.map(required_name).transpose()?,
            description: description.map(non_blank),
            price,
        })
    }

    /// Whether the update changes nothing.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.name.is_none() && self.description.is_none() && self.price.is_none()
    }
}

fn required_name(name: String) -> Result<String, AdminError> {
    non_blank(name).ok_or_else(|| AdminError::Validation("name cannot be empty".into()))
}

fn non_blank(text: String) -> Option<String> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        None
    } else if trimmed.len() == text.len() {
        Some(text)
    } else {
        Some(trimmed.to_string())
    }
}

/// What [`Admin::save_product`] should do with the product row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SaveTarget {
    Create(NewProduct),
    Update(ProductId, ProductUpdate),
}

// =============================================================================
// Admin service
// =============================================================================

/// Product and image management over a service-role client.
#[derive(Debug, Clone)]
pub struct Admin {
    client: SupabaseClient,
    catalog: Option<Catalog<SupabaseClient>>,
}

impl Admin {
    /// Wrap a service-role client.
    ///
    /// # Errors
    ///
    /// Returns `AdminError::NotConfigured` for an anon client.
    pub fn new(client: SupabaseClient) -> Result<Self, AdminError> {
        if client.role() != KeyRole::ServiceRole {
            return Err(AdminError::NotConfigured);
        }
        Ok(Self {
            client,
            catalog: None,
        })
    }

    /// Build from configuration.
    ///
    /// # Errors
    ///
    /// Returns `AdminError::NotConfigured` if no service-role key is set.
    pub fn from_config(config: &SupabaseConfig) -> Result<Self, AdminError> {
        SupabaseClient::service_role(config)
            .ok_or(AdminError::NotConfigured)
            .and_then(Self::new)
    }

    /// Invalidate `catalog` after every mutation.
    #[must_use]
    pub fn with_catalog(mut self, catalog: Catalog<SupabaseClient>) -> Self {
        self.catalog = Some(catalog);
        self
    }

    fn invalidate(&self) {
        if let Some(catalog) = &self.catalog {
            catalog.invalidate_all();
        }
    }

    /// Create a product.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend rejects the row.
    #[instrument(skip(self, input), fields(name = %input.name))]
    pub async fn create_product(&self, input: NewProduct) -> Result<Product, AdminError> {
        let raw = self.client.insert_product(&input).await?;
        let product = normalize_product(&raw)?;
        self.invalidate();

        info!(product_id = %product.id, "Created product");
        Ok(product)
    }

    /// Apply `update` to a product. An empty update returns the product unchanged.
    ///
    /// # Errors
    ///
    /// Returns `AdminError::NotFound` if the id does not exist.
    #[instrument(skip(self, update), fields(product_id = %id))]
    pub async fn update_product(
        &self,
        id: &ProductId,
        update: ProductUpdate,
    ) -> Result<Product, AdminError> {
        let raw = if update.is_empty() {
            self.client.get_product(id).await
        } else {
            self.client.update_product(id, &update).await
        }
        .map_err(|e| not_found(id, e))?;

        let product = normalize_product(&raw)?;
        if !update.is_empty() {
            self.invalidate();
            info!("Updated product");
        }
        Ok(product)
    }

    /// Delete a product and its image rows.
    ///
    /// # Errors
    ///
    /// Returns `AdminError::NotFound` if the id does not exist.
    #[instrument(skip(self), fields(product_id = %id))]
    pub async fn delete_product(&self, id: &ProductId) -> Result<(), AdminError> {
        self.client
            .delete_product(id)
            .await
            .map_err(|e| not_found(id, e))?;
        self.invalidate();

        info!("Deleted product");
        Ok(())
    }

    /// Validate and upload local images; returns their public URLs in order.
    ///
    /// Every file is validated before the first upload starts.
    ///
    /// # Errors
    ///
    /// Returns an error if any file is invalid or an upload fails. Files
    /// uploaded before a failure stay in the bucket.
    pub async fn upload_images(&self, paths: &[PathBuf]) -> Result<Vec<String>, AdminError> {
        let uploads = inspect_all(paths).await?;
        self.upload_inspected(uploads).await
    }

    async fn upload_inspected(&self, uploads: Vec<ImageUpload>) -> Result<Vec<String>, AdminError> {
        let mut urls = Vec::with_capacity(uploads.len());
        for upload in uploads {
            let bytes = tokio::fs::read(&upload.path)
                .await
                .map_err(|source| AdminError::Io {
                    path: upload.path.clone(),
                    source,
                })?;

            self.client
                .upload_object(&upload.key, bytes, &upload.content_type)
                .await?;

            let url = self.client.public_url(&upload.key);
            info!(key = %upload.key, size = upload.size, "Uploaded image");
            urls.push(url.to_string());
        }
        Ok(urls)
    }

    /// Link already uploaded images to a product, after any existing ones.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend rejects the rows.
    #[instrument(skip(self, urls), fields(product_id = %id, count = urls.len()))]
    pub async fn attach_images(&self, id: &ProductId, urls: &[String]) -> Result<(), AdminError> {
        self.client.insert_product_images(id, urls).await?;
        if !urls.is_empty() {
            self.invalidate();
        }
        Ok(())
    }

    /// Create or update a product, then upload and attach `images`.
    ///
    /// Images are validated before the product row is written, so a bad
    /// file never leaves a half-saved product behind.
    ///
    /// # Errors
    ///
    /// Returns the first validation, backend or I/O error encountered.
    pub async fn save_product(
        &self,
        target: SaveTarget,
        images: &[PathBuf],
    ) -> Result<Product, AdminError> {
        let uploads = inspect_all(images).await?;

        let product = match target {
            SaveTarget::Create(input) => self.create_product(input).await?,
            SaveTarget::Update(id, update) => self.update_product(&id, update).await?,
        };

        if uploads.is_empty() {
            return Ok(product);
        }

        let urls = self.upload_inspected(uploads).await?;
        self.attach_images(&product.id, &urls).await?;

        let raw = self
            .client
            .get_product(&product.id)
            .await
            .map_err(|e| not_found(&product.id, e))?;
        Ok(normalize_product(&raw)?)
    }
}

async fn inspect_all(paths: &[PathBuf]) -> Result<Vec<ImageUpload>, AdminError> {
    let mut uploads = Vec::with_capacity(paths.len());
    for path in paths {
        uploads.push(ImageUpload::inspect(path).await?);
    }
    Ok(uploads)
}

fn not_found(id: &ProductId, err: BackendError) -> AdminError {
    match err {
        BackendError::NotFound(_) => AdminError::NotFound(id.clone()),
        other => AdminError::Backend(other),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use secrecy::SecretString;
    use serde_json::json;
    use url::Url;

    use super::*;

    fn config(service: bool) -> SupabaseConfig {
        SupabaseConfig {
            url: Url::parse("https://abcd.supabase.co").unwrap(),
            anon_key: SecretString::from("anon-key-value"),
            service_role_key: service.then(|| SecretString::from("service-key-value")),
            image_bucket: "product-images".to_string(),
        }
    }

    #[test]
    fn test_requires_service_role() {
        assert!(matches!(
            Admin::from_config(&config(false)),
            Err(AdminError::NotConfigured)
        ));
        assert!(matches!(
            Admin::new(SupabaseClient::new(&config(true))),
            Err(AdminError::NotConfigured)
        ));
        assert!(Admin::from_config(&config(true)).is_ok());
    }

    #[test]
    fn test_new_product_validation() {
        let product = NewProduct::new("  Phone  ", Some("   ".into()), Price::from_units(10)).unwrap();
        assert_eq!(product.name, "Phone");
        assert_eq!(product.description, None);

        let err = NewProduct::new(" ", None, Price::ZERO).unwrap_err();
        assert!(matches!(err, AdminError::Validation(_)));
    }

    #[test]
    fn test_new_product_row() {
        let product = NewProduct::new("Phone", None, Price::parse("1999.50").unwrap()).unwrap();
        assert_eq!(
            serde_json::to_value(&product).unwrap(),
            json!({"name": "Phone", "price": "1999.5"})
        );
    }

    #[test]
    fn test_update_row_only_has_set_fields() {
        let update = ProductUpdate::new(None, None, Some(Price::from_units(5))).unwrap();
        assert_eq!(serde_json::to_value(&update).unwrap(), json!({"price": "5"}));

        let clear = ProductUpdate::new(None, Some(String::new()), None).unwrap();
        assert_eq!(
            serde_json::to_value(&clear).unwrap(),
            json!({"description": null})
        );
    }

    #[test]
    fn test_update_validation() {
        assert!(ProductUpdate::default().is_empty());
        assert!(matches!(
            ProductUpdate::new(Some("\t".into()), None, None),
            Err(AdminError::Validation(_))
        ));
    }

    #[test]
    fn test_not_found_mapping() {
        let id = ProductId::new("p1");
        assert!(matches!(
            not_found(&id, BackendError::NotFound("x".into())),
            AdminError::NotFound(i) if i == id
        ));
        assert!(matches!(
            not_found(&id, BackendError::RateLimited(1)),
            AdminError::Backend(_)
        ));
    }

    #[tokio::test]
    async fn test_save_rejects_bad_image_before_writing() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("datasheet.pdf");
        std::fs::write(&path, b"%PDF").unwrap();

        let admin = Admin::from_config(&config(true)).unwrap();
        let target = SaveTarget::Create(NewProduct::new("Phone", None, Price::ZERO).unwrap());

        // Fails during validation, before any request is attempted.
        let err = admin.save_product(target, &[path]).await.unwrap_err();
        assert!(matches!(
            err,
            AdminError::InvalidImage {
                reason: ImageRejection::NotAnImage(_),
                ..
            }
        ));
    }
}
