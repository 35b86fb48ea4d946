//! Product administration commands.
//!
//! # Environment Variables
//!
//! - `SUPABASE_SERVICE_ROLE_KEY` - Required; the anon key cannot write
//! - `TECHMART_IMAGE_BUCKET` - Bucket that receives uploaded images

use std::path::PathBuf;

use techmart_core::{Price, Product, ProductId};
use techmart_storefront::admin::{Admin, NewProduct, ProductUpdate, SaveTarget};
use techmart_storefront::catalog::Catalog;
use techmart_storefront::supabase::SupabaseClient;
use techmart_storefront::{AppError, StorefrontConfig};

use super::{catalog, emit, style};
use crate::render;

/// Admin service sharing a catalog with the storefront read path.
fn admin(config: &StorefrontConfig) -> Result<(Admin, Catalog<SupabaseClient>), AppError> {
    let catalog = catalog(config);
    let admin = Admin::from_config(&config.supabase)?.with_catalog(catalog.clone());
    Ok((admin, catalog))
}

/// Print a saved product the way shoppers will see it.
///
/// Falls back to the admin copy if the anon read fails, e.g. when row-level
/// security hides the row.
async fn show_saved(config: &StorefrontConfig, catalog: &Catalog<SupabaseClient>, saved: Product) {
    let product = match catalog.get_product(&saved.id).await {
        Ok(product) => product,
        Err(e) => {
            tracing::warn!(product_id = %saved.id, error = %e, "Saved product is not readable by shoppers");
            saved
        }
    };
    emit(&render::product_detail(&product, style(config)));
}

/// Create a product and upload its images.
pub async fn create(
    config: &StorefrontConfig,
    name: String,
    price: Price,
    description: Option<String>,
    images: &[PathBuf],
) -> Result<(), AppError> {
    let (admin, catalog) = admin(config)?;
    let input = NewProduct::new(name, description, price)?;

    let product = admin
        .save_product(SaveTarget::Create(input), images)
        .await?;

    emit(&format!("Created product {}\n\n", product.id));
    show_saved(config, &catalog, product).await;
    Ok(())
}

/// Update a product and append any new images.
pub async fn update(
    config: &StorefrontConfig,
    id: &ProductId,
    name: Option<String>,
    price: Option<Price>,
    description: Option<String>,
    images: &[PathBuf],
) -> Result<(), AppError> {
    let update = ProductUpdate::new(name, description, price)?;
    if update.is_empty() && images.is_empty() {
        return Err(AppError::BadRequest(
            "Nothing to update: pass --name, --price, --description or --image".to_string(),
        ));
    }

    let (admin, catalog) = admin(config)?;
    let product = admin
        .save_product(SaveTarget::Update(id.clone(), update), images)
        .await?;

    emit(&format!("Updated product {}\n\n", product.id));
    show_saved(config, &catalog, product).await;
    Ok(())
}

/// Delete a product.
pub async fn delete(config: &StorefrontConfig, id: &ProductId) -> Result<(), AppError> {
    let (admin, _) = admin(config)?;
    admin.delete_product(id).await?;
    emit(&format!("Deleted product {id}\n"));
    Ok(())
}
