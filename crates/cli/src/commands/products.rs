//! Catalog browsing commands.

use techmart_core::ProductId;
use techmart_storefront::{AppError, StorefrontConfig};

use super::{catalog, emit, style};
use crate::render;

/// List all products, newest first.
pub async fn list(config: &StorefrontConfig) -> Result<(), AppError> {
    let page = catalog(config).list_products().await?;

    emit(&render::product_list(&page.products, style(config)));
    if !page.rejected.is_empty() {
        tracing::warn!(
            count = page.rejected.len(),
            "Some products could not be displayed"
        );
    }
    Ok(())
}

/// Show one product.
pub async fn show(config: &StorefrontConfig, id: &ProductId) -> Result<(), AppError> {
    let product = catalog(config).get_product(id).await?;
    emit(&render::product_detail(&product, style(config)));
    Ok(())
}
