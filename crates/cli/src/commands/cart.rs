//! Cart commands.
//!
//! Each command restores the saved cart, applies one change and waits for
//! the change to be written before returning.

use techmart_core::ProductId;
use techmart_storefront::cart::{CartSession, JsonFileStorage};
use techmart_storefront::{AppError, StorefrontConfig};

use super::{catalog, emit, style};
use crate::render;

async fn open(config: &StorefrontConfig) -> CartSession<JsonFileStorage> {
    CartSession::open(
        JsonFileStorage::new(&config.cart_path),
        config.persist_debounce,
    )
    .await
}

/// Note that `id` has no line. The cart is left as it is.
fn not_in_cart(id: &ProductId) {
    tracing::info!(product_id = %id, "Product not in cart");
    emit(&format!("Product {id} is not in the cart\n"));
}

/// Print the cart.
pub async fn show(config: &StorefrontConfig) -> Result<(), AppError> {
    let session = open(config).await;
    emit(&render::cart(session.store(), style(config)));
    session.close().await;
    Ok(())
}

/// Add `quantity` units of a catalog product.
pub async fn add(config: &StorefrontConfig, id: &ProductId, quantity: u32) -> Result<(), AppError> {
    let product = catalog(config).get_product(id).await?;

    let mut session = open(config).await;
    session.store_mut().add_quantity(&product, quantity);
    tracing::info!(product_id = %id, quantity, "Added to cart");

    emit(&format!("Added {quantity} x {}\n", product.name));
    emit(&render::cart(session.store(), style(config)));
    session.close().await;
    Ok(())
}

/// Remove a product's line. An id that is not in the cart is a no-op.
pub async fn remove(config: &StorefrontConfig, id: &ProductId) -> Result<(), AppError> {
    let mut session = open(config).await;
    if session.store().line(id).is_none() {
        not_in_cart(id);
    }

    session.store_mut().remove_from_cart(id);
    emit(&render::cart(session.store(), style(config)));
    session.close().await;
    Ok(())
}

/// Set a line's quantity; zero or less removes the line. An id that is not
/// in the cart is a no-op.
pub async fn set(config: &StorefrontConfig, id: &ProductId, quantity: i64) -> Result<(), AppError> {
    let mut session = open(config).await;
    if session.store().line(id).is_none() {
        not_in_cart(id);
    }

    session.store_mut().update_quantity(id, quantity);
    emit(&render::cart(session.store(), style(config)));
    session.close().await;
    Ok(())
}

/// Empty the cart.
pub async fn clear(config: &StorefrontConfig) -> Result<(), AppError> {
    let mut session = open(config).await;
    session.store_mut().clear_cart();
    emit(&render::cart(session.store(), style(config)));
    session.close().await;
    Ok(())
}
