//! Plain-text views of products and the cart.

use std::fmt::Write;

use techmart_core::{CartStore, Product};

use crate::MAX_ADD_QUANTITY;

/// Display settings taken from configuration.
#[derive(Debug, Clone, Copy)]
pub struct Style<'a> {
    pub currency: &'a str,
    pub placeholder: &'a str,
}

/// One line per product: id, name, price and primary image.
pub fn product_list(products: &[Product], style: Style<'_>) -> String {
    if products.is_empty() {
        return "No products available.\n".to_string();
    }

    let mut out = String::new();
    for product in products {
        let _ = writeln!(
            out,
            "{}  {}  {}  {}",
            product.id,
            product.name,
            product.price.display_with(style.currency),
            product.primary_image_or(style.placeholder),
        );
    }
    out
}

/// Full product view with every image and the add-to-cart hint.
pub fn product_detail(product: &Product, style: Style<'_>) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "{}", product.name);
    let _ = writeln!(out, "{}", product.price.display_with(style.currency));
    if let Some(description) = &product.description {
        let _ = writeln!(out, "\n{description}");
    }

    let _ = writeln!(out, "\nImages:");
    if product.images.is_empty() {
        let _ = writeln!(out, "  {}", style.placeholder);
    }
    for url in &product.images {
        let _ = writeln!(out, "  {url}");
    }

    let _ = writeln!(
        out,
        "\nAdd to cart: techmart cart add {} --quantity <1-{MAX_ADD_QUANTITY}>",
        product.id
    );
    out
}

/// Cart lines with subtotals, then the item count and total.
pub fn cart(store: &CartStore, style: Style<'_>) -> String {
    if store.is_empty() {
        return "Your cart is empty.\n".to_string();
    }

    let mut out = String::new();
    for line in store.lines() {
        let _ = writeln!(
            out,
            "{} x {} @ {} = {}  [{}]",
            line.quantity,
            line.product.name,
            line.product.price.display_with(style.currency),
            line.subtotal().display_with(style.currency),
            line.product.id,
        );
    }
    let _ = writeln!(
        out,
        "Items: {}  Total: {}",
        store.total_items(),
        store.total_price().display_with(style.currency)
    );
    out
}
