//! Cache types for catalog responses.

use techmart_core::{CatalogPage, Product, ProductId};

/// Cache key for the listing and single products.
#[derive(Debug, Clone, Hash, PartialEq, Eq)]
pub enum CacheKey {
    Products,
    Product(ProductId),
}

/// Cached value types.
#[derive(Debug, Clone)]
pub enum CacheValue {
    Products(CatalogPage),
    Product(Box<Product>),
}
