//! Catalog normalization.
//!
//! The backend returns product rows in two historical shapes: an inline
//! `image_url` column, or a related `product_images` collection embedded by
//! PostgREST. [`normalize_product`] turns either (or both) into one canonical
//! [`crate::Product`] so the grid, the detail view and the cart never branch
//! on the schema themselves.

mod error;
mod normalize;

pub use error::{MalformedReason, MalformedRecordError};
pub use normalize::{CatalogPage, ImageSource, normalize_listing, normalize_product, sort_newest_first};
