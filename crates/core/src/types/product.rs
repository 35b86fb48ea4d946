//! Canonical product view model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{Price, ProductId};

/// A product as consumed by the grid, the detail view and the cart.
///
/// Produced by [`crate::catalog::normalize_product`] regardless of which
/// schema shape the backend returned.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    /// Stable identifier, never reused.
    pub id: ProductId,
    /// Display name (non-empty).
    pub name: String,
    /// Optional long description.
    pub description: Option<String>,
    /// Unit price in the major currency unit.
    pub price: Price,
    /// Image URLs; the first one is the primary image.
    #[serde(default)]
    pub images: Vec<String>,
    /// Creation time, only used for newest-first ordering.
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

impl Product {
    /// The image shown wherever only one fits.
    #[must_use]
    pub fn primary_image(&self) -> Option<&str> {
        self.images.first().map(String::as_str)
    }

    /// The primary image, or `placeholder` when the product has none.
    #[must_use]
    pub fn primary_image_or<'a>(&'a self, placeholder: &'a str) -> &'a str {
        self.primary_image().unwrap_or(placeholder)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn product(images: &[&str]) -> Product {
        Product {
            id: ProductId::new("p1"),
            name: "Headphones".to_string(),
            description: None,
            price: Price::from_units(15_000),
            images: images.iter().map(ToString::to_string).collect(),
            created_at: None,
        }
    }

    #[test]
    fn test_primary_image_is_first() {
        let p = product(&["a.jpg", "b.jpg"]);
        assert_eq!(p.primary_image(), Some("a.jpg"));
        assert_eq!(p.primary_image_or("ph.png"), "a.jpg");
    }

    #[test]
    fn test_primary_image_falls_back_to_placeholder() {
        let p = product(&[]);
        assert_eq!(p.primary_image(), None);
        assert_eq!(p.primary_image_or("ph.png"), "ph.png");
    }
}
