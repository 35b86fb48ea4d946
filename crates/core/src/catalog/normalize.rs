//! Normalization from raw backend rows to [`Product`].

use chrono::{DateTime, Utc};
use serde_json::{Map, Value};

use super::error::{MalformedReason, MalformedRecordError};
use crate::types::{Price, PriceError, Product, ProductId};

/// Related image collection embedded by PostgREST.
const FIELD_IMAGE_COLLECTION: &str = "product_images";
/// Legacy single-image column.
const FIELD_INLINE_IMAGE: &str = "image_url";

/// Where a record's images come from.
///
/// The backend schema moved from an inline `image_url` column to a related
/// `product_images` table, and rows of both shapes (or both at once) are
/// still returned. A non-empty collection always wins; the inline column is
/// only consulted when the collection is empty or absent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImageSource {
    /// URLs from the related collection, in the order the backend returned.
    Collection(Vec<String>),
    /// The single inline URL.
    Inline(String),
    /// No image at all; renderers fall back to a placeholder.
    None,
}

impl ImageSource {
    /// Classify the image fields of a raw record.
    #[must_use]
    pub fn from_record(record: &Map<String, Value>) -> Self {
        let collection: Vec<String> = record
            .get(FIELD_IMAGE_COLLECTION)
            .and_then(Value::as_array)
            .map(|items| items.iter().filter_map(collection_entry_url).collect())
            .unwrap_or_default();

        if !collection.is_empty() {
            return Self::Collection(collection);
        }

        match record.get(FIELD_INLINE_IMAGE).and_then(non_empty_str) {
            Some(url) => Self::Inline(url.to_owned()),
            None => Self::None,
        }
    }

    /// Ordered image URLs, primary first.
    #[must_use]
    pub fn into_urls(self) -> Vec<String> {
        match self {
            Self::Collection(urls) => urls,
            Self::Inline(url) => vec![url],
            Self::None => Vec::new(),
        }
    }
}

/// URL of one collection entry: `{"image_url": ..}`, `{"url": ..}` or a bare string.
fn collection_entry_url(entry: &Value) -> Option<String> {
    let url = match entry {
        Value::String(_) => non_empty_str(entry),
        Value::Object(obj) => obj
            .get(FIELD_INLINE_IMAGE)
            .or_else(|| obj.get("url"))
            .and_then(non_empty_str),
        _ => None,
    };
    url.map(str::to_owned)
}

fn non_empty_str(value: &Value) -> Option<&str> {
    value.as_str().map(str::trim).filter(|s| !s.is_empty())
}

/// Normalize one raw backend record.
///
/// # Errors
///
/// Returns [`MalformedRecordError`] when `id`, `name` or `price` is missing or
/// unusable, or when `price` is negative. Missing images never fail.
pub fn normalize_product(record: &Value) -> Result<Product, MalformedRecordError> {
    let obj = record
        .as_object()
        .ok_or_else(|| MalformedRecordError::new(None, MalformedReason::NotAnObject))?;

    let id = read_id(obj).map_err(|reason| MalformedRecordError::new(None, reason))?;
    let fail = |reason| MalformedRecordError::new(Some(id.to_string()), reason);

    let name = match obj.get("name") {
        None | Some(Value::Null) => return Err(fail(MalformedReason::MissingField("name"))),
        Some(value) => non_empty_str(value)
            .ok_or_else(|| {
                fail(MalformedReason::WrongType {
                    field: "name",
                    expected: "a non-empty string",
                })
            })?
            .to_owned(),
    };

    let price = read_price(obj).map_err(fail)?;

    let description = obj
        .get("description")
        .and_then(Value::as_str)
        .map(str::to_owned);

    let created_at = obj
        .get("created_at")
        .and_then(Value::as_str)
        .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
        .map(|dt| dt.with_timezone(&Utc));

    Ok(Product {
        id,
        name,
        description,
        price,
        images: ImageSource::from_record(obj).into_urls(),
        created_at,
    })
}

fn read_id(obj: &Map<String, Value>) -> Result<ProductId, MalformedReason> {
    const EXPECTED: &str = "a non-empty string or an integer";

    match obj.get("id") {
        None | Some(Value::Null) => Err(MalformedReason::MissingField("id")),
        Some(Value::String(s)) if !s.trim().is_empty() => Ok(ProductId::new(s.trim())),
        Some(Value::Number(n)) if n.is_i64() || n.is_u64() => Ok(ProductId::new(n.to_string())),
        Some(_) => Err(MalformedReason::WrongType {
            field: "id",
            expected: EXPECTED,
        }),
    }
}

fn read_price(obj: &Map<String, Value>) -> Result<Price, MalformedReason> {
    let text = match obj.get("price") {
        None | Some(Value::Null) => return Err(MalformedReason::MissingField("price")),
        Some(Value::Number(n)) => n.to_string(),
        Some(Value::String(s)) => s.clone(),
        Some(_) => {
            return Err(MalformedReason::WrongType {
                field: "price",
                expected: "a number or numeric string",
            });
        }
    };

    Price::parse(&text).map_err(|e| match e {
        PriceError::NotNumeric(t) => MalformedReason::InvalidPrice(t),
        PriceError::Negative(amount) => MalformedReason::NegativePrice(amount.to_string()),
    })
}

/// Result of normalizing a listing: good products plus the rows that were skipped.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CatalogPage {
    /// Products in backend order.
    pub products: Vec<Product>,
    /// Records that failed normalization; the caller decides how to log them.
    pub rejected: Vec<MalformedRecordError>,
}

/// Normalize every record of a listing, skipping malformed ones.
///
/// One bad row never aborts the rest of the listing.
pub fn normalize_listing<'a, I>(records: I) -> CatalogPage
where
    I: IntoIterator<Item = &'a Value>,
{
    let mut page = CatalogPage::default();
    for record in records {
        match normalize_product(record) {
            Ok(product) => page.products.push(product),
            Err(err) => page.rejected.push(err),
        }
    }
    page
}

/// Sort newest first; products without `created_at` go last. Stable.
pub fn sort_newest_first(products: &mut [Product]) {
    products.sort_by(|a, b| match (a.created_at, b.created_at) {
        (Some(x), Some(y)) => y.cmp(&x),
        (Some(_), None) => core::cmp::Ordering::Less,
        (None, Some(_)) => core::cmp::Ordering::Greater,
        (None, None) => core::cmp::Ordering::Equal,
    });
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use serde_json::json;

    use super::*;

    fn base() -> Value {
        json!({
            "id": "b1f0",
            "name": "Wireless Earbuds",
            "description": "Noise cancelling",
            "price": 25000,
            "created_at": "2024-05-01T10:00:00+00:00"
        })
    }

    fn with(mut record: Value, key: &str, value: Value) -> Value {
        record.as_object_mut().unwrap().insert(key.to_string(), value);
        record
    }

    fn without(mut record: Value, key: &str) -> Value {
        record.as_object_mut().unwrap().remove(key);
        record
    }

    #[test]
    fn test_collection_wins_over_inline() {
        let record = with(
            with(base(), "image_url", json!("c.jpg")),
            "product_images",
            json!([{"image_url": "a.jpg"}, {"image_url": "b.jpg"}]),
        );
        let product = normalize_product(&record).unwrap();
        assert_eq!(product.images, ["a.jpg", "b.jpg"]);
    }

    #[test]
    fn test_inline_only() {
        let record = with(base(), "image_url", json!("x.jpg"));
        let product = normalize_product(&record).unwrap();
        assert_eq!(product.images, ["x.jpg"]);
    }

    #[test]
    fn test_empty_collection_falls_back_to_inline() {
        let record = with(
            with(base(), "image_url", json!("x.jpg")),
            "product_images",
            json!([]),
        );
        assert_eq!(normalize_product(&record).unwrap().images, ["x.jpg"]);
    }

    #[test]
    fn test_no_images_is_not_an_error() {
        let product = normalize_product(&base()).unwrap();
        assert!(product.images.is_empty());

        let record = with(with(base(), "image_url", json!("")), "product_images", Value::Null);
        assert!(normalize_product(&record).unwrap().images.is_empty());
    }

    #[test]
    fn test_collection_entry_shapes_and_order() {
        let record = with(
            base(),
            "product_images",
            json!([{"url": "1.png"}, "2.png", {"image_url": null}, {"image_url": "3.png"}, 4]),
        );
        assert_eq!(
            normalize_product(&record).unwrap().images,
            ["1.png", "2.png", "3.png"]
        );
    }

    #[test]
    fn test_image_source_classification() {
        let obj = json!({"image_url": "i.jpg", "product_images": [{"image_url": "c.jpg"}]});
        assert_eq!(
            ImageSource::from_record(obj.as_object().unwrap()),
            ImageSource::Collection(vec!["c.jpg".into()])
        );
        let obj = json!({"image_url": "  "});
        assert_eq!(ImageSource::from_record(obj.as_object().unwrap()), ImageSource::None);
    }

    #[test]
    fn test_missing_price_fails() {
        let err = normalize_product(&without(base(), "price")).unwrap_err();
        assert_eq!(err.reason, MalformedReason::MissingField("price"));
        assert_eq!(err.product_id.as_deref(), Some("b1f0"));
    }

    #[test]
    fn test_price_coercion() {
        let p = normalize_product(&with(base(), "price", json!("1999.50"))).unwrap();
        assert_eq!(p.price, Price::parse("1999.5").unwrap());

        let p = normalize_product(&with(base(), "price", json!(12.25))).unwrap();
        assert_eq!(p.price, Price::parse("12.25").unwrap());

        let err = normalize_product(&with(base(), "price", json!("cheap"))).unwrap_err();
        assert!(matches!(err.reason, MalformedReason::InvalidPrice(_)));

        let err = normalize_product(&with(base(), "price", json!(true))).unwrap_err();
        assert!(matches!(err.reason, MalformedReason::WrongType { field: "price", .. }));

        let err = normalize_product(&with(base(), "price", json!(-5))).unwrap_err();
        assert!(matches!(err.reason, MalformedReason::NegativePrice(_)));
    }

    #[test]
    fn test_id_and_name_validation() {
        let err = normalize_product(&without(base(), "id")).unwrap_err();
        assert_eq!(err.reason, MalformedReason::MissingField("id"));
        assert!(err.product_id.is_none());

        let err = normalize_product(&with(base(), "id", json!(["x"]))).unwrap_err();
        assert!(matches!(err.reason, MalformedReason::WrongType { field: "id", .. }));

        let p = normalize_product(&with(base(), "id", json!(42))).unwrap();
        assert_eq!(p.id.as_str(), "42");

        let err = normalize_product(&without(base(), "name")).unwrap_err();
        assert_eq!(err.reason, MalformedReason::MissingField("name"));

        let err = normalize_product(&with(base(), "name", json!(""))).unwrap_err();
        assert!(matches!(err.reason, MalformedReason::WrongType { field: "name", .. }));
    }

    #[test]
    fn test_not_an_object() {
        let err = normalize_product(&json!([1, 2])).unwrap_err();
        assert_eq!(err.reason, MalformedReason::NotAnObject);
    }

    #[test]
    fn test_optional_fields() {
        let record = with(with(base(), "description", json!(7)), "created_at", json!("yesterday"));
        let p = normalize_product(&record).unwrap();
        assert!(p.description.is_none());
        assert!(p.created_at.is_none());

        let p = normalize_product(&base()).unwrap();
        assert_eq!(p.description.as_deref(), Some("Noise cancelling"));
        assert_eq!(p.created_at.unwrap().to_rfc3339(), "2024-05-01T10:00:00+00:00");
    }

    #[test]
    fn test_listing_skips_malformed_records() {
        let records = vec![
            base(),
            without(with(base(), "id", json!("bad")), "price"),
            with(base(), "id", json!("second")),
        ];
        let page = normalize_listing(&records);
        assert_eq!(page.products.len(), 2);
        assert_eq!(page.rejected.len(), 1);
        assert_eq!(page.rejected[0].product_id.as_deref(), Some("bad"));
    }

    #[test]
    fn test_sort_newest_first() {
        let records = vec![
            with(with(base(), "id", json!("old")), "created_at", json!("2023-01-01T00:00:00Z")),
            without(with(base(), "id", json!("undated")), "created_at"),
            with(with(base(), "id", json!("new")), "created_at", json!("2025-01-01T00:00:00Z")),
        ];
        let mut products = normalize_listing(&records).products;
        sort_newest_first(&mut products);
        let ids: Vec<&str> = products.iter().map(|p| p.id.as_str()).collect();
        assert_eq!(ids, ["new", "old", "undated"]);
    }
}
