//! Integration tests for TechMart.
//!
//! # Running Tests
//!
//! ```bash
//! # Offline scenarios (in-memory backend, temp-dir cart files)
//! cargo test -p techmart-integration-tests
//!
//! # Also hit a real Supabase project (reads SUPABASE_URL / SUPABASE_ANON_KEY)
//! cargo test -p techmart-integration-tests -- --ignored
//! ```
//!
//! # Test Categories
//!
//! - `storefront_flow` - Catalog to cart to persisted session
//! - `stale_fetch` - Superseded product fetches are dropped
//! - `supabase_http` - Client, catalog and admin against [`fake_supabase`]
//! - `supabase_live` - Read-only checks against a live project

pub mod fake_supabase;

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use serde_json::{Value, json};
use techmart_core::ProductId;
use techmart_storefront::{BackendError, CatalogBackend};

/// Backend serving fixed rows, optionally slowing down per product.
#[derive(Debug, Default)]
pub struct InMemoryBackend {
    rows: Vec<Value>,
    delays: HashMap<String, Duration>,
    calls: AtomicUsize,
}

impl InMemoryBackend {
    #[must_use]
    pub fn new(rows: Vec<Value>) -> Self {
        Self {
            rows,
            ..Self::default()
        }
    }

    /// Delay `get_product` for `id` by `delay`.
    #[must_use]
    pub fn with_delay(mut self, id: &str, delay: Duration) -> Self {
        self.delays.insert(id.to_string(), delay);
        self
    }

    /// Number of backend calls served.
    #[must_use]
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

fn row_id(row: &Value) -> Option<String> {
    match row.get("id")? {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

impl CatalogBackend for InMemoryBackend {
    async fn list_products(&self) -> Result<Vec<Value>, BackendError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.rows.clone())
    }

    async fn get_product(&self, id: &ProductId) -> Result<Value, BackendError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.delays.get(id.as_str()) {
            tokio::time::sleep(*delay).await;
        }
        self.rows
            .iter()
            .find(|row| row_id(row).as_deref() == Some(id.as_str()))
            .cloned()
            .ok_or_else(|| BackendError::NotFound(format!("product {id}")))
    }
}

/// A listing mixing both image schemas, a numeric id and one broken row.
#[must_use]
pub fn sample_rows() -> Vec<Value> {
    vec![
        json!({
            "id": "p1",
            "name": "Bluetooth speaker",
            "description": "Portable, 12h battery",
            "price": 1000,
            "created_at": "2024-03-01T10:00:00Z",
            "product_images": [
                {"image_url": "https://cdn.example.com/p1-front.png"},
                {"image_url": "https://cdn.example.com/p1-back.png"}
            ]
        }),
        json!({
            "id": "p2",
            "name": "USB-C cable",
            "price": "500",
            "created_at": "2024-05-01T10:00:00Z",
            "image_url": "https://cdn.example.com/p2.png"
        }),
        json!({
            "id": 3,
            "name": "Screen protector",
            "price": 250.5,
            "created_at": "2024-04-01T10:00:00Z",
            "product_images": [],
            "image_url": "https://cdn.example.com/p3.png"
        }),
        json!({
            "id": "p4",
            "name": "Mystery box",
            "price": "free",
            "created_at": "2024-06-01T10:00:00Z"
        }),
    ]
}
