//! The Supabase client, catalog and admin service over real HTTP.
//!
//! Runs against [`FakeSupabase`], a local server speaking the parts of
//! `PostgREST` and Storage the client uses.

use std::time::Duration;

use serde_json::json;
use techmart_core::{Price, ProductId};
use techmart_integration_tests::fake_supabase::{ANON_KEY, BUCKET, FakeSupabase, SERVICE_KEY};
use techmart_storefront::{BackendError, CatalogBackend};
use techmart_storefront::admin::{Admin, AdminError, NewProduct, ProductUpdate, SaveTarget};
use techmart_storefront::catalog::{Catalog, CatalogError};
use techmart_storefront::supabase::SupabaseClient;

const TTL: Duration = Duration::from_secs(300);
const PRODUCTS: &str = "/rest/v1/products";

async fn fake_with_products() -> FakeSupabase {
    let fake = FakeSupabase::start().await.unwrap();
    fake.seed(json!({
        "id": "p1",
        "name": "Bluetooth speaker",
        "price": 1000,
        "created_at": "2024-03-01T10:00:00Z",
        "product_images": [
            {"id": 1, "image_url": "https://cdn.example.com/p1-front.png"},
            {"id": 2, "image_url": "https://cdn.example.com/p1-back.png"}
        ]
    }));
    fake.seed(json!({
        "id": "p2",
        "name": "USB-C cable",
        "price": "500",
        "created_at": "2024-05-01T10:00:00Z",
        "image_url": "https://cdn.example.com/p2.png"
    }));
    fake
}

fn admin(fake: &FakeSupabase) -> Admin {
    Admin::from_config(&fake.config()).unwrap()
}

// =============================================================================
// Reads
// =============================================================================

#[tokio::test]
async fn test_catalog_reads_over_http() {
    let fake = fake_with_products().await;
    let catalog = Catalog::new(SupabaseClient::new(&fake.config()), TTL);

    let page = catalog.list_products().await.unwrap();
    let ids: Vec<&str> = page.products.iter().map(|p| p.id.as_str()).collect();
    assert_eq!(ids, ["p2", "p1"]);
    assert_eq!(
        page.products[1].images,
        [
            "https://cdn.example.com/p1-front.png",
            "https://cdn.example.com/p1-back.png"
        ]
    );
    assert_eq!(page.products[0].images, ["https://cdn.example.com/p2.png"]);

    let cable = catalog.get_product(&ProductId::new("p2")).await.unwrap();
    assert_eq!(cable.price, Price::from_units(500));
}

#[tokio::test]
async fn test_reads_use_anon_key() {
    let fake = fake_with_products().await;
    let client = SupabaseClient::new(&fake.config());

    client.list_products().await.unwrap();

    let requests = fake.requests();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].api_key.as_deref(), Some(ANON_KEY));
    assert_eq!(requests[0].bearer.as_deref(), Some(ANON_KEY));
}

#[tokio::test]
async fn test_missing_row_is_not_found() {
    let fake = fake_with_products().await;
    let client = SupabaseClient::new(&fake.config());

    let err = client.get_product(&ProductId::new("nope")).await.unwrap_err();
    assert!(matches!(err, BackendError::NotFound(_)));
    assert!(!err.is_retryable());

    let catalog = Catalog::new(client, TTL);
    let err = catalog.get_product(&ProductId::new("nope")).await.unwrap_err();
    assert!(matches!(err, CatalogError::NotFound(id) if id.as_str() == "nope"));
}

#[tokio::test]
async fn test_malformed_uuid_is_not_found() {
    let fake = fake_with_products().await;
    fake.respond_next(
        400,
        r#"{"code":"22P02","message":"invalid input syntax for type uuid: \"abc\""}"#,
    );

    let client = SupabaseClient::new(&fake.config());
    let err = client.get_product(&ProductId::new("abc")).await.unwrap_err();
    assert!(matches!(err, BackendError::NotFound(_)));
}

#[tokio::test]
async fn test_rate_limit_reports_retry_after() {
    let fake = fake_with_products().await;
    fake.rate_limit_next("7");

    let client = SupabaseClient::new(&fake.config());
    let err = client.list_products().await.unwrap_err();
    assert!(matches!(err, BackendError::RateLimited(7)));
    assert!(err.is_retryable());

    // Only the scripted response is affected
    assert_eq!(client.list_products().await.unwrap().len(), 2);
}

#[tokio::test]
async fn test_server_error_keeps_code_and_message() {
    let fake = fake_with_products().await;
    fake.respond_next(500, r#"{"code":"XX000","message":"internal error"}"#);

    let client = SupabaseClient::new(&fake.config());
    let err = client.list_products().await.unwrap_err();
    match err {
        BackendError::Backend {
            status,
            code,
            message,
        } => {
            assert_eq!(status, 500);
            assert_eq!(code.as_deref(), Some("XX000"));
            assert_eq!(message, "internal error");
        }
        other => panic!("expected Backend error, got {other:?}"),
    }
}

#[tokio::test]
async fn test_non_json_error_body() {
    let fake = fake_with_products().await;
    fake.respond_next(502, "<html>Bad gateway</html>");

    let client = SupabaseClient::new(&fake.config());
    let err = client.list_products().await.unwrap_err();
    assert!(matches!(
        err,
        BackendError::Backend { status: 502, code: None, ref message } if message.contains("Bad gateway")
    ));
}

#[tokio::test]
async fn test_unparseable_success_body_is_parse_error() {
    let fake = fake_with_products().await;
    fake.respond_next(200, "not json");

    let client = SupabaseClient::new(&fake.config());
    let err = client.list_products().await.unwrap_err();
    assert!(matches!(err, BackendError::Parse(_)));
}

#[tokio::test]
async fn test_unreachable_backend_is_connection_error() {
    let config = {
        let fake = FakeSupabase::start().await.unwrap();
        fake.config()
    };
    // Give the aborted server a moment to release the port.
    tokio::time::sleep(Duration::from_millis(50)).await;

    let err = SupabaseClient::new(&config).list_products().await.unwrap_err();
    assert!(matches!(err, BackendError::Connection(_)));
}

// =============================================================================
// Admin writes
// =============================================================================

#[tokio::test]
async fn test_create_update_delete_product() {
    let fake = FakeSupabase::start().await.unwrap();
    let admin = admin(&fake);

    let created = admin
        .create_product(
            NewProduct::new("Phone", Some("6.1 inch".into()), Price::parse("1999.50").unwrap())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(created.name, "Phone");
    assert_eq!(created.description.as_deref(), Some("6.1 inch"));
    assert_eq!(created.price, Price::parse("1999.5").unwrap());
    assert!(created.images.is_empty());

    let requests = fake.requests();
    assert_eq!(requests[0].api_key.as_deref(), Some(SERVICE_KEY));
    assert_eq!(requests[0].bearer.as_deref(), Some(SERVICE_KEY));

    let update = ProductUpdate::new(None, Some(String::new()), Some(Price::from_units(1500))).unwrap();
    let updated = admin.update_product(&created.id, update).await.unwrap();
    assert_eq!(updated.name, "Phone");
    assert_eq!(updated.description, None);
    assert_eq!(updated.price, Price::from_units(1500));

    // An empty update reads the row back without writing
    let patches = fake.count("PATCH", PRODUCTS);
    let same = admin
        .update_product(&created.id, ProductUpdate::default())
        .await
        .unwrap();
    assert_eq!(same, updated);
    assert_eq!(fake.count("PATCH", PRODUCTS), patches);

    admin.delete_product(&created.id).await.unwrap();
    assert!(fake.product(created.id.as_str()).is_none());

    let err = admin.delete_product(&created.id).await.unwrap_err();
    assert!(matches!(err, AdminError::NotFound(id) if id == created.id));
}

#[tokio::test]
async fn test_update_missing_product_is_not_found() {
    let fake = fake_with_products().await;
    let update = ProductUpdate::new(Some("Renamed".into()), None, None).unwrap();

    let err = admin(&fake)
        .update_product(&ProductId::new("nope"), update)
        .await
        .unwrap_err();
    assert!(matches!(err, AdminError::NotFound(_)));
}

#[tokio::test]
async fn test_create_invalidates_attached_catalog() {
    let fake = fake_with_products().await;
    let catalog = Catalog::new(SupabaseClient::new(&fake.config()), TTL);
    let admin = admin(&fake).with_catalog(catalog.clone());

    assert_eq!(catalog.list_products().await.unwrap().products.len(), 2);
    assert_eq!(catalog.list_products().await.unwrap().products.len(), 2);
    assert_eq!(fake.count("GET", PRODUCTS), 1);

    let created = admin
        .create_product(NewProduct::new("Charger", None, Price::from_units(300)).unwrap())
        .await
        .unwrap();

    let page = catalog.list_products().await.unwrap();
    assert_eq!(fake.count("GET", PRODUCTS), 2);
    assert_eq!(page.products.len(), 3);
    assert!(page.products.iter().any(|p| p.id == created.id));
}

#[tokio::test]
async fn test_detached_catalog_keeps_cached_listing() {
    let fake = fake_with_products().await;
    let catalog = Catalog::new(SupabaseClient::new(&fake.config()), TTL);
    let admin = admin(&fake);

    catalog.list_products().await.unwrap();
    admin
        .create_product(NewProduct::new("Charger", None, Price::from_units(300)).unwrap())
        .await
        .unwrap();

    assert_eq!(catalog.list_products().await.unwrap().products.len(), 2);
    assert_eq!(fake.count("GET", PRODUCTS), 1);
}

#[tokio::test]
async fn test_delete_invalidates_cached_product() {
    let fake = fake_with_products().await;
    let catalog = Catalog::new(SupabaseClient::new(&fake.config()), TTL);
    let admin = admin(&fake).with_catalog(catalog.clone());
    let id = ProductId::new("p1");

    catalog.get_product(&id).await.unwrap();
    admin.delete_product(&id).await.unwrap();

    let err = catalog.get_product(&id).await.unwrap_err();
    assert!(matches!(err, CatalogError::NotFound(_)));
}

// =============================================================================
// Images
// =============================================================================

#[tokio::test]
async fn test_upload_images_returns_public_urls() {
    let fake = FakeSupabase::start().await.unwrap();
    let dir = tempfile::tempdir().unwrap();
    let front = dir.path().join("front.png");
    let back = dir.path().join("back.JPG");
    std::fs::write(&front, [0x89, b'P', b'N', b'G']).unwrap();
    std::fs::write(&back, [0xFF, 0xD8, 0xFF]).unwrap();

    let urls = admin(&fake).upload_images(&[front, back]).await.unwrap();

    let objects = fake.objects();
    assert_eq!(objects.len(), 2);
    assert_eq!(objects[0].bucket, BUCKET);
    assert_eq!(objects[0].content_type.as_deref(), Some("image/png"));
    assert_eq!(objects[0].size, 4);
    assert_eq!(objects[1].content_type.as_deref(), Some("image/jpeg"));
    assert!(objects[1].key.ends_with(".jpg"));

    let public = format!("{}storage/v1/object/public/{BUCKET}/", fake.url());
    assert_eq!(urls.len(), 2);
    assert_eq!(urls[0], format!("{public}{}", objects[0].key));
    assert_eq!(urls[1], format!("{public}{}", objects[1].key));
}

#[tokio::test]
async fn test_save_product_attaches_images_in_order() {
    let fake = FakeSupabase::start().await.unwrap();
    let dir = tempfile::tempdir().unwrap();
    let paths: Vec<_> = ["a.png", "b.webp"]
        .iter()
        .map(|name| {
            let path = dir.path().join(name);
            std::fs::write(&path, b"img").unwrap();
            path
        })
        .collect();

    let target = SaveTarget::Create(NewProduct::new("Tablet", None, Price::from_units(90_000)).unwrap());
    let product = admin(&fake).save_product(target, &paths).await.unwrap();

    let objects = fake.objects();
    assert_eq!(product.images.len(), 2);
    assert!(product.images[0].ends_with(&objects[0].key));
    assert!(product.images[1].ends_with(&objects[1].key));
    assert_eq!(fake.count("POST", "/rest/v1/product_images"), 1);
}

#[tokio::test]
async fn test_save_product_appends_to_existing_images() {
    let fake = fake_with_products().await;
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("side.png");
    std::fs::write(&path, b"img").unwrap();

    let target = SaveTarget::Update(ProductId::new("p1"), ProductUpdate::default());
    let product = admin(&fake).save_product(target, &[path]).await.unwrap();

    assert_eq!(product.images.len(), 3);
    assert_eq!(product.images[0], "https://cdn.example.com/p1-front.png");
    assert!(product.images[2].contains("/storage/v1/object/public/"));
}

#[tokio::test]
async fn test_invalid_image_writes_nothing() {
    let fake = FakeSupabase::start().await.unwrap();
    let dir = tempfile::tempdir().unwrap();
    let good = dir.path().join("ok.png");
    let bad = dir.path().join("notes.txt");
    std::fs::write(&good, b"img").unwrap();
    std::fs::write(&bad, b"text").unwrap();

    let target = SaveTarget::Create(NewProduct::new("Tablet", None, Price::ZERO).unwrap());
    let err = admin(&fake).save_product(target, &[good, bad]).await.unwrap_err();

    assert!(matches!(err, AdminError::InvalidImage { .. }));
    assert!(fake.requests().is_empty());
}

#[tokio::test]
async fn test_failed_upload_is_reported() {
    let fake = FakeSupabase::start().await.unwrap();
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("ok.png");
    std::fs::write(&path, b"img").unwrap();
    fake.respond_next(
        400,
        r#"{"statusCode":"403","error":"Unauthorized","message":"new row violates row-level security policy"}"#,
    );

    let err = admin(&fake).upload_images(&[path]).await.unwrap_err();
    assert!(matches!(
        err,
        AdminError::Backend(BackendError::Backend { status: 400, ref message, .. })
            if message.contains("row-level security")
    ));
    assert!(fake.objects().is_empty());
}
