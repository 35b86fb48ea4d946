//! A stand-in Supabase project served over local HTTP.
//!
//! Implements just enough of `PostgREST` and Storage for the client:
//! products with embedded images, image row inserts and bucket uploads.
//! Every request is recorded, and the next response can be scripted to
//! drive the client's error handling.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use axum::body::Bytes;
use axum::extract::{Path, Query, Request, State};
use axum::http::{HeaderMap, StatusCode, header};
use axum::middleware::{self, Next};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use secrecy::SecretString;
use serde_json::{Map, Value, json};
use tokio::task::JoinHandle;
use url::Url;

use techmart_storefront::config::SupabaseConfig;

/// Anon key the fake project hands out.
pub const ANON_KEY: &str = "fake-anon-key";
/// Service-role key the fake project hands out.
pub const SERVICE_KEY: &str = "fake-service-key";
/// Bucket name used by [`FakeSupabase::config`].
pub const BUCKET: &str = "product-images";

/// One request as the server saw it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedRequest {
    pub method: String,
    pub path: String,
    pub api_key: Option<String>,
    pub bearer: Option<String>,
}

/// An object written to the bucket.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredObject {
    pub bucket: String,
    pub key: String,
    pub content_type: Option<String>,
    pub size: usize,
}

#[derive(Debug, Clone)]
struct Scripted {
    status: StatusCode,
    retry_after: Option<String>,
    body: String,
}

impl IntoResponse for Scripted {
    fn into_response(self) -> Response {
        let mut response = (self.status, self.body).into_response();
        response.headers_mut().insert(
            header::CONTENT_TYPE,
            header::HeaderValue::from_static("application/json"),
        );
        if let Some(value) = self
            .retry_after
            .and_then(|v| header::HeaderValue::from_str(&v).ok())
        {
            response.headers_mut().insert(header::RETRY_AFTER, value);
        }
        response
    }
}

#[derive(Debug, Default)]
struct FakeState {
    products: Vec<Map<String, Value>>,
    next_product: u32,
    next_image: u64,
    objects: Vec<StoredObject>,
    requests: Vec<RecordedRequest>,
    scripted: Option<Scripted>,
}

impl FakeState {
    fn product_mut(&mut self, id: &str) -> Option<&mut Map<String, Value>> {
        self.products
            .iter_mut()
            .find(|row| row.get("id").and_then(Value::as_str) == Some(id))
    }
}

type Shared = Arc<Mutex<FakeState>>;

fn lock(state: &Shared) -> MutexGuard<'_, FakeState> {
    state.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Running fake project. The server stops when this is dropped.
#[derive(Debug)]
pub struct FakeSupabase {
    url: Url,
    state: Shared,
    server: JoinHandle<()>,
}

impl FakeSupabase {
    /// Bind to an ephemeral local port and start serving.
    ///
    /// # Errors
    ///
    /// Returns an error if the listener cannot be bound.
    pub async fn start() -> std::io::Result<Self> {
        let state = Shared::default();

        let app = Router::new()
            .route(
                "/rest/v1/products",
                get(select_products)
                    .post(insert_product)
                    .patch(update_product)
                    .delete(delete_product),
            )
            .route("/rest/v1/product_images", post(insert_images))
            .route("/storage/v1/object/{bucket}/{*key}", post(upload_object))
            .layer(middleware::from_fn_with_state(Arc::clone(&state), record))
            .with_state(Arc::clone(&state));

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await?;
        let addr: SocketAddr = listener.local_addr()?;
        let url = Url::parse(&format!("http://{addr}")).map_err(std::io::Error::other)?;
        let server = tokio::spawn(async move {
            if let Err(e) = axum::serve(listener, app).await {
                tracing::warn!(error = %e, "Fake Supabase server stopped");
            }
        });

        Ok(Self { url, state, server })
    }

    /// Base URL of the project.
    #[must_use]
    pub fn url(&self) -> Url {
        self.url.clone()
    }

    /// Project settings pointing at this server, with both keys.
    #[must_use]
    pub fn config(&self) -> SupabaseConfig {
        SupabaseConfig {
            url: self.url(),
            anon_key: SecretString::from(ANON_KEY),
            service_role_key: Some(SecretString::from(SERVICE_KEY)),
            image_bucket: BUCKET.to_string(),
        }
    }

    /// Add a product row. Rows without `product_images` get an empty list.
    pub fn seed(&self, row: Value) {
        let Value::Object(mut row) = row else {
            return;
        };
        row.entry("product_images").or_insert_with(|| json!([]));
        lock(&self.state).products.push(row);
    }

    /// Answer the next request with `status` and `body`.
    pub fn respond_next(&self, status: u16, body: &str) {
        lock(&self.state).scripted = Some(Scripted {
            status: StatusCode::from_u16(status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR),
            retry_after: None,
            body: body.to_string(),
        });
    }

    /// Answer the next request with a 429 carrying `retry_after`.
    pub fn rate_limit_next(&self, retry_after: &str) {
        lock(&self.state).scripted = Some(Scripted {
            status: StatusCode::TOO_MANY_REQUESTS,
            retry_after: Some(retry_after.to_string()),
            body: json!({"message": "Too many requests"}).to_string(),
        });
    }

    /// Every request served so far.
    #[must_use]
    pub fn requests(&self) -> Vec<RecordedRequest> {
        lock(&self.state).requests.clone()
    }

    /// Requests with this method and path.
    #[must_use]
    pub fn count(&self, method: &str, path: &str) -> usize {
        lock(&self.state)
            .requests
            .iter()
            .filter(|r| r.method == method && r.path == path)
            .count()
    }

    /// Objects uploaded to storage, in upload order.
    #[must_use]
    pub fn objects(&self) -> Vec<StoredObject> {
        lock(&self.state).objects.clone()
    }

    /// Current row for `id`, with embedded images.
    #[must_use]
    pub fn product(&self, id: &str) -> Option<Value> {
        lock(&self.state)
            .product_mut(id)
            .map(|row| Value::Object(row.clone()))
    }
}

impl Drop for FakeSupabase {
    fn drop(&mut self) {
        self.server.abort();
    }
}

// =============================================================================
// Handlers
// =============================================================================

async fn record(State(state): State<Shared>, request: Request, next: Next) -> Response {
    let scripted = {
        let headers = request.headers();
        let mut state = lock(&state);
        state.requests.push(RecordedRequest {
            method: request.method().to_string(),
            path: request.uri().path().to_string(),
            api_key: header_value(headers, "apikey"),
            bearer: header_value(headers, header::AUTHORIZATION.as_str())
                .and_then(|v| v.strip_prefix("Bearer ").map(str::to_string)),
        });
        state.scripted.take()
    };

    match scripted {
        Some(scripted) => scripted.into_response(),
        None => next.run(request).await,
    }
}

fn header_value(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
}

/// `PostgREST` answer when a single object was requested and no row matched.
fn no_rows() -> Response {
    (
        StatusCode::NOT_ACCEPTABLE,
        Json(json!({
            "code": "PGRST116",
            "details": "The result contains 0 rows",
            "hint": null,
            "message": "JSON object requested, multiple (or no) rows returned"
        })),
    )
        .into_response()
}

fn id_filter(params: &HashMap<String, String>) -> Option<&str> {
    params
        .get("id")
        .map(|filter| filter.strip_prefix("eq.").unwrap_or(filter))
}

async fn select_products(
    State(state): State<Shared>,
    Query(params): Query<HashMap<String, String>>,
) -> Response {
    let mut state = lock(&state);

    if let Some(id) = id_filter(&params) {
        return match state.product_mut(id) {
            Some(row) => Json(Value::Object(row.clone())).into_response(),
            None => no_rows(),
        };
    }

    let mut rows = state.products.clone();
    rows.sort_by(|a, b| {
        let created = |row: &Map<String, Value>| {
            row.get("created_at")
                .and_then(Value::as_str)
                .map(str::to_string)
        };
        created(b).cmp(&created(a))
    });
    Json(rows).into_response()
}

async fn insert_product(State(state): State<Shared>, Json(body): Json<Value>) -> Response {
    let Value::Object(fields) = body else {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({"code": "PGRST102", "message": "Expected a JSON object"})),
        )
            .into_response();
    };

    let mut state = lock(&state);
    state.next_product += 1;
    let n = state.next_product;

    let mut row = fields;
    row.insert("id".into(), json!(format!("prod-{n}")));
    row.insert(
        "created_at".into(),
        json!(format!("2024-07-01T10:{:02}:00Z", n % 60)),
    );
    row.insert("product_images".into(), json!([]));
    state.products.push(row.clone());

    (StatusCode::CREATED, Json(Value::Object(row))).into_response()
}

async fn update_product(
    State(state): State<Shared>,
    Query(params): Query<HashMap<String, String>>,
    Json(patch): Json<Value>,
) -> Response {
    let mut state = lock(&state);
    let Some(id) = id_filter(&params) else {
        return no_rows();
    };
    let Some(row) = state.product_mut(id) else {
        return no_rows();
    };

    if let Value::Object(fields) = patch {
        for (key, value) in fields {
            if key != "id" {
                row.insert(key, value);
            }
        }
    }
    Json(Value::Object(row.clone())).into_response()
}

async fn delete_product(
    State(state): State<Shared>,
    Query(params): Query<HashMap<String, String>>,
) -> Response {
    let mut state = lock(&state);
    let Some(id) = id_filter(&params) else {
        return no_rows();
    };
    let Some(index) = state
        .products
        .iter()
        .position(|row| row.get("id").and_then(Value::as_str) == Some(id))
    else {
        return no_rows();
    };

    Json(Value::Object(state.products.remove(index))).into_response()
}

async fn insert_images(State(state): State<Shared>, Json(rows): Json<Vec<Value>>) -> Response {
    let mut state = lock(&state);

    for row in rows {
        let product_id = row.get("product_id").and_then(Value::as_str).unwrap_or_default();
        let image_url = row.get("image_url").cloned().unwrap_or(Value::Null);

        state.next_image += 1;
        let image_id = state.next_image;

        let Some(product) = state.product_mut(product_id) else {
            return (
                StatusCode::CONFLICT,
                Json(json!({
                    "code": "23503",
                    "message": "insert or update on table \"product_images\" violates foreign key constraint"
                })),
            )
                .into_response();
        };
        if let Some(Value::Array(images)) = product.get_mut("product_images") {
            images.push(json!({"id": image_id, "image_url": image_url}));
        }
    }

    StatusCode::CREATED.into_response()
}

async fn upload_object(
    State(state): State<Shared>,
    Path((bucket, key)): Path<(String, String)>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let mut state = lock(&state);

    if state.objects.iter().any(|o| o.bucket == bucket && o.key == key) {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({
                "statusCode": "409",
                "error": "Duplicate",
                "message": "The resource already exists"
            })),
        )
            .into_response();
    }

    state.objects.push(StoredObject {
        bucket: bucket.clone(),
        key: key.clone(),
        content_type: header_value(&headers, header::CONTENT_TYPE.as_str()),
        size: body.len(),
    });
    Json(json!({"Key": format!("{bucket}/{key}")})).into_response()
}
