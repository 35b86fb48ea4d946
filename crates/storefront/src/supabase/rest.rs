//! URL building and error classification for the Supabase REST APIs.

use serde_json::Value;
use url::Url;

use crate::backend::BackendError;

/// `PostgREST` code for "JSON object requested, multiple (or no) rows returned".
pub const NO_ROWS_CODE: &str = "PGRST116";

/// Postgres `invalid_text_representation`, raised for a malformed uuid filter.
pub const INVALID_TEXT_CODE: &str = "22P02";

/// Media type asking `PostgREST` for a single object instead of an array.
pub const SINGLE_OBJECT: &str = "application/vnd.pgrst.object+json";

/// Append path segments to the project base URL.
///
/// Segments are percent-encoded, so object keys can be passed as-is.
pub fn endpoint(base: &Url, segments: &[&str]) -> Url {
    let mut url = base.clone();
    url.set_query(None);
    url.set_fragment(None);
    if let Ok(mut path) = url.path_segments_mut() {
        path.pop_if_empty().extend(segments);
    }
    url
}

/// Turn a non-success response into a [`BackendError`].
///
/// Both `PostgREST` (`{code, message, details, hint}`) and Storage
/// (`{statusCode, error, message}`) bodies are understood. Anything else is
/// reported with a truncated copy of the body.
pub fn classify_error(status: u16, body: &str) -> BackendError {
    let parsed: Option<Value> = serde_json::from_str(body).ok();
    let field = |name: &str| {
        parsed
            .as_ref()
            .and_then(|v| v.get(name))
            .and_then(Value::as_str)
            .map(str::to_owned)
    };

    let code = field("code");
    let message = field("message")
        .or_else(|| field("error"))
        .unwrap_or_else(|| truncate(body, 200));

    if status == 404 || code.as_deref() == Some(NO_ROWS_CODE) {
        return BackendError::NotFound(message);
    }

    BackendError::Backend {
        status,
        code,
        message,
    }
}

/// Parse a `Retry-After` header value in seconds.
pub fn retry_after_secs(value: Option<&str>) -> u64 {
    value.and_then(|s| s.trim().parse::<u64>().ok()).unwrap_or(1)
}

/// First `max` characters of `text`, for log fields.
pub fn truncate(text: &str, max: usize) -> String {
    text.chars().take(max).collect()
}
