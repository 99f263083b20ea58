//! Shared HTTP client and auth utilities.

use std::time::Duration;

use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};

use crate::error::ToolmeshError;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(120);

/// Build the reqwest client used for completion requests.
pub fn build_client() -> Result<reqwest::Client, ToolmeshError> {
    Ok(reqwest::Client::builder()
        .timeout(REQUEST_TIMEOUT)
        .pool_max_idle_per_host(10)
        .build()?)
}

/// Build default headers for a Bearer-token API.
pub fn bearer_headers(api_key: &str) -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
    if let Ok(val) = HeaderValue::from_str(&format!("Bearer {api_key}")) {
        headers.insert(AUTHORIZATION, val);
    }
    headers
}

/// Map a non-success HTTP status to an error.
pub fn status_to_error(status: u16, body: &str) -> ToolmeshError {
    match status {
        401 | 403 => ToolmeshError::Authentication(body.to_string()),
        429 => ToolmeshError::RateLimited {
            retry_after_ms: extract_retry_after(body),
        },
        _ => ToolmeshError::Api {
            status,
            message: body.to_string(),
        },
    }
}

fn extract_retry_after(body: &str) -> Option<u64> {
    serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|v| {
            v.get("error")
                .and_then(|e| e.get("retry_after"))
                .and_then(|r| r.as_f64())
                .map(|s| (s * 1000.0) as u64)
        })
}
