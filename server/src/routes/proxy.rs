//! `/proxy/{*target}`: forward a request to another origin.
//!
//! The target is the rest of the path, `https://` prefixed when it carries no
//! scheme. Method, headers, query string and body pass through; the upstream
//! status, headers and body come back with permissive CORS headers. An
//! unreachable upstream is a 502.

use axum::body::{Body, Bytes};
use axum::extract::{Path, State};
use axum::http::header::{self, HeaderMap, HeaderValue};
use axum::http::{Method, StatusCode, Uri};
use axum::response::{IntoResponse, Response};
use tracing::{info, warn};

use crate::state::AppState;

/// Headers that describe one hop and must not be copied across.
const HOP_HEADERS: [header::HeaderName; 4] =
    [header::HOST, header::CONNECTION, header::TRANSFER_ENCODING, header::CONTENT_LENGTH];

pub async fn proxy(
    State(state): State<AppState>,
    Path(target): Path<String>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let url = target_url(&target, uri.query());
    info!(%method, %url, "proxying request");

    let upstream = state
        .http
        .request(method, &url)
        .headers(without_hop_headers(&headers))
        .body(body)
        .send()
        .await;
    let upstream = match upstream {
        Ok(upstream) => upstream,
        Err(e) => {
            warn!(%url, error = %e, "proxy upstream failed");
            return (StatusCode::BAD_GATEWAY, e.to_string()).into_response();
        }
    };

    let status = upstream.status();
    let mut response_headers = without_hop_headers(upstream.headers());
    let body = match upstream.bytes().await {
        Ok(body) => body,
        Err(e) => {
            warn!(%url, error = %e, "proxy upstream body failed");
            return (StatusCode::BAD_GATEWAY, e.to_string()).into_response();
        }
    };

    add_cors(&mut response_headers);
    let mut response = Response::new(Body::from(body));
    *response.status_mut() = status;
    *response.headers_mut() = response_headers;
    response
}

/// Upstream URL for a captured path tail.
pub fn target_url(target: &str, query: Option<&str>) -> String {
    let mut url = if target.starts_with("http") { target.to_owned() } else { format!("https://{target}") };
    if let Some(query) = query.filter(|q| !q.is_empty()) {
        url.push('?');
        url.push_str(query);
    }
    url
}

fn without_hop_headers(headers: &HeaderMap) -> HeaderMap {
    let mut copied = headers.clone();
    for name in &HOP_HEADERS {
        copied.remove(name);
    }
    copied
}

fn add_cors(headers: &mut HeaderMap) {
    headers.insert(header::ACCESS_CONTROL_ALLOW_ORIGIN, HeaderValue::from_static("*"));
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_METHODS,
        HeaderValue::from_static("GET, POST, PUT, DELETE, OPTIONS"),
    );
    headers.insert(header::ACCESS_CONTROL_ALLOW_HEADERS, HeaderValue::from_static("*"));
}

#[cfg(test)]
#[path = "proxy_test.rs"]
mod tests;
