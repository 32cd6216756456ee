//! Response representation and transformation.
//!
//! # Responsibilities
//! - Hold buffered responses produced by the network or the cache
//! - Apply route header overrides
//! - Build the explicit offline responses of the caching strategies
//! - Convert to an axum response at the HTTP edge

use std::collections::BTreeMap;

use axum::body::{Body, Bytes};
use axum::http::{HeaderMap, HeaderName, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};

/// Body of the 503 returned when the network fails and nothing is cached
/// (cache-first, stale-while-revalidate).
pub const OFFLINE_BODY: &str = "Offline: resource unavailable";

/// Body of the 503 returned by network-first when the network fails and the
/// cache is empty.
pub const NO_CACHE_BODY: &str = "Offline: no cache available";

/// A fully buffered response.
#[derive(Debug, Clone, PartialEq)]
pub struct KernelResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Bytes,
}

impl KernelResponse {
    pub fn new(status: StatusCode, body: impl Into<Bytes>) -> Self {
        Self {
            status,
            headers: HeaderMap::new(),
            body: body.into(),
        }
    }

    /// Plain-text response with a content type set.
    pub fn text(status: StatusCode, body: &'static str) -> Self {
        let mut response = Self::new(status, body);
        response.headers.insert(
            axum::http::header::CONTENT_TYPE,
            HeaderValue::from_static("text/plain; charset=utf-8"),
        );
        response
    }

    pub fn offline() -> Self {
        Self::text(StatusCode::SERVICE_UNAVAILABLE, OFFLINE_BODY)
    }

    pub fn no_cache_available() -> Self {
        Self::text(StatusCode::SERVICE_UNAVAILABLE, NO_CACHE_BODY)
    }

    pub fn bad_gateway() -> Self {
        Self::text(StatusCode::BAD_GATEWAY, "Upstream request failed")
    }

    /// `ok` in the fetch sense: a 2xx status.
    pub fn is_ok(&self) -> bool {
        self.status.is_success()
    }

    /// Override headers; invalid names or values are skipped with a warning.
    pub fn with_headers(mut self, overrides: &BTreeMap<String, String>) -> Self {
        for (name, value) in overrides {
            match (
                HeaderName::try_from(name.as_str()),
                HeaderValue::try_from(value.as_str()),
            ) {
                (Ok(name), Ok(value)) => {
                    self.headers.insert(name, value);
                }
                _ => tracing::warn!(header = %name, "Skipping invalid route header override"),
            }
        }
        self
    }
}

impl IntoResponse for KernelResponse {
    fn into_response(self) -> Response {
        let mut response = Response::new(Body::from(self.body));
        *response.status_mut() = self.status;
        *response.headers_mut() = self.headers;
        response
    }
}
