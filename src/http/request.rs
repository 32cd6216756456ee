//! Intercepted request representation.
//!
//! # Responsibilities
//! - Carry the parts of a request the kernel decides on (method, path, headers, body)
//! - Derive the request identity used as cache key
//! - Rewrite the target path for routes and mounts without touching the rest
//!
//! # Design Decisions
//! - Request ID added as early as possible for tracing (tower-http layers)
//! - Body is buffered; intercepted resources are small, static-ish files

use axum::body::Bytes;
use axum::http::{HeaderMap, HeaderName, Method};
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};

/// Header carrying the per-request correlation ID.
pub const X_REQUEST_ID: HeaderName = HeaderName::from_static("x-request-id");

/// Layer assigning a UUID v4 request ID when the client didn't send one.
pub fn set_request_id_layer() -> SetRequestIdLayer<MakeRequestUuid> {
    SetRequestIdLayer::new(X_REQUEST_ID, MakeRequestUuid)
}

/// Layer copying the request ID onto the response.
pub fn propagate_request_id_layer() -> PropagateRequestIdLayer {
    PropagateRequestIdLayer::new(X_REQUEST_ID)
}

/// A request as seen by the interception pipeline.
#[derive(Debug, Clone)]
pub struct KernelRequest {
    pub method: Method,
    /// Path including the query string, e.g. `/api/users?page=2`.
    pub path: String,
    pub headers: HeaderMap,
    pub body: Bytes,
}

impl KernelRequest {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            headers: HeaderMap::new(),
            body: Bytes::new(),
        }
    }

    /// Shorthand for a bodiless GET.
    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::GET, path)
    }

    /// Cache key: method plus full path.
    pub fn identity(&self) -> String {
        format!("{} {}", self.method, self.path)
    }

    /// Path without the query string.
    pub fn path_only(&self) -> &str {
        self.path.split_once('?').map_or(self.path.as_str(), |(p, _)| p)
    }

    /// Same request aimed at another target path.
    pub fn retarget(&self, path: impl Into<String>) -> Self {
        Self {
            method: self.method.clone(),
            path: path.into(),
            headers: self.headers.clone(),
            body: self.body.clone(),
        }
    }

    /// Only GET responses are stored by the caching strategies.
    pub fn is_cacheable(&self) -> bool {
        self.method == Method::GET
    }

    pub fn request_id(&self) -> &str {
        self.headers
            .get(&X_REQUEST_ID)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("unknown")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identity_includes_method_and_query() {
        let req = KernelRequest::get("/data/x.json?v=2");
        assert_eq!(req.identity(), "GET /data/x.json?v=2");
        assert_eq!(req.path_only(), "/data/x.json");

        let post = KernelRequest::new(Method::POST, "/data/x.json");
        assert_ne!(post.identity(), KernelRequest::get("/data/x.json").identity());
        assert!(!post.is_cacheable());
    }

    #[test]
    fn test_retarget_keeps_method_and_headers() {
        let mut req = KernelRequest::new(Method::PUT, "/a");
        req.headers.insert("x-test", "1".parse().unwrap());
        let moved = req.retarget("/b");
        assert_eq!(moved.method, Method::PUT);
        assert_eq!(moved.path, "/b");
        assert_eq!(moved.headers["x-test"], "1");
        assert_eq!(req.request_id(), "unknown");
    }
}
